//! The plot worker: a single polling loop that claims the oldest
//! queued plot, drives the matching plotter, and advances the job's
//! state machine.  Plotting is CPU-bound, so each worker runs one job
//! at a time; scaling out means more worker instances against the same
//! repository, and the repository's atomic dequeue is the only
//! coordination between them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::error::PlotError;
use crate::plot;
use crate::repository::PlotRepository;

/// How long the worker sleeps between polls of an empty queue.  Plot
/// jobs run for seconds to hours, so a coarse poll costs nothing.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(1);

/// The overall budget for a single plot.  A plot still running at the
/// deadline is abandoned and marked failed.
pub const DEFAULT_PLOT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// A polling plot worker bound to a repository.
pub struct PlotWorker {
    repository: Arc<dyn PlotRepository>,
    threads: usize,
    idle: Duration,
    plot_timeout: Duration,
}

impl PlotWorker {
    /// A worker with the default idle interval, plot timeout, and one
    /// render thread per CPU.
    pub fn new(repository: Arc<dyn PlotRepository>) -> Self {
        PlotWorker {
            repository,
            threads: num_cpus::get(),
            idle: DEFAULT_IDLE,
            plot_timeout: DEFAULT_PLOT_TIMEOUT,
        }
    }

    /// How many threads each plot may fan out to.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// How long to sleep when the queue is empty.
    pub fn idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// The overall time budget for a single plot.
    pub fn plot_timeout(mut self, plot_timeout: Duration) -> Self {
        self.plot_timeout = plot_timeout;
        self
    }

    /// One iteration of the worker loop: claim a job, plot it, record
    /// the outcome.  Returns false when the queue was empty.
    ///
    /// A successful plot goes Started then Complete with its bytes
    /// attached.  A timed-out plot goes Failed with nothing attached.
    /// Any other plotting error is logged and the job stays Started,
    /// left for an operator to inspect rather than silently retried:
    /// a deterministic failure would just fail again, and retrying a
    /// Buddhabrot burns serious CPU.
    pub fn poll_once(&self) -> Result<bool, PlotError> {
        let mut plot = match self.repository.dequeue_next()? {
            None => return Ok(false),
            Some(plot) => plot,
        };
        info!("dequeued plot {}", plot.id);

        plot.start();
        self.repository.save(plot.clone())?;

        let deadline = Instant::now() + self.plot_timeout;
        match plot::render(&plot.parameters, self.threads, deadline) {
            Ok(buffer) => {
                plot.complete(buffer.into_bytes());
                self.repository.save(plot.clone())?;
                info!("plot {} complete", plot.id);
            }
            Err(ref e) if e.is_timeout() => {
                plot.fail();
                self.repository.save(plot.clone())?;
                error!("plot {} abandoned: {}", plot.id, e);
            }
            Err(e) => {
                // Left Started on purpose; see above.
                error!("plot {} failed: {}", plot.id, e);
            }
        }
        Ok(true)
    }

    /// The polling loop.  Runs until the stop flag is raised.  A
    /// failure in one iteration is logged and the loop carries on; one
    /// bad job must never take the worker down.
    pub fn run(&self, stop: &AtomicBool) {
        info!("plot worker started ({} render threads)", self.threads);
        while !stop.load(Ordering::Relaxed) {
            match self.poll_once() {
                Ok(true) => {}
                Ok(false) => std::thread::sleep(self.idle),
                Err(e) => {
                    error!("worker iteration failed: {}", e);
                    std::thread::sleep(self.idle);
                }
            }
        }
        info!("plot worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RGB_BYTES_PER_PIXEL;
    use crate::params::{
        BuddhabrotParameters, MandelbrotParameters, PlotParameters, SampleSize,
    };
    use crate::plot::PlotState;
    use crate::repository::MemoryRepository;

    fn worker_with_repository() -> (PlotWorker, Arc<MemoryRepository>) {
        let repository = Arc::new(MemoryRepository::new());
        let worker = PlotWorker::new(repository.clone()).threads(2);
        (worker, repository)
    }

    #[test]
    fn empty_queue_is_not_work() {
        let (worker, _repository) = worker_with_repository();
        assert_eq!(worker.poll_once().unwrap(), false);
    }

    #[test]
    fn mandelbrot_job_runs_end_to_end() {
        let (worker, repository) = worker_with_repository();
        let id = repository
            .enqueue(PlotParameters::Mandelbrot(MandelbrotParameters {
                width: 64,
                height: 64,
                max_iterations: 32,
            }))
            .unwrap();

        assert_eq!(worker.poll_once().unwrap(), true);

        let plot = repository.find(id).unwrap().unwrap();
        assert_eq!(plot.state(), PlotState::Complete);
        assert!(plot.started_at.is_some());
        assert!(plot.completed_at.is_some());
        let image = plot.image_data.unwrap();
        assert_eq!(image.len(), 64 * 64 * RGB_BYTES_PER_PIXEL);
        // The center pixel maps to a deep-interior point.
        let offset = 32 * 64 * RGB_BYTES_PER_PIXEL + 32 * RGB_BYTES_PER_PIXEL;
        assert_eq!(&image[offset..offset + 3], &[0, 0, 0]);
    }

    #[test]
    fn buddhabrot_job_runs_end_to_end() {
        let (worker, repository) = worker_with_repository();
        let id = repository
            .enqueue(PlotParameters::Buddhabrot(BuddhabrotParameters {
                width: 32,
                height: 32,
                max_iterations: 64,
                max_sample_iterations: 32,
                sample_size: SampleSize::Count(2000),
                passes: 1,
                grayscale: true,
            }))
            .unwrap();

        assert_eq!(worker.poll_once().unwrap(), true);

        let plot = repository.find(id).unwrap().unwrap();
        assert_eq!(plot.state(), PlotState::Complete);
        assert_eq!(
            plot.image_data.unwrap().len(),
            32 * 32 * RGB_BYTES_PER_PIXEL
        );
    }

    #[test]
    fn timed_out_job_is_failed_with_no_image() {
        let (worker, repository) = worker_with_repository();
        let worker = worker.plot_timeout(Duration::from_secs(0));
        let id = repository
            .enqueue(PlotParameters::Mandelbrot(MandelbrotParameters {
                width: 512,
                height: 512,
                max_iterations: 1024,
            }))
            .unwrap();

        assert_eq!(worker.poll_once().unwrap(), true);

        let plot = repository.find(id).unwrap().unwrap();
        assert_eq!(plot.state(), PlotState::Failed);
        assert!(plot.image_data.is_none());
        assert!(plot.failed_at.is_some());
    }

    #[test]
    fn jobs_complete_in_queue_order() {
        let (worker, repository) = worker_with_repository();
        let params = PlotParameters::Mandelbrot(MandelbrotParameters {
            width: 16,
            height: 16,
            max_iterations: 16,
        });
        let first = repository.enqueue(params).unwrap();
        let second = repository.enqueue(params).unwrap();

        assert!(worker.poll_once().unwrap());
        assert_eq!(
            repository.find(first).unwrap().unwrap().state(),
            PlotState::Complete
        );
        assert_eq!(
            repository.find(second).unwrap().unwrap().state(),
            PlotState::Pending
        );
        assert!(worker.poll_once().unwrap());
        assert_eq!(
            repository.find(second).unwrap().unwrap().state(),
            PlotState::Complete
        );
    }
}
