//! The persistence boundary.  The engine only ever needs four
//! operations from a durable store (enqueue, dequeue-next, find,
//! save), so that is the whole trait.  `MemoryRepository` is the
//! in-process implementation: a FIFO of plot ids plus the plot records
//! themselves behind a single mutex.  Popping the queue inside that
//! one critical section is what gives the at-most-one-claimant
//! guarantee a database would get from skip-locked row deletion.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use log::debug;

use crate::error::PlotError;
use crate::params::PlotParameters;
use crate::plot::Plot;

/// What the engine asks of a plot store.  An empty queue is a normal
/// `Ok(None)`, never an error.
pub trait PlotRepository: Send + Sync {
    /// Validates the parameters, creates a pending plot, and queues
    /// it.  Returns the new plot's id.
    fn enqueue(&self, parameters: PlotParameters) -> Result<u64, PlotError>;

    /// Atomically claims the oldest pending plot.  A claimed plot is
    /// gone from the queue; no other consumer can observe it there.
    fn dequeue_next(&self) -> Result<Option<Plot>, PlotError>;

    /// Looks up a plot by id.
    fn find(&self, id: u64) -> Result<Option<Plot>, PlotError>;

    /// Persists a plot's current timestamps and image data.
    fn save(&self, plot: Plot) -> Result<(), PlotError>;
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    queue: VecDeque<u64>,
    plots: HashMap<u64, Plot>,
}

/// An in-memory `PlotRepository`.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        MemoryRepository::default()
    }

    /// The number of plots still waiting for a worker.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}

impl PlotRepository for MemoryRepository {
    fn enqueue(&self, parameters: PlotParameters) -> Result<u64, PlotError> {
        parameters.validate()?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.plots.insert(id, Plot::new(id, parameters));
        inner.queue.push_back(id);
        debug!("plot {} enqueued", id);
        Ok(id)
    }

    fn dequeue_next(&self) -> Result<Option<Plot>, PlotError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.queue.pop_front() {
            // Not an error case; there's just nothing to do.
            None => Ok(None),
            Some(id) => {
                let plot = inner
                    .plots
                    .get(&id)
                    .cloned()
                    .ok_or(PlotError::NotFound(id))?;
                Ok(Some(plot))
            }
        }
    }

    fn find(&self, id: u64) -> Result<Option<Plot>, PlotError> {
        Ok(self.inner.lock().unwrap().plots.get(&id).cloned())
    }

    fn save(&self, plot: Plot) -> Result<(), PlotError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.plots.contains_key(&plot.id) {
            return Err(PlotError::NotFound(plot.id));
        }
        inner.plots.insert(plot.id, plot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MandelbrotParameters;
    use crate::plot::PlotState;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    fn mandelbrot() -> PlotParameters {
        PlotParameters::Mandelbrot(MandelbrotParameters {
            width: 16,
            height: 16,
            max_iterations: 32,
        })
    }

    #[test]
    fn enqueue_assigns_ids_and_find_sees_pending_plots() {
        let repository = MemoryRepository::new();
        let a = repository.enqueue(mandelbrot()).unwrap();
        let b = repository.enqueue(mandelbrot()).unwrap();
        assert_ne!(a, b);
        assert_eq!(repository.pending(), 2);
        let plot = repository.find(a).unwrap().unwrap();
        assert_eq!(plot.state(), PlotState::Pending);
    }

    #[test]
    fn enqueue_rejects_degenerate_parameters() {
        let repository = MemoryRepository::new();
        let bad = PlotParameters::Mandelbrot(MandelbrotParameters {
            width: 16,
            height: 0,
            max_iterations: 32,
        });
        assert!(repository.enqueue(bad).is_err());
        assert_eq!(repository.pending(), 0);
    }

    #[test]
    fn dequeue_is_fifo() {
        let repository = MemoryRepository::new();
        let ids: Vec<u64> = (0..5)
            .map(|_| repository.enqueue(mandelbrot()).unwrap())
            .collect();
        let mut dequeued = vec![];
        while let Some(plot) = repository.dequeue_next().unwrap() {
            dequeued.push(plot.id);
        }
        assert_eq!(dequeued, ids);
        assert!(repository.dequeue_next().unwrap().is_none());
    }

    #[test]
    fn concurrent_consumers_each_claim_a_job_exactly_once() {
        let repository = MemoryRepository::new();
        let expected: HashSet<u64> = (0..64)
            .map(|_| repository.enqueue(mandelbrot()).unwrap())
            .collect();

        let claimed = StdMutex::new(Vec::new());
        crossbeam::scope(|spawner| {
            for _ in 0..8 {
                spawner.spawn(|_| {
                    while let Some(plot) = repository.dequeue_next().unwrap() {
                        claimed.lock().unwrap().push(plot.id);
                    }
                });
            }
        })
        .unwrap();

        let claimed = claimed.into_inner().unwrap();
        assert_eq!(claimed.len(), expected.len());
        let unique: HashSet<u64> = claimed.into_iter().collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn save_round_trips_state() {
        let repository = MemoryRepository::new();
        let id = repository.enqueue(mandelbrot()).unwrap();
        let mut plot = repository.dequeue_next().unwrap().unwrap();
        plot.start();
        repository.save(plot.clone()).unwrap();
        assert_eq!(
            repository.find(id).unwrap().unwrap().state(),
            PlotState::Started
        );
        plot.complete(vec![0; 16 * 16 * 3]);
        repository.save(plot).unwrap();
        let found = repository.find(id).unwrap().unwrap();
        assert_eq!(found.state(), PlotState::Complete);
        assert_eq!(found.image_data.unwrap().len(), 16 * 16 * 3);
    }

    #[test]
    fn save_of_an_unknown_plot_fails() {
        let repository = MemoryRepository::new();
        let orphan = Plot::new(99, mandelbrot());
        assert!(repository.save(orphan).is_err());
    }
}
