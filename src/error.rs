//! The error taxonomy for the plotting engine.  An empty queue is
//! deliberately *not* represented here; "no work to do" is an
//! `Ok(None)` at the repository boundary, never an error.

use failure::Fail;

/// Everything that can go wrong between accepting a plot request and
/// handing back its image bytes.
#[derive(Debug, Fail)]
pub enum PlotError {
    /// The parameters were degenerate (zero dimensions, zero iteration
    /// cap, an inside-out region).  Rejected before any work begins and
    /// never retried.
    #[fail(display = "invalid plot parameters: {}", _0)]
    Validation(String),

    /// The plot exceeded its overall time budget.  The partially
    /// accumulated buffer is discarded; a partial image is never
    /// surfaced as a completed plot.
    #[fail(display = "plot exceeded its time budget")]
    Timeout,

    /// A plot id that the repository has never seen.
    #[fail(display = "plot {} not found", _0)]
    NotFound(u64),

    /// Anything else that went wrong while plotting.  The worker logs
    /// these and leaves the job unresolved for operator inspection
    /// rather than retrying.
    #[fail(display = "plot failed: {}", _0)]
    Unexpected(String),
}

impl PlotError {
    /// True when the error is the overall-timeout case, which the
    /// worker maps to the Failed job state.
    pub fn is_timeout(&self) -> bool {
        match self {
            PlotError::Timeout => true,
            _ => false,
        }
    }
}
