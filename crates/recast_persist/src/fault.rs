//! Fault sinks: where recording faults go instead of aborting the walk.

use recast_core::RecastError;

/// Receives every fault raised while recording one object.
///
/// The walk continues after each report.
pub trait FaultSink {
    /// Handle one fault
    fn fault(&mut self, error: RecastError);
}

impl<F> FaultSink for F
where
    F: FnMut(RecastError),
{
    fn fault(&mut self, error: RecastError) {
        self(error);
    }
}

/// Default sink: logs each fault at `warn` and continues
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultSink;

impl FaultSink for LogFaultSink {
    fn fault(&mut self, error: RecastError) {
        tracing::warn!(error = %error, "fault while recording; continuing");
    }
}
