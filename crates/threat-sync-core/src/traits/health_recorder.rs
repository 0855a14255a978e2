//! Health recorder trait

/// Fire-and-forget observer of sync outcomes
///
/// The engine calls [`HealthRecorder::record_sync`] after every successful
/// cycle. Failed cycles are reported with [`HealthRecorder::record_error`]
/// by whoever drives the schedule.
pub trait HealthRecorder: Send + Sync {
    /// A sync cycle completed successfully
    fn record_sync(&self);

    /// A sync cycle failed
    fn record_error(&self);
}
