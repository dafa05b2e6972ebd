//! Capabilities the embedding player provides to the skip controller

/// Playback target controlled by a [`SkipController`](crate::SkipController)
///
/// Times are in seconds. `set_current_time` may re-enter the controller (e.g. to
/// report a seek); the controller never holds its state lock while calling it.
pub trait MediaHost: Send + Sync {
    /// Current playhead position
    fn current_time(&self) -> f64;

    /// Move the playhead
    fn set_current_time(&self, seconds: f64);

    /// Total media duration (0 or NaN while unknown)
    fn duration(&self) -> f64;
}
