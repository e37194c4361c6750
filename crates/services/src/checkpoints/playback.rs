/// Seam to the video player the controller interrupts.
///
/// The controller pauses on activation and resumes once the active
/// checkpoint is answered or skipped. It never reads the playback position
/// through this trait; positions are pushed in via `on_time_update`.
pub trait PlaybackControl: Send {
    fn pause(&mut self);
    fn resume(&mut self);
}
