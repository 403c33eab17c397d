/// Pauses and resumes the passive frame producer.
///
/// The controller holds the gate shut for the duration of a session open
/// so the synchronous process launch cannot interleave with frame
/// publication. Every pause must be matched by a resume, failure paths
/// included; a missed resume leaves the feed frozen.
pub trait CaptureGate: Send + Sync {
    fn pause(&self);
    fn resume(&self);
}

/// Gate for wirings without a pausable producer (tests, replay drivers).
pub struct NullCaptureGate;

impl CaptureGate for NullCaptureGate {
    fn pause(&self) {}
    fn resume(&self) {}
}
