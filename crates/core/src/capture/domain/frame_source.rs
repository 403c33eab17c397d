use crate::shared::frame::Frame;

/// Supplies the most recent camera frame on demand.
///
/// `Ok(None)` signals a transient capture failure; the caller skips the
/// tick and asks again later. Errors are reserved for conditions that
/// should abort startup (device gone, unsupported format) and are
/// expected only while a wiring is being probed.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}
