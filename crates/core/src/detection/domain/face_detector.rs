use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Domain interface for face detection.
///
/// Returns an empty sequence, not an error, when no face is present.
/// The region order carries no meaning but must be stable within one
/// call, since the recognition cycle pairs results with regions 1:1.
/// Tuning (scale factor, min-neighbors, minimum size) is construction-time
/// configuration of the implementation, never runtime state of the core.
/// Implementations may be stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>>;
}
