use crate::shared::constants::UNRECOGNIZED_USER;
use crate::shared::frame::Frame;

/// Identity classification for one cropped face.
///
/// `distance` is the match confidence: lower means a closer match. For
/// the unrecognized sentinel the distance is implementation-defined.
#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    pub user_name: String,
    pub url: String,
    pub distance: f64,
}

impl Recognition {
    pub fn new(user_name: impl Into<String>, url: impl Into<String>, distance: f64) -> Self {
        Self {
            user_name: user_name.into(),
            url: url.into(),
            distance,
        }
    }

    /// The sentinel result: no enrolled identity within threshold.
    pub fn unrecognized(distance: f64) -> Self {
        Self::new(UNRECOGNIZED_USER, "", distance)
    }

    pub fn is_unrecognized(&self) -> bool {
        self.user_name == UNRECOGNIZED_USER
    }
}

/// Domain interface for face recognition.
///
/// `recognize` takes a cropped grayscale face and never fails for a
/// structurally valid crop; "no match" is expressed through the sentinel,
/// not an error. `retrain` rebuilds the model from the enrolled face
/// store after new enrollments; a failure there degrades gracefully and
/// the stale model keeps serving.
pub trait FaceRecognizer: Send {
    fn recognize(&mut self, face: &Frame) -> Result<Recognition, Box<dyn std::error::Error>>;

    fn retrain(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
