/// Persists enrolled face samples.
///
/// `image` is an encoded face crop (PNG from the enrollment path). The
/// store owns layout and format; callers only promise the user name has
/// passed the reserved-name check.
pub trait FaceStore: Send {
    fn save_face(
        &mut self,
        user_name: &str,
        url: &str,
        image: &[u8],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
