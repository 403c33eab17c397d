/// An axis-aligned rectangle locating one detected face within a frame.
///
/// Produced by a detection cycle and invalidated wholesale by the next;
/// coordinates may extend past the frame edges, so consumers clamp before
/// touching pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersects the region with a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the region lies inside the frame.
    /// The result always has positive extent and non-negative origin.
    pub fn clamped_to(&self, frame_width: u32, frame_height: u32) -> Option<FaceRegion> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width).min(frame_width as i32);
        let y1 = self.y.saturating_add(self.height).min(frame_height as i32);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(FaceRegion {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}
