use crate::shared::region::FaceRegion;

/// A single captured video frame: contiguous interleaved bytes in
/// row-major order, stamped with a monotonically increasing capture index.
///
/// Pixel format conversion happens at the capture boundary only; the
/// session core treats pixel data as opaque except for region cropping
/// and the grayscale conversion the recognizer contract requires.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Extracts the pixels under `region`, clamped to the frame bounds.
    ///
    /// Returns `None` when the clamped region is degenerate (fully outside
    /// the frame or zero-sized). The crop keeps the capture index so
    /// downstream consumers can still correlate it with its source frame.
    pub fn crop(&self, region: &FaceRegion) -> Option<Frame> {
        let clamped = region.clamped_to(self.width, self.height)?;
        let ch = self.channels as usize;
        let row_stride = self.width as usize * ch;
        let x0 = clamped.x as usize * ch;
        let copy_len = clamped.width as usize * ch;

        let mut data = Vec::with_capacity(clamped.height as usize * copy_len);
        for row in clamped.y as usize..(clamped.y + clamped.height) as usize {
            let start = row * row_stride + x0;
            data.extend_from_slice(&self.data[start..start + copy_len]);
        }

        Some(Frame::new(
            data,
            clamped.width as u32,
            clamped.height as u32,
            self.channels,
            self.index,
        ))
    }

    /// Collapses the frame to a single luma channel (BT.601 weights for
    /// three-channel input, first channel passthrough otherwise).
    pub fn to_grayscale(&self) -> Frame {
        if self.channels == 1 {
            return self.clone();
        }

        let ch = self.channels as usize;
        let data: Vec<u8> = self
            .data
            .chunks_exact(ch)
            .map(|px| {
                if ch >= 3 {
                    let luma = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                    (luma / 1000) as u8
                } else {
                    px[0]
                }
            })
            .collect();

        Frame::new(data, self.width, self.height, 1, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: i32, h: i32) -> FaceRegion {
        FaceRegion {
            x,
            y,
            width: w,
            height: h,
        }
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_crop_interior_region() {
        // 4x4 single-channel frame with row-major values 0..16
        let data: Vec<u8> = (0..16).collect();
        let frame = Frame::new(data, 4, 4, 1, 7);

        let crop = frame.crop(&region(1, 1, 2, 2)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        assert_eq!(crop.data(), &[5, 6, 9, 10]);
    }

    #[test]
    fn test_crop_clamps_at_frame_edges() {
        let data: Vec<u8> = (0..16).collect();
        let frame = Frame::new(data, 4, 4, 1, 0);

        // Region hangs off the bottom-right corner.
        let crop = frame.crop(&region(2, 2, 10, 10)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.data(), &[10, 11, 14, 15]);
    }

    #[test]
    fn test_crop_outside_frame_returns_none() {
        let frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(frame.crop(&region(10, 10, 4, 4)).is_none());
        assert!(frame.crop(&region(0, 0, 0, 4)).is_none());
    }

    #[test]
    fn test_crop_multichannel_keeps_interleaving() {
        // 2x2 RGB, each pixel's channels all equal its pixel number
        let data = vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3];
        let frame = Frame::new(data, 2, 2, 3, 0);

        let crop = frame.crop(&region(1, 0, 1, 2)).unwrap();
        assert_eq!(crop.data(), &[1, 1, 1, 3, 3, 3]);
    }

    #[test]
    fn test_grayscale_of_rgb() {
        // Pure red pixel: luma = 299*255/1000 = 76
        let frame = Frame::new(vec![255, 0, 0], 1, 1, 3, 3);
        let gray = frame.to_grayscale();
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.index(), 3);
        assert_eq!(gray.data(), &[76]);
    }

    #[test]
    fn test_grayscale_of_grayscale_is_identity() {
        let frame = Frame::new(vec![42, 43], 2, 1, 1, 0);
        assert_eq!(frame.to_grayscale().data(), frame.data());
    }
}
