// ============================================================
// Layer 4 — Frame Transform
// ============================================================
// The single input transform shared by training, validation
// and deployment:
//
//   RgbImage ──resize (cubic)──► resize_to × resize_to
//            ──scale / 255──► [0, 1]
//            ──(x - mean) / std──► ImageNet-normalised
//            ──HWC → CHW──► Vec<f32> of len 3 * resize_to²
//
// Using one transform everywhere means a staged deployment
// frame goes through exactly the same numbers as a training
// frame.

use image::{
    imageops::{self, FilterType},
    RgbImage,
};
use std::path::Path;

pub const CHANNELS: usize = 3;

/// Per-channel ImageNet statistics
pub const IMAGENET_MEAN: [f32; CHANNELS] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD:  [f32; CHANNELS] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTransform {
    resize_to: u32,
}

impl FrameTransform {
    pub fn new(resize_to: u32) -> Self {
        Self { resize_to }
    }

    pub fn resize_to(&self) -> u32 {
        self.resize_to
    }

    /// Number of f32 values one transformed frame occupies
    pub fn frame_len(&self) -> usize {
        let side = self.resize_to as usize;
        CHANNELS * side * side
    }

    /// Resize and normalise one frame into CHW order.
    pub fn apply(&self, frame: &RgbImage) -> Vec<f32> {
        let side = self.resize_to;
        let resized;
        let frame = if frame.dimensions() == (side, side) {
            frame
        } else {
            resized = imageops::resize(frame, side, side, FilterType::CatmullRom);
            &resized
        };

        let plane = (side * side) as usize;
        let mut out = vec![0.0f32; CHANNELS * plane];
        for (i, pixel) in frame.pixels().enumerate() {
            for c in 0..CHANNELS {
                let x = pixel[c] as f32 / 255.0;
                out[c * plane + i] = (x - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
        out
    }

    /// Read an image file and transform it.
    pub fn load(&self, path: &Path) -> Result<Vec<f32>, image::ImageError> {
        Ok(self.apply(&image::open(path)?.to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_output_is_chw_and_normalised() {
        let t   = FrameTransform::new(2);
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let out = t.apply(&img);

        assert_eq!(out.len(), t.frame_len());
        let red   = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!(out[..4].iter().all(|v| (v - red).abs() < 1e-6));
        assert!(out[4..8].iter().all(|v| (v - green).abs() < 1e-6));
    }

    #[test]
    fn test_resizes_to_square() {
        let t   = FrameTransform::new(8);
        let img = RgbImage::from_pixel(20, 12, Rgb([10, 20, 30]));
        assert_eq!(t.apply(&img).len(), 3 * 8 * 8);
    }
}
