//! Image preprocessing for DINOv2 inference.
//!
//! DINOv2 expects:
//! - Shorter side resized to 256 (aspect ratio kept), then a 224×224 centre crop
//! - Pixels scaled to [0, 1] and normalized with ImageNet mean/std
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// ImageNet per-channel mean.
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet per-channel standard deviation.
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Dimensions after scaling the shorter side to `shorter`.
///
/// The longer side is truncated, not rounded.
fn resized_dimensions(width: u32, height: u32, shorter: u32) -> (u32, u32) {
    if width <= height {
        let h = (shorter as f64 * height as f64 / width.max(1) as f64) as u32;
        (shorter, h.max(shorter))
    } else {
        let w = (shorter as f64 * width as f64 / height.max(1) as f64) as u32;
        (w.max(shorter), shorter)
    }
}

/// Preprocess an image for DINOv2 inference.
///
/// Resizes so the shorter side equals `resize`, centre-crops to
/// `crop_size × crop_size`, converts to RGB, normalizes with ImageNet
/// statistics, and returns a `[1, 3, crop_size, crop_size]` tensor.
pub fn preprocess(image: &DynamicImage, resize: u32, crop_size: u32) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (new_w, new_h) = resized_dimensions(width, height, resize.max(crop_size));
    let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom);

    let left = (new_w - crop_size) / 2;
    let top = (new_h - crop_size) / 2;
    let rgb = resized.crop_imm(left, top, crop_size, crop_size).to_rgb8();

    let size = crop_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Walk the raw RGB buffer and write straight into the contiguous NCHW slice.
    let raw = rgb.as_raw();
    if let Some(tensor_data) = tensor.as_slice_mut() {
        for (i, pixel) in raw.chunks_exact(CHANNELS).enumerate() {
            let y = i / size;
            let x = i % size;
            for (c, &val) in pixel.iter().enumerate() {
                let idx = c * size * size + y * size + x;
                tensor_data[idx] = (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
            }
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_preprocess_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 256, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_small_portrait_image() {
        // Upscaled past the crop size before cropping
        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 90));
        let tensor = preprocess(&img, 256, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_resized_dimensions_keep_aspect() {
        assert_eq!(resized_dimensions(640, 480, 256), (341, 256));
        assert_eq!(resized_dimensions(480, 640, 256), (256, 341));
        assert_eq!(resized_dimensions(300, 300, 256), (256, 256));
    }

    #[test]
    fn test_resized_long_side_truncates() {
        // 256 * 500 / 300 = 426.67
        assert_eq!(resized_dimensions(500, 300, 256), (426, 256));
        assert_eq!(resized_dimensions(300, 500, 256), (256, 426));
    }

    #[test]
    fn test_preprocess_imagenet_normalization() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let tensor = preprocess(&img, 256, 224);
        // White -> (1 - mean) / std per channel
        for c in 0..3 {
            let expected = (1.0 - NORM_MEAN[c]) / NORM_STD[c];
            assert!((tensor[[0, c, 100, 100]] - expected).abs() < 1e-3);
        }

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])));
        let tensor = preprocess(&img, 256, 224);
        for c in 0..3 {
            let expected = -NORM_MEAN[c] / NORM_STD[c];
            assert!((tensor[[0, c, 5, 5]] - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_preprocess_channel_order_is_rgb() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([255, 0, 0])));
        let tensor = preprocess(&img, 256, 224);
        assert!(tensor[[0, 0, 50, 50]] > 2.0);
        assert!(tensor[[0, 1, 50, 50]] < 0.0);
        assert!(tensor[[0, 2, 50, 50]] < 0.0);
    }
}
