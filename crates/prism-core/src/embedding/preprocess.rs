//! Image preprocessing for the CLIP vision encoder.
//!
//! CLIP expects:
//! - Shortest side resized to the input size, then a center crop to a square
//! - Pixels scaled to [0, 1], then normalized with the OpenAI CLIP mean/std
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel).
const NORM_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel).
const NORM_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP inference.
///
/// Resizes to fill `image_size × image_size` and crops the center, converts to
/// RGB, normalizes, and returns an NCHW tensor suitable for ONNX Runtime.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let resized = image.resize_to_fill(
        image_size,
        image_size,
        image::imageops::FilterType::CatmullRom,
    );
    let rgb = resized.to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Walk the raw RGB bytes once; indexing the 4D array per pixel is much slower.
    let raw = rgb.as_raw();
    let plane = size * size;
    if let Some(tensor_data) = tensor.as_slice_mut() {
        for (i, pixel) in raw.chunks_exact(3).enumerate().take(plane) {
            for (c, &val) in pixel.iter().enumerate() {
                // NCHW layout: offset = c * size * size + pixel index
                tensor_data[c * plane + i] = (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
            }
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_preprocess_shape_224() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_shape_non_square_source() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 900));
        let tensor = preprocess(&img, 336);
        assert_eq!(tensor.shape(), &[1, 3, 336, 336]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255])));
        let tensor = preprocess(&img, 32);
        let expected_red = (1.0 - NORM_MEAN[0]) / NORM_STD[0];
        assert!((tensor[[0, 0, 5, 5]] - expected_red).abs() < 1e-3);

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0])));
        let tensor = preprocess(&img, 32);
        let expected_blue = -NORM_MEAN[2] / NORM_STD[2];
        assert!((tensor[[0, 2, 5, 5]] - expected_blue).abs() < 1e-3);
    }
}
