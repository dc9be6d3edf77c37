//! Pixel validation and normalization.
//!
//! The service owns normalization: clients send raw intensities in `[0, 1]`
//! and the mean/std constants below are applied exactly once, here.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use ndarray::{Array2, Array4};

use crate::error::{Result, ServiceError};
use crate::models::PixelInput;

pub const IMAGE_SIDE: usize = 28;
pub const PIXEL_COUNT: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Dataset-wide mean the model was trained against.
pub const MNIST_MEAN: f32 = 0.1307;
/// Dataset-wide standard deviation the model was trained against.
pub const MNIST_STD: f32 = 0.3081;

const SHAPE_HINT: &str = "Input must be 28×28 or a flat list of length 784";

/// Validates the payload and returns it as a single 28x28 image.
///
/// No reshaping of other sizes is attempted: a flat list must hold exactly
/// 784 values and a grid must be exactly 28 rows of 28 values.
pub fn canonicalize(input: PixelInput) -> Result<Array2<f32>> {
    let flat = match input {
        PixelInput::Flat(values) => {
            if values.len() != PIXEL_COUNT {
                return Err(ServiceError::InvalidShape(format!(
                    "{SHAPE_HINT} (got {} values)",
                    values.len()
                )));
            }
            values
        }
        PixelInput::Grid(rows) => {
            if rows.len() != IMAGE_SIDE {
                return Err(ServiceError::InvalidShape(format!(
                    "{SHAPE_HINT} (got {} rows)",
                    rows.len()
                )));
            }
            if let Some((index, row)) = rows
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != IMAGE_SIDE)
            {
                return Err(ServiceError::InvalidShape(format!(
                    "{SHAPE_HINT} (row {index} has {} values)",
                    row.len()
                )));
            }
            rows.into_iter().flatten().collect()
        }
    };

    // JSON numbers beyond f32 range arrive here as infinities
    if let Some(index) = flat.iter().position(|v| !v.is_finite()) {
        return Err(ServiceError::InvalidPixel(format!(
            "pixel {index} is {}, expected a finite number",
            flat[index]
        )));
    }

    Array2::from_shape_vec((IMAGE_SIDE, IMAGE_SIDE), flat)
        .map_err(|e| ServiceError::InvalidShape(e.to_string()))
}

/// Applies `(x - mean) / std` in f32 and adds batch and channel axes.
pub fn normalize(image: &Array2<f32>) -> Array4<f32> {
    let mut tensor = Array4::zeros((1, 1, IMAGE_SIDE, IMAGE_SIDE));
    for ((y, x), &value) in image.indexed_iter() {
        tensor[[0, 0, y, x]] = (value - MNIST_MEAN) / MNIST_STD;
    }
    tensor
}

/// Validate and normalize in one step; this is the model input.
pub fn prepare(input: PixelInput) -> Result<Array4<f32>> {
    canonicalize(input).map(|image| normalize(&image))
}

/// Converts a drawing of any size into raw 28x28 intensities in `[0, 1]`.
///
/// The first channel is used as grayscale (strokes are drawn white on
/// black), then the image is resized with a bicubic filter. The result is
/// deliberately left unnormalized.
pub fn drawing_to_pixels(drawing: &DynamicImage) -> PixelInput {
    let (width, height) = drawing.dimensions();
    let gray = GrayImage::from_fn(width, height, |x, y| Luma([drawing.get_pixel(x, y)[0]]));

    let side = IMAGE_SIDE as u32;
    let resized = image::imageops::resize(&gray, side, side, FilterType::CatmullRom);

    let grid = (0..side)
        .map(|y| {
            (0..side)
                .map(|x| resized.get_pixel(x, y)[0] as f32 / 255.0)
                .collect()
        })
        .collect();

    PixelInput::Grid(grid)
}

/// Decodes an uploaded drawing and converts it with [`drawing_to_pixels`].
pub fn decode_drawing(bytes: &[u8]) -> Result<PixelInput> {
    let drawing = image::load_from_memory(bytes)?;
    Ok(drawing_to_pixels(&drawing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn grid(rows: usize, cols: usize) -> PixelInput {
        PixelInput::Grid(vec![vec![0.5; cols]; rows])
    }

    #[test]
    fn accepts_flat_784() {
        let image = canonicalize(PixelInput::Flat(vec![0.25; PIXEL_COUNT])).unwrap();
        assert_eq!(image.dim(), (28, 28));
        assert!(image.iter().all(|&v| v == 0.25));
    }

    #[test]
    fn flat_layout_is_row_major() {
        let values: Vec<f32> = (0..PIXEL_COUNT).map(|i| i as f32).collect();
        let image = canonicalize(PixelInput::Flat(values)).unwrap();
        assert_eq!(image[[0, 27]], 27.0);
        assert_eq!(image[[1, 0]], 28.0);
        assert_eq!(image[[27, 27]], 783.0);
    }

    #[test]
    fn accepts_grid_28x28() {
        let image = canonicalize(grid(28, 28)).unwrap();
        assert_eq!(image.dim(), (28, 28));
    }

    #[test]
    fn rejects_wrong_counts() {
        for len in [0, 10, 783, 785] {
            let err = canonicalize(PixelInput::Flat(vec![0.0; len])).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidShape(_)), "len {len}");
        }
    }

    #[test]
    fn rejects_wrong_grids() {
        assert!(canonicalize(grid(27, 28)).is_err());
        assert!(canonicalize(grid(28, 29)).is_err());
        // 784 values in total, but not 28x28
        assert!(canonicalize(grid(784, 1)).is_err());

        let mut ragged = vec![vec![0.0; 28]; 28];
        ragged[5].pop();
        let err = canonicalize(PixelInput::Grid(ragged)).unwrap_err();
        assert!(err.to_string().contains("row 5"));
    }

    #[test]
    fn rejects_non_finite_pixels() {
        let mut values = vec![0.0; PIXEL_COUNT];
        values[42] = f32::INFINITY;
        let err = canonicalize(PixelInput::Flat(values)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPixel(_)));
        assert!(err.to_string().contains("pixel 42"));

        let mut rows = vec![vec![0.0; IMAGE_SIDE]; IMAGE_SIDE];
        rows[3][4] = f32::NAN;
        assert!(matches!(
            canonicalize(PixelInput::Grid(rows)),
            Err(ServiceError::InvalidPixel(_))
        ));
    }

    #[test]
    fn normalize_uses_mnist_constants() {
        let tensor = prepare(PixelInput::Flat(vec![0.0; PIXEL_COUNT])).unwrap();
        assert_eq!(tensor.dim(), (1, 1, 28, 28));
        let expected = (0.0f32 - 0.1307f32) / 0.3081f32;
        assert!(tensor.iter().all(|&v| v == expected));

        let tensor = prepare(PixelInput::Flat(vec![1.0; PIXEL_COUNT])).unwrap();
        let expected = (1.0f32 - 0.1307f32) / 0.3081f32;
        assert!(tensor.iter().all(|&v| v == expected));
    }

    #[test]
    fn drawing_uses_first_channel() {
        let red = DynamicImage::ImageRgba8(RgbaImage::from_pixel(240, 240, Rgba([255, 0, 0, 255])));
        let PixelInput::Grid(rows) = drawing_to_pixels(&red) else {
            panic!("expected grid");
        };
        assert_eq!(rows.len(), 28);
        assert!(rows.iter().all(|row| row.len() == 28));
        assert!(rows.iter().flatten().all(|&v| (v - 1.0).abs() < 1e-6));

        let blue = DynamicImage::ImageRgba8(RgbaImage::from_pixel(240, 240, Rgba([0, 0, 255, 255])));
        let PixelInput::Grid(rows) = drawing_to_pixels(&blue) else {
            panic!("expected grid");
        };
        assert!(rows.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn drawing_output_is_a_valid_payload() {
        let blank = DynamicImage::ImageRgba8(RgbaImage::new(100, 60));
        assert!(canonicalize(drawing_to_pixels(&blank)).is_ok());
    }

    #[test]
    fn undecodable_drawing_is_rejected() {
        let err = decode_drawing(b"not an image").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidImage(_)));
    }
}
