// preprocess.rs — Turning a scan into segmentation-model input.
//
//   Image<u8> (already resized) ──► [CLAHE] ──► Image<f32> in [0, 1] ──► Tensor [1, H, W, 1]
//
// Decoding and resizing happen upstream; denoising, if any, is the
// caller's business too. This module only checks the size, optionally
// equalizes, and normalizes.
//
// Normalization is u8 / 255, so 0 → 0.0 and 255 → 1.0. The tensor layout is
// NHWC with batch 1 and a single channel, which is what the U-Net layer
// models take.

use crate::clahe::Clahe;
use crate::config::PreprocessConfig;
use crate::error::{ClaheError, Result};
use crate::image::{Image, Pixel};

/// Dense f32 tensor in NHWC order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl Tensor {
    /// Wrap a single-channel f32 image as a `[1, H, W, 1]` tensor.
    pub fn from_image(image: Image<f32>) -> Self {
        let (w, h) = image.dimensions();
        Tensor {
            shape: [1, h, w, 1],
            data: image.into_vec(),
        }
    }

    /// `[batch, height, width, channels]`.
    #[inline]
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// `(width, height)` of the spatial dimensions.
    #[inline]
    pub fn spatial(&self) -> (usize, usize) {
        (self.shape[2], self.shape[1])
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Map u8 intensities to f32 in [0.0, 1.0].
pub fn normalize(src: &Image<u8>) -> Image<f32> {
    let data = src.as_slice().iter().map(|&v| v.to_f32() / 255.0).collect();
    Image::from_vec(src.width(), src.height(), data)
}

/// Output of [`Preprocessor::run`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Model input.
    pub tensor: Tensor,
    /// The 8-bit image the tensor was made from (equalized if CLAHE is on),
    /// for display next to the segmentation.
    pub image: Image<u8>,
}

/// Validated preprocessing step.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    width: usize,
    height: usize,
    clahe: Option<Clahe>,
}

impl Preprocessor {
    /// Validate `config` (including CLAHE parameters, if enabled).
    pub fn new(config: &PreprocessConfig) -> Result<Self> {
        let clahe = config.clahe.as_ref().map(|c| c.build()).transpose()?;
        Ok(Preprocessor {
            width: config.width,
            height: config.height,
            clahe,
        })
    }

    /// `(width, height)` the input must have.
    pub fn input_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn clahe(&self) -> Option<&Clahe> {
        self.clahe.as_ref()
    }

    /// Equalize (if configured) and normalize `image` into a model tensor.
    pub fn run(&self, image: &Image<u8>) -> Result<Preprocessed> {
        if image.dimensions() != (self.width, self.height) {
            return Err(ClaheError::ShapeMismatch {
                what: "preprocess input",
                expected: (self.width, self.height),
                actual: image.dimensions(),
            });
        }

        let image = match &self.clahe {
            Some(clahe) => clahe.equalize(image)?,
            None => image.clone(),
        };
        let tensor = Tensor::from_image(normalize(&image));
        Ok(Preprocessed { tensor, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClaheConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_endpoints() {
        let img = Image::from_vec(2, 2, vec![0u8, 128, 255, 42]);
        let f = normalize(&img);
        assert_relative_eq!(f.get(0, 0), 0.0);
        assert_relative_eq!(f.get(1, 0), 128.0 / 255.0);
        assert_relative_eq!(f.get(0, 1), 1.0);
    }

    #[test]
    fn test_tensor_shape_is_nhwc() {
        let t = Tensor::from_image(Image::new(5, 3));
        assert_eq!(t.shape(), [1, 3, 5, 1]);
        assert_eq!(t.spatial(), (5, 3));
        assert_eq!(t.as_slice().len(), 15);
    }

    #[test]
    fn test_run_without_clahe_keeps_pixels() {
        let config = PreprocessConfig {
            width: 4,
            height: 2,
            clahe: None,
        };
        let pre = Preprocessor::new(&config).unwrap();
        let img = Image::from_vec(4, 2, vec![0u8, 51, 102, 153, 204, 255, 0, 0]);
        let out = pre.run(&img).unwrap();
        assert_eq!(out.image, img);
        assert_relative_eq!(out.tensor.as_slice()[1], 0.2);
        assert_relative_eq!(out.tensor.as_slice()[5], 1.0);
    }

    #[test]
    fn test_run_with_clahe_uses_equalized_pixels() {
        let config = PreprocessConfig {
            width: 32,
            height: 32,
            clahe: Some(ClaheConfig::default()),
        };
        let pre = Preprocessor::new(&config).unwrap();
        let img = Image::from_fn(32, 32, |x, y| (60 + (x * 2 + y) % 20) as u8);
        let out = pre.run(&img).unwrap();
        let expected = pre.clahe().unwrap().equalize(&img).unwrap();
        assert_eq!(out.image, expected);
        assert_relative_eq!(out.tensor.as_slice()[0], expected.get(0, 0) as f32 / 255.0);
    }

    #[test]
    fn test_run_rejects_wrong_size() {
        let pre = Preprocessor::new(&PreprocessConfig::default()).unwrap();
        let err = pre.run(&Image::new(64, 64)).unwrap_err();
        assert!(matches!(err, ClaheError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_new_rejects_bad_clahe() {
        let config = PreprocessConfig {
            clahe: Some(ClaheConfig {
                clip_limit: 0.0,
                ..ClaheConfig::default()
            }),
            ..PreprocessConfig::default()
        };
        assert!(matches!(
            Preprocessor::new(&config),
            Err(ClaheError::InvalidClipLimit(_))
        ));
    }
}
