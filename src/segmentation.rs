// segmentation.rs — Retinal layer labels from model output.
//
// The trained U-Net is an opaque collaborator: whatever runs it (ONNX,
// TensorFlow bindings, a remote service) implements `SegmentationModel`
// and hands back per-pixel class probabilities. This module turns those
// into a label map (argmax) and a color overlay using the fixed palette of
// the six OCT layer classes.
//
// Argmax ties go to the lowest class index. Class indices beyond the
// palette render black.

use crate::error::{ClaheError, Result};
use crate::image::Image;
use crate::preprocess::{Preprocessor, Tensor};

/// Retinal OCT layer classes, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LayerClass {
    AboveIlm = 0,
    IlmToIplInl = 1,
    IplInlToRpe = 2,
    RpeToBm = 3,
    UnderBm = 4,
    /// Pigment epithelial detachment.
    Ped = 5,
}

impl LayerClass {
    pub const ALL: [LayerClass; 6] = [
        LayerClass::AboveIlm,
        LayerClass::IlmToIplInl,
        LayerClass::IplInlToRpe,
        LayerClass::RpeToBm,
        LayerClass::UnderBm,
        LayerClass::Ped,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Legend label.
    pub fn name(self) -> &'static str {
        match self {
            LayerClass::AboveIlm => "above ILM",
            LayerClass::IlmToIplInl => "ILM-IPL/INL",
            LayerClass::IplInlToRpe => "IPL/INL-RPE",
            LayerClass::RpeToBm => "RPE-BM",
            LayerClass::UnderBm => "under BM",
            LayerClass::Ped => "PED",
        }
    }

    /// Overlay color, RGB.
    pub fn color(self) -> [u8; 3] {
        match self {
            LayerClass::AboveIlm => [0, 0, 0],
            LayerClass::IlmToIplInl => [255, 0, 0],
            LayerClass::IplInlToRpe => [255, 255, 0],
            LayerClass::RpeToBm => [255, 255, 255],
            LayerClass::UnderBm => [0, 0, 255],
            LayerClass::Ped => [0, 255, 255],
        }
    }
}

/// Per-pixel class scores, `height × width × classes`, class fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities {
    width: usize,
    height: usize,
    classes: usize,
    data: Vec<f32>,
}

impl ClassProbabilities {
    pub fn new(width: usize, height: usize, classes: usize, data: Vec<f32>) -> Result<Self> {
        if classes == 0 || classes > u8::MAX as usize + 1 {
            return Err(ClaheError::InvalidClassCount(classes));
        }
        if data.len() != width * height * classes {
            return Err(ClaheError::ProbabilityLength {
                len: data.len(),
                height,
                width,
                classes,
            });
        }
        Ok(ClassProbabilities {
            width,
            height,
            classes,
            data,
        })
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    /// Scores for pixel (x, y).
    pub fn scores(&self, x: usize, y: usize) -> &[f32] {
        let start = (y * self.width + x) * self.classes;
        &self.data[start..start + self.classes]
    }

    /// Most likely class per pixel.
    ///
    /// Ties go to the lowest class index. NaN scores are skipped wherever
    /// they appear; a pixel whose scores are all NaN is labeled class 0.
    pub fn argmax(&self) -> LabelMap {
        let labels = self
            .data
            .chunks_exact(self.classes)
            .map(|scores| {
                let mut best: Option<(usize, f32)> = None;
                for (k, &s) in scores.iter().enumerate() {
                    if s.is_nan() {
                        continue;
                    }
                    match best {
                        Some((_, top)) if s <= top => {}
                        _ => best = Some((k, s)),
                    }
                }
                best.map_or(0, |(k, _)| k as u8)
            })
            .collect();
        LabelMap(Image::from_vec(self.width, self.height, labels))
    }
}

/// Class index per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap(pub Image<u8>);

impl LabelMap {
    pub fn image(&self) -> &Image<u8> {
        &self.0
    }

    /// Class at (x, y), if it is one of the known layers.
    pub fn class_at(&self, x: usize, y: usize) -> Option<LayerClass> {
        LayerClass::from_index(self.0.get(x, y))
    }

    /// Pixel count per known class, in `LayerClass::ALL` order.
    pub fn class_counts(&self) -> [usize; 6] {
        let mut counts = [0usize; 6];
        for &label in self.0.as_slice() {
            if let Some(c) = counts.get_mut(label as usize) {
                *c += 1;
            }
        }
        counts
    }

    /// Paint each pixel with its class color.
    pub fn colorize(&self) -> ColorMask {
        let data = self
            .0
            .as_slice()
            .iter()
            .map(|&label| LayerClass::from_index(label).map_or([0, 0, 0], LayerClass::color))
            .collect();
        ColorMask {
            width: self.0.width(),
            height: self.0.height(),
            data,
        }
    }
}

/// Interleaved RGB overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMask {
    width: usize,
    height: usize,
    data: Vec<[u8; 3]>,
}

impl ColorMask {
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel ({x},{y}) out of bounds");
        self.data[y * self.width + x]
    }

    /// Flattened `RGBRGB...` bytes, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.data.iter().flatten().copied().collect()
    }
}

/// The trained layer-segmentation network.
pub trait SegmentationModel {
    /// Run inference on a `[1, H, W, 1]` tensor.
    fn predict(&self, input: &Tensor) -> Result<ClassProbabilities>;
}

/// Result of [`segment`].
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// The 8-bit image that went into the model.
    pub input: Image<u8>,
    pub labels: LabelMap,
    pub mask: ColorMask,
}

/// Preprocess `image`, run `model`, and label the output.
pub fn segment<M: SegmentationModel + ?Sized>(
    model: &M,
    preprocessor: &Preprocessor,
    image: &Image<u8>,
) -> Result<Segmentation> {
    let pre = preprocessor.run(image)?;
    let probabilities = model.predict(&pre.tensor)?;
    if probabilities.dimensions() != pre.tensor.spatial() {
        return Err(ClaheError::ShapeMismatch {
            what: "model output",
            expected: pre.tensor.spatial(),
            actual: probabilities.dimensions(),
        });
    }

    let labels = probabilities.argmax();
    let mask = labels.colorize();
    log::debug!("segment: class counts {:?}", labels.class_counts());
    Ok(Segmentation {
        input: pre.image,
        labels,
        mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_order() {
        assert_eq!(LayerClass::from_index(1), Some(LayerClass::IlmToIplInl));
        assert_eq!(LayerClass::from_index(6), None);
        assert_eq!(LayerClass::Ped.color(), [0, 255, 255]);
        assert_eq!(LayerClass::RpeToBm.name(), "RPE-BM");
        for (i, c) in LayerClass::ALL.iter().enumerate() {
            assert_eq!(c.index() as usize, i);
        }
    }

    #[test]
    fn test_argmax_picks_highest_and_breaks_ties_low() {
        // 2×1 image, 3 classes.
        let probs = ClassProbabilities::new(2, 1, 3, vec![0.1, 0.7, 0.2, 0.4, 0.4, 0.2]).unwrap();
        let labels = probs.argmax();
        assert_eq!(labels.image().as_slice(), &[1, 0]);
    }

    #[test]
    fn test_new_rejects_bad_length() {
        assert!(matches!(
            ClassProbabilities::new(2, 2, 6, vec![0.0; 23]),
            Err(ClaheError::ProbabilityLength { .. })
        ));
        assert!(matches!(
            ClassProbabilities::new(2, 2, 0, vec![]),
            Err(ClaheError::InvalidClassCount(0))
        ));
        assert!(matches!(
            ClassProbabilities::new(1, 1, 257, vec![0.0; 257]),
            Err(ClaheError::InvalidClassCount(257))
        ));
    }

    #[test]
    fn test_argmax_skips_nan_in_any_class() {
        // 4×1 image, 3 classes: NaN first, NaN later, NaN only, all NaN.
        let nan = f32::NAN;
        let probs = ClassProbabilities::new(
            4,
            1,
            3,
            vec![
                nan, 0.2, 0.9, //
                0.3, nan, 0.1, //
                0.1, 0.1, nan, //
                nan, nan, nan,
            ],
        )
        .unwrap();
        assert_eq!(probs.argmax().image().as_slice(), &[2, 0, 0, 0]);
    }

    #[test]
    fn test_colorize_unknown_class_is_black() {
        let labels = LabelMap(Image::from_vec(3, 1, vec![1u8, 4, 9]));
        let mask = labels.colorize();
        assert_eq!(mask.get(0, 0), [255, 0, 0]);
        assert_eq!(mask.get(1, 0), [0, 0, 255]);
        assert_eq!(mask.get(2, 0), [0, 0, 0]);
        assert_eq!(mask.to_rgb_bytes().len(), 9);
        assert_eq!(labels.class_counts(), [0, 1, 0, 0, 1, 0]);
    }
}
