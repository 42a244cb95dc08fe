// config.rs — Serializable settings for equalization and model preprocessing.
//
// JSON on disk, every field optional:
//
//   {
//     "width": 128,
//     "height": 128,
//     "clahe": { "clip_limit": 4.0, "rows": 4, "cols": 4 }
//   }
//
// `"clahe": null` disables equalization (the baseline, non-CLAHE model).

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clahe::Clahe;
use crate::error::Result;
use crate::tiles::GridSpec;

/// Clip limits offered by interactive front ends.
pub const CLIP_LIMIT_RANGE: RangeInclusive<f64> = 1.0..=20.0;
/// Slider step for the clip limit.
pub const CLIP_LIMIT_STEP: f64 = 0.5;
/// Grid rows/cols offered by interactive front ends.
pub const GRID_RANGE: RangeInclusive<usize> = 2..=16;

/// CLAHE parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    pub clip_limit: f64,
    pub rows: usize,
    pub cols: usize,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        ClaheConfig {
            clip_limit: 4.0,
            rows: 4,
            cols: 4,
        }
    }
}

impl ClaheConfig {
    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.rows, self.cols)
    }

    /// Check the parameters without building anything.
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    /// Validated equalizer for these parameters.
    pub fn build(&self) -> Result<Clahe> {
        Clahe::new(self.clip_limit, self.grid())
    }
}

/// Model-input preprocessing: target size and optional CLAHE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Width the model expects; upstream resizing targets this.
    pub width: usize,
    /// Height the model expects.
    pub height: usize,
    /// `None` feeds the scan to the model without equalization.
    pub clahe: Option<ClaheConfig>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            width: 128,
            height: 128,
            clahe: Some(ClaheConfig::default()),
        }
    }
}

impl PreprocessConfig {
    /// Same size, no equalization.
    pub fn without_clahe(mut self) -> Self {
        self.clahe = None;
        self
    }
}

/// Read a [`PreprocessConfig`] from a JSON file.
pub fn load_config(path: &Path) -> Result<PreprocessConfig> {
    let contents = fs::read_to_string(path)?;
    let config: PreprocessConfig = serde_json::from_str(&contents)?;
    log::debug!("loaded config from {}: {config:?}", path.display());
    Ok(config)
}
