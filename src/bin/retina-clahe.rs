// src/bin/retina-clahe.rs
//
// Equalize a retinal scan from the command line.
//
// Usage:
//   retina-clahe scan.png out.png
//   retina-clahe scan.png out.png --clip-limit 2.5 --rows 8 --cols 8
//   retina-clahe scan.jpg out.png --no-resize --histogram-csv hist.csv
//   retina-clahe scan.png out.png --config preprocess.json
//
// The input is converted to 8-bit luma and, unless --no-resize is given,
// resized to the model input size (128×128 by default) before equalizing.
// Set RUST_LOG=debug to see the tile geometry.

use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::imageops::FilterType;
use image::GrayImage;

use retina_clahe::config::{self, PreprocessConfig};
use retina_clahe::histogram::Histogram;
use retina_clahe::Image;

#[derive(Parser, Debug)]
#[command(author, version, about = "CLAHE for grayscale retinal scans", long_about = None)]
struct Args {
    /// Input image (any format the `image` crate decodes)
    input: PathBuf,
    /// Output image; format follows the extension
    output: PathBuf,

    /// JSON preprocessing config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum count per histogram bin
    #[arg(long)]
    clip_limit: Option<f64>,
    /// Tile rows
    #[arg(long)]
    rows: Option<usize>,
    /// Tile columns
    #[arg(long)]
    cols: Option<usize>,

    /// Resize target as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size, conflicts_with = "no_resize")]
    size: Option<(usize, usize)>,
    /// Equalize at the input's native size
    #[arg(long)]
    no_resize: bool,

    /// Write `intensity,original,equalized` histogram counts here
    #[arg(long)]
    histogram_csv: Option<PathBuf>,
}

fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: usize = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let h: usize = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got {w}x{h}"));
    }
    Ok((w, h))
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let base = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PreprocessConfig::default(),
    };
    // An absent or null "clahe" section still equalizes with defaults here.
    let mut clahe_config = base.clahe.unwrap_or_default();
    if let Some(clip_limit) = args.clip_limit {
        clahe_config.clip_limit = clip_limit;
    }
    if let Some(rows) = args.rows {
        clahe_config.rows = rows;
    }
    if let Some(cols) = args.cols {
        clahe_config.cols = cols;
    }
    let clahe = clahe_config.build().context("invalid CLAHE parameters")?;

    log::info!("loading {}", args.input.display());
    let gray = image::open(&args.input)
        .with_context(|| format!("decoding {}", args.input.display()))?
        .to_luma8();

    let gray = if args.no_resize {
        gray
    } else {
        let (w, h) = args.size.unwrap_or((base.width, base.height));
        resize(&gray, w, h)?
    };
    let input = to_image(&gray);

    log::info!(
        "equalizing {}×{} (clip {}, grid {}×{})",
        input.width(),
        input.height(),
        clahe.clip_limit(),
        clahe_config.rows,
        clahe_config.cols
    );
    let output = clahe.equalize(&input)?;

    if let Some(csv_path) = &args.histogram_csv {
        write_histogram_csv(csv_path, &input, &output)?;
        log::info!("wrote histograms to {}", csv_path.display());
    }

    let (w, h) = output.dimensions();
    let out = GrayImage::from_raw(w as u32, h as u32, output.into_vec())
        .context("output buffer does not match its dimensions")?;
    out.save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("saved {}", args.output.display());
    Ok(())
}

fn resize(gray: &GrayImage, width: usize, height: usize) -> Result<GrayImage> {
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        bail!("resize target {width}x{height} is too large");
    };
    if gray.dimensions() == (w, h) {
        return Ok(gray.clone());
    }
    log::debug!("resizing {:?} → {w}×{h}", gray.dimensions());
    Ok(image::imageops::resize(gray, w, h, FilterType::Triangle))
}

fn to_image(gray: &GrayImage) -> Image<u8> {
    let (w, h) = gray.dimensions();
    Image::from_vec(w as usize, h as usize, gray.as_raw().clone())
}

fn write_histogram_csv(path: &Path, original: &Image<u8>, equalized: &Image<u8>) -> Result<()> {
    let before = Histogram::from_image(original);
    let after = Histogram::from_image(equalized);

    let mut csv = String::from("intensity,original,equalized\n");
    for (v, (a, b)) in before.counts().iter().zip(after.counts().iter()).enumerate() {
        writeln!(csv, "{v},{a},{b}")?;
    }
    fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

