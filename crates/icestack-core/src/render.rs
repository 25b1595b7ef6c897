//! Rendering of matched captures and placeholders.
//!
//! [`SlotRenderer`] is the seam between the slot scan and the artifact
//! pipeline: the scan decides *what* fills each slot, implementations decide
//! *how* the artifact is produced. [`RadarRenderer`] is the production
//! implementation: download the capture into the working directory, decode,
//! warp to web-mercator, stamp the timestamp, write the slot's output file
//! and remove the intermediate download. Renders are strictly sequential:
//! the intermediate path is shared between calls.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use image::GrayImage;

use crate::annotate;
use crate::warp::{self, RadarGrid, WarpError};

/// Filename of the shared intermediate download in the working directory.
const RAW_CAPTURE_NAME: &str = "raw_capture.tif";
/// Default annotation font.
const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf";

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while producing an artifact. All fatal to the run; a failed
/// capture render is never downgraded to a placeholder.
#[derive(Debug)]
pub enum RenderError {
    /// The source image could not be downloaded.
    SourceUnavailable(String),
    /// The capture could not be decoded or reprojected.
    Reprojection(String),
    /// The annotation font could not be loaded.
    Font(String),
    /// Reading or writing an artifact failed.
    Io(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnavailable(msg) => write!(f, "source unavailable: {}", msg),
            Self::Reprojection(msg) => write!(f, "reprojection failed: {}", msg),
            Self::Font(msg) => write!(f, "annotation font unavailable: {}", msg),
            Self::Io(msg) => write!(f, "artifact i/o failed: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<WarpError> for RenderError {
    fn from(e: WarpError) -> Self {
        Self::Reprojection(e.to_string())
    }
}

// ── The seam ───────────────────────────────────────────────────────────────

/// Produces one artifact per filled slot. `stamp` is the display timestamp
/// (`YYYY-MM-DD HH:MM:SS`): the capture's own time for a match, the slot's
/// expected time for a placeholder.
pub trait SlotRenderer {
    /// Write the annotated artifact for a matched capture.
    fn render_matched(&mut self, source: &str, stamp: &str, position: u32)
        -> Result<(), RenderError>;

    /// Write the "no data" artifact for a slot whose window passed without a
    /// match. Fails only on I/O.
    fn render_placeholder(&mut self, stamp: &str, position: u32) -> Result<(), RenderError>;
}

// ── Production renderer ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Scratch directory for intermediate downloads.
    pub working_dir: PathBuf,
    /// Directory receiving the final layer images.
    pub target_dir: PathBuf,
    /// TrueType font used for annotation.
    pub font_path: PathBuf,
    /// Georeference of the radar captures.
    pub grid: RadarGrid,
}

impl RenderConfig {
    pub fn new(working_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            target_dir: target_dir.into(),
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            grid: RadarGrid::default(),
        }
    }
}

/// Output path for one slot: `sea_ice_radar_<position>.tif`, 1-based.
pub fn output_path(target_dir: &Path, position: u32) -> PathBuf {
    target_dir.join(format!("sea_ice_radar_{}.tif", position))
}

pub struct RadarRenderer {
    config: RenderConfig,
    font: FontVec,
}

impl RadarRenderer {
    /// Load the annotation font up front; everything else happens per render.
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        let bytes = fs::read(&config.font_path).map_err(|e| {
            RenderError::Font(format!("{}: {}", config.font_path.display(), e))
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            RenderError::Font(format!("{}: {}", config.font_path.display(), e))
        })?;
        Ok(Self { config, font })
    }

    /// Output path for one slot.
    pub fn output_path(&self, position: u32) -> PathBuf {
        output_path(&self.config.target_dir, position)
    }

    fn download(&self, source: &str) -> Result<PathBuf, RenderError> {
        let bytes = reqwest::blocking::get(source)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|e| RenderError::SourceUnavailable(format!("GET {}: {}", source, e)))?;
        let raw_path = self.config.working_dir.join(RAW_CAPTURE_NAME);
        fs::write(&raw_path, &bytes)?;
        Ok(raw_path)
    }

    fn decode(&self, path: &Path) -> Result<GrayImage, RenderError> {
        let img = image::open(path)
            .map_err(|e| RenderError::Reprojection(format!("{}: {}", path.display(), e)))?;
        Ok(img.to_luma8())
    }

    fn save(&self, image: &GrayImage, position: u32) -> Result<(), RenderError> {
        let path = self.output_path(position);
        image
            .save(&path)
            .map_err(|e| RenderError::Io(format!("{}: {}", path.display(), e)))
    }
}

impl SlotRenderer for RadarRenderer {
    fn render_matched(
        &mut self,
        source: &str,
        stamp: &str,
        position: u32,
    ) -> Result<(), RenderError> {
        let raw_path = self.download(source)?;
        let raw = self.decode(&raw_path)?;
        let mut warped = warp::reproject(&raw, &self.config.grid)?;
        annotate::stamp_timestamp(&mut warped, stamp, &self.font);
        self.save(&warped, position)?;
        fs::remove_file(&raw_path)?;
        Ok(())
    }

    fn render_placeholder(&mut self, stamp: &str, position: u32) -> Result<(), RenderError> {
        let image = annotate::placeholder(stamp, &self.font);
        self.save(&image, position)
    }
}
