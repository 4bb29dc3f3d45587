use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::source::AnchorRegion;

pub const ENV_PREFIX: &str = "QBANK";

/// Run settings: `QBANK_*` environment variables over built-in defaults.
/// Command-line flags override these in `main`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub image_dir: PathBuf,
    pub source: PathBuf,
    pub anchor_pad_x: f32,
    pub anchor_pad_y: f32,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_with_prefix(ENV_PREFIX)
    }

    pub fn load_with_prefix(prefix: &str) -> Result<Self> {
        let defaults = AnchorRegion::default();
        Config::builder()
            .set_default("db_path", "study_app.db")?
            .set_default("image_dir", "assets/images")?
            .set_default("source", "200-301_Questions.pdf")?
            .set_default("anchor_pad_x", f64::from(defaults.pad_x))?
            .set_default("anchor_pad_y", f64::from(defaults.pad_y))?
            .add_source(Environment::with_prefix(prefix).try_parsing(true))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn anchor_region(&self) -> AnchorRegion {
        AnchorRegion {
            pad_x: self.anchor_pad_x,
            pad_y: self.anchor_pad_y,
        }
    }
}
