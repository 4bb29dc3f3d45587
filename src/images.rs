use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::RecordSink;
use crate::parser::lines;
use crate::source::{AnchorRegion, ImageBlob, PageSource};

const ANCHORS: &[&str] = &["Question", "Q"];

/// Why a page contributed no image. Never fatal to the run.
#[derive(Debug, Error)]
pub enum AssociationFailure {
    #[error("no question anchor on page")]
    NoAnchor,
    #[error("no question marker near anchor")]
    NoMarkerNearAnchor,
    #[error("page has no embedded images")]
    NoImages,
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image write failed: {0}")]
    Persist(String),
    #[error("question {0} is not in the store")]
    UnknownQuestion(String),
    #[error("page read failed: {0}")]
    Source(String),
}

#[derive(Debug)]
pub enum PageOutcome {
    Associated { question_number: String, path: PathBuf },
    Failed(AssociationFailure),
}

#[derive(Debug, Default)]
pub struct EnrichmentReport {
    pub associated: usize,
    /// (page number, reason)
    pub failures: Vec<(u32, AssociationFailure)>,
}

impl EnrichmentReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn print(&self) {
        println!(
            "Associated {} images ({} pages without one).",
            self.associated,
            self.failure_count()
        );
    }
}

/// `q<number>.png` inside `dir`.
pub fn image_path_for(dir: &Path, question_number: &str) -> PathBuf {
    dir.join(format!("q{}.png", question_number))
}

/// Best-effort pass: one image per page, attached to the question whose
/// marker sits next to the page's first anchor.
pub fn associate_images(
    source: &dyn PageSource,
    sink: &dyn RecordSink,
    image_dir: &Path,
    region: AnchorRegion,
) -> EnrichmentReport {
    let pages = source.page_count();
    let pb = ProgressBar::new(pages as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} images [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut report = EnrichmentReport::default();
    for index in 0..pages {
        let page_number = index as u32 + 1;
        match associate_page(source, sink, image_dir, region, index) {
            PageOutcome::Associated { question_number, path } => {
                debug!(page = page_number, question = %question_number, path = %path.display(), "image associated");
                report.associated += 1;
            }
            PageOutcome::Failed(reason) => {
                debug!(page = page_number, %reason, "no image association");
                report.failures.push((page_number, reason));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(associated = report.associated, failures = report.failure_count(), "image pass done");
    report
}

pub fn associate_page(
    source: &dyn PageSource,
    sink: &dyn RecordSink,
    image_dir: &Path,
    region: AnchorRegion,
    index: usize,
) -> PageOutcome {
    match try_associate(source, sink, image_dir, region, index) {
        Ok((question_number, path)) => PageOutcome::Associated { question_number, path },
        Err(reason) => PageOutcome::Failed(reason),
    }
}

fn try_associate(
    source: &dyn PageSource,
    sink: &dyn RecordSink,
    image_dir: &Path,
    region: AnchorRegion,
    index: usize,
) -> Result<(String, PathBuf), AssociationFailure> {
    let mut snippet = None;
    for anchor in ANCHORS {
        snippet = source
            .text_near(index, anchor, region)
            .map_err(|e| AssociationFailure::Source(e.to_string()))?;
        if snippet.is_some() {
            break;
        }
    }
    let snippet = snippet.ok_or(AssociationFailure::NoAnchor)?;

    let number = lines::question_start(&snippet)
        .ok_or(AssociationFailure::NoMarkerNearAnchor)?
        .number;

    let blob = source
        .first_image(index)
        .map_err(|e| AssociationFailure::Decode(e.to_string()))?
        .ok_or(AssociationFailure::NoImages)?;

    let path = persist_image(&blob, image_dir, &number)?;
    let path_str = path.to_string_lossy();
    match sink.update_image_path(&number, &path_str) {
        Ok(true) => Ok((number, path)),
        Ok(false) => Err(AssociationFailure::UnknownQuestion(number)),
        Err(e) => Err(AssociationFailure::Persist(e.to_string())),
    }
}

/// Decode the blob and write it as PNG, creating `dir` on first use.
fn persist_image(blob: &ImageBlob, dir: &Path, question_number: &str) -> Result<PathBuf, AssociationFailure> {
    let decoded = image::load_from_memory_with_format(&blob.bytes, blob.format)
        .map_err(|e| AssociationFailure::Decode(e.to_string()))?;
    std::fs::create_dir_all(dir).map_err(|e| AssociationFailure::Persist(e.to_string()))?;
    let path = image_path_for(dir, question_number);
    decoded
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|e| AssociationFailure::Persist(e.to_string()))?;
    Ok(path)
}

// ── Tests ──
