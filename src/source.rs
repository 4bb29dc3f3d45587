use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::ImageFormat;
use pdfium_render::prelude::*;

/// Plain text of one page, 1-based page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// An embedded image as encoded bytes plus the format they decode with.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// How far past the anchor's bounds the snippet region reaches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRegion {
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Default for AnchorRegion {
    fn default() -> Self {
        Self { pad_x: 150.0, pad_y: 50.0 }
    }
}

pub trait PageSource {
    fn page_count(&self) -> usize;
    fn page_text(&self, index: usize) -> Result<PageText>;
    fn first_image(&self, index: usize) -> Result<Option<ImageBlob>>;
    /// Text of the region around the first (case-insensitive) occurrence of
    /// `anchor`, or `None` if the page does not contain it.
    fn text_near(&self, index: usize, anchor: &str, region: AnchorRegion) -> Result<Option<String>>;
}

/// Dumps from text extractors end in ".txt"; everything else goes through pdfium.
pub fn is_text_dump(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

// ── PDF via pdfium ──

pub fn bind_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .context("Failed to bind pdfium library")?;
    Ok(Pdfium::new(bindings))
}

pub struct PdfSource<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfSource<'a> {
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self> {
        let document = pdfium
            .load_pdf_from_file(path, None)
            .with_context(|| format!("Failed to load PDF: {}", path.display()))?;
        Ok(Self { document })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'a>> {
        let index = PdfPageIndex::try_from(index).context("Page index out of range")?;
        self.document
            .pages()
            .get(index)
            .with_context(|| format!("Failed to load page {}", index + 1))
    }
}

impl PageSource for PdfSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<PageText> {
        let text = self.page(index)?.text().context("Failed to get page text")?.all();
        Ok(PageText {
            page_number: index as u32 + 1,
            text,
        })
    }

    fn first_image(&self, index: usize) -> Result<Option<ImageBlob>> {
        let page = self.page(index)?;
        for object in page.objects().iter() {
            let Some(image) = object.as_image_object() else {
                continue;
            };
            let raw = image.get_raw_image().context("Failed to decode embedded image")?;
            let mut bytes = Vec::new();
            raw.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .context("Failed to encode embedded image")?;
            return Ok(Some(ImageBlob {
                bytes,
                format: ImageFormat::Png,
            }));
        }
        Ok(None)
    }

    fn text_near(&self, index: usize, anchor: &str, region: AnchorRegion) -> Result<Option<String>> {
        let page = self.page(index)?;
        let text = page.text().context("Failed to get page text")?;
        let needle = anchor.to_lowercase();

        let Some(bounds) = text
            .segments()
            .iter()
            .find(|s| s.text().to_lowercase().contains(&needle))
            .map(|s| s.bounds())
        else {
            return Ok(None);
        };

        // PDF space has a bottom-left origin: "down" is a smaller y.
        let rect = PdfRect::new_from_values(
            bounds.bottom().value - region.pad_y,
            bounds.left().value,
            bounds.top().value,
            bounds.right().value + region.pad_x,
        );
        Ok(Some(text.inside_rect(rect)))
    }
}

// ── Plain text dumps ──

/// Pages separated by form feeds, as written by `pdftotext` and friends.
/// Dumps carry no images.
pub struct TextDumpSource {
    pages: Vec<String>,
}

impl TextDumpSource {
    pub fn open(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text dump: {}", path.display()))?;
        Ok(Self::from_text(&raw))
    }

    pub fn from_text(raw: &str) -> Self {
        let mut pages: Vec<String> = raw.split('\x0c').map(str::to_string).collect();
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }
        Self { pages }
    }
}

impl PageSource for TextDumpSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<PageText> {
        let text = self
            .pages
            .get(index)
            .with_context(|| format!("No page {}", index + 1))?;
        Ok(PageText {
            page_number: index as u32 + 1,
            text: text.clone(),
        })
    }

    fn first_image(&self, _index: usize) -> Result<Option<ImageBlob>> {
        Ok(None)
    }

    /// Without layout the region is approximated as the rest of the anchor's
    /// line plus the line below it.
    fn text_near(&self, index: usize, anchor: &str, _region: AnchorRegion) -> Result<Option<String>> {
        let page = self.page_text(index)?;
        let needle = anchor.to_lowercase();
        let lines: Vec<&str> = page.text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            // ASCII lowering keeps byte offsets aligned with `line`.
            if let Some(pos) = line.to_ascii_lowercase().find(&needle) {
                let mut snippet = line[pos..].to_string();
                if let Some(next) = lines.get(i + 1) {
                    snippet.push('\n');
                    snippet.push_str(next);
                }
                return Ok(Some(snippet));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feed() {
        let src = TextDumpSource::from_text("page one\x0cpage two\x0c");
        assert_eq!(src.page_count(), 2);
        let p = src.page_text(1).unwrap();
        assert_eq!(p.page_number, 2);
        assert_eq!(p.text, "page two");
    }

    #[test]
    fn text_near_starts_at_anchor() {
        let src = TextDumpSource::from_text("Exam header\nsee Question #12 below\nnext line\nlast");
        let snippet = src.text_near(0, "Question", AnchorRegion::default()).unwrap().unwrap();
        assert_eq!(snippet, "Question #12 below\nnext line");
        assert!(src.text_near(0, "Missing", AnchorRegion::default()).unwrap().is_none());
    }

    #[test]
    fn dumps_have_no_images() {
        let src = TextDumpSource::from_text("Question #1");
        assert!(src.first_image(0).unwrap().is_none());
    }

    #[test]
    fn missing_dump_fails_to_open() {
        assert!(TextDumpSource::open(Path::new("does/not/exist.txt")).is_err());
    }

    #[test]
    fn dump_detection() {
        assert!(is_text_dump(Path::new("dump.TXT")));
        assert!(!is_text_dump(Path::new("200-301_Questions.pdf")));
    }
}
