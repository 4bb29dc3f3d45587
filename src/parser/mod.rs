pub mod extract;
pub mod lines;
pub mod segments;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::db::RecordSink;
use crate::source::PageSource;
use extract::Parsed;
use segments::{Segment, Segmenter, DEFAULT_TOPIC};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub pages_skipped: usize,
    pub segments: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub quarantined: usize,
    pub discarded: usize,
}

impl IngestReport {
    pub fn print(&self) {
        println!(
            "Read {} pages ({} unreadable), {} segments.",
            self.pages, self.pages_skipped, self.segments
        );
        println!(
            "Saved {} questions, {} duplicates ignored, {} quarantined, {} discarded.",
            self.inserted, self.duplicates, self.quarantined, self.discarded,
        );
    }

    fn write(&mut self, sink: &dyn RecordSink, segment: &Segment) -> Result<()> {
        self.segments += 1;
        match extract::parse_segment(segment) {
            Some(Parsed::Question(q)) => {
                let inserted = sink
                    .upsert_question(&q)
                    .with_context(|| format!("Failed to save question {}", q.question_number))?;
                if inserted {
                    self.inserted += 1;
                } else {
                    self.duplicates += 1;
                }
            }
            Some(Parsed::Quarantine(r)) => {
                sink.insert_quarantine(&r)
                    .with_context(|| format!("Failed to quarantine segment from page {}", r.source_page))?;
                self.quarantined += 1;
            }
            None => self.discarded += 1,
        }
        Ok(())
    }
}

/// Segmentation pass: lines → segments → records, written in encounter order.
pub fn ingest(source: &dyn PageSource, sink: &dyn RecordSink) -> Result<IngestReport> {
    let page_count = source.page_count();
    let pb = ProgressBar::new(page_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut report = IngestReport::default();
    let mut segmenter = Segmenter::new();
    let mut topic = DEFAULT_TOPIC.to_string();

    for index in 0..page_count {
        pb.inc(1);
        let page = match source.page_text(index) {
            Ok(page) => page,
            Err(e) => {
                warn!(page = index + 1, error = %e, "skipping unreadable page");
                report.pages_skipped += 1;
                continue;
            }
        };
        report.pages += 1;

        for line in page.text.lines() {
            let (next, closed) = segmenter.push_line(topic, line, page.page_number);
            topic = next;
            if let Some(segment) = closed {
                report.write(sink, &segment)?;
            }
        }
    }
    if let Some(segment) = segmenter.finish() {
        report.write(sink, &segment)?;
    }
    pb.finish_and_clear();

    info!(
        pages = report.pages,
        segments = report.segments,
        inserted = report.inserted,
        quarantined = report.quarantined,
        "segmentation pass done"
    );
    Ok(report)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;
    use crate::db::{self, QuestionType};
    use crate::source::TextDumpSource;

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    fn fixture() -> TextDumpSource {
        let raw = std::fs::read_to_string("tests/fixtures/sample_dump.txt").unwrap();
        TextDumpSource::from_text(&raw)
    }

    #[test]
    fn sample_dump_end_to_end() {
        let conn = store();
        let report = ingest(&fixture(), &conn).unwrap();
        assert_eq!(report.pages, 3);
        assert_eq!(report.quarantined, 1);
        assert_eq!(report.discarded, 1, "cover page has no marker");
        assert_eq!(report.inserted, 7);
        assert_eq!(report.duplicates, 0);

        let q1 = db::fetch_question(&conn, "1").unwrap().unwrap();
        assert_eq!(q1.topic, "Topic 1");
        assert_eq!(q1.options.len(), 4);
        assert_eq!(q1.correct_answer, "C");
        assert_eq!(q1.text, "Which command configures an interface as an access port?");

        let q2 = db::fetch_question(&conn, "2").unwrap().unwrap();
        assert_eq!(q2.options, vec!["A. 802.1Q", "B. ISL"]);
        assert!(q2.correct_answer.starts_with('A'));

        let q3 = db::fetch_question(&conn, "3").unwrap().unwrap();
        assert_eq!(q3.options.len(), 4);
        assert!(q3.options.iter().all(|o| o.ends_with("(Refer to Image)")));

        let q5 = db::fetch_question(&conn, "5").unwrap().unwrap();
        assert_eq!(q5.question_type, QuestionType::DragDrop);
        assert_eq!(q5.topic, "Topic 2");

        let q6 = db::fetch_question(&conn, "6").unwrap().unwrap();
        assert_eq!(q6.question_type, QuestionType::Simulation);

        let q7 = db::fetch_question(&conn, "7").unwrap().unwrap();
        assert_eq!(q7.options.len(), 4, "question spanning a page break keeps its options");

        let errors = db::fetch_parsing_errors(&conn, 10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_reason, extract::PARSE_FAILED_REASON);
        assert!(errors[0].raw_text.starts_with("Question #4"));
        assert_eq!(errors[0].source_page, Some(2));
    }

    #[test]
    fn replay_changes_no_question() {
        let conn = store();
        ingest(&fixture(), &conn).unwrap();
        let (before, _) = db::fetch_questions(&conn, None, false, 100, 0).unwrap();

        let again = ingest(&fixture(), &conn).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 7);
        let (after, _) = db::fetch_questions(&conn, None, false, 100, 0).unwrap();
        assert_eq!(before, after);

        // Quarantine rows are not deduplicated across runs.
        assert_eq!(db::fetch_parsing_errors(&conn, 10).unwrap().len(), 2);
    }

    #[test]
    fn first_parse_of_a_number_wins() {
        let conn = store();
        let src = TextDumpSource::from_text(
            "Question #1\nFirst\nA. a\nB. b\nAnswer: A\nQuestion #1\nSecond\nA. c\nB. d\nAnswer: B",
        );
        let report = ingest(&src, &conn).unwrap();
        assert_eq!((report.inserted, report.duplicates), (1, 1));
        let q = db::fetch_question(&conn, "1").unwrap().unwrap();
        assert_eq!(q.text, "First");
    }
}
