pub mod answer;
pub mod options;

use std::sync::LazyLock;

use regex::Regex;

use super::lines;
use super::segments::Segment;
use crate::db::{QuarantineRecord, QuestionRecord, QuestionType};
use answer::UNKNOWN_ANSWER;
use options::QuestionPart;

pub const PARSE_FAILED_REASON: &str = "Parsing Failed (No Options/Answer)";

const BOILERPLATE: &[&str] = &["Select and Place: Topic 1"];

static TRAILING_TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Topic\s+\d+\s*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Question(QuestionRecord),
    Quarantine(QuarantineRecord),
}

/// Turn one segment into a question or a quarantine record. `None` means the
/// segment has no question-start marker and is discarded.
pub fn parse_segment(segment: &Segment) -> Option<Parsed> {
    let raw = segment.text();
    let marker = lines::question_start(&raw)?;
    let kind = QuestionType::detect(&raw);

    let cleaned = strip_boilerplate(&raw);
    let (question_part, correct_answer) = answer::split_answer(&cleaned);
    let extraction = options::extract(&QuestionPart::new(question_part, kind));

    if extraction.options.is_empty() && correct_answer == UNKNOWN_ANSWER && kind == QuestionType::Standard {
        tracing::debug!(question = %marker.number, page = segment.opened_on_page, "quarantined segment");
        return Some(Parsed::Quarantine(QuarantineRecord {
            raw_text: raw,
            error_reason: PARSE_FAILED_REASON.to_string(),
            source_page: segment.opened_on_page,
        }));
    }

    tracing::debug!(question = %marker.number, rule = extraction.rule, options = extraction.options.len(), "parsed segment");
    Some(Parsed::Question(QuestionRecord {
        question_number: marker.number,
        text: extraction.body,
        options: extraction.options,
        correct_answer,
        topic: segment.topic_context.clone(),
        question_type: kind,
        image_path: None,
    }))
}

fn strip_boilerplate(text: &str) -> String {
    let mut out = text.to_string();
    for noise in BOILERPLATE {
        out = out.replace(noise, "");
    }
    TRAILING_TOPIC_RE.replace(out.trim(), "").trim().to_string()
}

// ── Tests ──
