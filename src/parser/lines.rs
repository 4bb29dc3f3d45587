use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static TOPIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Topic\s*:?\s*(\d+)").unwrap());
static TOPIC_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Topic\s*:?\s*\d+\s*[,\-]?").unwrap());
// A bare "Q" must start a word so ACL text like "eq 80" is not read as a marker;
// "Question" may follow any character (glued text).
static QUESTION_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Question|\bQ)\s*(?:#|No\.?|Num)?\s*(\d+)").unwrap()
});
static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(?([A-Fa-f])\)?[.)\-]\s+(.*)$").unwrap());
static VISUAL_OPTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)A\.\s*B\.\s*C\.\s*D\.").unwrap());
// Same word-start rule for the short form: "VLANs." is not an answer marker.
static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Correct\s*)?(?:Answer|\bAns)\s*[:\-.]\s*").unwrap()
});
static INLINE_OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\(?([A-F])[.)]\s+").unwrap());

/// A question-start marker found somewhere in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMarker {
    /// Byte offset of the marker within the line.
    pub offset: usize,
    /// Byte offset just past the marker's number.
    pub end: usize,
    pub number: String,
}

/// "Topic 3", "Topic: 3" → "Topic 3".
pub fn topic_marker(line: &str) -> Option<String> {
    TOPIC_RE.captures(line).map(|caps| format!("Topic {}", &caps[1]))
}

/// `line` with its topic marker (and a following `,` or `-`) removed.
pub fn strip_topic_marker(line: &str) -> String {
    TOPIC_HEADER_RE.replace(line, " ").trim().to_string()
}

/// First question-start marker anywhere in `text`.
pub fn question_start(text: &str) -> Option<QuestionMarker> {
    let caps = QUESTION_START_RE.captures(text)?;
    let whole = caps.get(0)?;
    Some(QuestionMarker {
        offset: whole.start(),
        end: whole.end(),
        number: caps[1].to_string(),
    })
}

/// `A. text`, `(b) text`, `C- text` → ('A', "text"), letter upper-cased.
pub fn option_line(line: &str) -> Option<(char, &str)> {
    let caps = OPTION_RE.captures(line)?;
    let letter = caps.get(1)?.as_str().chars().next()?.to_ascii_uppercase();
    let content = caps.get(2)?.as_str().trim();
    Some((letter, content))
}

/// The "A. B. C. D." artifact: choices exist only in an image.
pub fn is_visual_options(line: &str) -> bool {
    VISUAL_OPTIONS_RE.is_match(line)
}

/// Span of the first answer marker ("Answer:", "Correct Answer -", "Ans.").
pub fn answer_marker(text: &str) -> Option<Range<usize>> {
    ANSWER_RE.find(text).map(|m| m.range())
}

/// Split a line carrying an in-order run of options (`stem A. x B. y`) into
/// its stem prefix and one piece per option. Returns `None` unless the run
/// starts at `A` and has at least two consecutive letters.
pub fn split_inline_options(line: &str) -> Option<(&str, Vec<&str>)> {
    let mut starts = Vec::new();
    let mut expected = 'A';
    for caps in INLINE_OPTION_RE.captures_iter(line) {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let found = letter.as_str().chars().next().unwrap_or(' ');
        if found != expected {
            if starts.is_empty() {
                continue;
            }
            break;
        }
        let opens_paren = line[whole.start()..letter.start()].ends_with('(');
        starts.push(if opens_paren { letter.start() - 1 } else { letter.start() });
        expected = (expected as u8 + 1) as char;
    }
    if starts.len() < 2 {
        return None;
    }

    let stem = line[..starts[0]].trim_end();
    let mut pieces = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(line.len());
        pieces.push(line[start..end].trim());
    }
    Some((stem, pieces))
}
