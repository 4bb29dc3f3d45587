use std::borrow::Cow;

use crate::db::QuestionType;
use crate::parser::lines;

pub const IMAGE_PLACEHOLDERS: [&str; 4] = [
    "A. (Refer to Image)",
    "B. (Refer to Image)",
    "C. (Refer to Image)",
    "D. (Refer to Image)",
];
pub const INTERACTIVE_PLACEHOLDER: &str = "(Interactive Question - Refer to Image/Explanation)";

/// The part of a segment before its answer marker.
pub struct QuestionPart<'a> {
    pub lines: Vec<&'a str>,
    pub kind: QuestionType,
}

impl<'a> QuestionPart<'a> {
    pub fn new(text: &'a str, kind: QuestionType) -> Self {
        let lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        Self { lines, kind }
    }

    /// Lines eligible for the body: the visual-options artifact is dropped and
    /// a question-start line keeps only what follows its marker, minus any
    /// topic marker.
    fn body_candidates(&self) -> Vec<BodyLine<'a>> {
        self.lines
            .iter()
            .filter(|line| !lines::is_visual_options(line))
            .filter_map(|&line| match lines::question_start(line) {
                Some(m) if m.offset == 0 => {
                    let rest = lines::strip_topic_marker(&line[m.end..]);
                    (!rest.is_empty()).then(|| BodyLine {
                        text: Cow::Owned(rest),
                        opens_question: true,
                    })
                }
                _ => Some(BodyLine {
                    text: Cow::Borrowed(line),
                    opens_question: false,
                }),
            })
            .collect()
    }

    fn plain_body(&self) -> String {
        self.body_candidates()
            .iter()
            .map(|l| &*l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct BodyLine<'a> {
    text: Cow<'a, str>,
    /// Remainder of the question-start line, where glued options can sit.
    opens_question: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub options: Vec<String>,
    pub body: String,
    /// Name of the rule that produced the options, "none" if nothing did.
    pub rule: &'static str,
}

type Rule = fn(&QuestionPart) -> Option<(Vec<String>, String)>;

/// Evaluated in order; the first rule that yields options wins.
pub const RULES: &[(&str, Rule)] = &[
    ("visual_marker", visual_marker),
    ("option_lines", option_lines),
    ("exhibit_reference", exhibit_reference),
    ("interactive", interactive),
];

pub fn extract(part: &QuestionPart) -> Extraction {
    RULES
        .iter()
        .find_map(|&(rule, apply)| {
            apply(part).map(|(options, body)| Extraction { options, body, rule })
        })
        .unwrap_or_else(|| Extraction {
            options: Vec::new(),
            body: part.plain_body(),
            rule: "none",
        })
}

fn image_placeholders() -> Vec<String> {
    IMAGE_PLACEHOLDERS.iter().map(|s| s.to_string()).collect()
}

/// "A. B. C. D." on its own: the choices live in an image. Option-looking
/// lines stay in the body untouched.
pub fn visual_marker(part: &QuestionPart) -> Option<(Vec<String>, String)> {
    part.lines
        .iter()
        .any(|l| lines::is_visual_options(l))
        .then(|| (image_placeholders(), part.plain_body()))
}

/// Per-line option scan. Inline runs like `stem A. x B. y` are split only on
/// the question-start line; elsewhere they are prose.
pub fn option_lines(part: &QuestionPart) -> Option<(Vec<String>, String)> {
    let candidates = part.body_candidates();
    let mut options = Vec::new();
    let mut body = Vec::new();

    for candidate in &candidates {
        let line: &str = &candidate.text;
        let inline = if candidate.opens_question {
            lines::split_inline_options(line)
        } else {
            None
        };
        if let Some((stem, pieces)) = inline {
            if !stem.is_empty() {
                body.push(stem);
            }
            for piece in pieces {
                match lines::option_line(piece) {
                    Some((letter, content)) => options.push(format!("{}. {}", letter, content)),
                    None => body.push(piece),
                }
            }
        } else if let Some((letter, content)) = lines::option_line(line) {
            options.push(format!("{}. {}", letter, content));
        } else {
            body.push(line);
        }
    }

    if options.is_empty() {
        None
    } else {
        Some((options, body.join("\n")))
    }
}

/// "Refer to the exhibit" with no textual choices: assume the image holds them.
pub fn exhibit_reference(part: &QuestionPart) -> Option<(Vec<String>, String)> {
    let body = part.plain_body();
    let lower = body.to_lowercase();
    (lower.contains("exhibit") || lower.contains("refer to")).then(|| (image_placeholders(), body))
}

/// Drag-and-drop and simulation items have no choices at all.
pub fn interactive(part: &QuestionPart) -> Option<(Vec<String>, String)> {
    (part.kind != QuestionType::Standard)
        .then(|| (vec![INTERACTIVE_PLACEHOLDER.to_string()], part.plain_body()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(text: &str) -> QuestionPart<'_> {
        QuestionPart::new(text, QuestionType::Standard)
    }

    #[test]
    fn scans_option_lines() {
        let p = part("Question #42\nStem text\nA. Foo\nb) Bar");
        let (options, body) = option_lines(&p).unwrap();
        assert_eq!(options, vec!["A. Foo", "B. Bar"]);
        assert_eq!(body, "Stem text");
    }

    #[test]
    fn marker_line_remainder_stays_in_body() {
        let p = part("Question #7 New stem A. X B. Y");
        let (options, body) = option_lines(&p).unwrap();
        assert_eq!(options, vec!["A. X", "B. Y"]);
        assert_eq!(body, "New stem");
    }

    #[test]
    fn topic_on_marker_line_stays_out_of_body() {
        let p = part("Question #1 Topic 1\nWhich command is used?\nA. foo\nB. bar");
        let (options, body) = option_lines(&p).unwrap();
        assert_eq!(options, vec!["A. foo", "B. bar"]);
        assert_eq!(body, "Which command is used?");

        let e = extract(&part("Question #2 Topic 3, Refer to the exhibit."));
        assert_eq!(e.body, "Refer to the exhibit.");
    }

    #[test]
    fn letters_in_stem_prose_are_not_options() {
        let p = part(
            "Question #3\nPC1 connects to switch A. Switch B. is the root bridge. What happens?\nA. It floods\nB. It drops",
        );
        let (options, body) = option_lines(&p).unwrap();
        assert_eq!(options, vec!["A. It floods", "B. It drops"]);
        assert_eq!(body, "PC1 connects to switch A. Switch B. is the root bridge. What happens?");
    }

    #[test]
    fn visual_marker_suppresses_scan() {
        let p = part("Question #3\nA. B. C. D.\nWhich route is used?\nA. not an option");
        let e = extract(&p);
        assert_eq!(e.rule, "visual_marker");
        assert_eq!(e.options, IMAGE_PLACEHOLDERS.to_vec());
        assert_eq!(e.body, "Which route is used?\nA. not an option");
    }

    #[test]
    fn exhibit_fallback() {
        let p = part("Question #4\nRefer to the exhibit. Which port is blocking?");
        assert!(option_lines(&p).is_none());
        let e = extract(&p);
        assert_eq!(e.rule, "exhibit_reference");
        assert_eq!(e.options.len(), 4);
    }

    #[test]
    fn interactive_fallback_only_for_non_standard() {
        let text = "Question #5\nDrag the protocols to the layers";
        assert!(interactive(&part(text)).is_none());
        let e = extract(&QuestionPart::new(text, QuestionType::DragDrop));
        assert_eq!(e.rule, "interactive");
        assert_eq!(e.options, vec![INTERACTIVE_PLACEHOLDER]);
    }

    #[test]
    fn nothing_applies() {
        let e = extract(&part("Question #6\nJust a stem"));
        assert_eq!(e.rule, "none");
        assert!(e.options.is_empty());
        assert_eq!(e.body, "Just a stem");
    }

    #[test]
    fn rules_are_ordered() {
        let names: Vec<_> = RULES.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["visual_marker", "option_lines", "exhibit_reference", "interactive"]);
    }
}
