use crate::parser::lines;

pub const UNKNOWN_ANSWER: &str = "Unknown";

/// Split a block at its first answer marker into (question part, answer).
/// The answer is the first non-blank line after the marker, cut at a second
/// marker on that line, or "Unknown".
pub fn split_answer(text: &str) -> (&str, String) {
    let Some(span) = lines::answer_marker(text) else {
        return (text, UNKNOWN_ANSWER.to_string());
    };
    let answer = text[span.end..]
        .trim()
        .lines()
        .next()
        .map(|line| match lines::answer_marker(line) {
            Some(next) => line[..next.start].trim(),
            None => line.trim(),
        })
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_ANSWER);
    (&text[..span.start], answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_on_own_line() {
        let (q, a) = split_answer("Question #1\nstem\nA. x\nAnswer: A\nExplanation: because");
        assert_eq!(q, "Question #1\nstem\nA. x\n");
        assert_eq!(a, "A");
    }

    #[test]
    fn answer_on_next_line() {
        let (_, a) = split_answer("stem\nCorrect Answer:\n  BD  \nmore");
        assert_eq!(a, "BD");
    }

    #[test]
    fn only_first_marker_splits() {
        let (q, a) = split_answer("stem Ans. C\nAnswer: D");
        assert_eq!(q, "stem ");
        assert_eq!(a, "C");
    }

    #[test]
    fn second_marker_on_the_answer_line_ends_it() {
        let (q, a) = split_answer("stem\nAns. C Answer: D");
        assert_eq!(q, "stem\n");
        assert_eq!(a, "C");
    }

    #[test]
    fn missing_marker_is_unknown() {
        let (q, a) = split_answer("stem\nA. x");
        assert_eq!(q, "stem\nA. x");
        assert_eq!(a, UNKNOWN_ANSWER);
    }

    #[test]
    fn dangling_marker_is_unknown() {
        let (_, a) = split_answer("stem\nAnswer:   ");
        assert_eq!(a, UNKNOWN_ANSWER);
    }
}
