use super::lines;

pub const DEFAULT_TOPIC: &str = "General";

/// The lines believed to belong to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub lines: Vec<String>,
    pub topic_context: String,
    pub opened_on_page: u32,
}

impl Segment {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Accumulates lines into the open segment. The running topic is not kept
/// here: callers thread it through [`Segmenter::push_line`], and a segment
/// takes the topic in effect when it opened.
#[derive(Debug, Default)]
pub struct Segmenter {
    buffer: Vec<String>,
    opened_on_page: u32,
    opened_under: String,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the topic in effect after this line and the
    /// segment closed by it, if any.
    pub fn push_line(&mut self, topic: String, line: &str, page: u32) -> (String, Option<Segment>) {
        let line = line.trim();
        if line.is_empty() {
            return (topic, None);
        }

        let topic = lines::topic_marker(line).unwrap_or(topic);

        let Some(marker) = lines::question_start(line) else {
            self.append(line, &topic, page);
            return (topic, None);
        };

        // Glued text: the prefix is the tail of the previous question.
        if marker.offset > 0 {
            self.append(&line[..marker.offset], &topic, page);
        }
        let closed = self.close();
        self.append(&line[marker.offset..], &topic, page);
        (topic, closed)
    }

    /// Emit whatever remains at end of stream.
    pub fn finish(&mut self) -> Option<Segment> {
        self.close()
    }

    fn append(&mut self, line: &str, topic: &str, page: u32) {
        if self.buffer.is_empty() {
            self.opened_on_page = page;
            self.opened_under = topic.to_string();
        }
        self.buffer.push(line.to_string());
    }

    fn close(&mut self) -> Option<Segment> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(Segment {
            lines: std::mem::take(&mut self.buffer),
            topic_context: std::mem::take(&mut self.opened_under),
            opened_on_page: self.opened_on_page,
        })
    }
}

/// Segment a sequence of `(page_number, text)` pages in order.
#[cfg(test)]
pub fn segment_pages<'a, I>(pages: I) -> Vec<Segment>
where
    I: IntoIterator<Item = (u32, &'a str)>,
{
    let mut segmenter = Segmenter::new();
    let mut topic = DEFAULT_TOPIC.to_string();
    let mut segments = Vec::new();

    for (page, text) in pages {
        for line in text.lines() {
            let (next, closed) = segmenter.push_line(topic, line, page);
            topic = next;
            segments.extend(closed);
        }
    }
    segments.extend(segmenter.finish());
    segments
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Vec<Segment> {
        segment_pages([(1, text)])
    }

    #[test]
    fn splits_on_line_start_markers() {
        let segs = segment("Question #1\nStem one\nA. x\nQuestion #2\nStem two");
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].lines, vec!["Question #1", "Stem one", "A. x"]);
        assert_eq!(segs[1].lines, vec!["Question #2", "Stem two"]);
    }

    #[test]
    fn glued_line_loses_nothing() {
        let line = "tail of prior stemQuestion #7 New stem";
        let segs = segment(line);
        assert_eq!(segs.len(), 2);
        let rejoined = format!("{}{}", segs[0].lines.last().unwrap(), segs[1].lines[0]);
        assert_eq!(rejoined, line);
    }

    #[test]
    fn glued_short_marker_is_not_split() {
        let segs = segment("Question #6\nend of stemQ #7 next");
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].lines, vec!["Question #6", "end of stemQ #7 next"]);
    }

    #[test]
    fn glued_prefix_goes_to_previous_question() {
        let segs = segment(
            "Question #6\nOld stem\n...end of prior stemQuestion #7 New stem A. X B. Y Answer: B",
        );
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].lines, vec!["Question #6", "Old stem", "...end of prior stem"]);
        assert_eq!(segs[1].lines, vec!["Question #7 New stem A. X B. Y Answer: B"]);
    }

    #[test]
    fn topic_threads_across_segments() {
        let segs = segment("Topic 1\nQuestion #1\nfoo\nTopic 2\nQuestion #2\nbar\nQuestion #3\nbaz");
        let topics: Vec<_> = segs.iter().map(|s| s.topic_context.as_str()).collect();
        // The leading "Topic 1" line is its own marker-less segment.
        assert_eq!(topics, vec!["Topic 1", "Topic 1", "Topic 2", "Topic 2"]);
    }

    #[test]
    fn topic_on_marker_line_applies_to_new_question() {
        let segs = segment("Question #1\nfoo\nQuestion #2 Topic 3\nbar");
        assert_eq!(segs[0].topic_context, DEFAULT_TOPIC);
        assert_eq!(segs[1].topic_context, "Topic 3");
    }

    #[test]
    fn default_topic_is_general() {
        let segs = segment("Question #1\nfoo");
        assert_eq!(segs[0].topic_context, DEFAULT_TOPIC);
    }

    #[test]
    fn segment_spans_pages_and_keeps_opening_page() {
        let segs = segment_pages([(3, "Question #9\nstem"), (4, "A. one\nB. two")]);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].opened_on_page, 3);
        assert_eq!(segs[0].lines.len(), 4);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let segs = segment("\n  \nQuestion #1\n\nstem\n");
        assert_eq!(segs[0].lines, vec!["Question #1", "stem"]);
    }

    #[test]
    fn trailing_buffer_is_flushed() {
        let segs = segment("Question #1\nincomplete");
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn empty_input_emits_nothing() {
        assert!(segment("").is_empty());
    }
}
