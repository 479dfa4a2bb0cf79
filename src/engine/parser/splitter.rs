/// One note's worth of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// 0-based document line of the segment's first non-blank line.
    pub start_line: usize,
}

/// An open code fence: the fence character and how many of them opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence {
    ch: char,
    len: usize,
}

impl Fence {
    pub(crate) fn open(trimmed: &str) -> Option<Self> {
        let ch = trimmed.chars().next()?;
        if ch != '`' && ch != '~' {
            return None;
        }
        let len = trimmed.chars().take_while(|&c| c == ch).count();
        (len >= 3).then_some(Self { ch, len })
    }

    pub(crate) fn closes(&self, trimmed: &str) -> bool {
        let count = trimmed.chars().take_while(|&c| c == self.ch).count();
        count >= self.len && trimmed.chars().skip(count).all(char::is_whitespace)
    }

    /// Info string after the opening fence characters.
    pub(crate) fn info<'a>(&self, trimmed: &'a str) -> &'a str {
        trimmed.trim_start_matches(self.ch).trim()
    }
}

/// Split a document into note segments.
///
/// Two markers create note breaks outside fenced code:
/// 1. A `# ` level-1 heading, which opens the new segment.
/// 2. A line of three or more dashes, which is consumed.
///
/// Text before the first marker is the implicit leading segment. Blank
/// segments are dropped.
pub fn split(body: &str) -> Vec<Segment> {
    let body = body.replace("\r\n", "\n");
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_start = 0;
    let mut fence: Option<Fence> = None;

    for (idx, line) in body.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(open) = fence {
            if open.closes(trimmed) {
                fence = None;
            }
            current.push(line);
            continue;
        }

        if let Some(open) = Fence::open(trimmed) {
            fence = Some(open);
            current.push(line);
            continue;
        }

        if is_separator(trimmed) {
            flush(&mut segments, &mut current, current_start);
            current_start = idx + 1;
            continue;
        }

        if is_top_heading(line) {
            flush(&mut segments, &mut current, current_start);
            current_start = idx;
        }

        current.push(line);
    }

    flush(&mut segments, &mut current, current_start);
    segments
}

fn flush(segments: &mut Vec<Segment>, current: &mut Vec<&str>, start: usize) {
    let first = current.iter().position(|l| !l.trim().is_empty());
    let last = current.iter().rposition(|l| !l.trim().is_empty());
    if let (Some(first), Some(last)) = (first, last) {
        segments.push(Segment {
            text: current[first..=last].join("\n"),
            start_line: start + first,
        });
    }
    current.clear();
}

fn is_separator(trimmed: &str) -> bool {
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

fn is_top_heading(line: &str) -> bool {
    line.starts_with("# ") || line.starts_with("#\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_split() {
        let segments = split("# First\n\nContent\n\n# Second\n\nMore content");
        assert_eq!(segments.len(), 2);
        assert!(segments[0].text.starts_with("# First"));
        assert!(segments[1].text.starts_with("# Second"));
        assert_eq!(segments[1].start_line, 4);
    }

    #[test]
    fn test_leading_text_is_its_own_segment() {
        let segments = split("intro line\n# A\nbody");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "intro line");
        assert_eq!(segments[1].start_line, 1);
    }

    #[test]
    fn test_dash_separator_is_consumed() {
        let segments = split("one\n---\ntwo");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "one");
        assert_eq!(segments[1].text, "two");
        assert_eq!(segments[1].start_line, 2);
    }

    #[test]
    fn test_subheadings_do_not_split() {
        let segments = split("# Title\n\n## Subtitle\n\nContent");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_markers_inside_fence_are_ignored() {
        let segments = split("# Title\n\n```python\n# comment\n---\n```\nafter");
        assert_eq!(segments.len(), 1);
        assert!(segments[0].text.contains("# comment"));
    }

    #[test]
    fn test_consecutive_separators_drop_blank_segments() {
        let segments = split("a\n---\n\n---\nb\n---\n");
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_crlf_input() {
        let segments = split("# A\r\nx\r\n# B\r\ny");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "# A\nx");
    }
}
