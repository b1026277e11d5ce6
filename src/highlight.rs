use regex::{Regex, RegexBuilder};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub is_match: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Segment {
            text: text.to_string(),
            is_match: false,
        }
    }

    fn matched(text: &str) -> Self {
        Segment {
            text: text.to_string(),
            is_match: true,
        }
    }
}

/// Splits cell text into matching and non matching segments for a keyword.
///
/// The keyword is matched literally and case-insensitively. Compiled once and reused for every
/// cell of a result set.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    pub fn new(keyword: &str) -> Self {
        if keyword.is_empty() {
            return Highlighter { pattern: None };
        }
        // Escaping keeps user input like "a+b" or "(x" from being read as regex syntax
        let pattern = RegexBuilder::new(&regex::escape(keyword))
            .case_insensitive(true)
            .build();
        match pattern {
            Ok(re) => Highlighter { pattern: Some(re) },
            Err(e) => {
                warn!("Keyword {keyword:?} can not be highlighted: {e}");
                Highlighter { pattern: None }
            }
        }
    }

    pub fn highlight(&self, text: &str) -> Vec<Segment> {
        let Some(re) = &self.pattern else {
            return vec![Segment::plain(text)];
        };

        let mut segments = Vec::new();
        let mut last = 0;
        for m in re.find_iter(text) {
            if m.start() > last {
                segments.push(Segment::plain(&text[last..m.start()]));
            }
            segments.push(Segment::matched(m.as_str()));
            last = m.end();
        }
        if last < text.len() {
            segments.push(Segment::plain(&text[last..]));
        }
        segments
    }
}

pub fn highlight(text: &str, keyword: &str) -> Vec<Segment> {
    Highlighter::new(keyword).highlight(text)
}
