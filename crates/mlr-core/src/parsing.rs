//! Free-text to structured-field extraction.
//!
//! Stage units and evaluators describe the sections they expect with a
//! [`SectionSchema`] and hand the raw generation text to a
//! [`SectionParser`]. Parsing never fails: unrecognised text is dropped,
//! and missing sections are reported as absent so each caller can apply its
//! own fallback.
//!
//! [`HeuristicSectionParser`] is the default strategy. It walks the text
//! line by line, switches the active section when a line looks like a
//! header, and appends other lines to the active section.

use std::collections::HashMap;

/// How header lines are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// A line is a header when its lowercase form contains one of the
    /// section's labels (`"title:"`), or starts with its ordinal (`"1."`).
    Labeled,
    /// A line is a header when it is shorter than `max_len` characters and
    /// its lowercase form contains one of the section's keywords.
    Prose { max_len: usize },
}

/// How accumulated body lines are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    Space,
    Newline,
}

impl Joiner {
    fn as_str(&self) -> &'static str {
        match self {
            Joiner::Space => " ",
            Joiner::Newline => "\n",
        }
    }
}

/// One expected section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub key: &'static str,
    /// Labels (labeled style) or keywords (prose style), lowercase.
    pub markers: Vec<&'static str>,
    /// Numbered header prefix such as `"1."`, labeled style only.
    pub ordinal: Option<&'static str>,
    /// Keep the header line's own value (text after `:`, or the whole line)
    /// and nothing after it.
    pub capture_inline: bool,
}

impl SectionSpec {
    pub fn new(key: &'static str, markers: &[&'static str]) -> Self {
        Self {
            key,
            markers: markers.to_vec(),
            ordinal: None,
            capture_inline: false,
        }
    }

    pub fn ordinal(mut self, ordinal: &'static str) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn capture_inline(mut self) -> Self {
        self.capture_inline = true;
        self
    }
}

/// Description of the sections a response is expected to contain.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSchema {
    pub style: HeaderStyle,
    pub joiner: Joiner,
    /// Sections in header-matching priority order.
    pub sections: Vec<SectionSpec>,
    /// Section that collects lines before the first header.
    pub default_section: Option<&'static str>,
}

impl SectionSchema {
    pub fn new(style: HeaderStyle, joiner: Joiner, sections: Vec<SectionSpec>) -> Self {
        Self {
            style,
            joiner,
            sections,
            default_section: None,
        }
    }

    pub fn with_default_section(mut self, key: &'static str) -> Self {
        self.default_section = Some(key);
        self
    }
}

/// Sections extracted from one response. Values are trimmed; blank
/// sections are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSections {
    values: HashMap<String, String>,
}

impl ParsedSections {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Swappable text-to-sections strategy.
pub trait SectionParser: Send + Sync {
    fn parse(&self, text: &str, schema: &SectionSchema) -> ParsedSections;
}

/// Line-oriented header detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSectionParser;

impl HeuristicSectionParser {
    fn header_for<'s>(line: &str, lower: &str, schema: &'s SectionSchema) -> Option<&'s SectionSpec> {
        schema.sections.iter().find(|spec| match schema.style {
            HeaderStyle::Labeled => {
                spec.markers.iter().any(|m| lower.contains(m))
                    || spec.ordinal.is_some_and(|o| line.starts_with(o))
            }
            HeaderStyle::Prose { max_len } => {
                line.chars().count() < max_len && spec.markers.iter().any(|m| lower.contains(m))
            }
        })
    }
}

impl SectionParser for HeuristicSectionParser {
    fn parse(&self, text: &str, schema: &SectionSchema) -> ParsedSections {
        let mut buckets: HashMap<&'static str, Vec<String>> = HashMap::new();
        let mut current = schema.default_section;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let lower = line.to_lowercase();

            if let Some(spec) = Self::header_for(line, &lower, schema) {
                current = Some(spec.key);
                if spec.capture_inline {
                    let value = match line.split_once(':') {
                        Some((_, rest)) => rest.trim(),
                        None => line,
                    };
                    // An inline value replaces anything captured earlier.
                    let bucket = buckets.entry(spec.key).or_default();
                    bucket.clear();
                    if !value.is_empty() {
                        bucket.push(value.to_string());
                    }
                    // Inline sections end on their header line.
                    current = None;
                }
                continue;
            }

            if let Some(key) = current {
                buckets.entry(key).or_default().push(line.to_string());
            }
        }

        let values = buckets
            .into_iter()
            .filter_map(|(key, lines)| {
                let joined = lines.join(schema.joiner.as_str());
                let trimmed = joined.trim();
                (!trimmed.is_empty()).then(|| (key.to_string(), trimmed.to_string()))
            })
            .collect();
        ParsedSections { values }
    }
}
