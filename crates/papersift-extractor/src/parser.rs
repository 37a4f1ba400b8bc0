//! Recover one structured row from free-form model output
//!
//! Models rarely answer with a bare CSV line. They think out loud, echo the
//! instruction or wrap the row in a markdown fence. The parser skips all of
//! that and takes the first line that looks like a full row.

use crate::config::DEFAULT_IGNORED_FRAGMENTS;
use crate::error::ExtractorError;
use tracing::debug;

/// Turns a raw response into positional field values
pub trait ResponseParser: Send + Sync {
    /// Parse `response` into at most `field_count` values
    ///
    /// The result always has exactly `field_count` entries; missing trailing
    /// values are `None`.
    fn parse(&self, response: &str, field_count: usize)
        -> Result<Vec<Option<String>>, ExtractorError>;
}

/// Picks the first comma-dense line and reads it as one CSV record
///
/// # Examples
///
/// ```
/// use papersift_extractor::{CsvRowParser, ResponseParser};
///
/// let parser = CsvRowParser::default();
/// let values = parser
///     .parse("Thinking...\n\"val1\",\"val2\",\"val3\"\n", 3)
///     .unwrap();
/// assert_eq!(values[1].as_deref(), Some("val2"));
/// ```
#[derive(Debug, Clone)]
pub struct CsvRowParser {
    ignored_fragments: Vec<String>,
}

impl CsvRowParser {
    /// Create a parser that skips lines containing any of `ignored_fragments`
    pub fn new<I, S>(ignored_fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignored_fragments: ignored_fragments
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Select the candidate row from a multi-line response
    pub fn select_row<'a>(&self, response: &'a str, field_count: usize) -> Option<&'a str> {
        let min_commas = field_count.saturating_sub(1);

        response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !self.is_ignored(line))
            .find(|line| line.matches(',').count() >= min_commas)
    }

    fn is_ignored(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.ignored_fragments
            .iter()
            .any(|fragment| lower.contains(fragment.as_str()))
    }

    /// Parse a single CSV line into exactly `field_count` values
    pub fn parse_row(
        &self,
        line: &str,
        field_count: usize,
    ) -> Result<Vec<Option<String>>, ExtractorError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());

        let record = match reader.records().next() {
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                return Err(ExtractorError::Parse(format!("Malformed CSV row: {}", e)));
            }
            None => return Err(ExtractorError::Parse("Empty CSV row".to_string())),
        };

        if record.len() > field_count {
            debug!(
                "Ignoring {} surplus fields in response row",
                record.len() - field_count
            );
        }

        let mut values: Vec<Option<String>> = record
            .iter()
            .take(field_count)
            .map(|field| Some(clean_field(field)))
            .collect();
        values.resize(field_count, None);
        Ok(values)
    }
}

/// Trim a field and strip quotes the CSV reader kept
///
/// A space after the delimiter (`"a", "b"`) makes the reader treat the
/// second field as unquoted, so its quotes survive parsing. Fields that
/// start directly with a quote were already unescaped by the reader.
fn clean_field(field: &str) -> String {
    let trimmed = field.trim();
    if field == field.trim_start() {
        return trimmed.to_string();
    }
    match trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => trimmed.to_string(),
    }
}

impl Default for CsvRowParser {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_FRAGMENTS)
    }
}

impl ResponseParser for CsvRowParser {
    fn parse(
        &self,
        response: &str,
        field_count: usize,
    ) -> Result<Vec<Option<String>>, ExtractorError> {
        let line = self.select_row(response, field_count).ok_or_else(|| {
            ExtractorError::Parse(format!(
                "No line with at least {} commas in response",
                field_count.saturating_sub(1)
            ))
        })?;
        self.parse_row(line, field_count)
    }
}
