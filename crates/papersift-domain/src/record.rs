//! Extraction records - the structured output for one document

use crate::query::ExtractionQuery;

/// One named field of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    /// Field name, as listed in the query
    pub name: String,

    /// Extracted value, `None` when the model emitted fewer fields than expected
    pub value: Option<String>,
}

/// Terminal outcome of extracting one document
///
/// A record either carries the complete field set of its query or only a
/// filename and an error. The variants make a half-valid record
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRecord {
    /// The model's response was parsed into the query's fields
    Success {
        /// Source document name
        filename: String,
        /// Every expected field, in query order
        fields: Vec<FieldValue>,
    },

    /// Processing or parsing failed
    Failure {
        /// Source document name
        filename: String,
        /// Human-readable failure reason
        error: String,
    },
}

impl ExtractionRecord {
    /// Build a successful record from positional values
    ///
    /// Values are mapped onto the query's field names in order. Missing
    /// trailing values become `None`; surplus values are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use papersift_domain::{ExtractionQuery, ExtractionRecord};
    ///
    /// let query = ExtractionQuery::new("q", ["a", "b", "c"]);
    /// let record = ExtractionRecord::from_values(
    ///     "paper.pdf",
    ///     &query,
    ///     vec![Some("1".to_string()), Some("2".to_string())],
    /// );
    /// assert_eq!(record.value("b"), Some("2"));
    /// assert_eq!(record.value("c"), None);
    /// ```
    pub fn from_values(
        filename: impl Into<String>,
        query: &ExtractionQuery,
        values: Vec<Option<String>>,
    ) -> Self {
        let mut values = values.into_iter();
        let fields = query
            .field_names()
            .iter()
            .map(|name| FieldValue {
                name: name.clone(),
                value: values.next().flatten(),
            })
            .collect();

        Self::Success {
            filename: filename.into(),
            fields,
        }
    }

    /// Build a failed record
    pub fn failure(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failure {
            filename: filename.into(),
            error: error.into(),
        }
    }

    /// Source document name
    pub fn filename(&self) -> &str {
        match self {
            Self::Success { filename, .. } | Self::Failure { filename, .. } => filename,
        }
    }

    /// Whether the extraction succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure reason, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// Value of a named field; `None` for failures, unknown names and unset fields
    pub fn value(&self, name: &str) -> Option<&str> {
        match self {
            Self::Success { fields, .. } => fields
                .iter()
                .find(|f| f.name == name)
                .and_then(|f| f.value.as_deref()),
            Self::Failure { .. } => None,
        }
    }

    /// All fields of a successful record, empty for failures
    pub fn fields(&self) -> &[FieldValue] {
        match self {
            Self::Success { fields, .. } => fields,
            Self::Failure { .. } => &[],
        }
    }
}
