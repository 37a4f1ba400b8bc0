//! Extraction query - the instruction template and its expected fields

use std::fmt;
use std::sync::Arc;

/// The instruction sent alongside every document, plus the ordered list of
/// field names the model is asked to return.
///
/// Queries are immutable once built. Cloning is cheap: the contents are
/// shared behind an `Arc`.
///
/// # Examples
///
/// ```
/// use papersift_domain::ExtractionQuery;
///
/// let query = ExtractionQuery::new("Return a,b,c as CSV", ["a", "b", "c"]);
/// assert_eq!(query.field_count(), 3);
/// assert_eq!(query.field_names()[1], "b");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractionQuery {
    inner: Arc<QueryInner>,
}

#[derive(PartialEq, Eq)]
struct QueryInner {
    instruction: String,
    field_names: Vec<String>,
}

impl ExtractionQuery {
    /// Create a query from an instruction and its ordered field names
    pub fn new<I, S>(instruction: impl Into<String>, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(QueryInner {
                instruction: instruction.into(),
                field_names: field_names.into_iter().map(Into::into).collect(),
            }),
        }
    }

    /// The natural-language instruction
    pub fn instruction(&self) -> &str {
        &self.inner.instruction
    }

    /// Expected field names, in the order the model emits them
    pub fn field_names(&self) -> &[String] {
        &self.inner.field_names
    }

    /// Number of expected fields
    pub fn field_count(&self) -> usize {
        self.inner.field_names.len()
    }
}

impl fmt::Debug for ExtractionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionQuery")
            .field("instruction_len", &self.inner.instruction.len())
            .field("field_names", &self.inner.field_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_accessors() {
        let query = ExtractionQuery::new("extract", vec!["x".to_string(), "y".to_string()]);
        assert_eq!(query.instruction(), "extract");
        assert_eq!(query.field_names(), &["x".to_string(), "y".to_string()]);
        assert_eq!(query.field_count(), 2);
    }

    #[test]
    fn test_clone_shares_contents() {
        let query = ExtractionQuery::new("extract", ["a"]);
        let copy = query.clone();
        assert_eq!(query, copy);
        assert!(Arc::ptr_eq(&query.inner, &copy.inner));
    }

    #[test]
    fn test_debug_omits_instruction_body() {
        let query = ExtractionQuery::new("a very long instruction", ["a"]);
        let debug = format!("{:?}", query);
        assert!(debug.contains("instruction_len"));
        assert!(!debug.contains("a very long instruction"));
    }
}
