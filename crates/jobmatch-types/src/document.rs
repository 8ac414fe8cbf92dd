//! Candidate documents.
//!
//! Documents are produced by whatever scrapes the job board and are
//! immutable once they reach the matching core.

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// A single posting (or any text) that can be matched against a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, usually the source URL
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Body text to embed (may be empty)
    #[serde(default)]
    pub text: String,
}

impl Document {
    /// Create a new document.
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    /// Check that the document can be referenced later.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.id.trim().is_empty() {
            return Err(MatchError::InvalidInput(
                "document id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whitespace-collapsed body text.
    pub fn normalized_text(&self) -> String {
        normalize_whitespace(&self.text)
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered set of documents searched in one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidatePool {
    documents: Vec<Document>,
}

impl CandidatePool {
    /// Build a pool, rejecting documents without an id.
    pub fn new(documents: Vec<Document>) -> Result<Self, MatchError> {
        for doc in &documents {
            doc.validate()?;
        }
        Ok(Self { documents })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a pool from either a JSON array or JSON Lines.
    pub fn from_json_str(input: &str) -> Result<Self, MatchError> {
        let trimmed = input.trim_start();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let documents: Vec<Document> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)?
        } else {
            trimmed
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str)
                .collect::<Result<_, _>>()?
        };

        Self::new(documents)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }
}

impl<'a> IntoIterator for &'a CandidatePool {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_id_rejected() {
        let doc = Document::new("  ", "title", "text");
        assert!(matches!(doc.validate(), Err(MatchError::InvalidInput(_))));
        assert!(CandidatePool::new(vec![doc]).is_err());
    }

    #[test]
    fn test_empty_text_allowed() {
        let pool = CandidatePool::new(vec![Document::new("a", "", "")]).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_parse_json_array() {
        let input = r#"[{"id": "u1", "title": "Data Scientist", "text": "python"},
                        {"id": "u2", "text": "rust"}]"#;
        let pool = CandidatePool::from_json_str(input).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1).unwrap().title, "");
    }

    #[test]
    fn test_parse_json_lines() {
        let input = "{\"id\": \"u1\", \"text\": \"a\"}\n\n{\"id\": \"u2\", \"text\": \"b\"}\n";
        let pool = CandidatePool::from_json_str(input).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(0).unwrap().id, "u1");
    }

    #[test]
    fn test_parse_blank_input() {
        let pool = CandidatePool::from_json_str("  \n").unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\tb   c "), "a b c");
    }
}
