// Profile document format
// The decoded JSON a profile file holds; the compiler's input

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::LoadError;

/// Explicit down/up pair for one key
///
/// Either side may be missing; the compiler treats it as empty and warns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSymbols {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<Vec<String>>,
}

/// A profile as authored, one of three shapes
///
/// ```json
/// {"type": "simple",    "profile": ["a", "b", "CTRL"]}
/// {"type": "symmetric", "profile": [["CTRL", "c"], ["x"]]}
/// {"type": "complete",  "profile": [{"down": ["a"], "up": ["b"]}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "profile", rename_all = "lowercase")]
pub enum ProfileDocument {
    /// One symbol per key, pressed and released as a tap
    Simple(Vec<String>),
    /// A symbol sequence per key, released in reverse order
    #[serde(alias = "symetric")]
    Symmetric(Vec<Vec<String>>),
    /// Explicit down and up macros per key
    Complete(Vec<BindingSymbols>),
}

impl ProfileDocument {
    /// Decode a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        serde_json::from_str(json).map_err(|e| LoadError::Parse(e.to_string()))
    }

    /// Read and decode a document file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Number of keys the document binds
    pub fn key_count(&self) -> usize {
        match self {
            ProfileDocument::Simple(keys) => keys.len(),
            ProfileDocument::Symmetric(keys) => keys.len(),
            ProfileDocument::Complete(keys) => keys.len(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProfileDocument::Simple(_) => "simple",
            ProfileDocument::Symmetric(_) => "symmetric",
            ProfileDocument::Complete(_) => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_simple() {
        let doc = ProfileDocument::from_json(r#"{"type":"simple","profile":["a","CTRL"]}"#)
            .unwrap();
        assert_eq!(
            doc,
            ProfileDocument::Simple(vec!["a".to_string(), "CTRL".to_string()])
        );
    }

    #[test]
    fn test_decode_historical_spelling() {
        let doc =
            ProfileDocument::from_json(r#"{"type":"symetric","profile":[["CTRL","c"]]}"#).unwrap();
        assert_eq!(doc.kind(), "symmetric");
        assert_eq!(doc.key_count(), 1);
    }

    #[test]
    fn test_decode_complete_with_missing_side() {
        let doc =
            ProfileDocument::from_json(r#"{"type":"complete","profile":[{"down":["a"]}]}"#)
                .unwrap();
        match doc {
            ProfileDocument::Complete(keys) => {
                assert_eq!(keys[0].down.as_deref(), Some(&["a".to_string()][..]));
                assert!(keys[0].up.is_none());
            }
            other => panic!("unexpected document {other:?}"),
        }
    }

    #[test]
    fn test_missing_type_or_profile_rejected() {
        assert!(matches!(
            ProfileDocument::from_json(r#"{"profile":["a"]}"#),
            Err(LoadError::Parse(_))
        ));
        assert!(matches!(
            ProfileDocument::from_json(r#"{"type":"simple"}"#),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(matches!(
            ProfileDocument::from_json(r#"{"type":"fancy","profile":[]}"#),
            Err(LoadError::Parse(_))
        ));
    }
}
