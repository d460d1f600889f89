//! Artifact content. Only its hash is kept.

use pruv_core::{canonical_json, sha256_hex};
use serde_json::Value;

/// The content of an artifact at one point in its life.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Raw bytes, hashed as-is.
    Bytes(Vec<u8>),
    /// Text, hashed as UTF-8.
    Text(String),
    /// Structured content, hashed in canonical JSON form.
    Json(Value),
}

impl Content {
    /// Lowercase hex SHA-256 of the content.
    pub fn hash(&self) -> String {
        match self {
            Content::Bytes(bytes) => sha256_hex(bytes),
            Content::Text(text) => sha256_hex(text.as_bytes()),
            Content::Json(value) => sha256_hex(canonical_json(value).as_bytes()),
        }
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Bytes(bytes.to_vec())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_hash_is_canonical() {
        let a = Content::from(json!({"title": "Q3 report", "pages": 12}));
        let b = Content::from(json!({"pages": 12, "title": "Q3 report"}));
        assert_eq!(a.hash(), b.hash());
        assert_eq!(
            a.hash(),
            "43cc179177c706648a3bddbb6a6974d477a1a79c3082e6ad243292c7828b69bb"
        );
    }

    #[test]
    fn test_text_and_bytes_agree() {
        let text = Content::from("hello");
        let bytes = Content::from(b"hello".as_slice());
        assert_eq!(text.hash(), bytes.hash());
        assert_eq!(
            text.hash(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
