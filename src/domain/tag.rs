// Tag domain model
use super::value::Value;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tag id '{0}': expected two uppercase letters followed by three digits")]
pub struct InvalidTagId(pub String);

/// Identifier of a measurement column, e.g. `PI001`.
///
/// Only ids of this exact shape are ever interpolated into store queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    pub fn parse(text: &str) -> Result<Self, InvalidTagId> {
        if Self::is_valid(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(InvalidTagId(text.to_string()))
        }
    }

    /// Trim and upper-case operator input before validating it.
    pub fn normalize(text: &str) -> Result<Self, InvalidTagId> {
        Self::parse(&text.trim().to_ascii_uppercase())
    }

    pub fn is_valid(text: &str) -> bool {
        let bytes = text.as_bytes();
        bytes.len() == 5
            && bytes[..2].iter().all(u8::is_ascii_uppercase)
            && bytes[2..].iter().all(u8::is_ascii_digit)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub value: Value,
}

impl Tag {
    pub fn new(id: TagId, value: Value) -> Self {
        Self { id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_tag_shape() {
        assert_eq!(TagId::parse("PI001").unwrap().as_str(), "PI001");
        assert_eq!(TagId::parse("TI042").unwrap().to_string(), "TI042");
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for text in ["pi001", "P1001", "PI01", "PI0012", "PIX01", "", "PI001; DROP", "ΠI001"] {
            assert_eq!(TagId::parse(text), Err(InvalidTagId(text.to_string())), "{text}");
        }
    }

    #[test]
    fn test_normalize_uppercases_and_trims() {
        assert_eq!(TagId::normalize("  pi001 ").unwrap().as_str(), "PI001");
        assert!(TagId::normalize("pi 001").is_err());
    }
}
