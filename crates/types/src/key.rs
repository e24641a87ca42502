//! Product key type

use curie_errors::KeyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest key accepted, in bytes
pub const MAX_KEY_LEN: usize = 128;

/// Opaque, externally issued identifier of a product asset
///
/// A key is used verbatim as the `product_id` query value of the exchange
/// request and as the file stem of the cached asset, so construction rejects
/// anything that is not a plain, non-hidden file name made of
/// `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductKey(String);

impl ProductKey {
    /// Validate and wrap a key
    ///
    /// # Errors
    ///
    /// Returns a `KeyError` if the key is empty, too long, starts with `.`
    /// or contains a character outside `[A-Za-z0-9._-]`.
    pub fn new(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();
        validate(&key)?;
        Ok(Self(key))
    }

    /// Borrow the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the cached asset for this key
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.0)
    }
}

fn validate(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(KeyError::TooLong {
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    if key.starts_with('.') {
        return Err(KeyError::LeadingDot);
    }
    if let Some((position, character)) = key
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(KeyError::InvalidCharacter {
            character,
            position,
        });
    }
    Ok(())
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProductKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductKey> for String {
    fn from(key: ProductKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ProductKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_issued_keys() {
        let key = ProductKey::new("65a9a1913baa11131f202df8").unwrap();
        assert_eq!(key.as_str(), "65a9a1913baa11131f202df8");
        assert_eq!(key.file_name("usdz"), "65a9a1913baa11131f202df8.usdz");
        assert!(ProductKey::new("chair_v2.final-3").is_ok());
    }

    #[test]
    fn test_rejects_traversal_and_url_unsafe_keys() {
        assert_eq!(ProductKey::new(""), Err(KeyError::Empty));
        assert_eq!(ProductKey::new(".."), Err(KeyError::LeadingDot));
        assert_eq!(ProductKey::new(".hidden"), Err(KeyError::LeadingDot));
        assert!(matches!(
            ProductKey::new("../etc/passwd"),
            Err(KeyError::LeadingDot)
        ));
        assert!(matches!(
            ProductKey::new("a/b"),
            Err(KeyError::InvalidCharacter {
                character: '/',
                position: 1
            })
        ));
        assert!(ProductKey::new("a\\b").is_err());
        assert!(ProductKey::new("a&product_id=b").is_err());
        assert!(ProductKey::new("a b").is_err());
        assert!(ProductKey::new("caf\u{e9}").is_err());
    }

    #[test]
    fn test_length_limit() {
        assert!(ProductKey::new("a".repeat(MAX_KEY_LEN)).is_ok());
        assert_eq!(
            ProductKey::new("a".repeat(MAX_KEY_LEN + 1)),
            Err(KeyError::TooLong {
                len: MAX_KEY_LEN + 1,
                max: MAX_KEY_LEN
            })
        );
    }
}
