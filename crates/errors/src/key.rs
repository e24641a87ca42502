//! Product key validation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum KeyError {
    #[error("product key is empty")]
    Empty,

    #[error("product key is {len} bytes long, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("product key contains {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("product key may not start with '.'")]
    LeadingDot,
}

impl UserFacingError for KeyError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("Product keys contain only ASCII letters, digits, '-', '_' and '.'.")
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Empty => "key.empty",
            Self::TooLong { .. } => "key.too_long",
            Self::InvalidCharacter { .. } => "key.invalid_character",
            Self::LeadingDot => "key.leading_dot",
        };
        Some(code)
    }
}
