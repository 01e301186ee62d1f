use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Why a submission could not be turned into a typed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The body was not a readable url-encoded form.
    Malformed,
    /// A value could not be coerced into the declared type.
    TypeMismatch,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DecodeErrorKind::Malformed => "malformed form body",
            DecodeErrorKind::TypeMismatch => "type mismatch",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} for `{field}`")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub field: String,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::Malformed, detail)
    }
}

/// Submitted form values, keyed by field name. Repeated names keep every
/// value in submission order.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    values: HashMap<String, Vec<String>>,
}

impl FormData {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in pairs {
            values.entry(name.into()).or_default().push(value.into());
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Text field; an absent field reads as the empty string so the
    /// validator can report it.
    pub fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    /// Numeric field; absent or empty values decode as `T::default()` and
    /// are left for the validator to reject. Anything else must parse as a
    /// base-10 integer exactly as submitted.
    pub fn number<T>(&self, name: &str) -> Result<T, DecodeError>
    where
        T: FromStr + Default,
    {
        match self.get(name) {
            None | Some("") => Ok(T::default()),
            Some(raw) => raw
                .parse::<T>()
                .map_err(|_| DecodeError::new(DecodeErrorKind::TypeMismatch, name)),
        }
    }
}

/// Maps declared form field names onto a typed command.
///
/// Implementations read each field through `FormData` and return on the
/// first failure; nothing is decoded after an error.
pub trait FromForm: Sized {
    fn from_form(form: &FormData) -> Result<Self, DecodeError>;
}
