//! Input validation shared by catalog, document and user models.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure for domain input or persisted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required name field is empty after trimming.
    BlankName(&'static str),
    /// A name field exceeds its storage width.
    NameTooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Checkpoint sequence positions start at 1.
    NonPositiveSequence(i64),
    /// Text does not follow the `DTS-YYYYMMDD-NNNN` shape.
    MalformedTrackingId(String),
    /// Daily sequence outside `1..=9999`.
    SequenceOutOfRange(u32),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName(field) => write!(f, "{field} must not be blank"),
            Self::NameTooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::NonPositiveSequence(value) => {
                write!(f, "sequence order must be positive, got {value}")
            }
            Self::MalformedTrackingId(value) => write!(f, "malformed tracking id `{value}`"),
            Self::SequenceOutOfRange(value) => {
                write!(f, "daily tracking sequence {value} is outside 1..=9999")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects blank or oversized names.
pub fn normalize_name(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName(field));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::NameTooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, ValidationError};

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("name", "  Invoice ", 100).unwrap(), "Invoice");
        assert_eq!(
            normalize_name("name", " \t ", 100),
            Err(ValidationError::BlankName("name"))
        );
    }

    #[test]
    fn normalize_name_counts_chars_not_bytes() {
        assert!(normalize_name("name", "éé", 2).is_ok());
        assert!(matches!(
            normalize_name("name", "ééé", 2),
            Err(ValidationError::NameTooLong { max_chars: 2, .. })
        ));
    }
}
