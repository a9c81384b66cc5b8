//! Resource limits for the query language

/// Maximum segments in a field path (`a.b.c` is 3)
pub const MAX_FIELD_PATH_DEPTH: usize = 16;

/// Maximum length of a `regex`/`iregex` pattern (4KB)
pub const MAX_REGEX_PATTERN_LEN: usize = 4 * 1024;

/// Maximum compiled regex size in bytes (1MB)
pub const MAX_REGEX_COMPILED_SIZE: usize = 1024 * 1024;

/// Maximum operands in an `in` lookup (10000)
pub const MAX_IN_OPERANDS: usize = 10_000;

/// Maximum fields in a single `order_by` (32)
pub const MAX_ORDER_FIELDS: usize = 32;

/// Limit violation
#[derive(Debug, Clone, PartialEq)]
pub enum LimitError {
    FieldPathTooDeep { depth: usize, max: usize },
    RegexTooLong { len: usize, max: usize },
    TooManyInOperands { count: usize, max: usize },
    TooManyOrderFields { count: usize, max: usize },
    EmptyFieldPath,
}

impl std::fmt::Display for LimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldPathTooDeep { depth, max } => {
                write!(f, "Field path too deep: {} segments (max {})", depth, max)
            }
            Self::RegexTooLong { len, max } => {
                write!(f, "Regex pattern too long: {} chars (max {})", len, max)
            }
            Self::TooManyInOperands { count, max } => {
                write!(f, "Too many 'in' operands: {} (max {})", count, max)
            }
            Self::TooManyOrderFields { count, max } => {
                write!(f, "Too many order_by fields: {} (max {})", count, max)
            }
            Self::EmptyFieldPath => write!(f, "Field path cannot be empty"),
        }
    }
}

impl std::error::Error for LimitError {}

/// Validate a split field path
pub fn validate_field_path(segments: &[&str]) -> Result<(), LimitError> {
    if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(LimitError::EmptyFieldPath);
    }
    if segments.len() > MAX_FIELD_PATH_DEPTH {
        return Err(LimitError::FieldPathTooDeep {
            depth: segments.len(),
            max: MAX_FIELD_PATH_DEPTH,
        });
    }
    Ok(())
}

/// Validate a regex pattern length
pub fn validate_regex_pattern(pattern: &str) -> Result<(), LimitError> {
    if pattern.len() > MAX_REGEX_PATTERN_LEN {
        return Err(LimitError::RegexTooLong {
            len: pattern.len(),
            max: MAX_REGEX_PATTERN_LEN,
        });
    }
    Ok(())
}

/// Validate `in` operand count
pub fn validate_in_operands(count: usize) -> Result<(), LimitError> {
    if count > MAX_IN_OPERANDS {
        return Err(LimitError::TooManyInOperands {
            count,
            max: MAX_IN_OPERANDS,
        });
    }
    Ok(())
}

/// Validate `order_by` field count
pub fn validate_order_fields(count: usize) -> Result<(), LimitError> {
    if count > MAX_ORDER_FIELDS {
        return Err(LimitError::TooManyOrderFields {
            count,
            max: MAX_ORDER_FIELDS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_field_path() {
        assert!(validate_field_path(&["name"]).is_ok());
        assert!(validate_field_path(&[]).is_err());
        assert!(validate_field_path(&["point", ""]).is_err());
        assert!(validate_field_path(&["x"; 17]).is_err());
    }

    #[test]
    fn test_validate_counts() {
        assert!(validate_in_operands(3).is_ok());
        assert!(validate_in_operands(MAX_IN_OPERANDS + 1).is_err());
        assert!(validate_order_fields(33).is_err());
        assert!(validate_regex_pattern(&"a".repeat(5000)).is_err());
    }
}
