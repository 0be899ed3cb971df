//! Patch targets and error definitions.

use std::fmt;

use thiserror::Error;

/// Points at one field inside one occurrence of a section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchTarget {
    /// Mapping key that opens the section (e.g. `image`).
    pub section: String,

    /// 0-based occurrence of the section in document order.
    pub occurrence: usize,

    /// Direct child field to replace (e.g. `repository`).
    pub field: String,
}

impl PatchTarget {
    /// Target `field` in the first `section` of the document.
    pub fn first(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            occurrence: 0,
            field: field.into(),
        }
    }

    /// Select a later occurrence of the section instead of the first.
    pub fn nth(mut self, occurrence: usize) -> Self {
        self.occurrence = occurrence;
        self
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}].{}", self.section, self.occurrence, self.field)
    }
}

/// Errors that can occur while patching a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// No section/field pair matched the target.
    #[error("target {target} not found")]
    TargetNotFound { target: PatchTarget },

    /// The document could not be read into the structural model.
    #[error("malformed document at line {line}: {reason}")]
    MalformedDocument { line: usize, reason: String },

    /// The selected section is a flow mapping or an alias, which cannot be
    /// edited in place.
    #[error("section {}[{}] is not a block mapping", target.section, target.occurrence)]
    UnsupportedSection { target: PatchTarget },

    /// The target field holds a mapping, sequence, alias or block scalar.
    #[error("field {target} does not hold a single-line scalar")]
    NonScalarField { target: PatchTarget },

    /// The replacement cannot be written as a YAML scalar.
    #[error("invalid replacement value: {0}")]
    InvalidValue(String),
}

impl PatchError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        let target = PatchTarget::first("image", "repository");
        assert_eq!(target.to_string(), "image[0].repository");
        assert_eq!(target.nth(2).to_string(), "image[2].repository");
    }

    #[test]
    fn test_error_messages() {
        let err = PatchError::TargetNotFound {
            target: PatchTarget::first("image", "tag"),
        };
        assert_eq!(err.to_string(), "target image[0].tag not found");

        let err = PatchError::malformed(3, "tab in indentation");
        assert_eq!(err.to_string(), "malformed document at line 3: tab in indentation");
    }
}
