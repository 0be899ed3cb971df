//! Single-field replacement.
//!
//! # Responsibilities
//! - Resolve a `PatchTarget` to exactly one value span
//! - Replace that span and nothing else
//! - Re-read the result so a corrupted document is never returned
//!
//! # Design Decisions
//! - First occurrence wins: scanning stops at the selected section, later
//!   sections with the same key are never examined
//! - Flow and alias sections still take up an occurrence number; selecting
//!   one is an error rather than a reason to move on to the next section
//! - Only direct children of the section are candidates; a same-named
//!   field one level deeper is a different field
//! - A missing target is an error, never a silent no-op

use crate::patch::document::{StructuredDocument, ValueKind};
use crate::patch::scalar::{self, ScalarStyle};
use crate::patch::types::{PatchError, PatchTarget};

/// Replace the value addressed by `target` with `new_value`.
pub fn patch(
    doc: &StructuredDocument,
    target: &PatchTarget,
    new_value: &str,
) -> Result<StructuredDocument, PatchError> {
    scalar::check_value(new_value)?;

    let not_found = || PatchError::TargetNotFound {
        target: target.clone(),
    };

    let section = doc
        .sections(&target.section)
        .nth(target.occurrence)
        .ok_or_else(not_found)?;
    if doc.entries()[section].kind != ValueKind::Mapping {
        return Err(PatchError::UnsupportedSection {
            target: target.clone(),
        });
    }
    let field = doc.child(section, &target.field).ok_or_else(not_found)?;
    let entry = &doc.entries()[field];

    let replacement = match entry.kind {
        ValueKind::Scalar(style) => scalar::render(new_value, style),
        ValueKind::Empty => format!(" {}", scalar::render(new_value, ScalarStyle::Plain)),
        _ => {
            return Err(PatchError::NonScalarField {
                target: target.clone(),
            })
        }
    };

    let text = doc.as_str();
    let span = entry.value_span.clone();
    if text[span.clone()] == replacement {
        tracing::debug!(%target, line = entry.line, "Value already up to date");
        return Ok(doc.clone());
    }

    let mut patched = String::with_capacity(text.len() + replacement.len());
    patched.push_str(&text[..span.start]);
    patched.push_str(&replacement);
    patched.push_str(&text[span.end..]);

    tracing::debug!(
        %target,
        line = entry.line,
        old = %&text[span],
        new = %replacement,
        "Patched value"
    );

    StructuredDocument::parse(patched)
}

/// Parse `text`, patch it, and return the new text.
pub fn patch_str(text: &str, target: &PatchTarget, new_value: &str) -> Result<String, PatchError> {
    let doc = StructuredDocument::parse(text)?;
    patch(&doc, target, new_value).map(StructuredDocument::into_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: &str = "\
# Default values for catalog.
replicaCount: 1

image:
  repository: public.ecr.aws/aws-containers/retail-store-sample-catalog
  pullPolicy: IfNotPresent
  # Overrides the image tag whose default is the chart appVersion.
  tag: \"1.2.1\"

mysql:
  create: true
  image:
    repository: public.ecr.aws/docker/library/mysql
    tag: \"8.0\"
";

    fn image_repo() -> PatchTarget {
        PatchTarget::first("image", "repository")
    }

    #[test]
    fn test_first_occurrence_only() {
        let new = "1234.dkr.ecr.us-east-1.amazonaws.com/catalog";
        let out = patch_str(VALUES, &image_repo(), new).unwrap();

        assert_eq!(
            out,
            VALUES.replace(
                "public.ecr.aws/aws-containers/retail-store-sample-catalog",
                new
            )
        );
        assert!(out.contains("    repository: public.ecr.aws/docker/library/mysql\n"));
    }

    #[test]
    fn test_quoted_tag_keeps_style() {
        let out = patch_str(VALUES, &PatchTarget::first("image", "tag"), "a1b2c3d").unwrap();

        assert!(out.contains("  tag: \"a1b2c3d\"\n"));
        assert!(out.contains("    tag: \"8.0\"\n"));
        assert!(out.contains("# Overrides the image tag whose default is the chart appVersion.\n"));
    }

    #[test]
    fn test_second_occurrence() {
        let target = image_repo().nth(1);
        let out = patch_str(VALUES, &target, "mirror/mysql").unwrap();

        assert!(out.contains(
            "  repository: public.ecr.aws/aws-containers/retail-store-sample-catalog\n"
        ));
        assert!(out.contains("    repository: mirror/mysql\n"));
    }

    #[test]
    fn test_idempotent() {
        let once = patch_str(VALUES, &image_repo(), "registry/catalog").unwrap();
        let twice = patch_str(&once, &image_repo(), "registry/catalog").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_flow_first_section_is_not_skipped() {
        let doc = "image: {repository: app, tag: \"1\"}\nmysql:\n  image:\n    repository: mysql\n";

        let err = patch_str(doc, &image_repo(), "B").unwrap_err();
        assert_eq!(err, PatchError::UnsupportedSection { target: image_repo() });

        let out = patch_str(doc, &image_repo().nth(1), "B").unwrap();
        assert!(out.starts_with("image: {repository: app, tag: \"1\"}\n"));
        assert!(out.ends_with("    repository: B\n"));
    }

    #[test]
    fn test_alias_first_section_is_not_skipped() {
        let doc = "\
defaults: &img
  repository: app
image: *img
mysql:
  image:
    repository: mysql
";
        let err = patch_str(doc, &image_repo(), "B").unwrap_err();
        assert_eq!(err, PatchError::UnsupportedSection { target: image_repo() });
    }

    #[test]
    fn test_flow_sequence_is_not_a_section() {
        let doc = "image: [a, b]\nsidecar:\n  image:\n    repository: envoy\n";
        let out = patch_str(doc, &image_repo(), "proxy").unwrap();
        assert_eq!(out, doc.replace("envoy", "proxy"));
    }

    #[test]
    fn test_document_block_scalar_has_no_sections() {
        let doc = "--- |\n  image:\n    repository: fake\n";
        let err = patch_str(doc, &image_repo(), "B").unwrap_err();
        assert!(matches!(err, PatchError::TargetNotFound { .. }));

        let stream = format!("{doc}---\nimage:\n  repository: real\n");
        let out = patch_str(&stream, &image_repo(), "B").unwrap();
        assert_eq!(out, stream.replace("real", "B"));
    }

    #[test]
    fn test_missing_section() {
        let err = patch_str("replicaCount: 1\n", &image_repo(), "x").unwrap_err();
        assert_eq!(err, PatchError::TargetNotFound { target: image_repo() });
    }

    #[test]
    fn test_missing_field_in_first_section() {
        // The first image section lacks the field; later sections are not consulted.
        let doc = "image:\n  tag: v1\nsidecar:\n  image:\n    repository: envoy\n";
        let err = patch_str(doc, &image_repo(), "x").unwrap_err();
        assert!(matches!(err, PatchError::TargetNotFound { .. }));
    }

    #[test]
    fn test_nested_same_name_is_not_a_direct_child() {
        let doc = "image:\n  mirror:\n    repository: inner\n";
        let err = patch_str(doc, &image_repo(), "x").unwrap_err();
        assert!(matches!(err, PatchError::TargetNotFound { .. }));
    }

    #[test]
    fn test_non_scalar_field() {
        let doc = "image:\n  repository:\n    name: ui\n";
        let err = patch_str(doc, &image_repo(), "x").unwrap_err();
        assert_eq!(err, PatchError::NonScalarField { target: image_repo() });
    }

    #[test]
    fn test_empty_field_gets_value() {
        let doc = "image:\n  repository: ui\n  tag: # set by CI\n";
        let out = patch_str(doc, &PatchTarget::first("image", "tag"), "abc123f").unwrap();
        assert_eq!(out, "image:\n  repository: ui\n  tag: abc123f # set by CI\n");
    }

    #[test]
    fn test_numeric_tag_is_quoted() {
        let doc = "image:\n  tag: latest\n";
        let out = patch_str(doc, &PatchTarget::first("image", "tag"), "1234567").unwrap();
        assert_eq!(out, "image:\n  tag: \"1234567\"\n");
    }

    #[test]
    fn test_trailing_comment_and_crlf() {
        let doc = "image:\r\n  repository: old # primary\r\n";
        let out = patch_str(doc, &image_repo(), "new").unwrap();
        assert_eq!(out, "image:\r\n  repository: new # primary\r\n");
    }

    #[test]
    fn test_malformed_document() {
        let err = patch_str("image:\n  repository: \"open\n", &image_repo(), "x").unwrap_err();
        assert!(matches!(err, PatchError::MalformedDocument { .. }));
    }

    #[test]
    fn test_invalid_value() {
        let err = patch_str(VALUES, &image_repo(), "bad\u{7}").unwrap_err();
        assert!(matches!(err, PatchError::InvalidValue(_)));
    }
}
