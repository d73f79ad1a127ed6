//! Structural checks on generated HTML.
//!
//! The checks are plain substring heuristics. They never fail: malformed or
//! empty input simply produces a verdict with every check set to `false`.

use serde::{Deserialize, Serialize};

/// Issue line for a document without `<html ...>` and `</html>`.
pub const MISSING_STRUCTURE: &str = "Missing proper HTML structure";
/// Issue line for a document without an email/waitlist form.
pub const MISSING_FORM: &str = "Missing waitlist email form";
/// Issue line for a document that does not load Tailwind.
pub const MISSING_STYLE_FRAMEWORK: &str = "Missing Tailwind CSS";

/// Outcome of [`validate_html`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    /// Contains opening and closing root-document markers.
    pub has_document_structure: bool,
    /// Contains a form referencing an email field or a waitlist marker.
    pub has_collection_form: bool,
    /// References the Tailwind CSS framework.
    pub has_style_framework: bool,
}

impl ValidationVerdict {
    /// All three checks passed.
    #[must_use]
    pub const fn is_basic_valid(&self) -> bool {
        self.has_document_structure && self.has_collection_form && self.has_style_framework
    }

    /// Issue lines for the failed checks only, in a fixed order.
    #[must_use]
    pub fn missing_issues(&self) -> Vec<&'static str> {
        let mut issues = Vec::with_capacity(3);
        if !self.has_document_structure {
            issues.push(MISSING_STRUCTURE);
        }
        if !self.has_collection_form {
            issues.push(MISSING_FORM);
        }
        if !self.has_style_framework {
            issues.push(MISSING_STYLE_FRAMEWORK);
        }
        issues
    }
}

/// Checks a candidate page.
///
/// # Examples
///
/// ```
/// use landingwise_workflow::validate_html;
///
/// let verdict = validate_html("<p>hello</p>");
/// assert!(!verdict.is_basic_valid());
/// assert_eq!(verdict.missing_issues().len(), 3);
/// ```
#[must_use]
pub fn validate_html(html: &str) -> ValidationVerdict {
    let has_document_structure = html.contains("<html") && html.contains("</html>");
    let has_collection_form =
        html.contains("form") && (html.contains("email") || html.contains("waitlist"));
    let has_style_framework = html.contains("tailwind") || html.contains("cdn.tailwindcss.com");

    ValidationVerdict {
        has_document_structure,
        has_collection_form,
        has_style_framework,
    }
}
