//! LandingWise publishing helpers
//!
//! Everything needed to put a generated page in front of visitors and to get
//! the collected emails back out.
//!
//! - [`slugify`] - Public URL slug for a project
//! - [`inject_waitlist_script`] - Wires a page's email form to the waitlist endpoint
//! - [`WaitlistExport`] - JSON and CSV export of waitlist entries
//!
//! # Example
//!
//! ```rust
//! use landingwise_publish::{inject_waitlist_script, slugify};
//!
//! let slug = slugify("My Product!", "0f8fad5b-d9cb-469f-a165-70867728950e");
//! assert_eq!(slug, "my-product--0f8fad5b");
//!
//! let html = inject_waitlist_script("<html><body></body></html>", "0f8fad5b");
//! assert!(html.contains("/api/waitlist"));
//! ```

mod export;
mod inject;
mod slug;

pub use export::{ExportEntry, ExportFormat, WaitlistExport};
pub use inject::{inject_waitlist_script, waitlist_script};
pub use slug::slugify;

use thiserror::Error;

/// Errors that can occur while exporting waitlist entries.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Failed to serialize the export to JSON.
    #[error("failed to serialize export: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to write the export file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown export format name.
    #[error("unsupported export format '{0}' (expected json or csv)")]
    UnsupportedFormat(String),
}

/// Result type for publishing operations.
pub type Result<T> = std::result::Result<T, PublishError>;
