// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deployment step.
// ABOUTME: Collects cleanup failures that shouldn't fail the step but should be shown to users.

use std::path::Path;

/// Collects non-fatal warnings.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn directory_not_removed(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::DirectoryNotRemoved,
            message: format!(
                "Could not delete directory '{}' because some files could not be deleted: {}",
                path.display(),
                reason
            ),
        }
    }

    pub fn file_not_removed(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::FileNotRemoved,
            message: format!("Could not delete file '{}': {}", path.display(), reason),
        }
    }

    pub fn rollback_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RollbackFailed,
            message: message.into(),
        }
    }
}

/// Categories of non-fatal warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A purged release directory (or part of it) remains on disk.
    DirectoryNotRemoved,
    /// A package file or stale download could not be deleted.
    FileNotRemoved,
    /// A failure-stage behaviour itself failed.
    RollbackFailed,
}
