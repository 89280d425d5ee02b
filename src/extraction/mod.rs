// ABOUTME: Package archive extraction behind a narrow interface.
// ABOUTME: Tar and zip packages are supported; the extractor is chosen by file extension.

mod tar_archive;
mod zip_archive;

pub use tar_archive::TarExtractor;
pub use zip_archive::ZipExtractor;

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("package file not found: {0}")]
    PackageNotFound(PathBuf),

    #[error("unsupported package format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to extract {package}: {source}")]
    Io {
        package: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read zip package {package}: {source}")]
    Zip {
        package: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("extraction task was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub trait PackageExtractor: Send + Sync {
    /// Extensions handled, lower-case, without the dot. Multi-part ones like `tar.gz` allowed.
    fn extensions(&self) -> &[&str];

    /// Extract `package` into `destination`. Returns the number of files written.
    fn extract(&self, package: &Path, destination: &Path) -> Result<usize, ExtractionError>;
}

/// Dispatches to the extractor registered for the package's extension.
pub struct GenericPackageExtractor {
    extractors: Vec<Box<dyn PackageExtractor>>,
}

impl std::fmt::Debug for GenericPackageExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let extensions: Vec<&str> = self
            .extractors
            .iter()
            .flat_map(|e| e.extensions().iter().copied())
            .collect();
        f.debug_struct("GenericPackageExtractor")
            .field("extensions", &extensions)
            .finish()
    }
}

impl Default for GenericPackageExtractor {
    fn default() -> Self {
        Self {
            extractors: vec![Box::new(TarExtractor), Box::new(ZipExtractor)],
        }
    }
}

impl GenericPackageExtractor {
    fn find(&self, package: &Path) -> Option<&dyn PackageExtractor> {
        let name = package.file_name()?.to_string_lossy().to_ascii_lowercase();
        self.extractors
            .iter()
            .find(|e| {
                e.extensions()
                    .iter()
                    .any(|ext| name.ends_with(&format!(".{ext}")))
            })
            .map(|e| e.as_ref())
    }

    pub fn supports(&self, package: &Path) -> bool {
        self.find(package).is_some()
    }
}

impl PackageExtractor for GenericPackageExtractor {
    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn extract(&self, package: &Path, destination: &Path) -> Result<usize, ExtractionError> {
        if !package.is_file() {
            return Err(ExtractionError::PackageNotFound(package.to_path_buf()));
        }
        let extractor = self
            .find(package)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(package.to_path_buf()))?;
        let files = extractor.extract(package, destination)?;
        tracing::info!(
            "Extracted {} files from {} to {}",
            files,
            package.display(),
            destination.display()
        );
        Ok(files)
    }
}

/// Split `Acme.Web.1.2.0.tar` into (`Acme.Web`, `1.2.0`) when no explicit identity is given.
pub fn package_identity_from_file_name(package: &Path) -> Option<(String, String)> {
    let name = package.file_name()?.to_string_lossy().into_owned();
    let stem = ["tar", "zip", "nupkg"]
        .iter()
        .find_map(|ext| name.strip_suffix(&format!(".{ext}")))?;
    let parts: Vec<&str> = stem.split('.').collect();
    let version_start = parts
        .iter()
        .position(|p| p.chars().next().is_some_and(|c| c.is_ascii_digit()))?;
    if version_start == 0 {
        return None;
    }
    Some((
        parts[..version_start].join("."),
        parts[version_start..].join("."),
    ))
}
