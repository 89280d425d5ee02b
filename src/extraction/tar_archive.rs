// ABOUTME: Extracts uncompressed tar packages.

use std::fs::File;
use std::path::Path;

use super::{ExtractionError, PackageExtractor};

#[derive(Debug, Default, Clone, Copy)]
pub struct TarExtractor;

impl PackageExtractor for TarExtractor {
    fn extensions(&self) -> &[&str] {
        &["tar"]
    }

    fn extract(&self, package: &Path, destination: &Path) -> Result<usize, ExtractionError> {
        let io_err = |source| ExtractionError::Io {
            package: package.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(destination).map_err(io_err)?;
        let mut archive = tar::Archive::new(File::open(package).map_err(io_err)?);
        archive.set_preserve_permissions(true);

        let mut files = 0;
        for entry in archive.entries().map_err(io_err)? {
            let mut entry = entry.map_err(io_err)?;
            let is_file = entry.header().entry_type().is_file();
            // unpack_in refuses paths escaping the destination
            if entry.unpack_in(destination).map_err(io_err)? && is_file {
                files += 1;
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tar(path: &Path, files: &[(&str, &str)]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, contents.as_bytes()).unwrap();
        }
        builder.finish().unwrap();
    }

    #[test]
    fn extracts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("Acme.1.0.0.tar");
        write_tar(&package, &[("web.config", "<x/>"), ("bin/app.sh", "echo hi")]);

        let dest = dir.path().join("out");
        let count = TarExtractor.extract(&package, &dest).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read_to_string(dest.join("bin/app.sh")).unwrap(),
            "echo hi"
        );
    }
}
