// ABOUTME: Extracts zip and nupkg packages.

use std::fs::File;
use std::io;
use std::path::Path;

use super::{ExtractionError, PackageExtractor};

#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl PackageExtractor for ZipExtractor {
    fn extensions(&self) -> &[&str] {
        &["zip", "nupkg"]
    }

    fn extract(&self, package: &Path, destination: &Path) -> Result<usize, ExtractionError> {
        let io_err = |source| ExtractionError::Io {
            package: package.to_path_buf(),
            source,
        };
        let zip_err = |source| ExtractionError::Zip {
            package: package.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(destination).map_err(io_err)?;
        let file = File::open(package).map_err(io_err)?;
        let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;

        let mut files = 0;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(zip_err)?;
            // Skip entries with unsafe paths
            let Some(relative) = file.enclosed_name() else {
                continue;
            };
            let outpath = destination.join(relative);

            if file.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(io_err)?;
                continue;
            }
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            let mut outfile = File::create(&outpath).map_err(io_err)?;
            io::copy(&mut file, &mut outfile).map_err(io_err)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
                }
            }
            files += 1;
        }
        Ok(files)
    }
}
