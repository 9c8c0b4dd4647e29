//! Filesystem boundary used for candidate existence checks and helper output checks.

use camino::Utf8Path;

#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    fn exists(&self, path: &Utf8Path) -> bool;

    /// Size in bytes of a regular file, `None` when missing or not a file.
    fn file_size(&self, path: &Utf8Path) -> Option<u64>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Utf8Path) -> bool {
        path.exists()
    }

    fn file_size(&self, path: &Utf8Path) -> Option<u64> {
        path.metadata()
            .ok()
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
    }
}
