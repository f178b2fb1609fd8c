use std::path::Path;

/// Returns `true` when a filesystem entry exists at `file_path`.
///
/// A missing path, or one that cannot be inspected, yields `false`.
pub fn validation(file_path: impl AsRef<Path>) -> bool {
    file_path.as_ref().exists()
}
