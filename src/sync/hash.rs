//! Content hashing for sync sources.
//!
//! Articles carry a 32-character `file_hash`: the first half of the SHA256
//! hex digest of the file's body. The server stores it as reported; only
//! local sources such as the directory scanner compute it.

use sha2::{Digest, Sha256};

use crate::model::FILE_HASH_LEN;

/// Hash article content into a `file_hash`.
#[must_use]
pub fn file_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FILE_HASH_LEN);
    hex
}

/// Check if content differs from what a stored hash describes.
///
/// A missing stored hash always counts as changed.
#[must_use]
pub fn has_changed(content: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_none_or(|h| h != file_hash(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_hash_shape() {
        let hash = file_hash("# Hello\n");
        assert_eq!(hash.len(), FILE_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, file_hash("# Hello\n"));
    }

    #[test]
    fn test_file_hash_known_value() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb924...
        assert_eq!(file_hash(""), "e3b0c44298fc1c149afbf4c8996fb924");
    }

    #[test]
    fn test_has_changed() {
        let hash = file_hash("body");
        assert!(!has_changed("body", Some(&hash)));
        assert!(has_changed("edited", Some(&hash)));
        assert!(has_changed("body", None));
    }
}
