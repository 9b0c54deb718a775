//! MSB checksums.
//!
//! An MSB is identified in the queue and in the activity log by the SHA-256
//! digest of its science program definition.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of an MSB definition.
pub fn calculate_checksum(definition: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(definition.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_hex() {
        let xml = "<SpMSB><title>Orion</title></SpMSB>";
        let checksum = calculate_checksum(xml);
        assert_eq!(checksum, calculate_checksum(xml));
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            calculate_checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_different_definitions_differ() {
        assert_ne!(calculate_checksum("<SpMSB/>"), calculate_checksum("<SpMSB />"));
    }
}
