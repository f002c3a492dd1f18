use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Generic SHA256 helper — returns a lowercase hex-encoded digest.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generic SHA1 helper — returns a lowercase hex-encoded digest.
///
/// Used for `style_signature`, which only needs collision-resistance within
/// one comparison run, not a cryptographic guarantee.
pub fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_known_vector() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        let digest = sha256_hex("");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha1_hex_is_deterministic() {
        let text = "pStyle:Heading1|numId:null|ilvl:null|indLeft:null|indRight:null|jc:null";
        assert_eq!(sha1_hex(text), sha1_hex(text));
        assert_eq!(sha1_hex(text).len(), 40);
    }

    #[test]
    fn sha1_hex_differs_on_different_input() {
        assert_ne!(sha1_hex("foo"), sha1_hex("bar"));
    }
}
