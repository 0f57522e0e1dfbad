use std::{fmt, ops::Deref};

use sha2::{Digest, Sha512};

/// Hex length of a SHA-512 digest, and the width of the `hash` column.
pub const FINGERPRINT_LEN: usize = 128;

/// Cache key for a piece of text: the lowercase hex SHA-512 of its UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Fingerprint {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(text: &str) -> Fingerprint {
    let digest = Sha512::digest(text.as_bytes());
    Fingerprint(hex::encode(digest))
}
