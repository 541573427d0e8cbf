use std::fmt;

/// Size of a revision content key in bytes (AES-256)
pub const CONTENT_KEY_SIZE: usize = 32;

/// The symmetric key a single revision's bytes are encrypted under.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; CONTENT_KEY_SIZE]);

// keep key material out of logs
impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

impl From<[u8; CONTENT_KEY_SIZE]> for ContentKey {
    fn from(bytes: [u8; CONTENT_KEY_SIZE]) -> Self {
        ContentKey(bytes)
    }
}

impl ContentKey {
    pub fn generate() -> Result<Self, anyhow::Error> {
        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(ContentKey(bytes))
    }

    pub fn bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.0
    }
}
