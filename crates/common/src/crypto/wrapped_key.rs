//! ECDH + AES Key Wrap (RFC 3394) of a content key for one recipient.
//!
//! Wrapping generates an ephemeral keypair, derives a shared secret with the
//! recipient's public key over X25519, and wraps the content key with that
//! secret. Only the holder of the recipient's private key can unwrap it.
//!
//! ```text
//! [ ephemeral_pubkey: 32 bytes ][ wrapped_content_key: 40 bytes ]
//! ```
//!
//! The guard stores the lowercase hex of these 72 bytes as an access key.

use aes_kw::KekAes256 as Kek;

use super::content_key::{ContentKey, CONTENT_KEY_SIZE};
use super::keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};

/// AES-KW adds one 8-byte integrity block to the wrapped key
pub const KW_BLOCK_SIZE: usize = 8;
pub const WRAPPED_KEY_SIZE: usize = PUBLIC_KEY_SIZE + CONTENT_KEY_SIZE + KW_BLOCK_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum WrappedKeyError {
    #[error("wrapped key error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct WrappedKey([u8; WRAPPED_KEY_SIZE]);

impl From<[u8; WRAPPED_KEY_SIZE]> for WrappedKey {
    fn from(bytes: [u8; WRAPPED_KEY_SIZE]) -> Self {
        WrappedKey(bytes)
    }
}

impl WrappedKey {
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, WrappedKeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; WRAPPED_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("wrapped key hex decode error"))?;
        Ok(WrappedKey(buff))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Wrap `key` so that only `recipient` can recover it.
    pub fn new(key: &ContentKey, recipient: &PublicKey) -> Result<Self, WrappedKeyError> {
        let ephemeral_private = SecretKey::generate()?;
        let ephemeral_public = ephemeral_private.public();

        let shared_secret = ephemeral_private
            .to_x25519()
            .diffie_hellman(&recipient.to_x25519()?);

        let kek = Kek::from(*shared_secret.as_bytes());
        let wrapped = kek
            .wrap_vec(key.bytes())
            .map_err(|_| anyhow::anyhow!("AES-KW wrap error"))?;

        if wrapped.len() != WRAPPED_KEY_SIZE - PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!("unexpected wrapped key size {}", wrapped.len()).into());
        }

        let mut out = [0u8; WRAPPED_KEY_SIZE];
        out[..PUBLIC_KEY_SIZE].copy_from_slice(&ephemeral_public.to_bytes());
        out[PUBLIC_KEY_SIZE..].copy_from_slice(&wrapped);
        Ok(WrappedKey(out))
    }

    /// Unwrap with the recipient's private key.
    ///
    /// Fails if the key was wrapped for someone else or the bytes were
    /// tampered with.
    pub fn recover(&self, recipient_secret: &SecretKey) -> Result<ContentKey, WrappedKeyError> {
        let ephemeral_public = PublicKey::try_from(&self.0[..PUBLIC_KEY_SIZE])?;

        let shared_secret = recipient_secret
            .to_x25519()
            .diffie_hellman(&ephemeral_public.to_x25519()?);

        let kek = Kek::from(*shared_secret.as_bytes());
        let unwrapped = kek
            .unwrap_vec(&self.0[PUBLIC_KEY_SIZE..])
            .map_err(|_| anyhow::anyhow!("AES-KW unwrap error"))?;

        let bytes: [u8; CONTENT_KEY_SIZE] = unwrapped
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("unwrapped content key has wrong size"))?;
        Ok(ContentKey::from(bytes))
    }
}
