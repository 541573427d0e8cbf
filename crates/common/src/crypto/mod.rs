//! Client-side key handling for shared revisions.
//!
//! The guard never sees a plaintext content key. Clients use this module to
//! produce and consume the opaque access keys it stores:
//!
//! - **Identity**: every user holds an Ed25519 keypair ([`SecretKey`] /
//!   [`PublicKey`]); the public half is registered with the guard.
//! - **Content keys**: every revision is encrypted under its own 256-bit
//!   [`ContentKey`].
//! - **Access keys**: a content key is wrapped once per subject as a
//!   [`WrappedKey`] (ephemeral X25519 ECDH + AES-KW) and stored hex-encoded.
//!
//! Re-sharing works by unwrapping one's own access key and wrapping the
//! recovered content key again for each recipient's public key.

mod content_key;
mod keys;
mod wrapped_key;

pub use content_key::{ContentKey, CONTENT_KEY_SIZE};
pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use wrapped_key::{WrappedKey, WrappedKeyError, WRAPPED_KEY_SIZE};
