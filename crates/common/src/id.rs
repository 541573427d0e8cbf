//! # Identifiers
//!
//! Every object the guard knows about is addressed by an [`ObjectId`]: an
//! opaque 128-bit value tagged with the [`IdKind`] it was allocated for.
//!
//! The textual form is a single kind letter followed by 32 lowercase hex
//! digits, e.g. `d6f1c0b3e2a94d1f8e7c6b5a4938271`:
//!
//! ```text
//! u...  user
//! d...  directory
//! f...  file
//! b...  file blob (a revision)
//! ```
//!
//! Ids are allocated by callers before the object exists (a file id can be
//! referenced by a share before the insert lands), so every boundary call
//! re-validates the kind it expects with [`ObjectId::expect_kind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const HEX_LEN: usize = 32;

/// The role an identifier was allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdKind {
    User,
    Directory,
    File,
    FileBlob,
}

impl IdKind {
    pub fn prefix(&self) -> char {
        match self {
            IdKind::User => 'u',
            IdKind::Directory => 'd',
            IdKind::File => 'f',
            IdKind::FileBlob => 'b',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'u' => Some(IdKind::User),
            'd' => Some(IdKind::Directory),
            'f' => Some(IdKind::File),
            'b' => Some(IdKind::FileBlob),
            _ => None,
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::User => write!(f, "User"),
            IdKind::Directory => write!(f, "Directory"),
            IdKind::File => write!(f, "File"),
            IdKind::FileBlob => write!(f, "FileBlob"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("malformed identifier: {0:?}")]
    Malformed(String),
    #[error("identifier {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: String,
        expected: IdKind,
        actual: IdKind,
    },
}

/// A kind-tagged object identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    kind: IdKind,
    value: Uuid,
}

impl ObjectId {
    /// Allocate a fresh random id of the given kind.
    pub fn new(kind: IdKind) -> Self {
        Self {
            kind,
            value: Uuid::new_v4(),
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// Parse the textual form without constraining the kind.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let mut chars = s.chars();
        let kind = chars
            .next()
            .and_then(IdKind::from_prefix)
            .ok_or_else(|| IdError::Malformed(s.to_string()))?;
        let hex = chars.as_str();
        if hex.len() != HEX_LEN || !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(IdError::Malformed(s.to_string()));
        }
        let value = Uuid::try_parse(hex).map_err(|_| IdError::Malformed(s.to_string()))?;
        Ok(Self { kind, value })
    }

    /// Parse and require a specific kind.
    pub fn parse_kind(s: &str, expected: IdKind) -> Result<Self, IdError> {
        let id = Self::parse(s)?;
        id.expect_kind(expected)?;
        Ok(id)
    }

    /// Reject this id if it was allocated for another role.
    pub fn expect_kind(&self, expected: IdKind) -> Result<(), IdError> {
        if self.kind != expected {
            return Err(IdError::WrongKind {
                id: self.to_string(),
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.value.simple())
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(serde::de::Error::custom)
    }
}
