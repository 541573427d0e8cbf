//! Read views handed back by the guard.
//!
//! Each view is a plain record; richer views embed smaller ones instead of
//! extending them. ACLs in a view have already been passed through
//! [`crate::permission::visible_entries`], and revisions only ever carry the
//! requester's own access key.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::ObjectId;
use crate::permission::{Permission, PermissionEntry};

/// File type as detected by the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionType {
    #[default]
    Unknown,
    Pdf,
    Txt,
    Doc,
    Docx,
    Odt,
    Png,
    Jpg,
    Tiff,
}

impl ExtensionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionType::Unknown => "unknown",
            ExtensionType::Pdf => "pdf",
            ExtensionType::Txt => "txt",
            ExtensionType::Doc => "doc",
            ExtensionType::Docx => "docx",
            ExtensionType::Odt => "odt",
            ExtensionType::Png => "png",
            ExtensionType::Jpg => "jpg",
            ExtensionType::Tiff => "tiff",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pdf" => ExtensionType::Pdf,
            "txt" => ExtensionType::Txt,
            "doc" => ExtensionType::Doc,
            "docx" => ExtensionType::Docx,
            "odt" => ExtensionType::Odt,
            "png" => ExtensionType::Png,
            "jpg" | "jpeg" => ExtensionType::Jpg,
            "tif" | "tiff" => ExtensionType::Tiff,
            _ => ExtensionType::Unknown,
        }
    }
}

/// Language the document text is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentLanguage {
    #[default]
    Unknown,
    English,
    German,
    French,
    Spanish,
}

impl DocumentLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentLanguage::Unknown => "unknown",
            DocumentLanguage::English => "english",
            DocumentLanguage::German => "german",
            DocumentLanguage::French => "french",
            DocumentLanguage::Spanish => "spanish",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "english" => DocumentLanguage::English,
            "german" => DocumentLanguage::German,
            "french" => DocumentLanguage::French,
            "spanish" => DocumentLanguage::Spanish,
            _ => DocumentLanguage::Unknown,
        }
    }
}

/// Who produced a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    User,
    Ocr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub value: String,
    pub relevance: f32,
    pub source: TagSource,
}

/// A wrapped copy of a revision's content key for one subject.
///
/// `encrypted_key` is opaque to the guard; see [`crate::crypto::WrappedKey`]
/// for the format clients produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessKey {
    pub user: ObjectId,
    pub issuer: ObjectId,
    pub encrypted_key: String,
}

/// One immutable version of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRevision {
    pub id: ObjectId,
    pub quick_number: u32,
    pub size_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub changed_at: OffsetDateTime,
    /// The requester's own key, if one was issued to them.
    pub access_key: Option<AccessKey>,
}

/// Name, id and visible ACL shared by every object view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub id: ObjectId,
    pub name: String,
    pub permissions: Vec<PermissionEntry>,
}

/// A child directory as listed in its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorySummary {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub child_count: u32,
}

/// A child file as listed in its parent, with the revision selected for
/// the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub quick_number: u32,
    pub extension: ExtensionType,
    pub language: DocumentLanguage,
    pub revision: FileRevision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub owner: ObjectId,
    pub parent_id: ObjectId,
    pub quick_number: u32,
    pub extension: ExtensionType,
    pub language: DocumentLanguage,
    pub thumbnail_id: Option<String>,
    pub tags: Vec<Tag>,
    /// Oldest first.
    pub revisions: Vec<FileRevision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryMetadata {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub owner: ObjectId,
    pub is_root: bool,
    /// Ancestor ids from the owner's root down to this directory.
    pub path: Vec<ObjectId>,
    pub directories: Vec<DirectorySummary>,
    pub files: Vec<FileSummary>,
}

/// The flags `object_id` grants the subject a permission query asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub object_id: ObjectId,
    pub permission: Permission,
}

/// Account details visible to the account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInformation {
    pub id: ObjectId,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub public_key: String,
    pub encrypted_private_key: String,
    pub root_directory_id: ObjectId,
    pub quick_number: u32,
}

/// What a login needs to verify a password and unlock the private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub id: ObjectId,
    pub password_hash: String,
    pub salt: String,
    pub public_key: String,
    pub encrypted_private_key: String,
}
