//! Metadata client trait and the schema types it returns

use std::fmt;

use async_trait::async_trait;

use crate::value::Value;

use super::error::MetaResult;

/// How vertex identifiers are represented in a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VidType {
    #[default]
    Int64,
    String,
}

impl VidType {
    /// Whether `value` is a valid identifier for this vid type
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (VidType::Int64, Value::Int(_)) | (VidType::String, Value::String(_))
        )
    }
}

impl fmt::Display for VidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VidType::Int64 => write!(f, "INT64"),
            VidType::String => write!(f, "FIXED_STRING"),
        }
    }
}

/// A graph space as described by the metadata tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
    pub id: i32,
    pub name: String,
    pub vid_type: VidType,
}

impl SpaceInfo {
    pub fn new(id: i32, name: impl Into<String>, vid_type: VidType) -> Self {
        SpaceInfo {
            id,
            name: name.into(),
            vid_type,
        }
    }
}

/// One indexed property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexField {
    pub name: String,
    pub type_name: String,
}

impl IndexField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        IndexField {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Tag index definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagIndexDef {
    /// Index name
    pub name: String,
    /// Tag this index belongs to
    pub tag: String,
    /// Indexed properties, in index order
    pub fields: Vec<IndexField>,
}

impl TagIndexDef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>, fields: Vec<IndexField>) -> Self {
        TagIndexDef {
            name: name.into(),
            tag: tag.into(),
            fields,
        }
    }
}

/// Build state of one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    pub name: String,
    pub status: String,
}

/// Remote metadata tier, as seen by the executors
#[async_trait]
pub trait MetaClient: Send + Sync {
    /// Resolve a space by name
    async fn get_space(&self, name: &str) -> MetaResult<SpaceInfo>;

    /// Create a tag index; with `if_not_exists` an existing index is not an error
    async fn create_tag_index(
        &self,
        space_id: i32,
        def: TagIndexDef,
        if_not_exists: bool,
    ) -> MetaResult<()>;

    /// Drop a tag index; with `if_exists` a missing index is not an error
    async fn drop_tag_index(&self, space_id: i32, name: &str, if_exists: bool) -> MetaResult<()>;

    async fn get_tag_index(&self, space_id: i32, name: &str) -> MetaResult<TagIndexDef>;

    async fn list_tag_indexes(&self, space_id: i32) -> MetaResult<Vec<TagIndexDef>>;

    async fn list_tag_index_status(&self, space_id: i32) -> MetaResult<Vec<IndexStatus>>;
}
