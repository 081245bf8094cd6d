//! In-memory metadata client

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::client::{IndexStatus, MetaClient, SpaceInfo, TagIndexDef, VidType};
use super::error::{MetaError, MetaResult};

#[derive(Default)]
struct SpaceSchema {
    tags: HashSet<String>,
    /// Creation order is the listing order
    indexes: Vec<TagIndexDef>,
}

#[derive(Default)]
struct State {
    spaces: HashMap<String, SpaceInfo>,
    schemas: HashMap<i32, SpaceSchema>,
    next_space_id: i32,
}

/// Metadata client backed by process memory
#[derive(Default)]
pub struct MemoryMeta {
    state: RwLock<State>,
}

impl MemoryMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a space, returning its descriptor (existing spaces are returned as-is)
    pub fn create_space(&self, name: &str, vid_type: VidType) -> SpaceInfo {
        let mut state = self.state.write();
        if let Some(space) = state.spaces.get(name) {
            return space.clone();
        }
        state.next_space_id += 1;
        let space = SpaceInfo::new(state.next_space_id, name, vid_type);
        state.spaces.insert(name.to_string(), space.clone());
        state.schemas.insert(space.id, SpaceSchema::default());
        space
    }

    /// Declare a tag in a space
    pub fn create_tag(&self, space_id: i32, tag: &str) -> MetaResult<()> {
        let mut state = self.state.write();
        let schema = state
            .schemas
            .get_mut(&space_id)
            .ok_or_else(|| MetaError::SpaceNotFound(space_id.to_string()))?;
        schema.tags.insert(tag.to_string());
        Ok(())
    }
}

fn schema(state: &State, space_id: i32) -> MetaResult<&SpaceSchema> {
    state
        .schemas
        .get(&space_id)
        .ok_or_else(|| MetaError::SpaceNotFound(space_id.to_string()))
}

#[async_trait]
impl MetaClient for MemoryMeta {
    async fn get_space(&self, name: &str) -> MetaResult<SpaceInfo> {
        self.state
            .read()
            .spaces
            .get(name)
            .cloned()
            .ok_or_else(|| MetaError::SpaceNotFound(name.to_string()))
    }

    async fn create_tag_index(
        &self,
        space_id: i32,
        def: TagIndexDef,
        if_not_exists: bool,
    ) -> MetaResult<()> {
        let mut state = self.state.write();
        let schema = state
            .schemas
            .get_mut(&space_id)
            .ok_or_else(|| MetaError::SpaceNotFound(space_id.to_string()))?;

        if !schema.tags.contains(&def.tag) {
            return Err(MetaError::TagNotFound(def.tag));
        }
        if schema.indexes.iter().any(|idx| idx.name == def.name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(MetaError::IndexExists(def.name));
        }
        schema.indexes.push(def);
        Ok(())
    }

    async fn drop_tag_index(&self, space_id: i32, name: &str, if_exists: bool) -> MetaResult<()> {
        let mut state = self.state.write();
        let schema = state
            .schemas
            .get_mut(&space_id)
            .ok_or_else(|| MetaError::SpaceNotFound(space_id.to_string()))?;

        let before = schema.indexes.len();
        schema.indexes.retain(|idx| idx.name != name);
        if schema.indexes.len() == before && !if_exists {
            return Err(MetaError::IndexNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn get_tag_index(&self, space_id: i32, name: &str) -> MetaResult<TagIndexDef> {
        let state = self.state.read();
        schema(&state, space_id)?
            .indexes
            .iter()
            .find(|idx| idx.name == name)
            .cloned()
            .ok_or_else(|| MetaError::IndexNotFound(name.to_string()))
    }

    async fn list_tag_indexes(&self, space_id: i32) -> MetaResult<Vec<TagIndexDef>> {
        let state = self.state.read();
        Ok(schema(&state, space_id)?.indexes.clone())
    }

    async fn list_tag_index_status(&self, space_id: i32) -> MetaResult<Vec<IndexStatus>> {
        let state = self.state.read();
        Ok(schema(&state, space_id)?
            .indexes
            .iter()
            .map(|idx| IndexStatus {
                name: idx.name.clone(),
                status: "FINISHED".to_string(),
            })
            .collect())
    }
}
