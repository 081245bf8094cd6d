//! In-memory storage client
//!
//! Holds whole graphs in process memory, keyed by space id. Used by the
//! command-line tool and by tests; it implements the same request/response
//! shapes a remote storage tier would.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::meta::SpaceInfo;
use crate::value::{DataSet, Edge, Row, Value, Vertex, VID_COLUMN};

use super::error::{StorageError, StorageResult};
use super::traits::{EdgeDirection, StorageClient, NEIGHBOR_COLUMNS, VERTEX_COLUMNS};

#[derive(Default)]
struct SpaceData {
    vertices: BTreeMap<Value, Vertex>,
    out_edges: HashMap<Value, Vec<Edge>>,
    in_edges: HashMap<Value, Vec<Edge>>,
}

/// Storage client backed by process memory
#[derive(Default)]
pub struct MemoryStorage {
    spaces: RwLock<HashMap<i32, SpaceData>>,
    failure: RwLock<Option<String>>,
    requests: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty space
    pub fn create_space(&self, space_id: i32) {
        self.spaces.write().entry(space_id).or_default();
    }

    /// Insert or replace a vertex
    pub fn add_vertex(&self, space_id: i32, vertex: Vertex) {
        let mut spaces = self.spaces.write();
        let space = spaces.entry(space_id).or_default();
        space.vertices.insert(vertex.vid.clone(), vertex);
    }

    /// Insert an edge; missing endpoints are created as bare vertices
    pub fn add_edge(&self, space_id: i32, edge: Edge) {
        let edge = edge.canonical();
        let mut spaces = self.spaces.write();
        let space = spaces.entry(space_id).or_default();
        for vid in [&edge.src, &edge.dst] {
            space
                .vertices
                .entry(vid.clone())
                .or_insert_with(|| Vertex::new(vid.clone()));
        }
        space
            .in_edges
            .entry(edge.dst.clone())
            .or_default()
            .push(edge.clone());
        space.out_edges.entry(edge.src.clone()).or_default().push(edge);
    }

    /// Make every subsequent request fail with `message`; `None` clears it
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.write() = message;
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn begin_request(&self) -> StorageResult<()> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match self.failure.read().as_ref() {
            Some(msg) => Err(StorageError::Rpc(msg.clone())),
            None => Ok(()),
        }
    }

    fn requested_vids<'a>(
        space: &SpaceInfo,
        vids: &'a DataSet,
    ) -> StorageResult<impl Iterator<Item = &'a Value>> {
        let col = vids.column(VID_COLUMN).ok_or_else(|| {
            StorageError::InvalidRequest(format!("request has no {} column", VID_COLUMN))
        })?;
        let vids: Vec<&Value> = col.collect();
        if let Some(bad) = vids.iter().find(|v| !space.vid_type.matches(v)) {
            return Err(StorageError::InvalidVid {
                space: space.id,
                vid: bad.to_string(),
            });
        }
        Ok(vids.into_iter())
    }
}

fn type_selected(edge: &Edge, edge_types: &[String]) -> bool {
    edge_types.is_empty() || edge_types.iter().any(|t| *t == edge.name)
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn get_neighbors(
        &self,
        space: &SpaceInfo,
        vids: &DataSet,
        edge_types: &[String],
        direction: EdgeDirection,
    ) -> StorageResult<DataSet> {
        self.begin_request()?;
        let requested = Self::requested_vids(space, vids)?;

        let spaces = self.spaces.read();
        let data = spaces
            .get(&space.id)
            .ok_or(StorageError::SpaceNotFound(space.id))?;

        let mut result = DataSet::with_capacity(NEIGHBOR_COLUMNS, vids.len());
        for vid in requested {
            let Some(vertex) = data.vertices.get(vid) else {
                continue;
            };
            let mut edges = Vec::new();
            if matches!(direction, EdgeDirection::Out | EdgeDirection::Both) {
                if let Some(out) = data.out_edges.get(vid) {
                    edges.extend(
                        out.iter()
                            .filter(|e| type_selected(e, edge_types))
                            .map(|e| Value::from(e.clone())),
                    );
                }
            }
            if matches!(direction, EdgeDirection::In | EdgeDirection::Both) {
                if let Some(inc) = data.in_edges.get(vid) {
                    edges.extend(
                        inc.iter()
                            .filter(|e| type_selected(e, edge_types))
                            .map(|e| Value::from(e.reversed())),
                    );
                }
            }
            result
                .push(Row::new(vec![Value::from(vertex.clone()), Value::List(edges)]))
                .map_err(|e| StorageError::Rpc(e.to_string()))?;
        }

        debug!(
            space = space.id,
            requested = vids.len(),
            returned = result.len(),
            "get_neighbors served"
        );
        Ok(result)
    }

    async fn get_vertices(&self, space: &SpaceInfo, vids: &DataSet) -> StorageResult<DataSet> {
        self.begin_request()?;
        let requested = Self::requested_vids(space, vids)?;

        let spaces = self.spaces.read();
        let data = spaces
            .get(&space.id)
            .ok_or(StorageError::SpaceNotFound(space.id))?;

        let mut result = DataSet::with_capacity(VERTEX_COLUMNS, vids.len());
        for vid in requested {
            if let Some(vertex) = data.vertices.get(vid) {
                result
                    .push(Row::new(vec![vid.clone(), Value::from(vertex.clone())]))
                    .map_err(|e| StorageError::Rpc(e.to_string()))?;
            }
        }
        Ok(result)
    }
}
