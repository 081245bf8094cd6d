//! Storage client trait definition

use async_trait::async_trait;

use crate::meta::SpaceInfo;
use crate::storage::error::StorageResult;
use crate::value::DataSet;

/// Columns of a neighbor-expansion response
pub const NEIGHBOR_COLUMNS: [&str; 2] = ["_vertex", "_edges"];
/// Columns of a vertex-fetch response
pub const VERTEX_COLUMNS: [&str; 2] = ["_vid", "_vertex"];

/// Which stored edges a neighbor expansion follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    /// Edges stored out of the requested vertex
    #[default]
    Out,
    /// Edges stored into the requested vertex, returned reversed
    In,
    /// Both of the above
    Both,
}

impl EdgeDirection {
    /// The opposite direction; `Both` stays `Both`
    pub fn reversed(self) -> Self {
        match self {
            EdgeDirection::Out => EdgeDirection::In,
            EdgeDirection::In => EdgeDirection::Out,
            EdgeDirection::Both => EdgeDirection::Both,
        }
    }
}

/// Remote storage tier, as seen by the executors
///
/// Requests carry a single-column `_vid` DataSet built by the request
/// builder. Responses are DataSets the iterators know how to walk.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Expand the neighbors of every requested vertex
    ///
    /// Returns [`NEIGHBOR_COLUMNS`]: one row per requested vertex that
    /// exists, even if it has no matching edges. `_edges` is a list of
    /// edges whose `src` is the requested vertex; edges walked against
    /// their stored direction carry a negative type. An empty
    /// `edge_types` slice means every edge type.
    async fn get_neighbors(
        &self,
        space: &SpaceInfo,
        vids: &DataSet,
        edge_types: &[String],
        direction: EdgeDirection,
    ) -> StorageResult<DataSet>;

    /// Fetch vertices with their tags
    ///
    /// Returns [`VERTEX_COLUMNS`], one row per requested vertex that exists.
    async fn get_vertices(&self, space: &SpaceInfo, vids: &DataSet) -> StorageResult<DataSet>;
}
