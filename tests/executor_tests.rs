//! Plans mixing storage, relational and maintenance operators

mod test_utils;

use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;

use stepgraph::context::QueryContext;
use stepgraph::executor::{ExecStatus, ExecutorError, Scheduler, WorkerPool};
use stepgraph::expr::Expr;
use stepgraph::meta::{IndexField, MemoryMeta, SpaceInfo, TagIndexDef, VidType};
use stepgraph::planner::{FindPath, PathKind, PlanBuilder, PlanKind};
use stepgraph::storage::{EdgeDirection, MemoryStorage, StorageClient, StorageResult};
use stepgraph::value::{DataSet, Edge, Value, PATH_COLUMN, VID_COLUMN};

use test_utils::{int_table, ints, paths_of, TestGraph};

#[tokio::test]
async fn test_neighbors_follow_first_request_order() {
    let graph = TestGraph::unit(&[(1, 2), (2, 3), (3, 1)]);

    let mut b = PlanBuilder::new();
    let start = b.start_with(int_table(VID_COLUMN, &[3, 1, 3, 2]), "vids");
    let gn = b
        .add(
            PlanKind::GetNeighbors {
                src: Expr::col(VID_COLUMN),
                edge_types: vec![],
                direction: EdgeDirection::Out,
                dedup: true,
            },
            &[start],
        )
        .unwrap();
    let result = graph.run_ok(b.build(gn).unwrap()).await;

    let order: Vec<i64> = result
        .data()
        .column("_vertex")
        .unwrap()
        .filter_map(|v| v.as_vertex()?.vid.as_int())
        .collect();
    assert_eq!(order, vec![3, 1, 2]);
    assert_eq!(graph.storage.request_count(), 1);
}

#[tokio::test]
async fn test_fetch_vertices_of_found_paths() {
    let graph = TestGraph::unit(&[(1, 2), (2, 4), (1, 3)]);
    let plan = FindPath::new(ints(&[1]), ints(&[4]), PathKind::BiBfs)
        .plan()
        .unwrap();
    let paths_var = plan.output_var().to_string();
    let paths = graph.run_ok(plan).await;
    assert_eq!(paths_of(&paths), vec![vec![1, 2, 4]]);

    // variables outlive the plan that wrote them
    let mut b = PlanBuilder::new();
    let gv = b
        .add(
            PlanKind::GetVertices {
                src: Expr::col(PATH_COLUMN),
                dedup: true,
                from_paths: true,
            },
            &[],
        )
        .unwrap();
    b.set_input_vars(gv, vec![paths_var]).unwrap();
    let result = graph.run_ok(b.build(gv).unwrap()).await;

    let vids: Vec<Value> = result.data().column(VID_COLUMN).unwrap().cloned().collect();
    assert_eq!(vids, ints(&[1, 2, 4]));
}

#[tokio::test]
async fn test_left_join_multiplicities() {
    let graph = TestGraph::unit(&[]);

    let mut b = PlanBuilder::new();
    let left = b.start_with(int_table("k", &[1, 1, 2, 3]), "left");
    let right = b.start_with(int_table("rk", &[1, 1, 2]), "right");
    let join = b
        .add(
            PlanKind::LeftJoin {
                left_keys: vec![Expr::col("k")],
                right_keys: vec![Expr::col("rk")],
            },
            &[left, right],
        )
        .unwrap();
    let result = graph.run_ok(b.build(join).unwrap()).await;

    // 1 matches twice on both sides, 2 once, 3 survives unmatched
    let data = result.data();
    assert_eq!(data.len(), 6);
    assert_eq!(data.col_names(), ["k", "rk"]);
    let unmatched = data
        .column("rk")
        .unwrap()
        .filter(|v| matches!(v, Value::Null))
        .count();
    assert_eq!(unmatched, 1);
}

#[tokio::test]
async fn test_cartesian_product_plan() {
    let graph = TestGraph::unit(&[]);

    let mut b = PlanBuilder::new();
    let a = b.start_with(int_table("a", &[1, 2]), "a");
    let c = b.start_with(int_table("b", &[10, 20, 30]), "b");
    let product = b.cartesian_product(&[a, c]).unwrap();
    let result = graph.run_ok(b.build(product).unwrap()).await;

    assert_eq!(result.data().len(), 6);
    assert_eq!(result.data().col_names(), ["a", "b"]);
    let first = &result.data().rows()[0];
    assert_eq!(first.values(), [Value::Int(1), Value::Int(10)]);
}

#[tokio::test]
async fn test_storage_failure_fails_query() {
    let graph = TestGraph::unit(&[(1, 2)]);
    graph.storage.set_failure(Some("shard down".to_string()));

    let plan = FindPath::new(ints(&[1]), ints(&[2]), PathKind::BiBfs)
        .plan()
        .unwrap();
    let err = graph.run(plan).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Storage(_)), "got {}", err);
}

#[tokio::test]
async fn test_killed_path_query_is_cancelled() {
    let graph = TestGraph::unit(&[(1, 2), (2, 3)]);
    graph.ctx.kill();

    let plan = FindPath::new(ints(&[1]), ints(&[3]), PathKind::BiDijkstra)
        .plan()
        .unwrap();
    let (status, result) = graph.run(plan).await.unwrap();
    assert_eq!(status, ExecStatus::Cancelled);
    assert!(result.is_none());
}

/// Storage that kills its query once it has served `kill_after` requests
struct KillingStorage {
    inner: MemoryStorage,
    ctx: OnceLock<Weak<QueryContext>>,
    kill_after: u64,
}

#[async_trait]
impl StorageClient for KillingStorage {
    async fn get_neighbors(
        &self,
        space: &SpaceInfo,
        vids: &DataSet,
        edge_types: &[String],
        direction: EdgeDirection,
    ) -> StorageResult<DataSet> {
        let result = self
            .inner
            .get_neighbors(space, vids, edge_types, direction)
            .await;
        if self.inner.request_count() >= self.kill_after {
            if let Some(ctx) = self.ctx.get().and_then(Weak::upgrade) {
                ctx.kill();
            }
        }
        result
    }

    async fn get_vertices(&self, space: &SpaceInfo, vids: &DataSet) -> StorageResult<DataSet> {
        self.inner.get_vertices(space, vids).await
    }
}

#[tokio::test]
async fn test_kill_between_loop_rounds() {
    let meta = MemoryMeta::new();
    let space = meta.create_space("kill", VidType::Int64);
    let inner = MemoryStorage::new();
    inner.create_space(space.id);
    for (src, dst) in [(1, 2), (2, 3), (3, 4), (4, 5)] {
        inner.add_edge(space.id, Edge::new(src, dst, 1, "edge", 0));
    }
    // the first round expands both ends, then the query is killed
    let storage = Arc::new(KillingStorage {
        inner,
        ctx: OnceLock::new(),
        kill_after: 2,
    });
    let ctx = Arc::new(QueryContext::new(
        space,
        storage.clone(),
        Arc::new(meta),
    ));
    let _ = storage.ctx.set(Arc::downgrade(&ctx));

    let plan = FindPath::new(ints(&[1]), ints(&[5]), PathKind::BiBfs)
        .plan()
        .unwrap();
    let scheduler = Scheduler::new(Arc::clone(&ctx), plan);
    assert_eq!(scheduler.schedule().await.unwrap(), ExecStatus::Cancelled);
    assert!(scheduler.result().is_none());
    // no second round was started
    assert_eq!(storage.inner.request_count(), 2);
}

#[tokio::test]
async fn test_tag_index_lifecycle() {
    let graph = TestGraph::unit(&[]);
    let space_id = graph.ctx.space().id;
    graph.meta.create_tag(space_id, "player").unwrap();

    let def = TagIndexDef::new(
        "idx",
        "player",
        vec![IndexField::new("name", "string"), IndexField::new("age", "int64")],
    );
    let mut b = PlanBuilder::new();
    let create = b
        .add(
            PlanKind::CreateTagIndex {
                def: def.clone(),
                if_not_exists: false,
            },
            &[],
        )
        .unwrap();
    let show = b.add(PlanKind::ShowTagIndexes, &[create]).unwrap();
    let result = graph.run_ok(b.build(show).unwrap()).await;
    let names: Vec<&Value> = result.data().column("Names").unwrap().collect();
    assert_eq!(names, vec![&Value::from("idx")]);

    let mut b = PlanBuilder::new();
    let desc = b
        .add(
            PlanKind::DescTagIndex {
                name: "idx".to_string(),
            },
            &[],
        )
        .unwrap();
    let result = graph.run_ok(b.build(desc).unwrap()).await;
    assert_eq!(result.data().len(), 2);

    // creating it again is an error unless asked not to be
    let mut b = PlanBuilder::new();
    let again = b
        .add(
            PlanKind::CreateTagIndex {
                def: def.clone(),
                if_not_exists: false,
            },
            &[],
        )
        .unwrap();
    let err = graph.run(b.build(again).unwrap()).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Meta(_)));

    let mut b = PlanBuilder::new();
    let again = b
        .add(
            PlanKind::CreateTagIndex {
                def,
                if_not_exists: true,
            },
            &[],
        )
        .unwrap();
    let (status, _) = graph.run(b.build(again).unwrap()).await.unwrap();
    assert_eq!(status, ExecStatus::Succeeded);
}

#[tokio::test]
async fn test_queries_share_one_worker() {
    let pool = WorkerPool::new(1);
    let first = TestGraph::unit(&[(1, 2), (2, 3)]);
    let second = TestGraph::unit(&[(1, 2), (2, 3)]);

    let plan = || {
        FindPath::new(ints(&[1]), ints(&[3]), PathKind::BiBfs)
            .plan()
            .unwrap()
    };
    let a = Scheduler::with_pool(Arc::clone(&first.ctx), plan(), pool.clone());
    let b = Scheduler::with_pool(Arc::clone(&second.ctx), plan(), pool.clone());

    let (ra, rb) = tokio::join!(a.schedule(), b.schedule());
    assert_eq!(ra.unwrap(), ExecStatus::Succeeded);
    assert_eq!(rb.unwrap(), ExecStatus::Succeeded);
    assert_eq!(paths_of(&a.result().unwrap()), vec![vec![1, 2, 3]]);
    assert_eq!(paths_of(&b.result().unwrap()), vec![vec![1, 2, 3]]);
    assert_eq!(pool.available(), 1);
}
