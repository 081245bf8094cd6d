//! Path and subgraph queries, planned and scheduled end to end

mod test_utils;

use stepgraph::planner::{FindPath, GetSubgraph, PathKind};
use stepgraph::storage::EdgeDirection;
use stepgraph::value::Value;

use test_utils::{ints, paths_of, TestGraph};

fn find(from: &[i64], to: &[i64], kind: PathKind, steps: usize) -> FindPath {
    FindPath::new(ints(from), ints(to), kind).with_steps(steps)
}

/// 1 -> 2 -> 5 -> 6 is the only three-hop route; 1 -> 3 -> 4 -> 5 -> 6 takes four
fn diamond() -> TestGraph {
    TestGraph::unit(&[(1, 2), (1, 3), (2, 4), (3, 4), (4, 5), (2, 5), (5, 6)])
}

#[tokio::test]
async fn test_bfs_and_dijkstra_agree_on_unit_weights() {
    let graph = diamond();
    let bfs = graph
        .run_ok(find(&[1], &[6], PathKind::BiBfs, 5).plan().unwrap())
        .await;
    let graph = diamond();
    let dijkstra = graph
        .run_ok(find(&[1], &[6], PathKind::BiDijkstra, 5).plan().unwrap())
        .await;

    assert_eq!(paths_of(&bfs), vec![vec![1, 2, 5, 6]]);
    assert_eq!(paths_of(&bfs), paths_of(&dijkstra));
}

#[tokio::test]
async fn test_bfs_returns_every_shortest_path() {
    let graph = TestGraph::unit(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
    let result = graph
        .run_ok(find(&[1], &[4], PathKind::BiBfs, 5).plan().unwrap())
        .await;
    assert_eq!(paths_of(&result), vec![vec![1, 2, 4], vec![1, 3, 4]]);
}

#[tokio::test]
async fn test_dijkstra_takes_cheaper_detour() {
    let graph = TestGraph::new(&[(1, 2, Some(1.0)), (2, 3, Some(1.0)), (1, 3, Some(5.0))]);
    let result = graph
        .run_ok(find(&[1], &[3], PathKind::BiDijkstra, 5).plan().unwrap())
        .await;
    assert_eq!(paths_of(&result), vec![vec![1, 2, 3]]);
}

#[tokio::test]
async fn test_floyd_answers_each_pair() {
    let graph = TestGraph::unit(&[(1, 2), (2, 3), (4, 3)]);
    let floyd = graph
        .run_ok(find(&[1, 4], &[3], PathKind::Floyd, 5).plan().unwrap())
        .await;
    assert_eq!(paths_of(&floyd), vec![vec![1, 2, 3], vec![4, 3]]);

    // globally shortest only
    let graph = TestGraph::unit(&[(1, 2), (2, 3), (4, 3)]);
    let dijkstra = graph
        .run_ok(find(&[1, 4], &[3], PathKind::BiDijkstra, 5).plan().unwrap())
        .await;
    assert_eq!(paths_of(&dijkstra), vec![vec![4, 3]]);
}

#[tokio::test]
async fn test_all_paths_within_bound() {
    let graph = TestGraph::unit(&[(1, 2), (2, 3), (1, 3)]);
    let result = graph
        .run_ok(find(&[1], &[3], PathKind::AllPaths, 2).plan().unwrap())
        .await;
    assert_eq!(paths_of(&result), vec![vec![1, 2, 3], vec![1, 3]]);
}

#[tokio::test]
async fn test_no_loop() {
    let edges = [(1, 2), (2, 1), (2, 3)];

    let graph = TestGraph::unit(&edges);
    let plan = find(&[1], &[3], PathKind::AllPaths, 4)
        .with_no_loop(true)
        .plan()
        .unwrap();
    let result = graph.run_ok(plan).await;
    let paths = paths_of(&result);
    assert_eq!(paths, vec![vec![1, 2, 3]]);
    for path in &paths {
        let mut vids = path.clone();
        vids.sort();
        vids.dedup();
        assert_eq!(vids.len(), path.len());
    }

    // without the filter the cycle may be walked
    let graph = TestGraph::unit(&edges);
    let result = graph
        .run_ok(find(&[1], &[3], PathKind::AllPaths, 4).plan().unwrap())
        .await;
    assert_eq!(paths_of(&result), vec![vec![1, 2, 1, 2, 3], vec![1, 2, 3]]);
}

#[tokio::test]
async fn test_unreachable_target() {
    for kind in [
        PathKind::BiBfs,
        PathKind::BiDijkstra,
        PathKind::Floyd,
        PathKind::AllPaths,
    ] {
        let graph = TestGraph::unit(&[(1, 2), (3, 4)]);
        let result = graph
            .run_ok(find(&[1], &[4], kind, 4).plan().unwrap())
            .await;
        assert!(paths_of(&result).is_empty(), "{} found a path", kind);
    }
}

#[tokio::test]
async fn test_subgraph_one_step() {
    let graph = TestGraph::unit(&[(1, 2), (2, 3), (3, 1), (1, 4)]);
    let plan = GetSubgraph::new(ints(&[1]), 1)
        .with_direction(EdgeDirection::Both)
        .plan()
        .unwrap();
    let result = graph.run_ok(plan).await;

    let row = &result.data().rows()[0];
    let mut vertices: Vec<i64> = row.values()[0]
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_vertex()?.vid.as_int())
        .collect();
    vertices.sort();
    assert_eq!(vertices, vec![1, 2, 3, 4]);
    // 2 -> 3 only shows up in the boundary round
    assert_eq!(row.values()[1].as_list().unwrap().len(), 4);

    let boundary = graph.ctx.vars().latest("__subgraph_boundary").unwrap();
    assert_eq!(boundary.data().len(), 5);
    assert_eq!(
        graph.ctx.vars().latest("__subgraph_last_step").unwrap().scalar_value(),
        Some(&Value::Bool(true))
    );
}

#[tokio::test]
async fn test_subgraph_boundary_edge_without_far_vertex() {
    let graph = TestGraph::unit(&[(1, 2), (2, 3)]);
    let plan = GetSubgraph::new(ints(&[1]), 1)
        .with_direction(EdgeDirection::Out)
        .plan()
        .unwrap();
    let result = graph.run_ok(plan).await;

    let row = &result.data().rows()[0];
    let mut vertices: Vec<i64> = row.values()[0]
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_vertex()?.vid.as_int())
        .collect();
    vertices.sort();
    assert_eq!(vertices, vec![1, 2]);

    let mut edges: Vec<(i64, i64)> = row.values()[1]
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|v| {
            let e = v.as_edge()?;
            Some((e.src.as_int()?, e.dst.as_int()?))
        })
        .collect();
    edges.sort();
    assert_eq!(edges, vec![(1, 2), (2, 3)]);
}
