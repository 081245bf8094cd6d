//! stepgraph command-line tool
//!
//! Loads an edge list into in-memory storage and runs a path or subgraph
//! query over it.
//!
//! Usage: stepgraph --edges graph.csv --from 1 --to 4 [--algo dijkstra]
//!
//! Exit codes:
//!   0 - Success
//!   2 - Bad arguments or unreadable edge list
//!   3 - Query failed

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use stepgraph::context::QueryContext;
use stepgraph::executor::config::DEFAULT_MAX_CONCURRENT_TASKS;
use stepgraph::executor::{ExecStatus, ExecutorConfig, Scheduler};
use stepgraph::meta::{MemoryMeta, VidType};
use stepgraph::planner::{ExecutionPlan, ExplainOutput, FindPath, GetSubgraph, PathKind};
use stepgraph::storage::MemoryStorage;
use stepgraph::value::{Edge, Value};

/// Edge type every loaded edge gets
const EDGE_TYPE: i32 = 1;
const EDGE_NAME: &str = "edge";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algo {
    /// Unweighted shortest paths (bidirectional BFS)
    Bfs,
    /// Weighted shortest paths over all source/target pairs
    Dijkstra,
    /// Weighted shortest paths per source/target pair
    Floyd,
    /// Every path up to the step bound
    All,
    /// The subgraph around the sources
    Subgraph,
}

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run graph path queries over an edge list")]
struct Cli {
    /// Edge list file: one `src,dst[,weight]` per line, `#` starts a comment
    #[arg(long, env = "STEPGRAPH_EDGES")]
    edges: PathBuf,

    /// Source vertex ids
    #[arg(long, value_delimiter = ',', required = true)]
    from: Vec<i64>,

    /// Target vertex ids (ignored by `subgraph`)
    #[arg(long, value_delimiter = ',')]
    to: Vec<i64>,

    #[arg(long, value_enum, default_value_t = Algo::Bfs)]
    algo: Algo,

    /// Maximum path length in hops (subgraph depth for `subgraph`)
    #[arg(long, default_value_t = 5)]
    steps: usize,

    /// Reject paths that visit a vertex twice
    #[arg(long)]
    no_loop: bool,

    /// Operator tasks allowed to run at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_TASKS, env = "STEPGRAPH_WORKERS")]
    workers: usize,

    /// Print the plan before running it
    #[arg(long)]
    explain: bool,
}

fn parse_edges(text: &str) -> Result<Vec<Edge>, String> {
    let mut edges = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let bad = |what: &str| format!("line {}: {}: `{}'", lineno + 1, what, line);
        if fields.len() < 2 || fields.len() > 3 {
            return Err(bad("expected src,dst[,weight]"));
        }
        let src: i64 = fields[0].parse().map_err(|_| bad("bad source id"))?;
        let dst: i64 = fields[1].parse().map_err(|_| bad("bad destination id"))?;
        let mut edge = Edge::new(src, dst, EDGE_TYPE, EDGE_NAME, 0);
        if let Some(weight) = fields.get(2) {
            let weight: f64 = weight.parse().map_err(|_| bad("bad weight"))?;
            edge = edge.prop("weight", weight);
        }
        edges.push(edge);
    }
    Ok(edges)
}

fn build_plan(cli: &Cli) -> Result<ExecutionPlan, String> {
    let from: Vec<Value> = cli.from.iter().copied().map(Value::from).collect();
    let to: Vec<Value> = cli.to.iter().copied().map(Value::from).collect();
    let kind = match cli.algo {
        Algo::Bfs => PathKind::BiBfs,
        Algo::Dijkstra => PathKind::BiDijkstra,
        Algo::Floyd => PathKind::Floyd,
        Algo::All => PathKind::AllPaths,
        Algo::Subgraph => {
            return GetSubgraph::new(from, cli.steps)
                .plan()
                .map_err(|e| e.to_string())
        }
    };
    if to.is_empty() {
        return Err("--to is required for path queries".to_string());
    }
    FindPath::new(from, to, kind)
        .with_steps(cli.steps)
        .with_no_loop(cli.no_loop)
        .plan()
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let text = match tokio::fs::read_to_string(&cli.edges).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("ERROR: cannot read {}: {}", cli.edges.display(), e);
            std::process::exit(2);
        }
    };
    let edges = match parse_edges(&text) {
        Ok(edges) => edges,
        Err(msg) => {
            eprintln!("ERROR: {}: {}", cli.edges.display(), msg);
            std::process::exit(2);
        }
    };
    let plan = match build_plan(&cli) {
        Ok(plan) => plan,
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            std::process::exit(2);
        }
    };
    if cli.explain {
        eprint!("{}", ExplainOutput::format(&plan));
    }

    let meta = MemoryMeta::new();
    let space = meta.create_space("cli", VidType::Int64);
    let storage = MemoryStorage::new();
    storage.create_space(space.id);
    let edge_count = edges.len();
    for edge in edges {
        storage.add_edge(space.id, edge);
    }
    tracing::info!(edges = edge_count, algo = ?cli.algo, "graph loaded");

    let config = ExecutorConfig::new().with_max_concurrent_tasks(cli.workers);
    let ctx = QueryContext::new(space, Arc::new(storage), Arc::new(meta)).with_config(config);
    let scheduler = Scheduler::new(Arc::new(ctx), plan);

    match scheduler.schedule().await {
        Ok(ExecStatus::Succeeded) => {}
        Ok(ExecStatus::Cancelled) => {
            eprintln!("query cancelled");
            std::process::exit(3);
        }
        Err(e) => {
            eprintln!("ERROR: query failed: {}", e);
            std::process::exit(3);
        }
    }

    let Some(result) = scheduler.result() else {
        eprintln!("ERROR: query produced no result");
        std::process::exit(3);
    };
    let data = result.data();
    for row in data.rows() {
        for value in row.iter() {
            match value {
                Value::Path(path) => println!("{}", path),
                Value::List(items) => {
                    for item in items {
                        println!("{}", item);
                    }
                }
                other => println!("{}", other),
            }
        }
    }
    eprintln!("{} row(s)", data.len());
}
