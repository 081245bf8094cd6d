//! Graph-shaped values: vertices, edges, steps and paths

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::datum::Value;

/// Property bag keyed by property name
pub type Props = BTreeMap<String, Value>;

/// A named group of vertex properties
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub name: String,
    pub props: Props,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            props: Props::new(),
        }
    }

    #[must_use]
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }
}

/// A vertex: identifier plus tags
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vertex {
    pub vid: Value,
    pub tags: Vec<Tag>,
}

impl Vertex {
    /// A vertex carrying only its identifier
    pub fn new(vid: impl Into<Value>) -> Self {
        Vertex {
            vid: vid.into(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Look up a property across all tags (first match wins)
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.tags.iter().find_map(|t| t.props.get(name))
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.vid)
    }
}

/// An edge as seen from its traversal direction
///
/// A negative `etype` means the edge was walked against its stored
/// direction: `src` is the vertex the traversal started from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub src: Value,
    pub dst: Value,
    pub etype: i32,
    pub name: String,
    pub ranking: i64,
    pub props: Props,
}

impl Edge {
    pub fn new(
        src: impl Into<Value>,
        dst: impl Into<Value>,
        etype: i32,
        name: impl Into<String>,
        ranking: i64,
    ) -> Self {
        Edge {
            src: src.into(),
            dst: dst.into(),
            etype,
            name: name.into(),
            ranking,
            props: Props::new(),
        }
    }

    #[must_use]
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// The same edge seen from the other endpoint
    pub fn reversed(&self) -> Edge {
        Edge {
            src: self.dst.clone(),
            dst: self.src.clone(),
            etype: -self.etype,
            name: self.name.clone(),
            ranking: self.ranking,
            props: self.props.clone(),
        }
    }

    /// Normalize to the stored direction (non-negative type)
    pub fn canonical(&self) -> Edge {
        if self.etype < 0 {
            self.reversed()
        } else {
            self.clone()
        }
    }

    /// Ordering key used wherever predecessor edges must be ranked
    pub fn key(&self) -> (&Value, i32, i64, &Value) {
        (&self.src, self.etype, self.ranking, &self.dst)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.etype < 0 {
            write!(
                f,
                "({})<-[:{}@{}]-({})",
                self.src, self.name, self.ranking, self.dst
            )
        } else {
            write!(
                f,
                "({})-[:{}@{}]->({})",
                self.src, self.name, self.ranking, self.dst
            )
        }
    }
}

/// One hop of a path: the edge data plus the vertex reached
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Step {
    pub dst: Vertex,
    pub etype: i32,
    pub name: String,
    pub ranking: i64,
    pub props: Props,
}

/// A path: source vertex followed by steps
///
/// Step `i` starts where step `i - 1` ended (or at `src` for `i == 0`).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    pub src: Vertex,
    pub steps: Vec<Step>,
}

impl Path {
    /// A zero-step path
    pub fn new(src: Vertex) -> Self {
        Path {
            src,
            steps: Vec::new(),
        }
    }

    /// Number of hops
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Identifier of the vertex the path ends at
    pub fn last_vid(&self) -> &Value {
        self.steps
            .last()
            .map(|s| &s.dst.vid)
            .unwrap_or(&self.src.vid)
    }

    /// Every vertex id on the path, source first
    pub fn vids(&self) -> impl Iterator<Item = &Value> {
        std::iter::once(&self.src.vid).chain(self.steps.iter().map(|s| &s.dst.vid))
    }

    /// Whether `vid` appears anywhere on the path
    pub fn contains_vid(&self, vid: &Value) -> bool {
        self.vids().any(|v| v == vid)
    }

    /// Whether any vertex repeats along the path
    pub fn has_duplicate_vertex(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.steps.len() + 1);
        self.vids().any(|v| !seen.insert(v))
    }

    /// Append a hop. Returns false (and leaves the path untouched) if the
    /// edge does not start where the path ends.
    pub fn push_edge(&mut self, edge: &Edge) -> bool {
        if &edge.src != self.last_vid() {
            return false;
        }
        self.steps.push(Step {
            dst: Vertex::new(edge.dst.clone()),
            etype: edge.etype,
            name: edge.name.clone(),
            ranking: edge.ranking,
            props: edge.props.clone(),
        });
        true
    }

    /// Copy of this path extended by one hop
    pub fn extended(&self, edge: &Edge) -> Option<Path> {
        let mut path = self.clone();
        path.push_edge(edge).then_some(path)
    }

    /// The edges of this path, in walk order
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::with_capacity(self.steps.len());
        let mut prev = &self.src.vid;
        for step in &self.steps {
            edges.push(Edge {
                src: prev.clone(),
                dst: step.dst.vid.clone(),
                etype: step.etype,
                name: step.name.clone(),
                ranking: step.ranking,
                props: step.props.clone(),
            });
            prev = &step.dst.vid;
        }
        edges
    }

    /// The same walk in the opposite direction; edge types flip sign
    pub fn reversed(&self) -> Path {
        let last = self
            .steps
            .last()
            .map(|s| s.dst.clone())
            .unwrap_or_else(|| self.src.clone());
        let mut path = Path::new(last);
        for edge in self.edges().iter().rev() {
            path.push_edge(&edge.reversed());
        }
        path
    }

    /// Join two paths where `other` starts at this path's end
    pub fn concat(&self, other: &Path) -> Option<Path> {
        if self.last_vid() != &other.src.vid {
            return None;
        }
        let mut path = self.clone();
        path.steps.extend(other.steps.iter().cloned());
        Some(path)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.src)?;
        for step in &self.steps {
            if step.etype < 0 {
                write!(f, "<-[:{}@{}]-{}", step.name, step.ranking, step.dst)?;
            } else {
                write!(f, "-[:{}@{}]->{}", step.name, step.ranking, step.dst)?;
            }
        }
        write!(f, ">")
    }
}
