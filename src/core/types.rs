use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulation time in whole ticks.
pub type SimTime = u64;

/// Coordinate along the single spatial axis used for travel and collision checks.
pub type Position = f64;

/// The kind of processing stage a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Source,
    Server,
    Storage,
    Vehicle,
    Combiner,
    Separator,
    Sink,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Source => "source",
            NodeKind::Server => "server",
            NodeKind::Storage => "storage",
            NodeKind::Vehicle => "vehicle",
            NodeKind::Combiner => "combiner",
            NodeKind::Separator => "separator",
            NodeKind::Sink => "sink",
        };
        f.write_str(name)
    }
}

/// Node identifier with kind information
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub(crate) id: String,
    pub(crate) kind: NodeKind,
}

impl NodeId {
    /// Create a new node ID
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self { id: id.into(), kind }
    }

    /// Get the raw ID string
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the node kind
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Pair this node with a position on the travel axis
    pub fn at(&self, position: Position) -> Location {
        Location {
            node: self.clone(),
            position,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A node together with where it sits on the travel axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub node: NodeId,
    pub position: Position,
}

impl Location {
    pub fn new(node: NodeId, position: Position) -> Self {
        Self { node, position }
    }
}
