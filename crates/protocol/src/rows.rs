use serde::{Deserialize, Serialize};

/// Which way a tree view walks the frame graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalDirection {
    /// Root to leaf, following `children`.
    CallTree,
    /// Leaf to root, following `parent`, starting at frames that were on CPU.
    HotMethods,
}

impl TraversalDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "call-tree" | "call" | "calltree" => Some(Self::CallTree),
            "hot-methods" | "hot" | "hotmethods" => Some(Self::HotMethods),
            _ => None,
        }
    }
}

impl std::fmt::Display for TraversalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallTree => write!(f, "Call Tree"),
            Self::HotMethods => write!(f, "Hot Methods"),
        }
    }
}

/// A fully resolved row, ready for a renderer to draw.
///
/// The core emits a `Vec<TreeRow>` for the currently visible part of a tree
/// view. Renderers never need the frame table to draw one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRow {
    /// Stable path identifier; address toggles and highlights with it.
    pub id: String,
    /// Method label, with `:line` where the view distinguishes call sites.
    pub label: String,
    pub indent: u32,
    pub depth: u32,
    /// Aggregated samples: on-stack for call trees, attributed samples for
    /// hot methods.
    pub samples: u64,
    pub samples_pct: f64,
    /// On-CPU samples, when the row carries them.
    pub on_cpu: Option<u64>,
    pub on_cpu_pct: Option<f64>,
    pub opened: bool,
    pub has_children: bool,
    pub highlighted: bool,
}
