//! Node/link graph model handed to the force-graph renderer.
//!
//! Field names follow what the renderer is configured with: nodes are keyed
//! by `entity`, links point at nodes through `Subject` and `Object`.

mod merge;
mod normalize;

pub use merge::{dedup, flatten, merge_into, DedupPolicy, DedupStats};
pub use normalize::{subgraph_from_record, NormalizeOptions};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};

/// Rendering class of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Main,
    Sub,
}

/// A graph vertex, unique by `entity` once deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub entity: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Entity whose document introduced this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub root: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Node {
    pub fn new(entity: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            entity: entity.into(),
            node_type,
            parent: None,
            root: false,
            category: None,
        }
    }
}

/// A directed labeled edge (`Subject --Relation--> Object`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Object")]
    pub object: String,
    #[serde(rename = "Relation", default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Hop distance from `parent` for leveled relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, JsonValue>,
}

impl Link {
    pub fn new(subject: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            relation: None,
            parent: None,
            level: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }
}

/// The `{nodes, links}` pair consumed by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn node(&self, entity: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.entity == entity)
    }

    pub fn contains_node(&self, entity: &str) -> bool {
        self.node(entity).is_some()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.root)
    }

    /// Links whose `Subject` or `Object` has no node.
    pub fn dangling_links(&self) -> Vec<&Link> {
        let keys: HashSet<&str> = self.nodes.iter().map(|n| n.entity.as_str()).collect();
        self.links
            .iter()
            .filter(|l| !keys.contains(l.subject.as_str()) || !keys.contains(l.object.as_str()))
            .collect()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
