//! Flattening and deduplication of sub-graphs.

use std::collections::{HashMap, HashSet};

use super::{Graph, Node};

/// Which collections are deduplicated after merging.
///
/// Nodes are keyed by `entity`, links by the ordered `(Subject, Object)`
/// pair. The first occurrence wins, except that a node keeps `root: true`
/// if any of its duplicates had it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    pub nodes: bool,
    pub links: bool,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            nodes: true,
            links: true,
        }
    }
}

impl DedupPolicy {
    pub fn none() -> Self {
        Self {
            nodes: false,
            links: false,
        }
    }
}

/// Entries removed by a dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub nodes_dropped: usize,
    pub links_dropped: usize,
}

/// Remove duplicates in place, keeping order of first occurrences.
pub fn dedup(graph: &mut Graph, policy: DedupPolicy) -> DedupStats {
    let mut stats = DedupStats::default();

    if policy.nodes {
        let before = graph.nodes.len();
        let mut kept: HashMap<String, usize> = HashMap::with_capacity(before);
        let mut nodes: Vec<Node> = Vec::with_capacity(before);
        for node in graph.nodes.drain(..) {
            match kept.get(&node.entity) {
                // A dropped duplicate that is some document's own entity
                // still marks the retained copy as a root.
                Some(&idx) => {
                    if node.root {
                        nodes[idx].root = true;
                    }
                }
                None => {
                    kept.insert(node.entity.clone(), nodes.len());
                    nodes.push(node);
                }
            }
        }
        graph.nodes = nodes;
        stats.nodes_dropped = before - graph.nodes.len();
    }

    if policy.links {
        let before = graph.links.len();
        let mut seen = HashSet::with_capacity(before);
        graph
            .links
            .retain(|l| seen.insert((l.subject.clone(), l.object.clone())));
        stats.links_dropped = before - graph.links.len();
    }

    stats
}

/// Concatenate sub-graphs in order, then apply `policy`.
pub fn flatten<I>(subgraphs: I, policy: DedupPolicy) -> Graph
where
    I: IntoIterator<Item = Graph>,
{
    let mut merged = Graph::default();
    for sub in subgraphs {
        merged.nodes.extend(sub.nodes);
        merged.links.extend(sub.links);
    }

    let stats = dedup(&mut merged, policy);
    if stats != DedupStats::default() {
        log::debug!(
            "Dropped {} duplicate nodes and {} duplicate links",
            stats.nodes_dropped,
            stats.links_dropped
        );
    }

    merged
}

/// Merge `incoming` into `current`. Entries already in `current` win.
pub fn merge_into(current: &mut Graph, incoming: Graph, policy: DedupPolicy) -> DedupStats {
    current.nodes.extend(incoming.nodes);
    current.links.extend(incoming.links);
    dedup(current, policy)
}
