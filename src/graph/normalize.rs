//! Entity document → local node/link sub-graph.

use std::collections::HashSet;

use super::{Graph, Link, Node, NodeType};
use crate::error::{GraphError, Result};
use crate::record::{EntityRecord, RelationRecord, Relations, SubelementRelation};

/// Keys set by normalization; dropped from pass-through attributes so they
/// can't collide on serialization.
const RESERVED_ATTRIBUTES: [&str; 2] = ["parent", "level"];

/// How nodes of a sub-graph are annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Flag the document's own entity with `root: true`.
    pub mark_root: bool,
    /// Set `parent` on nodes to the document's entity.
    pub tag_node_parent: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            mark_root: true,
            tag_node_parent: true,
        }
    }
}

/// Derive the sub-graph of one entity document.
///
/// `requested` is the name the document was fetched under and is only used
/// for error reporting. Nodes of the result are unique by `entity`, and every
/// link has both endpoints among them.
pub fn subgraph_from_record(
    requested: &str,
    record: &EntityRecord,
    options: &NormalizeOptions,
) -> Result<Graph> {
    let owner = record.owner().ok_or_else(|| GraphError::MissingField {
        entity: requested.to_string(),
        field: "metadata.Entity".to_string(),
    })?;

    let mut sub = Subgraph::new(owner, *options);
    let kg = &record.knowledge_graph;

    // Root first so it wins local dedup; cross-entity dedup carries the
    // flag over (see `merge::dedup`).
    sub.add_node(owner, NodeType::Main, options.mark_root);

    for entity in &kg.entities {
        sub.add_node(entity.name(), NodeType::Main, false);
    }

    match &kg.relations {
        Relations::Flat(records) => {
            for rel in records {
                sub.add_relation(rel, None, false);
            }
        }
        Relations::Leveled(levels) => {
            for (level, records) in levels.levels() {
                for rel in records {
                    sub.add_relation(rel, Some(level), level == 1);
                }
            }
        }
        Relations::Keyed(by_entity) => {
            if !by_entity.is_empty() && !by_entity.contains_key(owner) {
                let keys: Vec<&str> = by_entity.keys().map(String::as_str).collect();
                return Err(GraphError::Parse(format!(
                    "Relations of '{}' are keyed by {:?}, none of which is the entity or a `level N` key",
                    requested, keys
                )));
            }
            for (key, records) in by_entity {
                if key != owner {
                    log::warn!(
                        "Ignoring {} relations under '{}' in document for '{}'",
                        records.len(),
                        key,
                        owner
                    );
                    continue;
                }
                for rel in records {
                    sub.add_relation(rel, None, true);
                }
            }
        }
    }

    for name in &kg.sub_elements {
        sub.add_node(name, NodeType::Sub, false);
    }

    for rel in &kg.subelement_relations {
        sub.add_subelement_relation(rel);
    }

    log::debug!(
        "Sub-graph for '{}': {} nodes, {} links",
        owner,
        sub.graph.nodes.len(),
        sub.graph.links.len()
    );

    Ok(sub.graph)
}

struct Subgraph<'a> {
    owner: &'a str,
    options: NormalizeOptions,
    seen: HashSet<String>,
    graph: Graph,
}

impl<'a> Subgraph<'a> {
    fn new(owner: &'a str, options: NormalizeOptions) -> Self {
        Self {
            owner,
            options,
            seen: HashSet::new(),
            graph: Graph::default(),
        }
    }

    fn add_node(&mut self, entity: &str, node_type: NodeType, root: bool) {
        if entity.trim().is_empty() {
            log::debug!("Skipping blank entity name in '{}'", self.owner);
            return;
        }
        if !self.seen.insert(entity.to_string()) {
            return;
        }
        let mut node = Node::new(entity, node_type);
        node.root = root;
        if self.options.tag_node_parent {
            node.parent = Some(self.owner.to_string());
        }
        self.graph.nodes.push(node);
    }

    /// `owner_subject` forces `Subject` to the owner (level-1 and
    /// entity-keyed records).
    fn add_relation(&mut self, rel: &RelationRecord, level: Option<u8>, owner_subject: bool) {
        if rel.object.trim().is_empty() {
            log::debug!("Skipping relation without object in '{}'", self.owner);
            return;
        }

        // Direct relations start at the owner by definition; the document
        // often leaves the subject out or repeats it.
        let subject = match rel.subject.as_deref() {
            _ if owner_subject => self.owner,
            Some(s) if !s.trim().is_empty() => s,
            _ => self.owner,
        };

        let mut attributes = rel.attributes.clone();
        for key in RESERVED_ATTRIBUTES {
            attributes.remove(key);
        }

        let link = Link {
            subject: subject.to_string(),
            object: rel.object.clone(),
            relation: rel.relation.clone(),
            parent: Some(self.owner.to_string()),
            level,
            attributes,
        };

        self.add_node(&link.subject, NodeType::Main, false);
        self.add_node(&link.object, NodeType::Main, false);
        self.graph.links.push(link);
    }

    fn add_subelement_relation(&mut self, rel: &SubelementRelation) {
        if rel.parent.trim().is_empty() || rel.sub_element.trim().is_empty() {
            log::debug!("Skipping incomplete sub-element relation in '{}'", self.owner);
            return;
        }

        let mut link = Link::new(rel.parent.as_str(), rel.sub_element.as_str());
        link.relation = rel.relation.clone();
        link.parent = Some(self.owner.to_string());

        self.add_node(&link.subject, NodeType::Main, false);
        self.add_node(&link.object, NodeType::Sub, false);
        self.graph.links.push(link);
    }
}
