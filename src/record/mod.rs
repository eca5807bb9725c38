//! Serde model of the documents published by the knowledge-graph data host.
//!
//! Entity documents have gone through several layouts over time (flat,
//! leveled or entity-keyed relations, bare names vs. `Entity Code` objects).
//! Everything here accepts all of them; the graph module decides what to do
//! with the result.

mod catalog;

pub use catalog::Catalog;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::{GraphError, Result};

/// One `<entity>.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(rename = "knowledge graph", default)]
    pub knowledge_graph: KnowledgeGraph,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "Entity", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(rename = "Entity Code", default, skip_serializing_if = "Option::is_none")]
    pub entity_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<EntityRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relations: Relations,
    #[serde(rename = "sub-elements", default, deserialize_with = "null_as_default")]
    pub sub_elements: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subelement_relations: Vec<SubelementRelation>,
}

/// An item of `knowledge graph.entities`: either a bare name or an object
/// carrying the name under `Entity Code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Name(String),
    Coded {
        #[serde(rename = "Entity Code", alias = "Entity", alias = "entity")]
        code: String,
    },
}

impl EntityRef {
    pub fn name(&self) -> &str {
        match self {
            EntityRef::Name(name) => name,
            EntityRef::Coded { code } => code,
        }
    }
}

/// `knowledge graph.relations`, flat, split by hop distance, or keyed by
/// the entity the relations start from.
///
/// Variants are tried in order: an object using only `level N` keys is
/// `Leveled`; any other object is `Keyed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relations {
    Flat(Vec<RelationRecord>),
    Leveled(LeveledRelations),
    Keyed(BTreeMap<String, Vec<RelationRecord>>),
}

impl Default for Relations {
    fn default() -> Self {
        Relations::Flat(Vec::new())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeveledRelations {
    #[serde(rename = "level 1", default, deserialize_with = "null_as_default")]
    pub level_1: Vec<RelationRecord>,
    #[serde(rename = "level 2", default, deserialize_with = "null_as_default")]
    pub level_2: Vec<RelationRecord>,
    #[serde(rename = "level 3", default, deserialize_with = "null_as_default")]
    pub level_3: Vec<RelationRecord>,
}

impl LeveledRelations {
    /// Levels in hop order, paired with their depth.
    pub fn levels(&self) -> [(u8, &[RelationRecord]); 3] {
        [
            (1, self.level_1.as_slice()),
            (2, self.level_2.as_slice()),
            (3, self.level_3.as_slice()),
        ]
    }
}

/// A directed labeled edge as stored in the document. Level-1 records
/// usually omit `Subject`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    #[serde(rename = "Subject", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "Object")]
    pub object: String,
    #[serde(rename = "Relation", default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Anything else on the record (e.g. `Relevance`), passed through to links.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubelementRelation {
    #[serde(rename = "Parent")]
    pub parent: String,
    #[serde(rename = "Sub-element")]
    pub sub_element: String,
    #[serde(rename = "Relation", default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl EntityRecord {
    /// Decode a document body fetched for `entity`.
    pub fn from_slice(entity: &str, body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| GraphError::Parse(format!("JSON parse error in '{}': {}", entity, e)))
    }

    /// The entity this document describes. `Entity Code` takes precedence
    /// over `Entity`; blank values count as absent.
    pub fn owner(&self) -> Option<&str> {
        self.metadata
            .entity_code
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.metadata
                    .entity
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
            })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
