//! Merged knowledge graph used to attach node attributes.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::graph::Graph;

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(rename = "knowledge graph", default)]
    knowledge_graph: CatalogGraph,
}

#[derive(Default, Deserialize)]
struct CatalogGraph {
    #[serde(default)]
    entities: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    entity: String,
    #[serde(default)]
    category: Option<String>,
}

/// Entity → category lookup built from the merged document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: HashMap<String, String>,
}

impl Catalog {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_slice(body)
            .map_err(|e| GraphError::Parse(format!("JSON parse error in catalog: {}", e)))?;

        let mut categories = HashMap::new();
        for entry in doc.knowledge_graph.entities {
            if let Some(category) = entry.category {
                // first entry wins, matching node dedup
                categories.entry(entry.entity).or_insert(category);
            }
        }

        Ok(Self { categories })
    }

    pub fn category(&self, entity: &str) -> Option<&str> {
        self.categories.get(entity).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Fill in `category` on nodes that don't have one yet.
    pub fn apply(&self, graph: &mut Graph) {
        for node in graph.nodes.iter_mut().filter(|n| n.category.is_none()) {
            if let Some(category) = self.categories.get(&node.entity) {
                node.category = Some(category.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeType};

    const DOC: &str = r#"{
        "knowledge graph": {
            "entities": [
                {"entity": "biomass", "category": "Energy source"},
                {"entity": "UNDP", "category": "Organization"},
                {"entity": "biomass", "category": "Duplicate"},
                {"entity": "uncategorized"}
            ],
            "relations": []
        }
    }"#;

    #[test]
    fn test_catalog_from_slice() {
        let catalog = Catalog::from_slice(DOC.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.category("biomass"), Some("Energy source"));
        assert_eq!(catalog.category("uncategorized"), None);
    }

    #[test]
    fn test_apply_keeps_existing_category() {
        let catalog = Catalog::from_slice(DOC.as_bytes()).unwrap();
        let mut graph = Graph {
            nodes: vec![
                Node::new("biomass", NodeType::Main),
                Node {
                    category: Some("Custom".to_string()),
                    ..Node::new("UNDP", NodeType::Main)
                },
                Node::new("pellets", NodeType::Sub),
            ],
            links: vec![],
        };
        catalog.apply(&mut graph);
        assert_eq!(graph.nodes[0].category.as_deref(), Some("Energy source"));
        assert_eq!(graph.nodes[1].category.as_deref(), Some("Custom"));
        assert_eq!(graph.nodes[2].category, None);
    }

    #[test]
    fn test_catalog_rejects_garbage() {
        assert!(matches!(Catalog::from_slice(b"[1,2"), Err(GraphError::Parse(_))));
    }
}
