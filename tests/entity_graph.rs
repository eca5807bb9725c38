//! End-to-end: HTTP source → builder → session, against a mock data host.

use entgraph::config::SourceConfig;
use entgraph::{
    GraphBuilder, GraphError, GraphSession, HttpEntitySource, NodeType, UpdateMode,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENTITY_PREFIX: &str = "/api/UNDP-Data/dsc-energy-knowledge-graph/main/00_API";

async fn mount(server: &MockServer, file: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", ENTITY_PREFIX, file)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn data_host() -> MockServer {
    let server = MockServer::start().await;

    mount(
        &server,
        "biomass.json",
        json!({
            "metadata": {"Entity": "biomass"},
            "knowledge graph": {
                "entities": ["solar"],
                "relations": [{"Subject": "biomass", "Object": "solar", "Relation": "relates_to"}],
                "sub-elements": ["pellets"]
            }
        }),
    )
    .await;

    mount(
        &server,
        "data%20ecosystems.json",
        json!({
            "metadata": {"Entity": "data ecosystems", "Entity Code": "data ecosystems"},
            "knowledge graph": {
                "entities": [{"Entity Code": "solar"}, {"Entity Code": "open data"}],
                "relations": {
                    "level 1": [{"Object": "open data", "Relation": "includes"}],
                    "level 2": [{"Subject": "open data", "Object": "solar", "Relation": "informs"}],
                    "level 3": []
                },
                "sub-elements": ["data portals"],
                "subelement_relations": [{"Parent": "open data", "Sub-element": "data portals"}]
            }
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/unknown.json", ENTITY_PREFIX)))
        .respond_with(ResponseTemplate::new(404).set_body_string("404: Not Found"))
        .mount(&server)
        .await;

    server
}

fn builder_for(server: &MockServer) -> GraphBuilder {
    let config = SourceConfig {
        base_url: format!("{}/api", server.uri()),
        ..SourceConfig::default()
    };
    GraphBuilder::new(Arc::new(HttpEntitySource::new(&config).unwrap()))
}

#[tokio::test]
async fn biomass_scenario() {
    let server = data_host().await;
    let graph = builder_for(&server).build_graph(&["biomass"]).await.unwrap();

    let nodes: Vec<_> = graph
        .nodes
        .iter()
        .map(|n| (n.entity.as_str(), n.node_type, n.root))
        .collect();
    assert_eq!(
        nodes,
        vec![
            ("biomass", NodeType::Main, true),
            ("solar", NodeType::Main, false),
            ("pellets", NodeType::Sub, false),
        ]
    );

    assert_eq!(graph.links.len(), 1);
    assert_eq!(graph.links[0].subject, "biomass");
    assert_eq!(graph.links[0].object, "solar");
    assert_eq!(graph.links[0].relation.as_deref(), Some("relates_to"));
}

#[tokio::test]
async fn leveled_document_with_spaces_in_name() {
    let server = data_host().await;
    let graph = builder_for(&server)
        .build_graph(&["data ecosystems"])
        .await
        .unwrap();

    assert_eq!(graph.roots().count(), 1);
    assert_eq!(graph.roots().next().unwrap().entity, "data ecosystems");
    assert!(graph.dangling_links().is_empty());

    let level_one: Vec<_> = graph.links.iter().filter(|l| l.level == Some(1)).collect();
    assert_eq!(level_one.len(), 1);
    assert_eq!(level_one[0].subject, "data ecosystems");

    let portal = graph.node("data portals").unwrap();
    assert_eq!(portal.node_type, NodeType::Sub);
    assert!(graph
        .links
        .iter()
        .any(|l| l.subject == "open data" && l.object == "data portals"));
}

#[tokio::test]
async fn multi_entity_build_is_deduplicated_in_input_order() {
    let server = data_host().await;
    let graph = builder_for(&server)
        .build_graph(&["data ecosystems", "biomass"])
        .await
        .unwrap();

    let solar: Vec<_> = graph.nodes.iter().filter(|n| n.entity == "solar").collect();
    assert_eq!(solar.len(), 1);
    assert_eq!(solar[0].parent.as_deref(), Some("data ecosystems"));

    let mut keys: Vec<_> = graph.nodes.iter().map(|n| n.entity.as_str()).collect();
    let total = keys.len();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), total);
}

#[tokio::test]
async fn not_found_fails_build_and_keeps_session_graph() {
    let server = data_host().await;
    let session = GraphSession::open(builder_for(&server), UpdateMode::Replace, &["biomass"])
        .await
        .unwrap();
    let before = session.current();

    let err = session.search("unknown").await.unwrap_err();
    assert!(matches!(err, GraphError::Fetch { status: 404, .. }));
    assert_eq!(session.current(), before);

    let err = builder_for(&server)
        .build_graph(&["biomass", "unknown"])
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Fetch { .. }));
}
