pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod record;
pub mod server;
pub mod session;
pub mod source;

pub use builder::GraphBuilder;
pub use config::Config;
pub use error::{GraphError, Result};
pub use graph::{DedupPolicy, Graph, Link, Node, NodeType};
pub use session::{GraphSession, SessionUpdate, UpdateMode};
pub use source::{EntitySource, HttpEntitySource};
