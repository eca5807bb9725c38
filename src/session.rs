//! Graph session: the state behind a search box and a clickable graph.
//!
//! Every search or node expansion takes a ticket from a monotonically
//! increasing counter before it starts fetching. When the build finishes
//! its result is committed only if that ticket is still the latest one
//! issued, so a slow request can never overwrite a newer one.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::builder::GraphBuilder;
use crate::error::Result;
use crate::graph::{self, Graph, Node};

/// What a committed build does to the session graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// The new graph replaces the current one.
    #[default]
    Replace,
    /// The new graph is merged into the current one; existing entries win.
    Merge,
}

/// Outcome of a search or expansion that built successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Committed; `graph` is the session graph after the update.
    Applied { sequence: u64, graph: Graph },
    /// A newer request was issued while this one was in flight.
    Stale { sequence: u64, latest: u64 },
}

impl SessionUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, SessionUpdate::Applied { .. })
    }

    pub fn sequence(&self) -> u64 {
        match self {
            SessionUpdate::Applied { sequence, .. } | SessionUpdate::Stale { sequence, .. } => {
                *sequence
            }
        }
    }
}

struct SessionState {
    graph: Graph,
    committed: u64,
}

pub struct GraphSession {
    builder: GraphBuilder,
    mode: UpdateMode,
    issued: AtomicU64,
    state: Mutex<SessionState>,
}

impl GraphSession {
    /// Empty session; nothing is fetched until the first search.
    pub fn new(builder: GraphBuilder, mode: UpdateMode) -> Self {
        Self {
            builder,
            mode,
            issued: AtomicU64::new(0),
            state: Mutex::new(SessionState {
                graph: Graph::default(),
                committed: 0,
            }),
        }
    }

    /// Session seeded with the graph for `initial`.
    pub async fn open<S: AsRef<str>>(
        builder: GraphBuilder,
        mode: UpdateMode,
        initial: &[S],
    ) -> Result<Self> {
        let session = Self::new(builder, mode);
        session.rebuild(initial).await?;
        Ok(session)
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// Latest ticket issued.
    pub fn sequence(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Ticket of the build currently shown.
    pub fn committed(&self) -> u64 {
        self.lock().committed
    }

    pub fn current(&self) -> Graph {
        self.lock().graph.clone()
    }

    /// Search-box submission.
    pub async fn search(&self, entity: &str) -> Result<SessionUpdate> {
        self.rebuild(&[entity]).await
    }

    /// Node click: expand around the clicked node's entity.
    pub async fn expand(&self, node: &Node) -> Result<SessionUpdate> {
        self.rebuild(&[node.entity.as_str()]).await
    }

    /// Build `names` and commit the result if no newer request was issued.
    /// On failure the session graph is left as it was.
    pub async fn rebuild<S: AsRef<str>>(&self, names: &[S]) -> Result<SessionUpdate> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let graph = match self.builder.build_graph(names).await {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("Graph update #{} failed: {}", ticket, e);
                return Err(e);
            }
        };

        Ok(self.commit(ticket, graph))
    }

    fn commit(&self, ticket: u64, graph: Graph) -> SessionUpdate {
        let mut state = self.lock();

        let latest = self.issued.load(Ordering::SeqCst);
        if ticket != latest {
            log::warn!("Discarding stale graph update #{} (latest is #{})", ticket, latest);
            return SessionUpdate::Stale {
                sequence: ticket,
                latest,
            };
        }

        match self.mode {
            UpdateMode::Replace => state.graph = graph,
            UpdateMode::Merge => {
                graph::merge_into(&mut state.graph, graph, self.builder.policy());
            }
        }
        state.committed = ticket;

        log::info!(
            "Committed graph update #{}: {} nodes, {} links",
            ticket,
            state.graph.nodes.len(),
            state.graph.links.len()
        );

        SessionUpdate::Applied {
            sequence: ticket,
            graph: state.graph.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
