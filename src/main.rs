use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use entgraph::server::GraphServer;
use entgraph::{Config, DedupPolicy, GraphBuilder, GraphSession, HttpEntitySource};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "entgraph", version, about = "Build node/link graphs from knowledge-graph entity documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch entities and print the merged graph as JSON
    Build {
        /// Entity names, e.g. "biomass" "data ecosystems"
        #[arg(required = true)]
        entities: Vec<String>,
        /// Keep duplicate nodes and links
        #[arg(long)]
        no_dedup: bool,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List entity documents published on the configured branch
    List,
    /// Serve the graph JSON API
    Serve {
        /// Overrides http_server.port
        #[arg(long)]
        port: Option<u16>,
        /// Entities loaded into the session before serving
        #[arg(long)]
        seed: Vec<String>,
    },
}

/// Build a source and a builder from config, attaching the catalog when one
/// is configured. A catalog that fails to load is logged and skipped.
async fn build_builder(config: &Config) -> Result<(Arc<HttpEntitySource>, GraphBuilder)> {
    let source = Arc::new(HttpEntitySource::new(&config.source)?);
    let builder = GraphBuilder::from_config(source.clone(), config);

    let builder = if config.source.catalog_path.is_some() {
        match builder.clone().load_catalog().await {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Catalog unavailable, continuing without categories: {}", e);
                builder
            }
        }
    } else {
        builder
    };

    Ok((source, builder))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.entgraph.log_level),
    )
    .init();

    match cli.command {
        Command::Build {
            entities,
            no_dedup,
            pretty,
        } => run_build(&config, &entities, no_dedup, pretty).await?,
        Command::List => run_list(&config).await?,
        Command::Serve { port, seed } => run_server(&config, port, &seed).await?,
    }

    Ok(())
}

async fn run_build(config: &Config, entities: &[String], no_dedup: bool, pretty: bool) -> Result<()> {
    let (_, mut builder) = build_builder(config).await?;
    if no_dedup {
        builder = builder.with_policy(DedupPolicy::none());
    }

    let graph = builder
        .build_graph(entities)
        .await
        .with_context(|| format!("Failed to build graph for {:?}", entities))?;

    let json = if pretty {
        serde_json::to_string_pretty(&graph)?
    } else {
        serde_json::to_string(&graph)?
    };
    println!("{}", json);

    Ok(())
}

async fn run_list(config: &Config) -> Result<()> {
    let (source, _) = build_builder(config).await?;
    let names = source
        .list_entities()
        .await
        .context("Failed to list entity documents")?;

    for name in &names {
        println!("{}", name);
    }
    log::info!("{} entity documents", names.len());

    Ok(())
}

async fn run_server(config: &Config, port: Option<u16>, seed: &[String]) -> Result<()> {
    log::info!("Starting entgraph server v{}", env!("CARGO_PKG_VERSION"));

    let (_, builder) = build_builder(config).await?;
    let mode = config.builder.update_mode;

    let session = GraphSession::new(builder.clone(), mode);
    if !seed.is_empty() {
        // A failed seed leaves an empty graph; the server still starts.
        if let Err(e) = session.rebuild(seed).await {
            log::error!("Error fetching seed entities {:?}: {}", seed, e);
        }
    }

    let server = GraphServer::new(builder, Arc::new(session), &config.http_server);
    server.run(port.unwrap_or(config.http_server.port)).await?;

    Ok(())
}
