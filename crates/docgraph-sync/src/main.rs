//! `docgraph` command line: inspect, edit and convert structured documents.

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use docgraph_document::EditValue;
use docgraph_sync::{EngineConfig, Format, GraphView, SyncEngine};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let file = Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Document to read");
    let format = Arg::new("format")
        .long("format")
        .value_parser(value_parser!(Format))
        .help("Document format (defaults to the file extension)");
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Engine configuration (TOML)");

    Command::new("docgraph")
        .version(docgraph_sync::VERSION)
        .about("Inspect, edit and convert structured documents through their graph")
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Summarize the graph of a document")
                .arg(file.clone())
                .arg(format.clone())
                .arg(config.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full graph snapshot as JSON"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Replace the value at a display path")
                .arg(file.clone())
                .arg(Arg::new("path").required(true).help("Display path, e.g. {Root}.fruit.name"))
                .arg(Arg::new("value").required(true).help("New value"))
                .arg(format.clone())
                .arg(config.clone())
                .arg(
                    Arg::new("in-place")
                        .long("in-place")
                        .action(ArgAction::SetTrue)
                        .help("Write the result back to the file"),
                )
                .arg(
                    Arg::new("json-value")
                        .long("json-value")
                        .action(ArgAction::SetTrue)
                        .help("Parse the value as JSON instead of classifying it"),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Rewrite a document in another format")
                .arg(file)
                .arg(format)
                .arg(config)
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .value_parser(value_parser!(Format))
                        .help("Target format"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn load(args: &ArgMatches) -> Result<(PathBuf, SyncEngine)> {
    let Some(path) = args.get_one::<PathBuf>("file").cloned() else {
        bail!("missing document path");
    };

    let mut config = match args.get_one::<PathBuf>("config") {
        Some(config_path) => {
            let text = tokio::fs::read_to_string(config_path)
                .await
                .with_context(|| format!("reading config {}", config_path.display()))?;
            EngineConfig::from_toml_str(&text)?
        }
        None => EngineConfig::new(),
    };
    if let Some(format) = args.get_one::<Format>("format").copied().or_else(|| Format::from_path(&path)) {
        config = config.with_format(format);
    }
    debug!(?config, "engine configuration");

    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mut engine = SyncEngine::new(config)?;
    engine
        .load(text)
        .await
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok((path, engine))
}

fn print_summary(path: &Path, engine: &SyncEngine) {
    let snapshot = engine.snapshot();
    let graph = engine.graph();
    println!("Document: {}", path.display());
    println!("  Format: {}", engine.format());
    println!("  Hash: {}", engine.document().hash().short());
    println!("  Nodes: {}", graph.node_count());
    println!("  Edges: {}", graph.edge_count());
    match snapshot.view {
        GraphView::Ready(_) => {
            println!("  Counted nodes: {} (limit {})", graph.limited_count(), engine.config().node_limit);
        }
        GraphView::AboveLimit { node_count, limit } => {
            println!("  Above supported limit: {node_count} nodes (limit {limit})");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("inspect", args)) => {
            let (path, engine) = load(args).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            } else {
                print_summary(&path, &engine);
            }
        }
        Some(("edit", args)) => {
            let (path, mut engine) = load(args).await?;
            let target = args.get_one::<String>("path").map_or("", String::as_str);
            let raw = args.get_one::<String>("value").cloned().unwrap_or_default();
            let value = if args.get_flag("json-value") {
                EditValue::Json(raw)
            } else {
                EditValue::Text(raw)
            };

            let receipt = engine.apply_edit(target, value)?;
            info!(path = %receipt.target, version = %receipt.version, "edit applied");

            if args.get_flag("in-place") {
                tokio::fs::write(&path, engine.text())
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
            } else {
                print!("{}", with_newline(engine.text()));
            }
        }
        Some(("convert", args)) => {
            let (_, mut engine) = load(args).await?;
            let Some(to) = args.get_one::<Format>("to").copied() else {
                bail!("missing target format");
            };
            engine.set_format(to)?;
            print!("{}", with_newline(engine.text()));
        }
        _ => {
            cli().print_help()?;
        }
    }

    Ok(())
}

fn with_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}
