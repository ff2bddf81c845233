use crate::config::load_config;
use crate::convert::{to_positioned, to_simplified};
use crate::ir::{ConnectionType, Direction, OrgGraph};
use crate::layout_dump::LayoutDump;
use crate::reconcile::ReconcileError;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::session::{GraphSession, InteractionEvent, Reaction};
use crate::text_metrics::TextMeasurer;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ogre",
    version,
    about = "Org graph engine: replay edits and lay out an org chart"
)]
pub struct Args {
    /// Canonical graph JSON ({nodes, edges}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// JSON5 script of interaction commands to replay
    #[arg(short = 's', long = "script")]
    pub script: Option<PathBuf>,

    /// Output file. Defaults to stdout for json/svg.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout direction (TB or LR), overrides the config file
    #[arg(short = 'd', long = "direction")]
    pub direction: Option<String>,

    /// Log debug events to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

/// One scripted step, replayed in order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScriptCommand {
    Event {
        event: InteractionEvent,
    },
    ChooseType {
        #[serde(rename = "type")]
        connection_type: ConnectionType,
    },
    Cancel,
    AddChild {
        parent: String,
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    EditNode {
        id: String,
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    DeleteNode {
        id: String,
    },
    DeleteBranch {
        id: String,
    },
    DeleteEdge {
        id: String,
    },
    ChangeEdgeType {
        id: String,
        #[serde(rename = "type")]
        connection_type: ConnectionType,
    },
    ResetLayout,
    Relayout,
    SetDirection {
        direction: Direction,
    },
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(token) = args.direction.as_deref() {
        config.layout.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown direction '{token}' (expected TB or LR)"))?;
    }

    let input = read_input(args.input.as_deref())?;
    let parsed: OrgGraph = json5::from_str(&input).context("failed to parse input graph")?;
    // Edges supplied without ids get their derived ids.
    let mut graph = to_simplified(&to_positioned(&parsed.nodes, &parsed.edges));

    let mut session = GraphSession::new(&config);
    if let Some(path) = args.script.as_deref() {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        let commands: Vec<ScriptCommand> =
            json5::from_str(&script).context("failed to parse script")?;
        graph = replay(&mut session, graph, commands)?;
    }

    let view = session.view(&graph);
    match args.output_format {
        OutputFormat::Json => {
            let document = serde_json::json!({
                "graph": &graph,
                "layout": LayoutDump::from_view(&view),
            });
            let text = serde_json::to_string_pretty(&document)?;
            match args.output.as_deref() {
                Some(path) => std::fs::write(path, text)?,
                None => println!("{text}"),
            }
        }
        OutputFormat::Svg => {
            let svg = render_svg(&view, &config, &mut TextMeasurer::new());
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&view, &config, &mut TextMeasurer::new());
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }
    Ok(())
}

/// `RUST_LOG` wins when set; otherwise `--verbose` picks debug over warn.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level(verbose)))
}

fn fallback_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter(verbose))
        .init();
}

/// Applies `commands` in order, committing every applied mutation.
///
/// Rejections are logged and skipped; a stale id aborts the replay.
pub fn replay(
    session: &mut GraphSession,
    mut graph: OrgGraph,
    commands: Vec<ScriptCommand>,
) -> Result<OrgGraph> {
    for (step, command) in commands.into_iter().enumerate() {
        let reaction = apply_command(session, &graph, command.clone())
            .with_context(|| format!("script step {} ({command:?}) failed", step + 1))?;
        match &reaction {
            Reaction::Rejected(rejection) => {
                tracing::warn!(step = step + 1, ?rejection, "script step rejected, skipping");
            }
            Reaction::AwaitingType(gesture) => {
                tracing::debug!(
                    step = step + 1,
                    source = %gesture.source,
                    target = %gesture.target,
                    "awaiting connection type"
                );
            }
            Reaction::Applied(_) | Reaction::Unchanged => {}
        }
        graph = reaction.commit(graph);
    }
    Ok(graph)
}

fn apply_command(
    session: &mut GraphSession,
    graph: &OrgGraph,
    command: ScriptCommand,
) -> Result<Reaction, ReconcileError> {
    match command {
        ScriptCommand::Event { event } => session.handle(graph, event),
        ScriptCommand::ChooseType { connection_type } => {
            session.choose_connection_type(graph, &connection_type)
        }
        ScriptCommand::Cancel => {
            session.cancel_pending();
            Ok(Reaction::Unchanged)
        }
        ScriptCommand::AddChild {
            parent,
            name,
            description,
        } => session.add_child(graph, &parent, &name, description.as_deref()),
        ScriptCommand::EditNode {
            id,
            name,
            description,
        } => session.edit_node(graph, &id, &name, description.as_deref()),
        ScriptCommand::DeleteNode { id } => session.delete_node(graph, &id),
        ScriptCommand::DeleteBranch { id } => session.delete_branch(graph, &id),
        ScriptCommand::DeleteEdge { id } => session.delete_edge(graph, &id),
        ScriptCommand::ChangeEdgeType {
            id,
            connection_type,
        } => session.change_edge_type(graph, &id, &connection_type),
        ScriptCommand::ResetLayout => session.reset_layout(graph),
        ScriptCommand::Relayout => {
            session.relayout();
            Ok(Reaction::Unchanged)
        }
        ScriptCommand::SetDirection { direction } => {
            session.set_direction(direction);
            Ok(Reaction::Unchanged)
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
