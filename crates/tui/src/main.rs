mod renderer;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use calltrace_core::{ProfileSession, TreeConfig};
use calltrace_protocol::TraversalDirection;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "calltrace")]
#[command(about = "Browse hot methods and call trees of a sampled CPU profile")]
#[command(version)]
struct Args {
    /// Profile payload (`aggregated_samples.frame_nodes` + `method_lookup`)
    profile: PathBuf,

    /// Initial view: `hot` or `call`
    #[arg(long, default_value = "hot", value_parser = parse_view)]
    view: TraversalDirection,

    /// Only show top-level methods matching this pattern
    #[arg(short, long)]
    filter: Option<String>,

    /// Indent step where the tree branches
    #[arg(long, default_value_t = TreeConfig::default().major_indent)]
    major_indent: u32,

    /// Indent step along an unbranching chain
    #[arg(long, default_value_t = TreeConfig::default().minor_indent)]
    minor_indent: u32,

    /// Print the initially visible rows and exit
    #[arg(long)]
    dump: bool,
}

fn parse_view(s: &str) -> Result<TraversalDirection, String> {
    TraversalDirection::parse(s).ok_or_else(|| format!("unknown view {s:?}; expected hot or call"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let data = std::fs::read(&args.profile)
        .with_context(|| format!("reading {}", args.profile.display()))?;
    let label = args
        .profile
        .file_name()
        .map_or_else(|| "profile".to_string(), |n| n.to_string_lossy().into_owned());
    let config = TreeConfig {
        major_indent: args.major_indent,
        minor_indent: args.minor_indent,
    };
    let mut session = ProfileSession::load(&data, label, config)
        .map_err(|e| anyhow!("{}: {e}", args.profile.display()))?;

    if let Some(filter) = &args.filter {
        for direction in [TraversalDirection::HotMethods, TraversalDirection::CallTree] {
            session.set_filter(direction, filter);
        }
    }

    if args.dump {
        let rows = session.rows(args.view);
        let mut out = std::io::stdout().lock();
        writeln!(out, "{} of {}", args.view, session.label())?;
        if rows.is_empty() {
            writeln!(out, "no results")?;
        }
        for row in &rows {
            writeln!(out, "{}", renderer::format_row(row))?;
        }
        return Ok(());
    }

    renderer::run_tui(&mut session, args.view)
}
