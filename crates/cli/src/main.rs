use anyhow::Result;
use asmtree::{discover_inputs, short_file_name};
use asmtree_core::backends::CilSource;
use asmtree_core::render::render_forest;
use asmtree_core::scan::{scan_files, FileStatus};
use asmtree_core::tree::build_forest;
use asmtree_core::vendor::VendorFilter;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Dependency-tree printer for vendor .NET assemblies.
///
/// This CLI is a thin wrapper around `asmtree-core` (exposed in code as
/// `asmtree_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "asmtree",
    version = asmtree_core::version(),
    about = "Print dependency trees for vendor .NET assemblies",
    long_about = None
)]
struct Cli {
    /// Assembly files or directories to scan. Directories are searched
    /// recursively for `.dll` and `.exe` files.
    paths: Vec<String>,

    /// Invert the trees: each root becomes a most-depended-on assembly and
    /// its children are the assemblies that reference it.
    #[arg(short = 'r', long)]
    reverse: bool,

    /// Emit the forest as JSON instead of ASCII trees.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    scan_command(&cli.paths, cli.reverse, cli.json)
}

/// Scan the given paths and print one dependency tree per root assembly.
///
/// Unreadable files are reported on stderr and skipped; nothing here is
/// fatal, so the process always exits successfully.
fn scan_command(paths: &[String], reverse: bool, json: bool) -> Result<()> {
    let files = discover_inputs(paths);
    debug!(count = files.len(), "discovered input files");

    let filter = VendorFilter::vendor_family();
    let outcome = scan_files(&CilSource, &filter, &files);

    for report in &outcome.reports {
        if let FileStatus::LoadFailed { message } = &report.status {
            eprintln!("{}: {}", short_file_name(&report.path), message);
        }
    }

    let graph = if reverse { outcome.graph.reversed() } else { outcome.graph };
    let forest = build_forest(&graph);

    if json {
        println!("{}", serde_json::to_string_pretty(&forest)?);
    } else {
        print!("{}", render_forest(&forest));
    }

    Ok(())
}
