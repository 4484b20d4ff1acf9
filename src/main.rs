//! CLI front-end (component M).
//!
//! Wires the flags spec.md §5 names onto [`dwarflint::Criteria`], sets up
//! `tracing-subscriber` the way the teacher's binary crates do it (an
//! env-filter driven by `RUST_LOG`, defaulting to `warn`, rendered through
//! `tracing-tree` for readable nesting), and turns the accumulated error
//! count into the process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use dwarflint::{check_file, Criteria, Reporter};

/// A pedantic structural validator for DWARF debugging information in ELF
/// object files.
#[derive(Debug, Parser)]
#[command(name = "dwarflint", version, about)]
struct Args {
    /// Also check the (often producer-specific) strings area.
    #[arg(long)]
    strict: bool,

    /// Tolerate encodings known to be produced by the GNU toolchain.
    #[arg(long)]
    gnu: bool,

    /// Don't report missing `.debug_*` sections.
    #[arg(short = 'i', long = "ignore-missing")]
    ignore_missing: bool,

    /// Don't print the per-file "No errors" summary line.
    #[arg(short, long)]
    quiet: bool,

    /// ELF object files to check.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2))
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let mut criteria = Criteria::default();
    if args.strict {
        criteria.strict();
    }
    if args.gnu {
        criteria.gnu();
    }
    if args.ignore_missing {
        criteria.ignore_missing();
    }
    if args.quiet {
        criteria.quiet();
    }

    let mut reporter = Reporter::new(criteria);
    for path in &args.paths {
        let errors_before = reporter.error_count();
        if let Err(err) = check_file(path, &mut reporter) {
            eprintln!("dwarflint: {err:#}");
            continue;
        }
        if reporter.error_count() == errors_before && !reporter.quiet() {
            println!("No errors");
        }
    }

    if reporter.error_count() != 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
