//! Run command

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use dbgraft_core::model::StoreSpec;
use dbgraft_engine::{run_plan, RunPlan};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Plan file (TOML); the built-in europe/africa/memory plan otherwise
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store as NAME=LOCATION, repeatable; replaces the plan's stores
    #[arg(long = "store", value_name = "NAME=LOCATION")]
    pub stores: Vec<StoreSpec>,

    /// Store to capture (first store when --store is given without it)
    #[arg(long)]
    pub source: Option<String>,

    /// Transplant target, repeatable, in order
    #[arg(long = "target")]
    pub targets: Vec<String>,

    #[arg(long)]
    pub table: Option<String>,

    #[arg(long)]
    pub column: Option<String>,

    /// LIKE pattern matched against --column
    #[arg(long)]
    pub pattern: Option<String>,

    /// Install the image read-only in every target
    #[arg(long)]
    pub read_only: bool,
}

/// Build the plan from the config file (or the default) and flag overrides
fn build_plan(args: RunArgs) -> Result<RunPlan, Box<dyn std::error::Error>> {
    let mut plan = match &args.config {
        Some(path) => RunPlan::load(path)?,
        None => RunPlan::default(),
    };

    if !args.stores.is_empty() {
        plan.source = args.stores[0].name.clone();
        plan.stores = args.stores;
        plan.targets = None;
    }
    if let Some(source) = args.source {
        plan.source = source;
    }
    if !args.targets.is_empty() {
        plan.targets = Some(args.targets);
    }
    if let Some(table) = args.table {
        plan.probe.table = table;
    }
    if let Some(column) = args.column {
        plan.probe.column = column;
    }
    if let Some(pattern) = args.pattern {
        plan.probe.pattern = pattern;
    }
    if args.read_only {
        plan.transplant_read_only = true;
    }
    Ok(plan)
}

pub fn execute(args: RunArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let plan = build_plan(args)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = run_plan(&plan, &mut out);
    out.flush()?;

    if let Some(err) = &report.failure {
        eprintln!("Error: {}", err);
    }
    for failure in &report.cleanup.close_failures {
        eprintln!("Warning: {}", failure);
    }
    Ok(report.exit_code())
}
