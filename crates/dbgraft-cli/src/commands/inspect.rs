//! Inspect command

use clap::Args;
use dbgraft_core::errors::ExErrorKind;
use dbgraft_core::model::{OpenMode, QueryResult, RowProbe, StoreSpec};
use dbgraft_store::{verify, ConnectionRegistry, VerifyOutcome};

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Database file, or :memory:
    pub location: String,

    #[arg(long, default_value = "countries")]
    pub table: String,

    #[arg(long, default_value = "name")]
    pub column: String,

    #[arg(long, default_value = "%land%")]
    pub pattern: String,
}

fn print_rows(rows: &QueryResult) {
    for (index, row) in rows.iter().enumerate() {
        println!("{}: [{}]", index + 1, row);
    }
}

pub fn execute(args: InspectArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let spec = StoreSpec::new(args.location.clone(), args.location.as_str())
        .with_mode(OpenMode::ReadOnly);
    let probe = RowProbe::new(args.table, args.column, args.pattern);

    let mut registry = ConnectionRegistry::new();
    let conn = registry.open(&spec)?;
    let report = verify(conn, &spec.name, &probe);

    if let Some(tables) = &report.tables {
        println!("tables ({}):", tables.len());
        print_rows(tables);
    }
    if let Some(matches) = &report.matches {
        println!(
            "{}.{} LIKE '{}' ({}):",
            probe.table,
            probe.column,
            probe.pattern,
            matches.len()
        );
        print_rows(matches);
    }

    let mut code = match &report.outcome {
        VerifyOutcome::Inspected => 0,
        VerifyOutcome::EmptySchema => {
            println!("no tables");
            0
        }
        VerifyOutcome::Failed(err) => {
            eprintln!("Error: {}", err);
            err.kind().exit_code()
        }
    };

    let summary = registry.close_all();
    for failure in &summary.failures {
        eprintln!("Warning: {}", failure);
    }
    if code == 0 && !summary.is_clean() {
        code = ExErrorKind::CloseFailed.exit_code();
    }
    Ok(code)
}
