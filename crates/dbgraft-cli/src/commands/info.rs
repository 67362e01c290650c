//! Info command

use clap::Args;
use dbgraft_core::errors::ExErrorKind;
use dbgraft_store::db::engine_info;

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Also list every compile-time option
    #[arg(long)]
    pub compile_options: bool,
}

pub fn execute(args: InfoArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let info = engine_info()?;

    println!("version: {}", info.version);
    println!("version_number: {}", info.version_number);
    println!("threadsafe: {}", info.threadsafe);
    println!("serialize: {}", info.serialize_supported);
    if args.compile_options {
        for option in &info.compile_options {
            println!("  {}", option);
        }
    }

    if info.serialize_supported {
        Ok(0)
    } else {
        eprintln!("Error: SQLite library was built without serialize support");
        Ok(ExErrorKind::Unsupported.exit_code())
    }
}
