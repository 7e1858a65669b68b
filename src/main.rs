//! Thin CLI launcher. This binary only reads ruleblock text files from
//! disk, calls [`picorules::compile`], and prints the result — all compiler
//! logic lives in the library crate.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::Parser;

use picorules::{compile, Dialect, Options, RuleblockInput};

#[derive(Parser, Debug)]
#[command(name = "picorules", about = "Compile Picorules rule text into dependency-ordered SQL")]
struct Cli {
    /// Target SQL dialect: oracle, mssql, postgresql.
    #[arg(long)]
    dialect: String,

    /// One or more ruleblock source files; the ruleblock name is the file
    /// stem (lowercased).
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Comma-separated subset filter (§6 `subset`).
    #[arg(long)]
    subset: Option<String>,

    /// Include ruleblocks marked inactive.
    #[arg(long)]
    include_inactive: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let dialect = match Dialect::from_str(&cli.dialect) {
        Ok(d) => d,
        Err(_) => {
            eprintln!("unsupported dialect '{}'; expected oracle, mssql, or postgresql", cli.dialect);
            return ExitCode::FAILURE;
        }
    };

    let mut ruleblocks = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("failed to read '{}': {err}", path.display());
                return ExitCode::FAILURE;
            }
        };
        ruleblocks.push(RuleblockInput::new(name, text));
    }

    let mut options = Options::new(dialect);
    options.include_inactive = cli.include_inactive;
    if let Some(subset) = cli.subset {
        options.subset = subset
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    let result = compile(&ruleblocks, &options);

    for warning in &result.warnings {
        log::warn!("{}: {}", warning.ruleblock.as_deref().unwrap_or("-"), warning.message);
    }

    if !result.success {
        for error in &result.errors {
            eprintln!("error: {}", error.message);
        }
        return ExitCode::FAILURE;
    }

    for program in &result.sql {
        println!("{program}\n");
    }

    ExitCode::SUCCESS
}
