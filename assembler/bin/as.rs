use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use sicxe_assembler::catalog::InstructionCatalog;
use sicxe_assembler::error::Error;
use sicxe_assembler::output::Sink;
use sicxe_assembler::Assembler;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// SIC/XE source file
    source: PathBuf,

    /// Instruction catalog
    #[arg(short, long, default_value = "inst.data")]
    catalog: PathBuf,

    /// Object deck destination (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the symbol table here
    #[arg(long)]
    symtab: Option<PathBuf>,

    /// Write the literal table here
    #[arg(long)]
    littab: Option<PathBuf>,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    let source = match fs::read_to_string(&args.source) {
        Ok(source) => source,
        Err(source) => {
            let path = args.source.display().to_string();
            tracing::error!("{}", Error::Source { path, source });
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Parse(error)) => {
            let origin = args.source.display().to_string();
            eprintln!("{}", error.render(&source, Some(&origin), io::stderr().is_terminal()));
            ExitCode::FAILURE
        }
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, source: &str) -> Result<(), Error> {
    let catalog = InstructionCatalog::from_file(&args.catalog)?;
    tracing::debug!(instructions = catalog.len(), "catalog loaded");

    let assembly = Assembler::new(catalog).assemble(source)?;

    if let Some(path) = &args.symtab {
        Sink::file(path)?.write(&assembly.symbols)?;
    }
    if let Some(path) = &args.littab {
        Sink::file(path)?.write(&assembly.literals)?;
    }

    let mut sink = match &args.output {
        Some(path) => Sink::file(path)?,
        None => Sink::stdout(),
    };
    sink.write(&assembly.deck())?;
    Ok(())
}
