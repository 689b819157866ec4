use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use zxasm_common::{Assembler, Project};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Hex,
    Bin,
}

#[derive(Parser, Debug)]
#[command(name = "zxasm")]
#[command(about = "Z80 Assembler CLI", long_about = None)]
struct Args {
    /// Input file (use - for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Project file (JSON) describing output files and section placement
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Directory to write binaries and debug information to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Output format: hex prints to stdout, bin writes files
    #[arg(short, long, value_enum, default_value = "hex")]
    format: Format,

    /// Write <file>.debug.json next to each output file
    #[arg(long)]
    debug_info: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let (file_name, source) = if args.input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        ("<stdin>".to_string(), buffer)
    } else {
        let source = std::fs::read_to_string(&args.input).with_context(|| format!("cannot read {}", args.input))?;
        (args.input.clone(), source)
    };

    let mut assembler = Assembler::new();
    if let Some(path) = &args.project {
        let project = Project::load(path).with_context(|| format!("cannot load project {}", path.display()))?;
        assembler = assembler.with_project(project);
    }

    let output = assembler.assemble(&file_name, &source)?;
    tracing::info!(files = output.len(), "assembled {}", file_name);

    for file in output.files() {
        match args.format {
            Format::Hex => println!("{}: {}", file.name(), hex::encode(file.bytes())),
            Format::Bin => {
                let path = args.output.join(file.name());
                std::fs::write(&path, file.bytes()).with_context(|| format!("cannot write {}", path.display()))?;
                tracing::info!(bytes = file.len(), "wrote {}", path.display());
            }
        }
        if args.debug_info {
            let path = args.output.join(format!("{}.debug.json", file.name()));
            let json = serde_json::to_string_pretty(file.debug_info())?;
            std::fs::write(&path, json).with_context(|| format!("cannot write {}", path.display()))?;
        }
    }

    Ok(())
}
