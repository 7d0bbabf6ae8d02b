//! Delve CLI binary: `run` one research query, `ingest` a directory into the corpus.

mod log_format;
mod logging;
mod run;

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use delve::ChunkerConfig;

use run::{read_query, run_ingest, run_research, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Delve: iterative deep research over your documents and the web")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research a query and print the final report
    Run(RunArgs),
    /// Chunk .txt, .md and .pdf files under a directory into the corpus
    Ingest(IngestArgs),
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Research query; read from stdin when omitted
    query: Vec<String>,

    /// Override DELVE_MAX_ITERATIONS
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_iterations: Option<u32>,

    /// Disable web search even when EXA_API_KEY is set
    #[arg(long)]
    no_web: bool,

    /// Log node enter/exit to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ClapArgs, Debug)]
struct IngestArgs {
    /// Directory to walk
    dir: PathBuf,

    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,

    #[arg(short, long)]
    verbose: bool,
}

impl Command {
    fn verbose(&self) -> bool {
        match self {
            Command::Run(a) => a.verbose,
            Command::Ingest(a) => a.verbose,
        }
    }
}

async fn cmd_run(args: RunArgs) -> Result<(), run::RunError> {
    let query = if args.query.is_empty() {
        let stdin = std::io::stdin();
        read_query(&mut stdin.lock(), &mut std::io::stdout())?
    } else {
        args.query.join(" ")
    };
    let opts = RunOptions {
        max_iterations: args.max_iterations,
        no_web: args.no_web,
        verbose: args.verbose,
    };
    let outcome = run_research(&query, &opts).await?;
    println!("Final Research Report:");
    println!("{}", outcome.report);
    let _ = std::io::Write::flush(&mut std::io::stdout());
    Ok(())
}

async fn cmd_ingest(args: IngestArgs) -> Result<(), run::RunError> {
    let chunker = ChunkerConfig {
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
    };
    let (report, total) = run_ingest(&args.dir, chunker).await?;
    println!(
        "Ingested {} chunks from {} files ({} skipped, {} old chunks replaced); corpus now holds {} chunks.",
        report.chunks,
        report.files,
        report.skipped.len(),
        report.removed,
        total
    );
    for path in &report.skipped {
        eprintln!("skipped: {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let loaded = delve_config::load_and_apply(delve_config::APP_NAME, None);
    logging::init(args.cmd.verbose())?;
    match loaded {
        Ok(report) => tracing::debug!(
            from_dotenv = ?report.from_dotenv,
            from_xdg = ?report.from_xdg,
            "config loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "config files not applied"),
    }

    let result = match args.cmd {
        Command::Run(a) => cmd_run(a).await,
        Command::Ingest(a) => cmd_ingest(a).await,
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "delve failed");
        eprintln!("delve: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn run_joins_query_words() {
        let args = Args::try_parse_from(["delve", "run", "Compare", "X", "and", "Y", "--no-web"]).unwrap();
        match args.cmd {
            Command::Run(a) => {
                assert_eq!(a.query.join(" "), "Compare X and Y");
                assert!(a.no_web);
                assert_eq!(a.max_iterations, None);
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn run_rejects_zero_iterations() {
        assert!(Args::try_parse_from(["delve", "run", "q", "--max-iterations", "0"]).is_err());
        let args = Args::try_parse_from(["delve", "run", "--max-iterations", "4"]).unwrap();
        match args.cmd {
            Command::Run(a) => {
                assert!(a.query.is_empty());
                assert_eq!(a.max_iterations, Some(4));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn ingest_defaults() {
        let args = Args::try_parse_from(["delve", "ingest", "docs", "-v"]).unwrap();
        match args.cmd {
            Command::Ingest(a) => {
                assert_eq!(a.dir, PathBuf::from("docs"));
                assert_eq!(a.chunk_size, 1000);
                assert_eq!(a.chunk_overlap, 200);
                assert!(a.verbose);
            }
            other => panic!("expected ingest, got {:?}", other),
        }
    }
}
