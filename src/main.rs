//! sqlplot CLI
//!
//! - `process`: regenerate the directive output of a document
//! - `csv2result`: turn a CSV table into RESULT lines
//! - `config`: write the default configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlplot::config::{generate_default_config, Config};
use sqlplot::import::{csv_to_result_lines, parse_delimiter};
use sqlplot::{process_file, write_document, DocumentKind, ProcessOptions, SqliteEngine};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sqlplot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Regenerate plots and tables embedded in documents from SQL directives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ~/.config/sqlplot/config.toml or ./sqlplot.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process the directives of a document and rewrite it in place
    Process {
        /// Document to process (.tex, .py, .js, .csv, .gp)
        file: PathBuf,
        /// SQLite database holding imported tables
        #[arg(short = 'D', long)]
        database: Option<String>,
        /// Print the regenerated document instead of rewriting the file
        #[arg(long)]
        stdout: bool,
        /// Document kind (tex, py, js, csv, gnuplot); detected from the extension by default
        #[arg(short, long)]
        kind: Option<String>,
        /// Neither read nor update the color cache
        #[arg(long)]
        no_color_cache: bool,
    },

    /// Convert a CSV file with a header row into RESULT lines
    Csv2result {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Field delimiter; accepts escapes such as \t
        #[arg(short, long, default_value = ",")]
        delimiter: String,
    },

    /// Write the default configuration
    Config {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("sqlplot={}", config.logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::discover(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Commands::Process {
            file,
            database,
            stdout,
            kind,
            no_color_cache,
        } => {
            let kind = kind
                .as_deref()
                .map(DocumentKind::from_name)
                .transpose()?;
            let database = database.unwrap_or_else(|| config.database.path.clone());
            let color_cache = if no_color_cache {
                None
            } else {
                config.color_cache_path()
            };

            let mut engine = SqliteEngine::open(&database)?;
            let options = ProcessOptions { kind, color_cache };

            let document = process_file(&file, &mut engine, &options)
                .with_context(|| format!("Failed to process {}", file.display()))?;

            if stdout {
                std::io::stdout()
                    .write_all(document.as_bytes())
                    .context("Failed to write to stdout")?;
            } else {
                write_document(&file, &document)?;
            }
        }

        Commands::Csv2result {
            input,
            output,
            delimiter,
        } => {
            let delimiter = parse_delimiter(&delimiter)?;
            let reader = std::fs::File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;

            let lines = match output {
                Some(path) => {
                    let mut writer = std::io::BufWriter::new(
                        std::fs::File::create(&path)
                            .with_context(|| format!("Failed to create {}", path.display()))?,
                    );
                    let lines = csv_to_result_lines(reader, &mut writer, delimiter)?;
                    writer.flush()?;
                    lines
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut writer = stdout.lock();
                    csv_to_result_lines(reader, &mut writer, delimiter)?
                }
            };
            tracing::info!(input = %input.display(), lines, "Converted CSV");
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}
