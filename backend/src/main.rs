//! Marges CLI - margin report per arrival lot
//!
//! ```bash
//! marges report export.csv               # Write "MARGES PAR ARRIVAGES yyyymmdd.csv"
//! marges report export.csv -o out/ --format json
//! marges lots export.csv                 # Buyer groups and lots as JSON
//! marges parse export.csv                # Just parse CSV to JSON
//! marges serve                           # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use marges::{parse_csv_file_auto, run_file, OutputFormat, Settings};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "marges")]
#[command(about = "Margin report per arrival lot from purchase/sale exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the margin report from an export
    Report {
        /// Input CSV export
        input: PathBuf,

        /// Output directory (default: MARGES_OUTPUT_DIR or current dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Print the report instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Show buyer groups, lots and subtotals as JSON
    Lots {
        /// Input CSV export
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => match cli.command {
            Commands::Report {
                input,
                output_dir,
                format,
                stdout,
            } => cmd_report(&input, output_dir, format.into(), stdout, settings),

            Commands::Lots { input, output } => cmd_lots(&input, output.as_deref(), &settings),

            Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

            Commands::Serve { port } => cmd_serve(port, settings).await,
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_report(
    input: &Path,
    output_dir: Option<PathBuf>,
    format: OutputFormat,
    stdout: bool,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match output_dir {
        Some(dir) => settings.with_output_dir(dir),
        None => settings,
    };

    eprintln!("📄 Processing: {}", input.display());
    let output = run_file(input, &settings)?;

    if stdout {
        match format {
            OutputFormat::Csv => output.report.write_csv(io::stdout().lock())?,
            OutputFormat::Json => println!("{}", output.report.to_json_pretty()?),
        }
    } else {
        let path = output.report.save(&settings.output_dir, format)?;
        eprintln!("💾 Saved: {}", path.display());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_lots(input: &Path, output: Option<&Path>, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let result = run_file(input, settings)?;

    for group in &result.groups {
        eprintln!(
            "   {}: {} lots, total {:.2}",
            group.party,
            group.lots.len(),
            group.group_total()
        );
    }

    let json = serde_json::to_string_pretty(&result.groups)?;
    write_output(&json, output)
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)
}

async fn cmd_serve(port: u16, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    marges::server::start_server(port, settings).await?;
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
