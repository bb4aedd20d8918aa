//! gradeload CLI
//!
//! ```bash
//! gradeload serve                                   # Start HTTP server (port 3000)
//! gradeload process actas.xlsx --propuesta ING-SIS \
//!     --comision A1 --actividad ALG1 --periodo 2024-1C
//! gradeload inspect actas.xlsx                      # Show normalized + filtered records
//! ```

use clap::{Parser, Subcommand};
use gradeload::{
    filter_records, normalize, process_file, read_sheet_file, ReadOptions, RunContext, Settings,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gradeload")]
#[command(about = "Turn enrollment/grade spreadsheets into upload-ready CSV files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides GRADELOAD_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the pipeline once and write both artifacts
    Process {
        /// Input spreadsheet (xls, xlsx, xlsm, xlsb, ods, csv)
        input: PathBuf,

        #[arg(long)]
        propuesta: String,

        #[arg(long)]
        comision: String,

        #[arg(long)]
        actividad: String,

        /// Periodo lectivo
        #[arg(long)]
        periodo: String,

        /// Output directory (default: GRADELOAD_PROCESSED_DIR or ./processed)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// First row is data, not a header
        #[arg(long)]
        no_header: bool,
    },

    /// Print normalized and filtered records as JSON
    Inspect {
        /// Input spreadsheet
        input: PathBuf,

        /// First row is data, not a header
        #[arg(long)]
        no_header: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Process {
            input,
            propuesta,
            comision,
            actividad,
            periodo,
            out_dir,
            no_header,
        } => {
            let ctx = RunContext::new(propuesta, comision, actividad, periodo);
            cmd_process(&input, &ctx, out_dir, no_header)
        }

        Commands::Inspect {
            input,
            no_header,
            output,
        } => cmd_inspect(&input, no_header, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn read_options(no_header: bool) -> ReadOptions {
    ReadOptions {
        has_header: !no_header,
    }
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(port) = port {
        settings = settings.with_port(port);
    }
    gradeload::server::start_server(settings).await
}

fn cmd_process(
    input: &Path,
    ctx: &RunContext,
    out_dir: Option<PathBuf>,
    no_header: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = out_dir {
        settings = settings.with_processed_dir(dir);
    }
    fs::create_dir_all(&settings.processed_dir)?;

    eprintln!("📄 Processing: {}", input.display());
    let output = process_file(input, ctx, &settings.processed_dir, read_options(no_header))?;

    eprintln!("   Rows:    {}", output.report.total);
    eprintln!("   Kept:    {}", output.report.kept);
    eprintln!("   Dropped: {} (campus), {} (grade)", output.report.dropped_campus, output.report.dropped_grade);
    for warning in &output.warnings {
        eprintln!("   ⚠️  {}", warning);
    }

    println!("{}", output.enrollment.path.display());
    println!("{}", output.grade.path.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_inspect(
    input: &Path,
    no_header: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Inspecting: {}", input.display());

    let table = read_sheet_file(input, read_options(no_header))?;
    eprintln!("   Format: {:?}", table.format);
    if let Some(ref encoding) = table.encoding {
        eprintln!("   Encoding: {}", encoding);
    }

    let records = normalize(table.rows)?;
    let (filtered, report) = filter_records(records.clone());
    eprintln!("✅ {} records, {} kept", report.total, report.kept);

    let json = serde_json::to_string_pretty(&json!({
        "records": records,
        "filtered": filtered,
        "report": report,
    }))?;
    write_output(&json, output)
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
