//! rfpress - export editor snapshots to PDF and DOCX
//!
//! Usage:
//!   rfpress export proposal.json --format both --out-dir exports
//!   RUST_LOG=debug rfpress export draft.html --title "Q3 Bid"

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use rfpress::{snapshot, ExportConfig, ExportSession};

#[derive(Parser)]
#[command(name = "rfpress")]
#[command(version, about = "Export rich-text editor snapshots to PDF and DOCX", long_about = None)]
#[command(after_help = "EXAMPLES:
    rfpress export proposal.json                 Write proposal PDF to the current directory
    rfpress export draft.html -f docx -o out     Write an editable DOCX into out/
    rfpress export draft.json -f both -t \"Bid\"   Write Bid.pdf and Bid.docx")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a snapshot
    Export(ExportArgs),
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Editor snapshot (JSON or HTML)
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pdf)]
    format: Format,

    /// Document title, used for the file name and metadata
    #[arg(short, long)]
    title: Option<String>,

    /// JSON export configuration
    #[arg(short, long, value_name = "FILE", env = "RFPRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory to write into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pdf,
    Docx,
    Both,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Export(args) => export(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    }
}

fn export(args: ExportArgs) -> rfpress::Result<()> {
    let config = match &args.config {
        Some(path) => ExportConfig::from_json_file(path)?,
        None => ExportConfig::default(),
    };

    let mut document = snapshot::read_file(&args.snapshot)?;
    if let Some(title) = args.title {
        document.title = Some(title);
    }

    let session = ExportSession::new(config);

    if matches!(args.format, Format::Pdf | Format::Both) {
        export_pdf(&session, &document, &args.out_dir)?;
    }
    if matches!(args.format, Format::Docx | Format::Both) {
        let artifact = session.export_docx(&document)?;
        let path = artifact.save_in(&args.out_dir)?;
        println!("{} ({} paragraphs)", path.display(), artifact.units);
    }
    Ok(())
}

#[cfg(feature = "rendering")]
fn export_pdf(
    session: &ExportSession,
    document: &rfpress::Document,
    out_dir: &std::path::Path,
) -> rfpress::Result<()> {
    let mut rasterizer = rfpress::rendering::SkiaRasterizer::new();
    let artifact = session.export_pdf(document, &mut rasterizer)?;
    let path = artifact.save_in(out_dir)?;
    println!("{} ({} pages)", path.display(), artifact.units);
    for diagnostic in &artifact.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    Ok(())
}

#[cfg(not(feature = "rendering"))]
fn export_pdf(
    _session: &ExportSession,
    _document: &rfpress::Document,
    _out_dir: &std::path::Path,
) -> rfpress::Result<()> {
    Err(rfpress::Error::Config(
        "PDF export requires the `rendering` feature".to_string(),
    ))
}
