use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use splitx::{split_docx, FsSink};

#[derive(Parser)]
#[command(
    name = "splitx",
    version,
    about = "Split a .docx document into standalone section documents at heading boundaries"
)]
struct Cli {
    /// Path to the source .docx file
    input: PathBuf,

    /// Directory where section documents are written
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Prefix joined to every section file name
    #[arg(short, long)]
    prefix: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let extension = cli
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    if extension != "docx" {
        bail!(
            "Invalid file format. Expected .docx file, got .{}\n\
            Note: splitx only supports Word .docx files (not .doc, .xlsx, .zip, etc.)",
            extension
        );
    }

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("could not read {}", cli.input.display()))?;

    let mut sink = FsSink::new(&cli.output_dir);
    let outcome = split_docx(&bytes, cli.prefix.as_deref(), &mut sink);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for id in &outcome.created {
            println!("{id}");
        }
        if let Some(error) = &outcome.error {
            eprintln!("error: {error}");
        }
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
