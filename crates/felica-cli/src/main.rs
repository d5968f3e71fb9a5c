use anyhow::{Context, Result};
use clap::Parser;
use felica_hardware::FelicaTag;
use felica_hardware::mock::{CardImage, MockKeyDeriver, MockTag};
use felica_keys::{CsvKeySource, KeyTable};
use felica_reader::{SessionAborted, SystemSession};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod display;
mod formatters;
mod text_output;

use display::ConsoleSink;
use text_output::TextOutput;

#[derive(Parser)]
#[command(name = "felica-dump")]
#[command(about = "FeliCa Dumper - Extract data from FeliCa cards")]
#[command(version)]
struct Args {
    /// Path to the keys CSV file
    #[arg(short, long, default_value = "keys.csv")]
    keys: PathBuf,

    /// Card image (JSON) to replay
    #[arg(short, long)]
    card: PathBuf,

    /// Also write the results to this text file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // RUST_LOG=debug for detailed logs, default: info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let image = CardImage::from_file(&args.card)
        .with_context(|| format!("Failed to load card image {}", args.card.display()))?;
    let mut tag = MockTag::new(image);
    let deriver = MockKeyDeriver::new();
    let mut keys = KeyTable::new(CsvKeySource::new(&args.keys));

    let mut console = ConsoleSink::new(std::io::stdout().lock());
    console.header(&tag.product());

    let outcome = SystemSession::new(&mut tag, &deriver, &mut keys, &mut console).run();
    let (reports, aborted) = match outcome {
        Ok(reports) => (reports, None),
        Err(SessionAborted { completed, source }) => (completed, Some(source)),
    };

    if let Some(path) = args.output {
        let mut output = TextOutput::new(path, args.keys.display().to_string());
        for report in &reports {
            output.add_system(report);
        }
        output
            .save()
            .with_context(|| format!("Failed to write output file {}", output.path().display()))?;
        info!(
            "Results for {} system(s) saved to {}",
            reports.len(),
            output.path().display()
        );
    }

    if let Some(e) = aborted {
        return Err(anyhow::Error::new(e).context("Card session aborted"));
    }

    Ok(())
}
