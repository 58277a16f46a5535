//! Command-line entry point: reads an `ImageRequest` and runs it through the in-memory reference
//! pipeline. Signal handling and process supervision are out of scope (spec.md §1); this binary
//! exists to exercise the library end to end.

use anyhow::{Context, Result};
use clap::Parser;
use model_runner::api::ImageRequest;
use model_runner::database::{InMemoryJobTable, InMemoryRegionTable};
use model_runner::image_processor::ImageProcessor;
use model_runner::queue::{InMemoryJobQueue, JobQueue};
use model_runner::region_processor::RegionProcessor;
use model_runner::sink::Sink;
use model_runner::tile_factory::MockTileFactory;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// Path to a JSON file containing an ImageRequest. Reads from stdin if omitted.
	#[arg(long)]
	request: Option<PathBuf>,

	/// Increase log verbosity (-v, -vv, -vvv).
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
}

fn log_level(verbosity: u8) -> log::LevelFilter {
	match verbosity {
		0 => log::LevelFilter::Warn,
		1 => log::LevelFilter::Info,
		2 => log::LevelFilter::Debug,
		_ => log::LevelFilter::Trace,
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new().filter_level(log_level(cli.verbose)).format_timestamp(None).init();

	let raw = match &cli.request {
		Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
		None => std::io::read_to_string(std::io::stdin()).context("reading ImageRequest from stdin")?,
	};
	let request: ImageRequest = serde_json::from_str(&raw).context("parsing ImageRequest JSON")?;
	anyhow::ensure!(request.is_valid(), "ImageRequest failed validation: {request:?}");

	let queue = InMemoryJobQueue::new();
	queue.enqueue(request);

	let job_table = Arc::new(InMemoryJobTable::default());
	let region_table = Arc::new(InMemoryRegionTable::new());
	let tile_factory = Arc::new(MockTileFactory::new());
	let region_processor = Arc::new(RegionProcessor::new(region_table, tile_factory));
	let sinks: Vec<Arc<dyn Sink>> = Vec::new();
	let image_processor = ImageProcessor::new(job_table, region_processor, sinks);

	while let Some(request) = queue.poll() {
		let job_id = Uuid::new_v4().to_string();
		let image_id = request.image_id.clone();
		let result = image_processor.process(&job_id, request, None, (4096, 4096)).await?;
		log::info!(
			"image {image_id} finished with status {:?}: {} feature(s)",
			result.status,
			result.features.len()
		);
		println!("{}", serde_json::to_string_pretty(&result.features)?);
	}

	Ok(())
}
