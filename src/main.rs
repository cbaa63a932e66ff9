mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use grab::Downloader;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.to_config();
    if args.output_is_default() {
        println!(
            "Output directory not provided, defaulting to {}",
            config.output_dir.display()
        );
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let started = Instant::now();
        let downloader = Downloader::new(config);

        let report = downloader
            .download(&args.url)
            .await
            .with_context(|| format!("Failed to download {}", args.url))?;

        if report.is_complete() {
            if let Some(expected) = &args.sha256 {
                let hash = grab::hashing::verify_hash(&report.path, expected).await?;
                println!("Verified SHA256: {}", hash);
            }
            println!("File downloaded successfully and saved in {}", report.path.display());
        } else {
            let indices: Vec<usize> = report.missed_chunks.iter().map(|c| c.index).collect();
            eprintln!(
                "Download incomplete: {} chunk(s) missed after retries: {:?}",
                indices.len(),
                indices
            );
            if let Some(meta) = &report.metadata_path {
                eprintln!("Missed chunks recorded in {}", meta.display());
            }
            println!("Partial file saved in {}", report.path.display());
        }
        println!("Download took {:?}", started.elapsed());

        Ok::<(), anyhow::Error>(())
    })
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
