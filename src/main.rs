//! worldgen - deterministic procedural chunk generation
//!
//! Command-line host: generates a square region around the origin and
//! reports content hashes and scheduler counters.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;
use std::{env, fs};
use tracing::info;
use worldgen_core::ChunkPos;
use worldgen_world::{ChunkResult, EngineConfig, StatsSnapshot, WorldgenEngine};

const DEFAULT_RADIUS: i32 = 2;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting worldgen v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let engine = WorldgenEngine::with_builtin_registries(config)
        .context("failed to build the worldgen engine")?;
    let summary = generate_region(&engine, cli.radius)?;

    for chunk in &summary.chunks {
        info!(chunk = ?chunk.pos, hash = %chunk.hash, "chunk ready");
    }
    info!(
        chunks = summary.chunks.len(),
        elapsed_ms = summary.elapsed_ms,
        pipeline_runs = summary.stats.pipeline_runs,
        markers_resolved = summary.stats.markers_resolved,
        "region generated"
    );
    println!(
        "generated {} chunks (seed {}) in {} ms",
        summary.chunks.len(),
        summary.seed,
        summary.elapsed_ms
    );

    if let Some(path) = &cli.metrics {
        write_summary(path, &summary)?;
        info!(path = %path.display(), "wrote metrics summary");
    }

    info!("worldgen shutting down");
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChunkSummary {
    pos: [i32; 2],
    hash: String,
    biomes: usize,
}

#[derive(Debug, Serialize)]
struct RegionSummary {
    seed: i64,
    radius: i32,
    elapsed_ms: u128,
    chunks: Vec<ChunkSummary>,
    stats: StatsSnapshot,
}

/// Request every chunk of the region at once and collect them as they land.
fn generate_region(engine: &WorldgenEngine, radius: i32) -> Result<RegionSummary> {
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();
    let mut requested = 0usize;
    for z in -radius..=radius {
        for x in -radius..=radius {
            let tx = tx.clone();
            engine.request_with(
                ChunkPos::new(x, z),
                Box::new(move |result: ChunkResult| {
                    let _ = tx.send(result);
                }),
            );
            requested += 1;
        }
    }
    drop(tx);

    let mut delivered = Vec::with_capacity(requested);
    for result in rx.iter().take(requested) {
        delivered.push(result.context("chunk generation failed")?);
    }
    delivered.sort_by_key(|chunk| chunk.pos());

    // Prefer the resident copy: cross-border features may have been carved
    // into a chunk after it was first delivered.
    let mut chunks = Vec::with_capacity(delivered.len());
    for chunk in delivered {
        let pos = chunk.pos();
        let chunk = engine.cached(pos).unwrap_or(chunk);
        let biomes: BTreeSet<_> = chunk.biomes().iter().copied().collect();
        chunks.push(ChunkSummary {
            pos: [pos.x, pos.z],
            hash: chunk.content_hash().to_hex().to_string(),
            biomes: biomes.len(),
        });
    }

    Ok(RegionSummary {
        seed: engine.config().seed,
        radius,
        elapsed_ms: started.elapsed().as_millis(),
        chunks,
        stats: engine.stats(),
    })
}

fn write_summary(path: &Path, summary: &RegionSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    config: Option<PathBuf>,
    seed: Option<i64>,
    radius: i32,
    metrics: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            config: None,
            seed: None,
            radius: DEFAULT_RADIUS,
            metrics: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--seed" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<i64>() {
                            Ok(value) => opts.seed = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--seed must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--seed requires an integer");
                    }
                }
                "--radius" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<i32>() {
                            Ok(value) if value >= 0 => opts.radius = value.min(64),
                            Ok(value) => {
                                tracing::error!(value, "--radius must not be negative");
                            }
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--radius must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--radius requires an integer");
                    }
                }
                "--metrics" => {
                    if let Some(path) = args.next() {
                        opts.metrics = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--metrics requires a file path");
                    }
                }
                other => {
                    tracing::warn!(arg = other, "ignoring unknown argument");
                }
            }
        }

        opts
    }
}
