use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use raqueta::config::PipelineConfig;
use raqueta::csv_loader::write_fixed_segment;
use raqueta::pipeline::SegmentPipeline;

/// Inspecciona una grabación: picos detectados, umbral y ventanas
#[derive(Parser, Debug)]
#[command(name = "replay_csv")]
struct Args {
    /// CSV del acelerómetro
    accel: PathBuf,

    /// CSV del giroscopio
    gyro: PathBuf,

    /// Escribe las ventanas en este directorio (seg_NNN.csv)
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Configuración JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => PipelineConfig::default(),
    };
    let pipeline = SegmentPipeline::new(config)?;

    println!("🎞️  Reproduciendo {:?} + {:?}", args.accel, args.gyro);
    let result = pipeline
        .segment_files(&args.accel, &args.gyro)
        .context("No se pudo segmentar la grabación")?;

    let detector = pipeline.detector();
    let detection = detector.detect_detailed(&result.signal.acc_magnitude());
    let grid = result.signal.grid();

    println!(
        "📐 Rejilla: {} muestras a {} Hz ({:.3}s - {:.3}s)",
        result.signal.len(),
        result.signal.fs(),
        grid.iter().next().copied().unwrap_or_default(),
        grid.iter().last().copied().unwrap_or_default()
    );
    println!(
        "📈 Suavizado w={}, umbral {:.4}, separación mínima {} muestras",
        detector.smoothing_window(),
        detection.threshold,
        detector.min_distance()
    );

    println!("\n🏓 {} picos:", result.peaks.len());
    for (n, &peak) in result.peaks.iter().enumerate() {
        println!(
            "  {:>3}. idx {:>6}  t={:>8.3}s  |acc|~={:>8.3}",
            n + 1,
            peak,
            grid[peak],
            detection.smoothed[peak]
        );
    }

    if let Some(dir) = &args.dump {
        fs::create_dir_all(dir)?;
        for (n, segment) in result.segments.iter().enumerate() {
            write_fixed_segment(dir.join(format!("seg_{:03}.csv", n + 1)), segment)?;
        }
        println!("\n💾 {} ventanas en {:?}", result.segments.len(), dir);
    }

    Ok(())
}
