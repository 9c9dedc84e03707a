/*
Preparación del dataset de golpes desde grabaciones de teléfono (Phyphox)

Para cada clase configurada busca en <raw-root>/<clase>/ un CSV de
acelerómetro y uno de giroscopio, los alinea a una rejilla común, detecta
los golpes por picos de |acc| y escribe una ventana por golpe en
<out-root>/<clase>/<clase>_NNN.csv (continuando la numeración existente).

Uso:
    ./target/release/raqueta --raw-root data_sets --out-root data_sets_phone
    RUST_LOG=debug ./target/release/raqueta --config pipeline.json
*/

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use raqueta::config::PipelineConfig;
use raqueta::pipeline::SegmentPipeline;

#[derive(Parser, Debug)]
#[command(name = "raqueta")]
#[command(about = "Segmenta golpes de tenis de mesa desde CSVs de acelerómetro y giroscopio", long_about = None)]
struct Args {
    /// Directorio con una subcarpeta por clase
    #[arg(long, default_value = "data_sets")]
    raw_root: PathBuf,

    /// Directorio de salida de las ventanas
    #[arg(long, default_value = "data_sets_phone")]
    out_root: PathBuf,

    /// Configuración JSON (los campos ausentes toman el default)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => PipelineConfig::default(),
    };

    println!("🏓 Preparación de ventanas de golpes");
    println!("   origen:  {:?}", args.raw_root);
    println!("   destino: {:?}", args.out_root);
    println!(
        "   fs={} Hz, ventana=[-{}s, +{}s], {} muestras\n",
        config.fs, config.pre_seg_sec, config.post_seg_sec, config.segment_samples
    );

    let pipeline = SegmentPipeline::new(config).context("Configuración inválida")?;

    let started = Instant::now();
    let summary = pipeline
        .run_batch(&args.raw_root, &args.out_root)
        .with_context(|| format!("No se pudo preparar {:?}", args.out_root))?;

    println!("\n{}", summary);
    println!("✅ Terminado en {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}
