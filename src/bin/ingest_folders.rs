/*
Ingesta incremental de grabaciones nuevas.

Cada subcarpeta de <new-root> es una sesión; su nombre (en minúsculas) se
traduce a clase con `folder_classes` de la configuración. Las carpetas sin
clase se ignoran. Las ventanas se añaden al dataset existente sin
sobrescribir nada.
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use raqueta::config::PipelineConfig;
use raqueta::pipeline::SegmentPipeline;

#[derive(Parser, Debug)]
#[command(name = "ingest_folders")]
#[command(about = "Añade ventanas de sesiones nuevas al dataset existente", long_about = None)]
struct Args {
    /// Directorio con una subcarpeta por sesión de grabación
    #[arg(long, default_value = "new_phone_dataset")]
    new_root: PathBuf,

    /// Dataset de destino
    #[arg(long, default_value = "data_sets_phone")]
    out_root: PathBuf,

    /// Configuración JSON (incluye `folder_classes`)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => PipelineConfig::default(),
    };

    println!("📥 Ingesta de {:?} -> {:?}", args.new_root, args.out_root);
    for (folder, class_name) in &config.folder_classes {
        println!("   {:<12} -> {}", folder, class_name);
    }

    let pipeline = SegmentPipeline::new(config).context("Configuración inválida")?;
    let summary = pipeline
        .ingest_folders(&args.new_root, &args.out_root)
        .with_context(|| format!("No se pudo leer {:?}", args.new_root))?;

    println!("\n{}", summary);
    Ok(())
}
