/*
Balanceo de clases con muestras sintéticas.

Carga las ventanas de <data-root>/<clase>/, las ajusta a la longitud
canónica y genera variantes (ruido + ganancia + escala temporal) hasta
llegar a --target por clase. Las variantes se escriben a continuación de
las existentes en <out-root>/<clase>/. Una clase con ventanas corruptas
queda como ERROR en el resumen y no detiene a las demás.
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use raqueta::augmentor::Augmentor;
use raqueta::config::{AugmentConfig, DEFAULT_CLASSES};

#[derive(Parser, Debug)]
#[command(name = "augment_dataset")]
#[command(about = "Genera ventanas sintéticas hasta balancear las clases", long_about = None)]
struct Args {
    /// Dataset con las ventanas originales
    #[arg(long, default_value = "data_sets_phone")]
    data_root: PathBuf,

    /// Destino de las variantes (por defecto, el mismo dataset)
    #[arg(long)]
    out_root: Option<PathBuf>,

    /// Muestras objetivo por clase (sobrescribe la configuración)
    #[arg(long)]
    target: Option<usize>,

    /// Semilla para resultados reproducibles (sobrescribe la configuración)
    #[arg(long)]
    seed: Option<u64>,

    /// Configuración JSON de la aumentación
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clases a balancear
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<String>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AugmentConfig::from_json_file(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => AugmentConfig::default(),
    };
    if let Some(target) = args.target {
        config.target_per_class = target;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let out_root = args.out_root.clone().unwrap_or_else(|| args.data_root.clone());
    let classes = args
        .classes
        .clone()
        .unwrap_or_else(|| DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect());

    println!(
        "🧪 Aumentación: objetivo {} ventanas/clase, longitud {}",
        config.target_per_class, config.fixed_length
    );

    let mut augmentor = Augmentor::new(config).context("Configuración inválida")?;
    let summary = augmentor.balance_dataset(&args.data_root, &out_root, &classes);

    println!("\n{}", summary);
    println!("✅ Variantes escritas en {:?}", out_root);
    Ok(())
}
