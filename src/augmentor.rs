use std::path::Path;

use ndarray::{Array1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{error, info, warn};

use crate::config::AugmentConfig;
use crate::csv_loader::{append_class_segments, load_class_segments};
use crate::error::{PipelineError, Result};
use crate::pipeline::{BatchSummary, ClassOutcome, SkipReason};
use crate::segmenter::{pad_or_truncate, resample_rows, to_fixed_length};
use crate::types::{FixedSegment, NUM_CHANNELS};

/// Generador de variantes sintéticas de una ventana normalizada.
///
/// Aplica, en este orden: ruido gaussiano por elemento, ganancia por canal
/// y un estiramiento temporal que termina en una nueva normalización a la
/// longitud canónica. El ruido va antes del estiramiento para que la
/// interpolación lo suavice.
pub struct Augmentor<R = StdRng> {
    config: AugmentConfig,
    noise: Normal<f64>,
    rng: R,
}

impl Augmentor<StdRng> {
    /// Usa `config.seed` si existe; si no, semilla del sistema
    pub fn new(config: AugmentConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Augmentor<R> {
    pub fn with_rng(config: AugmentConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| PipelineError::InvalidConfig(format!("noise_std: {e}")))?;
        Ok(Self { config, noise, rng })
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    /// Variante perturbada de `sample` con forma (fixed_length, 6)
    pub fn augment(&mut self, sample: ArrayView2<'_, f64>) -> Result<FixedSegment> {
        let (t, channels) = sample.dim();
        if channels != NUM_CHANNELS {
            return Err(PipelineError::ChannelMismatch {
                expected: NUM_CHANNELS,
                actual: channels,
            });
        }
        if t == 0 {
            return Err(PipelineError::InsufficientData { found: 0 });
        }

        // 1) Ruido aditivo
        let noise = &self.noise;
        let rng = &mut self.rng;
        let mut aug = sample.mapv(|v| v + noise.sample(&mut *rng));

        // 2) Ganancia por canal, igual en todos los instantes
        let [gain_lo, gain_hi] = self.config.gain_range;
        let gains = Array1::from_iter(
            (0..channels).map(|_| self.rng.gen_range(gain_lo..=gain_hi)),
        );
        aug *= &gains.insert_axis(Axis(0));

        // 3) Escala temporal y vuelta a la longitud canónica
        let [warp_lo, warp_hi] = self.config.warp_range;
        let scale: f64 = self.rng.gen_range(warp_lo..=warp_hi);
        let warped_len = ((t as f64 * scale).round() as usize).max(2);
        let warped = resample_rows(aug.view(), warped_len)?;

        to_fixed_length(warped.view(), self.config.fixed_length)
    }

    /// Genera las muestras que faltan para llegar a `target`.
    ///
    /// La i-ésima muestra nueva parte del original `i % n`. Si ya hay
    /// suficientes originales, o no hay ninguno, no se genera nada.
    pub fn augment_to_target(
        &mut self,
        originals: &[FixedSegment],
        target: usize,
    ) -> Result<Vec<FixedSegment>> {
        let n = originals.len();
        if n == 0 || n >= target {
            return Ok(Vec::new());
        }

        (0..target - n)
            .map(|i| self.augment(originals[i % n].view()))
            .collect()
    }

    /// Completa `<data_root>/<clase>/` hasta `target_per_class` y añade las
    /// variantes a `<out_root>/<clase>/`.
    ///
    /// Las ventanas guardadas se ajustan antes a `fixed_length` con
    /// `pad_or_truncate`.
    pub fn balance_class(
        &mut self,
        data_root: &Path,
        out_root: &Path,
        class_name: &str,
    ) -> Result<ClassOutcome> {
        let class_dir = data_root.join(class_name);
        if !class_dir.is_dir() {
            warn!(clase = class_name, "Sin carpeta de clase, se omite");
            return Ok(ClassOutcome::Skipped(SkipReason::EmptyClass));
        }

        let fixed_length = self.config.fixed_length;
        let originals: Vec<FixedSegment> = load_class_segments(&class_dir)?
            .iter()
            .map(|segment| pad_or_truncate(segment.view(), fixed_length))
            .collect();
        if originals.is_empty() {
            warn!(clase = class_name, "Carpeta sin ventanas");
            return Ok(ClassOutcome::Skipped(SkipReason::EmptyClass));
        }

        let target = self.config.target_per_class;
        if originals.len() >= target {
            return Ok(ClassOutcome::Skipped(SkipReason::AlreadyBalanced));
        }

        let synthetic = self.augment_to_target(&originals, target)?;
        let written = append_class_segments(out_root, class_name, &synthetic)?;
        info!(
            clase = class_name,
            originales = originals.len(),
            nuevas = written.count(),
            desde = written.first_index,
            "Variantes escritas"
        );
        Ok(ClassOutcome::Written(written))
    }

    /// Balancea cada clase por separado; el fallo de una queda como
    /// `Failed` y no detiene a las demás
    pub fn balance_dataset(
        &mut self,
        data_root: &Path,
        out_root: &Path,
        classes: &[String],
    ) -> BatchSummary {
        let entries = classes
            .iter()
            .map(|class_name| {
                let outcome = self
                    .balance_class(data_root, out_root, class_name)
                    .unwrap_or_else(|e| {
                        error!(clase = %class_name, "Fallo aumentando la clase: {}", e);
                        ClassOutcome::Failed(e.to_string())
                    });
                (class_name.clone(), outcome)
            })
            .collect();

        BatchSummary { entries }
    }
}
