use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::resampler::DEFAULT_MAX_RECORDING_SEC;

/// Clases de golpe reconocidas
pub const DEFAULT_CLASSES: [&str; 8] = [
    "Forehand", "Backhand", "Smash", "Push", "Block", "Flick", "Serve", "Chop",
];

/// Parámetros de la segmentación de golpes.
///
/// Se construye una vez por ejecución y se pasa por referencia a cada etapa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clases a procesar, en el orden del resumen final
    pub classes: Vec<String>,
    /// Frecuencia de la rejilla común en Hz (default: 100)
    pub fs: f64,
    /// Muestras por golpe tras normalizar la longitud (default: 100)
    pub segment_samples: usize,
    /// Segundos antes del pico (default: 0.5)
    pub pre_seg_sec: f64,
    /// Segundos después del pico (default: 0.5)
    pub post_seg_sec: f64,
    /// Umbral = media + thresh_factor * desviación (default: 1.0)
    pub thresh_factor: f64,
    /// Periodo refractario entre picos en segundos (default: 0.3)
    pub min_distance_sec: f64,
    /// Carpeta de grabación (en minúsculas) -> clase, para ingesta incremental
    pub folder_classes: BTreeMap<String, String>,
    /// Duración máxima aceptada de una traza en segundos (default: 14400)
    pub max_recording_sec: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classes: DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
            fs: 100.0,
            segment_samples: 100,
            pre_seg_sec: 0.5,
            post_seg_sec: 0.5,
            thresh_factor: 1.0,
            min_distance_sec: 0.3,
            folder_classes: BTreeMap::from([
                ("forehand1".to_string(), "Forehand".to_string()),
                ("backhand1".to_string(), "Backhand".to_string()),
            ]),
            max_recording_sec: DEFAULT_MAX_RECORDING_SEC,
        }
    }
}

impl PipelineConfig {
    /// Carga la configuración desde JSON; los campos ausentes toman el default
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fs.is_finite() && self.fs > 0.0) {
            return Err(invalid(format!("fs debe ser > 0 (es {})", self.fs)));
        }
        if self.segment_samples < 2 {
            return Err(invalid(format!(
                "segment_samples debe ser >= 2 (es {})",
                self.segment_samples
            )));
        }
        for (name, value) in [
            ("pre_seg_sec", self.pre_seg_sec),
            ("post_seg_sec", self.post_seg_sec),
            ("min_distance_sec", self.min_distance_sec),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!("{name} debe ser >= 0 (es {value})")));
            }
        }
        if !(self.max_recording_sec.is_finite() && self.max_recording_sec > 0.0) {
            return Err(invalid(format!(
                "max_recording_sec debe ser > 0 (es {})",
                self.max_recording_sec
            )));
        }
        if !self.thresh_factor.is_finite() {
            return Err(invalid("thresh_factor no es finito".to_string()));
        }
        if let Some(bad) = self
            .classes
            .iter()
            .chain(self.folder_classes.values())
            .find(|c| c.is_empty() || c.contains(['/', '\\', '_']))
        {
            return Err(invalid(format!(
                "nombre de clase inválido {bad:?} (no puede estar vacío ni contener '/', '\\' o '_')"
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = self.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(invalid(format!("clase repetida {dup:?}")));
        }
        Ok(())
    }

    /// Muestras antes del pico
    pub fn pre_samples(&self) -> usize {
        (self.pre_seg_sec * self.fs).round() as usize
    }

    /// Muestras después del pico
    pub fn post_samples(&self) -> usize {
        (self.post_seg_sec * self.fs).round() as usize
    }
}

/// Parámetros de la aumentación sintética para balancear clases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Longitud canónica de las ventanas de entrenamiento (default: 128)
    pub fixed_length: usize,
    /// Desviación del ruido gaussiano aditivo (default: 0.02)
    pub noise_std: f64,
    /// Rango de ganancia por canal (default: [0.97, 1.03])
    pub gain_range: [f64; 2],
    /// Rango del factor de escala temporal (default: [0.92, 1.08])
    pub warp_range: [f64; 2],
    /// Muestras objetivo por clase (default: 150)
    pub target_per_class: usize,
    /// Semilla opcional para ejecuciones reproducibles
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            fixed_length: 128,
            noise_std: 0.02,
            gain_range: [0.97, 1.03],
            warp_range: [0.92, 1.08],
            target_per_class: 150,
            seed: None,
        }
    }
}

impl AugmentConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fixed_length < 2 {
            return Err(invalid(format!(
                "fixed_length debe ser >= 2 (es {})",
                self.fixed_length
            )));
        }
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(invalid(format!(
                "noise_std debe ser >= 0 (es {})",
                self.noise_std
            )));
        }
        for (name, [lo, hi]) in [("gain_range", self.gain_range), ("warp_range", self.warp_range)]
        {
            if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
                return Err(invalid(format!("{name} inválido: [{lo}, {hi}]")));
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> PipelineError {
    PipelineError::InvalidConfig(msg)
}
