use tracing::debug;

use crate::config::PipelineConfig;

/// Parámetros del detector de golpes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Frecuencia de la señal en Hz
    pub fs: f64,
    /// Umbral = media + thresh_factor * desviación (default: 1.0)
    pub thresh_factor: f64,
    /// Separación mínima entre picos en segundos (default: 0.3)
    pub min_distance_sec: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            fs: 100.0,
            thresh_factor: 1.0,
            min_distance_sec: 0.3,
        }
    }
}

impl From<&PipelineConfig> for DetectorParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            fs: config.fs,
            thresh_factor: config.thresh_factor,
            min_distance_sec: config.min_distance_sec,
        }
    }
}

/// Resultado completo de una detección (para inspección y depuración)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakDetection {
    pub peaks: Vec<usize>,
    pub smoothed: Vec<f64>,
    pub threshold: f64,
}

/// Detector de picos de golpe sobre la magnitud de aceleración
#[derive(Debug, Clone, Copy)]
pub struct PeakDetector {
    params: DetectorParams,
}

impl PeakDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Ventana de suavizado: ~50 ms, mínimo 3 muestras
    pub fn smoothing_window(&self) -> usize {
        ((0.05 * self.params.fs).round() as usize).max(3)
    }

    /// Periodo refractario en muestras
    pub fn min_distance(&self) -> usize {
        (self.params.min_distance_sec * self.params.fs).round() as usize
    }

    /// Índices de los picos detectados, en orden creciente
    pub fn detect(&self, signal: &[f64]) -> Vec<usize> {
        self.detect_detailed(signal).peaks
    }

    pub fn detect_detailed(&self, signal: &[f64]) -> PeakDetection {
        let n = signal.len();
        if n < 3 {
            return PeakDetection::default();
        }

        let smoothed = moving_average(signal, self.smoothing_window());

        let mean = smoothed.iter().sum::<f64>() / n as f64;
        let variance = smoothed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let mut std = variance.sqrt();
        if std == 0.0 {
            std = 1.0;
        }
        let threshold = mean + self.params.thresh_factor * std;

        // Máximos locales (incluye mesetas) por encima del umbral
        let candidates: Vec<usize> = (1..n - 1)
            .filter(|&i| {
                smoothed[i] > threshold
                    && smoothed[i] >= smoothed[i - 1]
                    && smoothed[i] >= smoothed[i + 1]
            })
            .collect();

        let peaks = enforce_min_distance(&candidates, &smoothed, self.min_distance());

        debug!(
            candidatos = candidates.len(),
            picos = peaks.len(),
            umbral = threshold,
            "Detección de picos"
        );

        PeakDetection {
            peaks,
            smoothed,
            threshold,
        }
    }
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new(DetectorParams::default())
    }
}

/// Media móvil centrada de longitud `window`, misma longitud que la entrada.
///
/// Fuera de la señal se cuenta como cero y siempre se divide por `window`,
/// por lo que los extremos quedan atenuados. Con ventana par sobra una
/// muestra a la izquierda.
pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    let n = signal.len();
    if window <= 1 {
        return signal.to_vec();
    }

    let right = (window - 1) / 2;
    let left = window - 1 - right;
    let w = window as f64;

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(left);
            let hi = (i + right).min(n - 1);
            signal[lo..=hi].iter().sum::<f64>() / w
        })
        .collect()
}

/// Recorrido voraz en orden de índice.
///
/// Un candidato se acepta si está al menos `min_dist` muestras después del
/// último pico aceptado; si no, sustituye a ese pico cuando es más fuerte.
/// Una cadena de sustituciones puede desplazar el pico aceptado bastante más
/// allá de su ventana refractaria original.
fn enforce_min_distance(candidates: &[usize], smoothed: &[f64], min_dist: usize) -> Vec<usize> {
    let mut peaks: Vec<usize> = Vec::with_capacity(candidates.len());

    for &idx in candidates {
        match peaks.last_mut() {
            Some(last) if idx - *last < min_dist => {
                if smoothed[idx] > smoothed[*last] {
                    *last = idx;
                }
            }
            _ => peaks.push(idx),
        }
    }

    peaks
}
