use ndarray::{s, Array1, Array2, ArrayView2};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::resampler::interp;
use crate::types::{FixedSegment, Segment, SixAxisSignal, NUM_CHANNELS};

/// Recorta ventanas de duración fija alrededor de cada pico
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSegmenter {
    pre: usize,
    post: usize,
}

impl WindowSegmenter {
    /// `pre` y `post` en muestras
    pub fn new(pre: usize, post: usize) -> Self {
        Self { pre, post }
    }

    pub fn from_seconds(fs: f64, pre_sec: f64, post_sec: f64) -> Self {
        Self::new(
            (pre_sec * fs).round() as usize,
            (post_sec * fs).round() as usize,
        )
    }

    /// Rango `[start, end)` de la ventana de `peak` en una señal de `len`
    /// filas, o `None` si queda vacía
    pub fn window_bounds(&self, peak: usize, len: usize) -> Option<(usize, usize)> {
        let start = peak.saturating_sub(self.pre);
        let end = (peak + self.post).min(len);
        (end > start).then_some((start, end))
    }

    /// Una ventana por pico, en el orden de los picos; las ventanas vacías
    /// se descartan sin error
    pub fn segment(&self, signal: &SixAxisSignal, peaks: &[usize]) -> Vec<Segment> {
        peaks
            .iter()
            .filter_map(|&peak| self.window_bounds(peak, signal.len()))
            .map(|(start, end)| signal.rows(start, end).to_owned())
            .collect()
    }
}

impl From<&PipelineConfig> for WindowSegmenter {
    fn from(config: &PipelineConfig) -> Self {
        Self::new(config.pre_samples(), config.post_samples())
    }
}

/// `n` puntos equiespaciados en [0, 1]
fn unit_axis(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (n - 1) as f64;
            (0..n).map(|i| i as f64 / last).collect()
        }
    }
}

/// Estira o comprime el eje temporal a `target_len` filas interpolando
/// cada columna sobre un eje normalizado [0, 1]
pub fn resample_rows(segment: ArrayView2<'_, f64>, target_len: usize) -> Result<Array2<f64>> {
    let (t, channels) = segment.dim();
    if t == 0 {
        return Err(PipelineError::InsufficientData { found: 0 });
    }

    let old_x = unit_axis(t);
    let new_x = unit_axis(target_len);

    let mut out = Array2::<f64>::zeros((target_len, channels));
    for j in 0..channels {
        let fp: Vec<f64> = segment.column(j).iter().copied().collect();
        out.column_mut(j)
            .assign(&Array1::from(interp(&new_x, &old_x, &fp)));
    }
    Ok(out)
}

/// Normaliza una ventana (T, 6) a exactamente `target_len` filas.
///
/// Si ya tiene esa longitud se devuelve sin cambios; si no, se remuestrea
/// (nunca se rellena con ceros).
pub fn to_fixed_length(segment: ArrayView2<'_, f64>, target_len: usize) -> Result<FixedSegment> {
    if segment.ncols() != NUM_CHANNELS {
        return Err(PipelineError::ChannelMismatch {
            expected: NUM_CHANNELS,
            actual: segment.ncols(),
        });
    }
    if segment.nrows() == target_len {
        return Ok(segment.to_owned());
    }
    resample_rows(segment, target_len)
}

/// Ajuste del lado del clasificador: recorta la cola o rellena con ceros al
/// final hasta `length` filas
pub fn pad_or_truncate(sample: ArrayView2<'_, f64>, length: usize) -> Array2<f64> {
    let (t, channels) = sample.dim();
    if t >= length {
        return sample.slice(s![..length, ..]).to_owned();
    }
    let mut out = Array2::<f64>::zeros((length, channels));
    out.slice_mut(s![..t, ..]).assign(&sample);
    out
}
