use ndarray::{Array1, Array2, ArrayView1};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::{SensorTrace, SixAxisSignal, UniformSignal, AXES_PER_SENSOR, NUM_CHANNELS};

/// Interpolación lineal de `(xp, fp)` en los puntos `x`.
///
/// `xp` debe ser estrictamente creciente. Fuera de `[xp[0], xp[n-1]]` se
/// repite el valor del extremo, sin extrapolar. En un `x` que coincide con
/// un `xp[i]` devuelve exactamente `fp[i]`.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len();
    if n == 0 {
        return vec![0.0; x.len()];
    }

    x.iter()
        .map(|&xi| {
            // Primer índice con xp[j] > xi
            let j = xp.partition_point(|&v| v <= xi);
            if j == 0 {
                fp[0]
            } else if j == n {
                fp[n - 1]
            } else {
                let i = j - 1;
                let frac = (xi - xp[i]) / (xp[j] - xp[i]);
                fp[i] + frac * (fp[j] - fp[i])
            }
        })
        .collect()
}

/// Rejilla `start, start + dt, ...` hasta `end` inclusive.
///
/// El último punto se incluye con un margen de medio paso, así que la
/// longitud es `floor((end - start) / dt + 0.5) + 1`.
pub fn uniform_grid(start: f64, end: f64, fs: f64) -> Array1<f64> {
    if end < start {
        return Array1::zeros(0);
    }
    let dt = 1.0 / fs;
    let n = ((end - start) / dt + 0.5).floor() as usize + 1;
    Array1::from_iter((0..n).map(|i| start + i as f64 * dt))
}

/// Duración máxima por defecto de una grabación, en segundos (4 h)
pub const DEFAULT_MAX_RECORDING_SEC: f64 = 4.0 * 3600.0;

/// Remuestreo de trazas irregulares a una rejilla uniforme de `fs` Hz
#[derive(Debug, Clone, Copy)]
pub struct GridResampler {
    fs: f64,
    max_duration: f64,
}

impl GridResampler {
    pub fn new(fs: f64) -> Result<Self> {
        Self::with_max_duration(fs, DEFAULT_MAX_RECORDING_SEC)
    }

    /// Como `new`, rechazando trazas que duren más de `max_duration` segundos
    pub fn with_max_duration(fs: f64, max_duration: f64) -> Result<Self> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "frecuencia de muestreo inválida: {fs}"
            )));
        }
        if !(max_duration.is_finite() && max_duration > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "duración máxima inválida: {max_duration}"
            )));
        }
        Ok(Self { fs, max_duration })
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    /// Interpola cada eje de la traza sobre `[t_min, t_max]` a paso `1/fs`
    pub fn resample(&self, trace: &SensorTrace) -> Result<UniformSignal> {
        if trace.len() < 2 {
            return Err(PipelineError::InsufficientData { found: trace.len() });
        }

        let t = trace.timestamps();
        let (t_min, t_max) = (t[0], t[t.len() - 1]);
        // La rejilla se reserva entera: un timestamp corrupto no puede
        // llegar a uniform_grid
        if t_max - t_min > self.max_duration {
            return Err(PipelineError::TraceTooLong {
                duration: t_max - t_min,
                limit: self.max_duration,
            });
        }
        let grid = uniform_grid(t_min, t_max, self.fs);

        let x = grid.to_vec();

        let mut data = Array2::<f64>::zeros((grid.len(), AXES_PER_SENSOR));
        for axis in 0..AXES_PER_SENSOR {
            let column = interp(&x, t, &trace.axis(axis));
            data.column_mut(axis).assign(&Array1::from(column));
        }

        UniformSignal::new(self.fs, grid, data)
    }

    /// Alinea acelerómetro y giroscopio sobre una rejilla común.
    ///
    /// Cada sensor se remuestrea por separado y después ambos se vuelven a
    /// interpolar sobre la rejilla de su intersección temporal, porque las
    /// dos rejillas propias pueden tener orígenes distintos.
    pub fn merge(&self, acc: &SensorTrace, gyro: &SensorTrace) -> Result<SixAxisSignal> {
        let acc_grid = self.resample(acc)?;
        let gyro_grid = self.resample(gyro)?;

        let (acc_start, acc_end) = bounds(&acc_grid)?;
        let (gyro_start, gyro_end) = bounds(&gyro_grid)?;

        let t_start = acc_start.max(gyro_start);
        let t_end = acc_end.min(gyro_end);
        if t_end <= t_start {
            return Err(PipelineError::NoOverlap {
                acc_start,
                acc_end,
                gyro_start,
                gyro_end,
            });
        }

        let grid = uniform_grid(t_start, t_end, self.fs);
        let x = grid.to_vec();

        let mut data = Array2::<f64>::zeros((grid.len(), NUM_CHANNELS));
        for (offset, source) in [(0, &acc_grid), (AXES_PER_SENSOR, &gyro_grid)] {
            let xp = source.grid().to_vec();
            for axis in 0..AXES_PER_SENSOR {
                let fp = column_vec(source.data().column(axis));
                let column = interp(&x, &xp, &fp);
                data.column_mut(offset + axis).assign(&Array1::from(column));
            }
        }

        debug!(
            muestras = grid.len(),
            inicio = t_start,
            fin = t_end,
            "Rejilla común de 6 ejes construida"
        );

        SixAxisSignal::new(UniformSignal::new(self.fs, grid, data)?)
    }
}

fn bounds(signal: &UniformSignal) -> Result<(f64, f64)> {
    match (signal.start(), signal.end()) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(PipelineError::InsufficientData { found: 0 }),
    }
}

fn column_vec(column: ArrayView1<'_, f64>) -> Vec<f64> {
    column.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn trace_from(times: &[f64], f: impl Fn(f64) -> [f64; 3]) -> SensorTrace {
        SensorTrace::from_samples(times.iter().map(|&t| (t, f(t))).collect())
    }

    #[test]
    fn test_interp_clamps_and_interpolates() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 0.0];
        let out = interp(&[-1.0, 0.0, 0.5, 1.0, 1.25, 2.0, 3.0], &xp, &fp);
        assert_eq!(out, vec![0.0, 0.0, 5.0, 10.0, 7.5, 0.0, 0.0]);
    }

    #[test]
    fn test_grid_length_formula() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let start: f64 = rng.gen_range(-5.0..5.0);
            let span: f64 = rng.gen_range(0.02..4.0);
            let fs: f64 = rng.gen_range(20.0..200.0);
            let dt = 1.0 / fs;
            let grid = uniform_grid(start, start + span, fs);
            let expected = ((span / dt) + 0.5).floor() as usize + 1;
            assert_eq!(grid.len(), expected);
            assert_eq!(grid[0], start);
        }
    }

    #[test]
    fn test_resample_grid_length_for_irregular_trace() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut t = 0.3;
        let mut times = Vec::new();
        while t < 2.0 {
            times.push(t);
            t += rng.gen_range(0.0095..0.0105);
        }
        let trace = trace_from(&times, |t| [t, 2.0 * t, -t]);
        let resampler = GridResampler::new(100.0).unwrap();
        let signal = resampler.resample(&trace).unwrap();

        let t_min = times[0];
        let t_max = *times.last().unwrap();
        let expected = ((t_max - t_min) / 0.01 + 0.5).floor() as usize + 1;
        assert_eq!(signal.len(), expected);
        assert_eq!(signal.channels(), 3);

        // Señal lineal: la interpolación la reproduce dentro del rango
        for (i, &g) in signal.grid().iter().enumerate() {
            let g = g.min(t_max);
            assert_abs_diff_eq!(signal.data()[[i, 0]], g, epsilon = 1e-9);
            assert_abs_diff_eq!(signal.data()[[i, 1]], 2.0 * g, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_resample_identity_at_original_samples() {
        // Muestras en puntos exactos de la rejilla, con huecos irregulares
        let indices = [0usize, 1, 3, 4, 7, 8, 9, 12, 15, 16, 20];
        let times: Vec<f64> = indices.iter().map(|&i| i as f64 * (1.0 / 100.0)).collect();
        let trace = trace_from(&times, |t| [(t * 37.0).sin(), t * t, 4.0 - t]);

        let signal = GridResampler::new(100.0).unwrap().resample(&trace).unwrap();
        assert_eq!(signal.len(), 21);

        for (k, &i) in indices.iter().enumerate() {
            let original = trace.values()[k];
            for axis in 0..3 {
                assert_eq!(signal.data()[[i, axis]], original[axis]);
            }
        }
    }

    #[test]
    fn test_resample_insufficient_data() {
        let trace = trace_from(&[1.0, 1.0, 1.0], |_| [0.0; 3]);
        let result = GridResampler::new(100.0).unwrap().resample(&trace);
        assert!(matches!(result, Err(PipelineError::InsufficientData { found: 1 })));
    }

    #[test]
    fn test_merge_uses_overlap_window() {
        let acc_times: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
        let gyro_times: Vec<f64> = (0..=100).map(|i| 0.237 + i as f64 * 0.0107).collect();
        let acc = trace_from(&acc_times, |t| [t, 0.0, 9.81]);
        let gyro = trace_from(&gyro_times, |t| [0.0, t, -t]);

        let merged = GridResampler::new(100.0).unwrap().merge(&acc, &gyro).unwrap();
        assert_eq!(merged.data().ncols(), 6);
        assert_eq!(merged.grid().len(), merged.data().nrows());

        let first = merged.grid()[0];
        assert!(first >= 0.237 - 1e-9);
        assert!(*merged.grid().iter().last().unwrap() <= 1.0 + 0.005 + 1e-9);

        // Canales lineales en el tiempo: se conservan tras las dos pasadas
        assert_abs_diff_eq!(merged.data()[[0, 0]], first, epsilon = 1e-9);
        assert_abs_diff_eq!(merged.data()[[0, 2]], 9.81, epsilon = 1e-12);
        assert_abs_diff_eq!(merged.data()[[0, 4]], first, epsilon = 1e-9);
        assert_abs_diff_eq!(merged.data()[[0, 5]], -first, epsilon = 1e-9);
    }

    #[test]
    fn test_merge_without_overlap_fails() {
        let acc = trace_from(&[0.0, 0.5, 1.0], |_| [1.0; 3]);
        let gyro = trace_from(&[2.0, 2.5, 3.0], |_| [1.0; 3]);
        let result = GridResampler::new(100.0).unwrap().merge(&acc, &gyro);
        assert!(matches!(result, Err(PipelineError::NoOverlap { .. })));
    }

    #[test]
    fn test_invalid_fs() {
        assert!(GridResampler::new(0.0).is_err());
        assert!(GridResampler::new(f64::NAN).is_err());
        assert!(GridResampler::with_max_duration(100.0, 0.0).is_err());
    }

    #[test]
    fn test_corrupt_timestamp_rejected_before_allocating() {
        let trace = trace_from(&[0.0, 0.01, 1.0e13], |_| [1.0; 3]);
        let result = GridResampler::new(100.0).unwrap().resample(&trace);
        match result {
            Err(PipelineError::TraceTooLong { duration, limit }) => {
                assert_eq!(duration, 1.0e13);
                assert_eq!(limit, DEFAULT_MAX_RECORDING_SEC);
            }
            other => panic!("se esperaba TraceTooLong, llegó {other:?}"),
        }

        let resampler = GridResampler::with_max_duration(100.0, 1.0).unwrap();
        assert!(resampler.resample(&trace_from(&[0.0, 1.0], |_| [0.0; 3])).is_ok());
        assert!(matches!(
            resampler.resample(&trace_from(&[0.0, 1.5], |_| [0.0; 3])),
            Err(PipelineError::TraceTooLong { .. })
        ));

        // merge propaga el error del sensor afectado
        let acc = trace_from(&[0.0, 0.5, 1.0], |_| [1.0; 3]);
        let gyro = trace_from(&[0.0, 0.5, 1.0e13], |_| [1.0; 3]);
        assert!(matches!(
            GridResampler::new(100.0).unwrap().merge(&acc, &gyro),
            Err(PipelineError::TraceTooLong { .. })
        ));
    }
}
