use std::fmt;

use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::error::{PipelineError, Result};

/// Lectura de un sensor de 3 ejes: [x, y, z]
pub type SensorVector = [f64; 3];

/// Ventana variable recortada alrededor de un pico: (T, 6)
pub type Segment = Array2<f64>;

/// Ventana de longitud fija lista para el clasificador: (L, 6)
pub type FixedSegment = Array2<f64>;

/// Constantes del sistema
pub const AXES_PER_SENSOR: usize = 3;
pub const NUM_CHANNELS: usize = 6; // acc_x, acc_y, acc_z, gyro_x, gyro_y, gyro_z
pub const CHANNEL_NAMES: [&str; NUM_CHANNELS] =
    ["acc_x", "acc_y", "acc_z", "gyro_x", "gyro_y", "gyro_z"];

/// Tipo de sensor de origen de un CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

impl SensorKind {
    /// Subcadena (sin distinguir mayúsculas) que identifica el archivo del sensor
    pub fn file_pattern(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyro",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Accelerometer => write!(f, "acelerómetro"),
            SensorKind::Gyroscope => write!(f, "giroscopio"),
        }
    }
}

/// Serie temporal irregular de un sensor de 3 ejes.
///
/// Se construye ya limpia: timestamps finitos, ordenados y estrictamente
/// crecientes. Ante timestamps repetidos se conserva la primera aparición.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorTrace {
    timestamps: Vec<f64>,
    values: Vec<SensorVector>,
}

impl SensorTrace {
    pub fn from_samples(mut samples: Vec<(f64, SensorVector)>) -> Self {
        samples.retain(|(t, _)| t.is_finite());
        // sort_by es estable: la primera aparición de cada tiempo queda delante
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut timestamps: Vec<f64> = Vec::with_capacity(samples.len());
        let mut values = Vec::with_capacity(samples.len());
        for (t, v) in samples {
            if timestamps.last().is_some_and(|&last| t <= last) {
                continue;
            }
            timestamps.push(t);
            values.push(v);
        }

        Self { timestamps, values }
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[SensorVector] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Valores de un eje como vector contiguo (para interpolar)
    pub fn axis(&self, axis: usize) -> Vec<f64> {
        self.values.iter().map(|v| v[axis]).collect()
    }
}

/// Señal muestreada uniformemente a `fs` Hz: rejilla (T,) + matriz (T, C)
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSignal {
    fs: f64,
    grid: Array1<f64>,
    data: Array2<f64>,
}

impl UniformSignal {
    pub fn new(fs: f64, grid: Array1<f64>, data: Array2<f64>) -> Result<Self> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "frecuencia de muestreo inválida: {fs}"
            )));
        }
        if grid.len() != data.nrows() {
            return Err(PipelineError::InvalidConfig(format!(
                "la rejilla tiene {} puntos y la matriz {} filas",
                grid.len(),
                data.nrows()
            )));
        }
        Ok(Self { fs, grid, data })
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn grid(&self) -> &Array1<f64> {
        &self.grid
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.data.ncols()
    }

    pub fn start(&self) -> Option<f64> {
        self.grid.iter().next().copied()
    }

    pub fn end(&self) -> Option<f64> {
        self.grid.iter().last().copied()
    }
}

/// Señal uniforme de 6 canales [acc_x, acc_y, acc_z, gyro_x, gyro_y, gyro_z]
#[derive(Debug, Clone, PartialEq)]
pub struct SixAxisSignal {
    signal: UniformSignal,
}

impl SixAxisSignal {
    pub fn new(signal: UniformSignal) -> Result<Self> {
        if signal.channels() != NUM_CHANNELS {
            return Err(PipelineError::ChannelMismatch {
                expected: NUM_CHANNELS,
                actual: signal.channels(),
            });
        }
        Ok(Self { signal })
    }

    pub fn fs(&self) -> f64 {
        self.signal.fs()
    }

    pub fn grid(&self) -> &Array1<f64> {
        self.signal.grid()
    }

    pub fn data(&self) -> &Array2<f64> {
        self.signal.data()
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Filas [start, end) de la señal
    pub fn rows(&self, start: usize, end: usize) -> ArrayView2<'_, f64> {
        self.signal.data.slice(s![start..end, ..])
    }

    /// Norma euclídea de la aceleración por muestra
    pub fn acc_magnitude(&self) -> Vec<f64> {
        acc_magnitude(&self.signal.data.view())
    }
}

/// Norma euclídea de las 3 primeras columnas de una matriz (T, C)
pub fn acc_magnitude(data: &ArrayView2<'_, f64>) -> Vec<f64> {
    data.slice(s![.., ..AXES_PER_SENSOR])
        .axis_iter(Axis(0))
        .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect()
}
