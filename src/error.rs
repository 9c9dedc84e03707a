use std::path::PathBuf;

use thiserror::Error;

use crate::types::SensorKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Datos insuficientes: se necesitan al menos 2 timestamps distintos, hay {found}")]
    InsufficientData { found: usize },

    #[error("Sin solapamiento temporal: acelerómetro [{acc_start:.3}, {acc_end:.3}] s, giroscopio [{gyro_start:.3}, {gyro_end:.3}] s")]
    NoOverlap {
        acc_start: f64,
        acc_end: f64,
        gyro_start: f64,
        gyro_end: f64,
    },

    #[error("Traza demasiado larga: {duration:.1} s (máximo {limit:.1} s); ¿timestamp corrupto?")]
    TraceTooLong { duration: f64, limit: f64 },

    #[error("No se encontró CSV de {kind} en {dir:?}")]
    MissingSourceFile { kind: SensorKind, dir: PathBuf },

    #[error("Número de canales inválido: se esperaban {expected}, hay {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Valor inválido {value:?} en fila {row}, columna {column} de {path:?}")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("Configuración inválida: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
