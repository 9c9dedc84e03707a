//! Preparación de datasets de golpes de tenis de mesa a partir de
//! grabaciones IMU de teléfono (acelerómetro + giroscopio).
//!
//! Flujo: remuestreo a rejilla común -> fusión de sensores -> detección de
//! picos -> ventanas alrededor de cada pico -> longitud fija -> CSV por clase.
//! `augmentor` genera variantes sintéticas para balancear clases.

pub mod augmentor;
pub mod config;
pub mod csv_loader;
pub mod error;
pub mod peak_detector;
pub mod pipeline;
pub mod resampler;
pub mod segmenter;
pub mod types;


pub use config::{AugmentConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{BatchSummary, ClassOutcome, SegmentPipeline};
