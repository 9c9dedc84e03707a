use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::unbounded;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::csv_loader::{append_class_segments, find_source_file, load_sensor_trace, WrittenSegments};
use crate::error::{PipelineError, Result};
use crate::peak_detector::{DetectorParams, PeakDetector};
use crate::resampler::GridResampler;
use crate::segmenter::{to_fixed_length, WindowSegmenter};
use crate::types::{FixedSegment, SensorKind, SensorTrace, SixAxisSignal};

/// Motivo por el que una clase o carpeta no aporta ventanas
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingSourceFile(SensorKind),
    InsufficientData,
    NoOverlap,
    NoPeaks,
    /// Hubo picos pero todas sus ventanas quedaron vacías
    NoWindows,
    UnmappedFolder,
    /// Clase sin ventanas guardadas que aumentar
    EmptyClass,
    /// La clase ya alcanza el objetivo de la aumentación
    AlreadyBalanced,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSourceFile(kind) => write!(f, "sin CSV de {kind}"),
            SkipReason::InsufficientData => write!(f, "datos insuficientes"),
            SkipReason::NoOverlap => write!(f, "sin solapamiento acelerómetro/giroscopio"),
            SkipReason::NoPeaks => write!(f, "sin picos detectados"),
            SkipReason::NoWindows => write!(f, "picos sin ventana válida"),
            SkipReason::UnmappedFolder => write!(f, "carpeta sin clase asignada"),
            SkipReason::EmptyClass => write!(f, "sin ventanas de origen"),
            SkipReason::AlreadyBalanced => write!(f, "objetivo ya alcanzado"),
        }
    }
}

/// Resultado de procesar una clase (o una carpeta de grabación)
#[derive(Debug, Clone, PartialEq)]
pub enum ClassOutcome {
    Written(WrittenSegments),
    Skipped(SkipReason),
    Failed(String),
}

impl ClassOutcome {
    /// Ventanas aportadas (0 si se saltó o falló)
    pub fn segments(&self) -> usize {
        match self {
            ClassOutcome::Written(written) => written.count(),
            _ => 0,
        }
    }
}

/// Señal alineada, picos y ventanas normalizadas de un par de archivos
#[derive(Debug, Clone)]
pub struct SwingSegmentation {
    pub signal: SixAxisSignal,
    pub peaks: Vec<usize>,
    pub segments: Vec<FixedSegment>,
}

/// Resumen por entrada (clase o carpeta) de una ejecución
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub entries: Vec<(String, ClassOutcome)>,
}

impl BatchSummary {
    pub fn total_segments(&self) -> usize {
        self.entries.iter().map(|(_, outcome)| outcome.segments()).sum()
    }

    pub fn get(&self, name: &str) -> Option<&ClassOutcome> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Resumen (ventanas por clase) ===")?;
        for (name, outcome) in &self.entries {
            match outcome {
                ClassOutcome::Written(written) => writeln!(
                    f,
                    "{:<10}: {:>3} ventanas (desde #{:03})",
                    name,
                    written.count(),
                    written.first_index
                )?,
                ClassOutcome::Skipped(reason) => {
                    writeln!(f, "{:<10}: {:>3} ventanas ({})", name, 0, reason)?
                }
                ClassOutcome::Failed(msg) => {
                    writeln!(f, "{:<10}: {:>3} ventanas (ERROR: {})", name, 0, msg)?
                }
            }
        }
        write!(f, "Total: {} ventanas", self.total_segments())
    }
}

/// Cadena completa: remuestreo -> fusión -> picos -> ventanas -> longitud fija
#[derive(Debug, Clone)]
pub struct SegmentPipeline {
    config: PipelineConfig,
    resampler: GridResampler,
    detector: PeakDetector,
    segmenter: WindowSegmenter,
}

impl SegmentPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resampler: GridResampler::with_max_duration(config.fs, config.max_recording_sec)?,
            detector: PeakDetector::new(DetectorParams::from(&config)),
            segmenter: WindowSegmenter::from(&config),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector(&self) -> &PeakDetector {
        &self.detector
    }

    /// Segmenta un par de trazas ya cargadas
    pub fn segment_traces(&self, acc: &SensorTrace, gyro: &SensorTrace) -> Result<SwingSegmentation> {
        let signal = self.resampler.merge(acc, gyro)?;
        let peaks = self.detector.detect(&signal.acc_magnitude());

        let segments = self
            .segmenter
            .segment(&signal, &peaks)
            .iter()
            .map(|segment| to_fixed_length(segment.view(), self.config.segment_samples))
            .collect::<Result<Vec<_>>>()?;

        Ok(SwingSegmentation {
            signal,
            peaks,
            segments,
        })
    }

    pub fn segment_files(
        &self,
        acc_path: impl AsRef<Path>,
        gyro_path: impl AsRef<Path>,
    ) -> Result<SwingSegmentation> {
        let acc = load_sensor_trace(acc_path)?;
        let gyro = load_sensor_trace(gyro_path)?;
        self.segment_traces(&acc, &gyro)
    }

    /// Procesa el par acelerómetro/giroscopio de `src_dir` y añade las
    /// ventanas a `<out_root>/<label>/`.
    ///
    /// Las condiciones esperadas de "sin datos" vuelven como `Skipped`; solo
    /// la entrada malformada o los fallos de E/S vuelven como error.
    pub fn process_source_dir(
        &self,
        src_dir: &Path,
        out_root: &Path,
        label: &str,
    ) -> Result<ClassOutcome> {
        let sources = find_source_file(src_dir, SensorKind::Accelerometer)
            .and_then(|acc| Ok((acc, find_source_file(src_dir, SensorKind::Gyroscope)?)));
        let (acc_path, gyro_path) = match sources {
            Ok(paths) => paths,
            Err(PipelineError::MissingSourceFile { kind, dir }) => {
                warn!(clase = label, directorio = %dir.display(), "No se encontró CSV de {}", kind);
                return Ok(ClassOutcome::Skipped(SkipReason::MissingSourceFile(kind)));
            }
            Err(e) => return Err(e),
        };

        info!(
            clase = label,
            acc = %file_name(&acc_path),
            gyro = %file_name(&gyro_path),
            "Procesando"
        );

        let segmentation = match self.segment_files(&acc_path, &gyro_path) {
            Ok(segmentation) => segmentation,
            Err(e @ PipelineError::InsufficientData { .. }) => {
                warn!(clase = label, "{}", e);
                return Ok(ClassOutcome::Skipped(SkipReason::InsufficientData));
            }
            Err(e @ PipelineError::NoOverlap { .. }) => {
                warn!(clase = label, "{}", e);
                return Ok(ClassOutcome::Skipped(SkipReason::NoOverlap));
            }
            Err(e) => return Err(e),
        };

        if segmentation.peaks.is_empty() {
            warn!(clase = label, "No se detectaron picos, no se crean ventanas");
            return Ok(ClassOutcome::Skipped(SkipReason::NoPeaks));
        }
        if segmentation.segments.is_empty() {
            warn!(
                clase = label,
                picos = segmentation.peaks.len(),
                "Ninguna ventana válida alrededor de los picos"
            );
            return Ok(ClassOutcome::Skipped(SkipReason::NoWindows));
        }

        let written = append_class_segments(out_root, label, &segmentation.segments)?;
        info!(
            clase = label,
            ventanas = written.count(),
            desde = written.first_index,
            destino = %out_root.join(label).display(),
            "Ventanas escritas"
        );
        Ok(ClassOutcome::Written(written))
    }

    /// Procesa `<raw_root>/<clase>/`
    pub fn process_class(&self, raw_root: &Path, out_root: &Path, class_name: &str) -> Result<ClassOutcome> {
        self.process_source_dir(&raw_root.join(class_name), out_root, class_name)
    }

    /// Procesa una carpeta de grabación nueva; la clase sale del nombre de
    /// la carpeta vía `folder_classes`
    pub fn process_folder(&self, folder: &Path, out_root: &Path) -> Result<ClassOutcome> {
        let key = folder
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase())
            .unwrap_or_default();

        match self.config.folder_classes.get(&key) {
            Some(label) => self.process_source_dir(folder, out_root, label),
            None => {
                warn!(carpeta = %folder.display(), "Carpeta ignorada (sin clase asignada)");
                Ok(ClassOutcome::Skipped(SkipReason::UnmappedFolder))
            }
        }
    }

    /// Procesa todas las clases configuradas, un hilo por clase.
    ///
    /// El fallo de una clase no detiene a las demás: queda registrado como
    /// `Failed` con 0 ventanas.
    pub fn run_batch(&self, raw_root: &Path, out_root: &Path) -> Result<BatchSummary> {
        fs::create_dir_all(out_root)?;

        let (tx, rx) = unbounded::<(String, ClassOutcome)>();
        thread::scope(|scope| {
            for class_name in &self.config.classes {
                let tx = tx.clone();
                scope.spawn(move || {
                    let outcome = self
                        .process_class(raw_root, out_root, class_name)
                        .unwrap_or_else(|e| {
                            error!(clase = %class_name, "Fallo procesando la clase: {}", e);
                            ClassOutcome::Failed(e.to_string())
                        });
                    if tx.send((class_name.clone(), outcome)).is_err() {
                        error!(clase = %class_name, "Canal de resultados cerrado");
                    }
                });
            }
        });
        drop(tx);

        let mut results: HashMap<String, ClassOutcome> = rx.iter().collect();
        let entries = self
            .config
            .classes
            .iter()
            .map(|name| {
                let outcome = results
                    .remove(name)
                    .unwrap_or_else(|| ClassOutcome::Failed("el worker no devolvió resultado".into()));
                (name.clone(), outcome)
            })
            .collect();

        Ok(BatchSummary { entries })
    }

    /// Recorre las subcarpetas de `new_root` en orden y añade sus ventanas
    /// al dataset existente.
    ///
    /// Es secuencial: varias carpetas pueden apuntar a la misma clase y
    /// comparten su numeración.
    pub fn ingest_folders(&self, new_root: &Path, out_root: &Path) -> Result<BatchSummary> {
        let mut folders: Vec<PathBuf> = fs::read_dir(new_root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        let entries = folders
            .iter()
            .map(|folder| {
                let outcome = self.process_folder(folder, out_root).unwrap_or_else(|e| {
                    error!(carpeta = %folder.display(), "Fallo procesando la carpeta: {}", e);
                    ClassOutcome::Failed(e.to_string())
                });
                (file_name(folder), outcome)
            })
            .collect();

        Ok(BatchSummary { entries })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
