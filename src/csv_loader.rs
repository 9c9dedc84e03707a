use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use ndarray::Array2;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::{FixedSegment, SensorKind, SensorTrace, SensorVector, CHANNEL_NAMES, NUM_CHANNELS};

/// Columnas mínimas de un CSV de sensor: tiempo + 3 ejes
const SENSOR_COLUMNS: usize = 4;

/// Carga un CSV de sensor estilo Phyphox:
/// `Time (s),<eje x>,<eje y>,<eje z>[,...]`.
///
/// Las columnas se leen por posición; la cabecera solo se salta. La traza
/// resultante queda ordenada y sin timestamps repetidos.
pub fn load_sensor_trace(path: impl AsRef<Path>) -> Result<SensorTrace> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.len();
    if headers < SENSOR_COLUMNS {
        return Err(PipelineError::ChannelMismatch {
            expected: SENSOR_COLUMNS,
            actual: headers,
        });
    }

    let mut samples: Vec<(f64, SensorVector)> = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row = row_idx + 1;
        if record.len() < SENSOR_COLUMNS {
            return Err(PipelineError::ChannelMismatch {
                expected: SENSOR_COLUMNS,
                actual: record.len(),
            });
        }

        // Un tiempo no finito descarta la fila en SensorTrace; un eje no
        // finito es un error
        let t = parse_field(&record, path, row, 0)?;
        let x = parse_finite(&record, path, row, 1)?;
        let y = parse_finite(&record, path, row, 2)?;
        let z = parse_finite(&record, path, row, 3)?;
        samples.push((t, [x, y, z]));
    }

    let raw = samples.len();
    let trace = SensorTrace::from_samples(samples);
    debug!(
        archivo = %path.display(),
        filas = raw,
        validas = trace.len(),
        "Traza de sensor cargada"
    );
    Ok(trace)
}

fn parse_field(record: &StringRecord, path: &Path, row: usize, column: usize) -> Result<f64> {
    let raw = record.get(column).unwrap_or_default();
    raw.parse::<f64>().map_err(|_| invalid_value(record, path, row, column))
}

/// Como `parse_field`, rechazando `nan` e `inf`
fn parse_finite(record: &StringRecord, path: &Path, row: usize, column: usize) -> Result<f64> {
    let value = parse_field(record, path, row, column)?;
    if !value.is_finite() {
        return Err(invalid_value(record, path, row, column));
    }
    Ok(value)
}

fn invalid_value(record: &StringRecord, path: &Path, row: usize, column: usize) -> PipelineError {
    PipelineError::InvalidValue {
        path: path.to_path_buf(),
        row,
        column,
        value: record.get(column).unwrap_or_default().to_string(),
    }
}

/// Serializa una ventana (L, 6) con cabecera `acc_x,...,gyro_z`.
///
/// El CSV se arma completo en memoria y se escribe con una sola llamada,
/// así un fallo nunca deja un archivo truncado.
pub fn write_fixed_segment(path: impl AsRef<Path>, segment: &FixedSegment) -> Result<()> {
    if segment.ncols() != NUM_CHANNELS {
        return Err(PipelineError::ChannelMismatch {
            expected: NUM_CHANNELS,
            actual: segment.ncols(),
        });
    }

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(CHANNEL_NAMES)?;
    for row in segment.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    let buffer = writer.into_inner().map_err(|e| e.into_error())?;

    fs::write(path, buffer)?;
    Ok(())
}

/// Carga una ventana guardada, localizando las columnas por nombre
pub fn load_fixed_segment(path: impl AsRef<Path>) -> Result<FixedSegment> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let columns: Vec<usize> = CHANNEL_NAMES
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == *name))
        .collect();
    if columns.len() != NUM_CHANNELS {
        return Err(PipelineError::ChannelMismatch {
            expected: NUM_CHANNELS,
            actual: columns.len(),
        });
    }

    let mut values: Vec<f64> = Vec::new();
    let mut rows = 0;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        for &column in &columns {
            values.push(parse_finite(&record, path, row_idx + 1, column)?);
        }
        rows += 1;
    }

    Array2::from_shape_vec((rows, NUM_CHANNELS), values).map_err(|_| {
        PipelineError::ChannelMismatch {
            expected: NUM_CHANNELS,
            actual: columns.len(),
        }
    })
}

/// Archivos `.csv` de un directorio, ordenados por nombre
pub fn list_csv_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Carga todas las ventanas guardadas de una clase, en orden de nombre
pub fn load_class_segments(dir: impl AsRef<Path>) -> Result<Vec<FixedSegment>> {
    list_csv_files(dir)?
        .iter()
        .map(|path| load_fixed_segment(path))
        .collect()
}

/// Primer CSV (orden de nombre) cuyo nombre contiene el patrón del sensor
pub fn find_source_file(dir: impl AsRef<Path>, kind: SensorKind) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let missing = || PipelineError::MissingSourceFile {
        kind,
        dir: dir.to_path_buf(),
    };
    if !dir.is_dir() {
        return Err(missing());
    }

    list_csv_files(dir)?
        .into_iter()
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_lowercase().contains(kind.file_pattern()))
                .unwrap_or(false)
        })
        .ok_or_else(missing)
}

/// Siguiente índice libre para `<clase>_<NNN>.csv` en `class_dir` (1 si no hay)
pub fn next_index_for_class(class_dir: impl AsRef<Path>, class_name: &str) -> Result<usize> {
    let class_dir = class_dir.as_ref();
    if !class_dir.is_dir() {
        return Ok(1);
    }

    let prefix = format!("{class_name}_");
    let max_idx = list_csv_files(class_dir)?
        .iter()
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
        .filter_map(|stem| stem.strip_prefix(&prefix))
        .filter_map(|idx| idx.parse::<usize>().ok())
        .max()
        .unwrap_or(0);

    Ok(max_idx + 1)
}

/// Ventanas escritas para una clase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSegments {
    pub first_index: usize,
    pub paths: Vec<PathBuf>,
}

impl WrittenSegments {
    pub fn count(&self) -> usize {
        self.paths.len()
    }
}

/// Añade las ventanas a `<out_root>/<clase>/` continuando la numeración
/// existente (nunca sobrescribe)
pub fn append_class_segments(
    out_root: impl AsRef<Path>,
    class_name: &str,
    segments: &[FixedSegment],
) -> Result<WrittenSegments> {
    let class_dir = out_root.as_ref().join(class_name);
    fs::create_dir_all(&class_dir)?;

    let first_index = next_index_for_class(&class_dir, class_name)?;
    let mut paths = Vec::with_capacity(segments.len());
    for (offset, segment) in segments.iter().enumerate() {
        let path = class_dir.join(format!("{}_{:03}.csv", class_name, first_index + offset));
        write_fixed_segment(&path, segment)?;
        paths.push(path);
    }

    Ok(WrittenSegments { first_index, paths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_sensor_trace_positional() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "Accelerometer.csv",
            "Time (s),Acceleration x (m/s^2),Acceleration y (m/s^2),Acceleration z (m/s^2),Absolute\n\
             0.02,1,2,3,9\n\
             0.00,4,5,6,9\n\
             0.01,7,8,9,9\n\
             0.01,0,0,0,9\n",
        );

        let trace = load_sensor_trace(&path).unwrap();
        assert_eq!(trace.timestamps(), &[0.0, 0.01, 0.02]);
        assert_eq!(trace.values()[1], [7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_load_sensor_trace_missing_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "gyro.csv", "t,x,y\n0.0,1,2\n");
        assert!(matches!(
            load_sensor_trace(&path),
            Err(PipelineError::ChannelMismatch { expected: 4, actual: 3 })
        ));

        let path = write_file(dir.path(), "gyro2.csv", "t,x,y,z\n0.0,1,2,3\n0.1,1,2\n");
        assert!(matches!(
            load_sensor_trace(&path),
            Err(PipelineError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_load_sensor_trace_bad_number() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "gyro.csv", "t,x,y,z\n0.0,1,abc,3\n");
        match load_sensor_trace(&path) {
            Err(PipelineError::InvalidValue { row, column, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("se esperaba InvalidValue, llegó {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_axis_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "acc.csv", "t,x,y,z\n0.0,1,2,3\n0.01,nan,2,3\n");
        match load_sensor_trace(&path) {
            Err(PipelineError::InvalidValue { row, column, value, .. }) => {
                assert_eq!((row, column), (2, 1));
                assert_eq!(value, "nan");
            }
            other => panic!("se esperaba InvalidValue, llegó {other:?}"),
        }

        let path = write_file(dir.path(), "gyro.csv", "t,x,y,z\n0.0,1,2,inf\n");
        assert!(matches!(
            load_sensor_trace(&path),
            Err(PipelineError::InvalidValue { column: 3, .. })
        ));

        // Un tiempo NaN solo descarta la fila
        let path = write_file(dir.path(), "acc2.csv", "t,x,y,z\nnan,1,2,3\n0.0,4,5,6\n");
        assert_eq!(load_sensor_trace(&path).unwrap().len(), 1);

        let path = write_file(
            dir.path(),
            "seg.csv",
            "acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z\n1,2,3,4,-inf,6\n",
        );
        assert!(matches!(
            load_fixed_segment(&path),
            Err(PipelineError::InvalidValue { column: 4, .. })
        ));
    }

    #[test]
    fn test_segment_write_then_load_by_name() {
        let dir = TempDir::new().unwrap();
        let seg = Array2::from_shape_fn((100, 6), |(i, j)| i as f64 * 0.125 - j as f64 / 3.0);
        let path = dir.path().join("Forehand_001.csv");
        write_fixed_segment(&path, &seg).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z\n"));
        assert_eq!(content.lines().count(), 101);

        let loaded = load_fixed_segment(&path).unwrap();
        assert_eq!(loaded, seg);
    }

    #[test]
    fn test_load_segment_reordered_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "seg.csv",
            "gyro_z,extra,acc_x,acc_y,acc_z,gyro_x,gyro_y\n6,0,1,2,3,4,5\n",
        );
        let seg = load_fixed_segment(&path).unwrap();
        assert_eq!(seg.row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let path = write_file(dir.path(), "bad.csv", "acc_x,acc_y,acc_z\n1,2,3\n");
        assert!(matches!(
            load_fixed_segment(&path),
            Err(PipelineError::ChannelMismatch { expected: 6, actual: 3 })
        ));
    }

    #[test]
    fn test_find_source_file_case_insensitive_sorted() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b_Accelerometer.csv", "t,x,y,z\n");
        write_file(dir.path(), "a_ACCELEROMETER.csv", "t,x,y,z\n");
        write_file(dir.path(), "Gyroscope.csv", "t,x,y,z\n");
        write_file(dir.path(), "accelerometer.txt", "");

        let acc = find_source_file(dir.path(), SensorKind::Accelerometer).unwrap();
        assert_eq!(acc.file_name().unwrap(), "a_ACCELEROMETER.csv");
        let gyro = find_source_file(dir.path(), SensorKind::Gyroscope).unwrap();
        assert_eq!(gyro.file_name().unwrap(), "Gyroscope.csv");
    }

    #[test]
    fn test_find_source_file_missing() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "Accelerometer.csv", "t,x,y,z\n");
        assert!(matches!(
            find_source_file(dir.path(), SensorKind::Gyroscope),
            Err(PipelineError::MissingSourceFile {
                kind: SensorKind::Gyroscope,
                ..
            })
        ));
        assert!(find_source_file(dir.path().join("nope"), SensorKind::Gyroscope).is_err());
    }

    #[test]
    fn test_next_index_and_append() {
        let dir = TempDir::new().unwrap();
        let class_dir = dir.path().join("Smash");
        assert_eq!(next_index_for_class(&class_dir, "Smash").unwrap(), 1);

        fs::create_dir_all(&class_dir).unwrap();
        write_file(&class_dir, "Smash_004.csv", "");
        write_file(&class_dir, "Smash_012.csv", "");
        write_file(&class_dir, "Smash_notes.csv", "");
        write_file(&class_dir, "Other_099.csv", "");
        assert_eq!(next_index_for_class(&class_dir, "Smash").unwrap(), 13);

        let segs = vec![Array2::zeros((100, 6)), Array2::ones((100, 6))];
        let written = append_class_segments(dir.path(), "Smash", &segs).unwrap();
        assert_eq!(written.first_index, 13);
        assert_eq!(written.count(), 2);
        assert!(class_dir.join("Smash_013.csv").is_file());
        assert!(class_dir.join("Smash_014.csv").is_file());
        assert_eq!(next_index_for_class(&class_dir, "Smash").unwrap(), 15);
    }
}
