use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read objectives from {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} has no columns")]
    NoColumns { path: PathBuf },
    #[error("line {line} of {path} has {found} fields but the header has {expected}")]
    ExtraFields {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectiveSource {
    Uploaded(PathBuf),
    Example(PathBuf),
    Missing,
}

impl fmt::Display for ObjectiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveSource::Uploaded(path) => write!(f, "{}", path.display()),
            ObjectiveSource::Example(path) => write!(f, "example {}", path.display()),
            ObjectiveSource::Missing => write!(f, "no objectives file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Objectives {
        source: ObjectiveSource,
        objectives: Vec<String>,
    },
    /// The required column was not found; raw data kept for display only.
    Unrecognized {
        headers: Vec<String>,
        preview: Vec<Vec<String>>,
    },
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// First row longer than the header, as (line, field count).
    overlong: Option<(u64, usize)>,
}

/// Loads objectives from the upload, else the bundled example, else nothing.
///
/// A malformed upload is an error. A missing or unreadable example only
/// degrades to an empty list.
pub fn load_objectives(
    upload: Option<&Path>,
    example: &Path,
    column: Option<&str>,
) -> Result<LoadOutcome, LoadError> {
    if let Some(path) = upload {
        let table = read_path(path)?;
        let outcome = extract(table, column, ObjectiveSource::Uploaded(path.to_path_buf()));
        if let LoadOutcome::Objectives { objectives, .. } = &outcome {
            tracing::info!(path = %path.display(), count = objectives.len(), "loaded objectives");
        }
        return Ok(outcome);
    }

    match read_path(example) {
        Ok(table) => {
            tracing::info!(path = %example.display(), "no objectives uploaded, using the example file");
            Ok(extract(table, column, ObjectiveSource::Example(example.to_path_buf())))
        }
        Err(err) => {
            tracing::warn!(error = %err, "no objectives file available, starting empty");
            Ok(LoadOutcome::Objectives {
                source: ObjectiveSource::Missing,
                objectives: Vec::new(),
            })
        }
    }
}

fn read_path(path: &Path) -> Result<Table, LoadError> {
    let file = std::fs::File::open(path).map_err(|err| LoadError::Csv {
        path: path.to_path_buf(),
        source: csv::Error::from(err),
    })?;
    let table = read_table(file).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if table.headers.is_empty() {
        return Err(LoadError::NoColumns {
            path: path.to_path_buf(),
        });
    }
    if let Some((line, found)) = table.overlong {
        return Err(LoadError::ExtraFields {
            path: path.to_path_buf(),
            line,
            expected: table.headers.len(),
            found,
        });
    }
    Ok(table)
}

/// Short rows are accepted and read as missing trailing fields.
fn read_table<R: Read>(input: R) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    let mut overlong = None;
    for record in reader.records() {
        let record = record?;
        if overlong.is_none() && record.len() > headers.len() {
            let line = record.position().map_or(0, |pos| pos.line());
            overlong = Some((line, record.len()));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table {
        headers,
        rows,
        overlong,
    })
}

fn extract(table: Table, column: Option<&str>, source: ObjectiveSource) -> LoadOutcome {
    let index = match column {
        None => 0,
        Some(name) => match table.headers.iter().position(|h| h.trim() == name) {
            Some(index) => index,
            None => {
                tracing::warn!(
                    column = name,
                    headers = ?table.headers,
                    "required objectives column not found"
                );
                return LoadOutcome::Unrecognized {
                    headers: table.headers,
                    preview: table.rows.into_iter().take(PREVIEW_ROWS).collect(),
                };
            }
        },
    };

    let objectives = table
        .rows
        .into_iter()
        .map(|mut row| {
            if index < row.len() {
                row.swap_remove(index)
            } else {
                String::new()
            }
        })
        .collect();

    LoadOutcome::Objectives { source, objectives }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(raw: &str) -> Table {
        read_table(raw.as_bytes()).unwrap()
    }

    fn objectives(outcome: LoadOutcome) -> Vec<String> {
        match outcome {
            LoadOutcome::Objectives { objectives, .. } => objectives,
            other => panic!("expected objectives, got {other:?}"),
        }
    }

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn single_column_is_taken_whatever_its_header() {
        let outcome = extract(
            table("Meta\nPronunciar /r/\nAmpliar vocabulario\n"),
            None,
            ObjectiveSource::Missing,
        );
        assert_eq!(
            objectives(outcome),
            vec!["Pronunciar /r/".to_string(), "Ampliar vocabulario".to_string()]
        );
    }

    #[test]
    fn two_column_file_keeps_only_first_column() {
        let outcome = extract(
            table("Area,Objetivo\nFonología,Pronunciar /r/\nLéxico,Ampliar vocabulario\n"),
            None,
            ObjectiveSource::Missing,
        );
        assert_eq!(
            objectives(outcome),
            vec!["Fonología".to_string(), "Léxico".to_string()]
        );
    }

    #[test]
    fn named_column_mode_selects_by_header() {
        let outcome = extract(
            table("Area,Objetivo\nFonología,Pronunciar /r/\n"),
            Some("Objetivo"),
            ObjectiveSource::Missing,
        );
        assert_eq!(objectives(outcome), vec!["Pronunciar /r/".to_string()]);
    }

    #[test]
    fn named_column_mode_reports_unrecognized_data() {
        let body: String = std::iter::once("Meta,Nivel".to_string())
            .chain((0..8).map(|i| format!("m{i},{i}")))
            .collect::<Vec<_>>()
            .join("\n");
        match extract(table(&body), Some("Objetivo"), ObjectiveSource::Missing) {
            LoadOutcome::Unrecognized { headers, preview } => {
                assert_eq!(headers, vec!["Meta".to_string(), "Nivel".to_string()]);
                assert_eq!(preview.len(), PREVIEW_ROWS);
                assert_eq!(preview[0], vec!["m0".to_string(), "0".to_string()]);
            }
            other => panic!("expected unrecognized, got {other:?}"),
        }
    }

    #[test]
    fn upload_wins_over_example() {
        let dir = tempfile::tempdir().unwrap();
        let upload = write_csv(dir.path(), "subido.csv", "x\nA\nB\nC\n");
        let example = write_csv(dir.path(), "ejemplo.csv", "Objetivo\nZ\n");

        let outcome = load_objectives(Some(&upload), &example, None).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Objectives {
                source: ObjectiveSource::Uploaded(upload),
                objectives: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            }
        );
    }

    #[test]
    fn example_is_used_without_upload() {
        let dir = tempfile::tempdir().unwrap();
        let example = write_csv(dir.path(), "ejemplo.csv", "Objetivo\nZ\n");
        let outcome = load_objectives(None, &example, None).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Objectives {
                source: ObjectiveSource::Example(example),
                objectives: vec!["Z".to_string()],
            }
        );
    }

    #[test]
    fn missing_example_degrades_to_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = load_objectives(None, &dir.path().join("absent.csv"), None).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Objectives {
                source: ObjectiveSource::Missing,
                objectives: Vec::new(),
            }
        );
    }

    #[test]
    fn malformed_upload_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ragged = write_csv(dir.path(), "roto.csv", "a,b\n1,2\n3,4,5\n");
        let example = write_csv(dir.path(), "ejemplo.csv", "Objetivo\nZ\n");
        let err = load_objectives(Some(&ragged), &example, None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ExtraFields {
                line: 3,
                expected: 2,
                found: 3,
                ..
            }
        ));

        let empty = write_csv(dir.path(), "vacio.csv", "");
        let err = load_objectives(Some(&empty), &example, None).unwrap_err();
        assert!(matches!(err, LoadError::NoColumns { .. }));
    }

    #[test]
    fn short_rows_read_as_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let upload = write_csv(
            dir.path(),
            "corto.csv",
            "Objetivo,Nota\nLeer,bien\nEscribir\n",
        );
        let example = write_csv(dir.path(), "ejemplo.csv", "Objetivo\nZ\n");

        let outcome = load_objectives(Some(&upload), &example, None).unwrap();
        assert_eq!(
            objectives(outcome),
            vec!["Leer".to_string(), "Escribir".to_string()]
        );

        let outcome = load_objectives(Some(&upload), &example, Some("Nota")).unwrap();
        assert_eq!(
            objectives(outcome),
            vec!["bien".to_string(), String::new()]
        );
    }

    #[test]
    fn missing_upload_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let example = write_csv(dir.path(), "ejemplo.csv", "Objetivo\nZ\n");
        let err = load_objectives(Some(&dir.path().join("nope.csv")), &example, None);
        assert!(err.is_err());
    }
}
