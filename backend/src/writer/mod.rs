//! Artifact serialization.
//!
//! Two CSV artifacts per run, named from `(Comision, Actividad)`:
//!
//! | Artifact   | File name                                   | Quoting          |
//! |------------|---------------------------------------------|------------------|
//! | enrollment | `Subir_Alumnos_{Comision}_{Actividad}.csv`  | only when needed |
//! | grade      | `Subir_Notas_{Comision}_{Actividad}.csv`    | every field      |
//!
//! The quoting asymmetry is what the downstream importer expects and must
//! not be unified. Both files are UTF-8, comma-separated, `\n`-terminated,
//! and always carry a header row.
//!
//! Files are rendered in memory, written to a unique temporary file in the
//! destination directory and renamed into place. An existing artifact with
//! the same name is replaced.

use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::{WriteError, WriteResult};
use crate::models::{EnrollmentRow, GradeRow, RunContext, ENROLLMENT_HEADERS, GRADE_HEADERS};

/// Which artifact is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Enrollment,
    Grade,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Enrollment => "Subir_Alumnos",
            ArtifactKind::Grade => "Subir_Notas",
        }
    }

    pub fn quote_style(self) -> csv::QuoteStyle {
        match self {
            ArtifactKind::Enrollment => csv::QuoteStyle::Necessary,
            ArtifactKind::Grade => csv::QuoteStyle::Always,
        }
    }

    /// Deterministic file name; context values are used verbatim.
    pub fn file_name(self, ctx: &RunContext) -> String {
        format!("{}_{}_{}.csv", self.prefix(), ctx.comision, ctx.actividad)
    }
}

/// An artifact persisted on disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub path: PathBuf,
    /// Data rows, header excluded
    pub rows: usize,
}

/// Write the enrollment artifact into `dest_dir`.
pub fn write_enrollment(
    dest_dir: &Path,
    ctx: &RunContext,
    rows: &[EnrollmentRow],
) -> WriteResult<WrittenArtifact> {
    let kind = ArtifactKind::Enrollment;
    let bytes = render(kind, &ENROLLMENT_HEADERS, rows.iter().map(EnrollmentRow::fields))?;
    persist(kind, dest_dir, ctx, &bytes, rows.len())
}

/// Write the grade artifact into `dest_dir`.
pub fn write_grades(
    dest_dir: &Path,
    ctx: &RunContext,
    rows: &[GradeRow],
) -> WriteResult<WrittenArtifact> {
    let kind = ArtifactKind::Grade;
    let bytes = render(kind, &GRADE_HEADERS, rows.iter().map(GradeRow::fields))?;
    persist(kind, dest_dir, ctx, &bytes, rows.len())
}

/// Serialize a header plus records with the artifact's quoting policy.
pub fn render<'a, I, const N: usize>(
    kind: ArtifactKind,
    headers: &[&str; N],
    records: I,
) -> WriteResult<Vec<u8>>
where
    I: IntoIterator<Item = [&'a str; N]>,
{
    let csv_err = |source: csv::Error| WriteError::Csv {
        path: PathBuf::from(kind.prefix()),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .double_quote(true)
        .quote_style(kind.quote_style())
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers).map_err(csv_err)?;
    for record in records {
        writer.write_record(record).map_err(csv_err)?;
    }

    writer.into_inner().map_err(|e| WriteError::Io {
        path: PathBuf::from(kind.prefix()),
        source: std::io::Error::new(e.error().kind(), e.error().to_string()),
    })
}

/// Refuse names that are not a single plain path component.
pub fn check_file_name(file_name: &str) -> WriteResult<()> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == file_name => Ok(()),
        _ => Err(WriteError::UnsafeFileName(file_name.to_string())),
    }
}

fn persist(
    kind: ArtifactKind,
    dest_dir: &Path,
    ctx: &RunContext,
    bytes: &[u8],
    rows: usize,
) -> WriteResult<WrittenArtifact> {
    let file_name = kind.file_name(ctx);
    check_file_name(&file_name)?;

    let path = dest_dir.join(&file_name);
    let tmp_path = dest_dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    if let Err(source) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(WriteError::Io {
            path: tmp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&tmp_path, &path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(WriteError::Io { path, source });
    }

    Ok(WrittenArtifact {
        kind,
        file_name,
        path,
        rows,
    })
}
