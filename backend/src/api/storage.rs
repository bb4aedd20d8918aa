//! Upload storage: file name sanitizing and saving uploaded bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use unicode_normalization::UnicodeNormalization;

use crate::parser::SheetFormat;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"));

/// Reduce an uploaded file name to a safe, flat name.
///
/// Accents are folded to ASCII (`Año` → `Ano`), path separators become
/// spaces, whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` is
/// removed and leading/trailing `.`/`_` are stripped. May return an empty
/// string.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Whether the extension names a spreadsheet dialect we can read.
pub fn allowed_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => SheetFormat::from_extension(ext).is_ok(),
        None => false,
    }
}

/// Directory that receives uploaded files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save bytes under an already-sanitized name and return the path.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
