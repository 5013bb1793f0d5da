use std::{io::Result, path::PathBuf};

use crate::asset::{resolve_path, DATA_DIR};

/// Resolves the path to the small click log used across the tests.
pub fn click_log() -> Result<PathBuf> {
    resolve_path(&[DATA_DIR, "sessions.jsonl"])
}

/// Resolves the path to a click log containing one malformed record.
pub fn malformed_click_log() -> Result<PathBuf> {
    resolve_path(&[DATA_DIR, "sessions_malformed.jsonl"])
}
