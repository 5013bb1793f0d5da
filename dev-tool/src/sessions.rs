use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use click_model::SearchSession;
use displaydoc::Display;
use log::debug;
use thiserror::Error;

/// Errors of reading a click log.
#[derive(Debug, Display, Error)]
pub(crate) enum LoadingError {
    /// Failed to read the click log: {0}
    Io(#[from] io::Error),
    /// Invalid session on line {line}: {source}
    Invalid {
        line: usize,
        source: serde_json::Error,
    },
}

/// Reads the sessions of a line delimited json click log.
///
/// Empty lines are skipped. A single invalid line rejects the whole log.
pub(crate) fn load_sessions(path: impl AsRef<Path>) -> Result<Vec<SearchSession>, LoadingError> {
    read_sessions(BufReader::new(File::open(path)?))
}

fn read_sessions(reader: impl BufRead) -> Result<Vec<SearchSession>, LoadingError> {
    let mut sessions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let session = serde_json::from_str(&line).map_err(|source| LoadingError::Invalid {
            line: idx + 1,
            source,
        })?;
        sessions.push(session);
    }
    debug!("Loaded {} sessions", sessions.len());

    Ok(sessions)
}
