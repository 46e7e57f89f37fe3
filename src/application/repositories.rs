use std::fs;
use std::path::PathBuf;

use eyre::OptionExt;
use serde_json::{Map, Value};

use crate::AnyResult;

/// Movie catalog backed by a semicolon separated csv file. The file is
/// read on every lookup, so edits to it show up without a restart.
#[derive(Debug, Clone)]
pub struct MovieRepository {
    path: PathBuf,
}

impl MovieRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the first record whose Title column matches, as a json
    /// object keyed by the header row.
    pub fn find_by_title(&self, title: &str) -> AnyResult<Option<Map<String, Value>>> {
        let raw = fs::read(&self.path)?;
        let text = String::from_utf8_lossy(&raw);
        let mut lines = text.lines();

        let columns: Vec<&str> = lines
            .next()
            .ok_or_eyre("movie database is empty")?
            .split(';')
            .collect();
        let title_column = columns
            .iter()
            .position(|column| *column == "Title")
            .ok_or_eyre("movie database has no Title column")?;

        for line in lines {
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(';').collect();
            if fields.get(title_column).copied() != Some(title) {
                continue;
            }

            let record = columns
                .iter()
                .zip(&fields)
                .map(|(column, field)| ((*column).to_owned(), Value::from(*field)))
                .collect();
            return Ok(Some(record));
        }

        Ok(None)
    }
}
