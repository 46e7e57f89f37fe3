pub mod repositories;

use std::path::PathBuf;

use compact_str::{format_compact, CompactString};

use crate::application::repositories::MovieRepository;

/// State shared with every collection handler.
#[derive(Debug, Clone)]
pub struct ServerData {
    pub host: String,
    pub port: u16,
    pub movies: MovieRepository,
}

impl ServerData {
    pub fn new(host: impl Into<String>, port: u16, movie_db: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port,
            movies: MovieRepository::new(movie_db),
        }
    }

    /// The host:port pair announced in the Host response header.
    pub fn address(&self) -> CompactString {
        format_compact!("{}:{}", self.host, self.port)
    }
}
