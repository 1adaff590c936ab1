use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use tweetline_ingest::{BodySource, FetchError, PageDecoder};

/// Captured response bodies replayed as if they came from the platform.
///
/// Files are served in lexical order: the first answers the empty cursor and
/// each file's decoded bottom cursor leads to the file after it. The last
/// file's bottom cursor is answered with an empty final page so a replay
/// ends as exhausted rather than failed.
pub struct CaptureDir {
    bodies: Vec<(PathBuf, Vec<u8>)>,
    by_cursor: HashMap<String, usize>,
    final_cursor: Option<String>,
}

/// A timeline with no entries and no cursor.
const END_OF_CAPTURES: &[u8] = br#"{"data":{"timeline":{"instructions":[]}}}"#;

impl CaptureDir {
    pub fn load(dir: &Path, decoder: &dyn PageDecoder) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Cannot read capture directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut bodies = Vec::with_capacity(paths.len());
        for path in paths {
            let body = std::fs::read(&path)
                .with_context(|| format!("Cannot read capture {}", path.display()))?;
            bodies.push((path, body));
        }

        let mut by_cursor = HashMap::new();
        let mut final_cursor = None;
        if !bodies.is_empty() {
            by_cursor.insert(String::new(), 0);
        }
        for (index, (path, body)) in bodies.iter().enumerate() {
            match decoder.decode(body) {
                Ok(page) if page.next_cursor.is_empty() => {}
                Ok(page) if index + 1 < bodies.len() => {
                    by_cursor.entry(page.next_cursor).or_insert(index + 1);
                }
                Ok(page) => final_cursor = Some(page.next_cursor),
                Err(err) => warn!(file = %path.display(), error = %err, "Capture does not decode"),
            }
        }
        // A cursor that also leads to a captured file keeps serving that file.
        let final_cursor = final_cursor.filter(|cursor| !by_cursor.contains_key(cursor));

        info!(dir = %dir.display(), pages = bodies.len(), "Captures loaded");
        Ok(Self {
            bodies,
            by_cursor,
            final_cursor,
        })
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[async_trait]
impl BodySource for CaptureDir {
    async fn fetch_body(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<Vec<u8>, FetchError> {
        if self.final_cursor.as_deref() == Some(cursor) {
            debug!(query, remaining, cursor, "Captures exhausted, serving final empty page");
            return Ok(END_OF_CAPTURES.to_vec());
        }
        let Some(&index) = self.by_cursor.get(cursor) else {
            return Err(FetchError::Api {
                status: 404,
                message: format!("no capture answers cursor {cursor:?}"),
            });
        };
        let (path, body) = &self.bodies[index];
        debug!(query, remaining, cursor, file = %path.display(), "Serving capture");
        Ok(body.clone())
    }
}
