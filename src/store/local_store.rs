//! Filesystem-backed store for two kinds of records: whole-document JSON
//! metadata (station and variable catalogs) and per-(station, variable)
//! series chunks.
//!
//! A chunk is a parquet file plus a JSON sidecar holding the covered
//! interval. The sidecar is written last: after a torn write the store can
//! only claim less coverage than the data on disk, never more. Any read
//! corruption degrades to a cache miss so callers re-fetch instead of
//! failing.

use crate::store::error::StoreError;
use crate::types::interval::Interval;
use crate::types::observation::ObservationSeries;
use crate::types::variable::VariableId;
use log::{debug, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

#[derive(Debug, Clone)]
pub struct LocalStore {
    metadata_dir: PathBuf,
    data_dir: PathBuf,
    root: PathBuf,
}

/// Sidecar document describing a chunk's covered interval.
#[derive(Debug, Serialize, Deserialize)]
struct ChunkMeta {
    interval: Interval,
}

impl LocalStore {
    /// Opens (and creates, if needed) a store rooted at `root`.
    pub async fn open(root: PathBuf) -> Result<Self, StoreError> {
        let metadata_dir = root.join("metadata");
        let data_dir = root.join("data");
        for dir in [&metadata_dir, &data_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::DirCreation(dir.clone(), e))?;
        }
        Ok(Self {
            metadata_dir,
            data_dir,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.metadata_dir.join(format!("{key}.json"))
    }

    fn chunk_paths(&self, station: &str, variable: VariableId) -> (PathBuf, PathBuf) {
        let stem = format!("{station}_{variable}");
        (
            self.data_dir.join(format!("{stem}.parquet")),
            self.data_dir.join(format!("{stem}.meta.json")),
        )
    }

    /// Reads a metadata document; unreadable or unparsable documents are
    /// logged and reported as a miss.
    pub async fn get_metadata(&self, key: &str) -> Option<Value> {
        let path = self.metadata_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read metadata cache {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Corrupt metadata cache {}: {e}. Treating as miss.",
                    path.display()
                );
                None
            }
        }
    }

    /// Replaces a metadata document wholesale (no merge semantics).
    pub async fn put_metadata(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.metadata_path(key);
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StoreError::MetadataEncode(path.clone(), e))?;
        let dir = self.metadata_dir.clone();
        let target = path.clone();
        task::spawn_blocking(move || write_atomic(&dir, &target, &bytes))
            .await?
            .map_err(|e| StoreError::MetadataWrite(path, e))
    }

    /// O(1) check for a cached chunk, without reading the data.
    pub async fn has_series_chunk(&self, station: &str, variable: VariableId) -> bool {
        let (_, meta_path) = self.chunk_paths(station, variable);
        fs::try_exists(&meta_path).await.unwrap_or(false)
    }

    /// Loads the cached chunk for a (station, variable) pair.
    ///
    /// Returns `None` on a miss or on any corruption: unparsable sidecar,
    /// unreadable parquet, or observations outside the declared interval
    /// (the store must never claim coverage it cannot serve).
    pub async fn get_series_chunk(
        &self,
        station: &str,
        variable: VariableId,
    ) -> Option<(Interval, ObservationSeries)> {
        let (data_path, meta_path) = self.chunk_paths(station, variable);
        let meta_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read chunk sidecar {}: {e}", meta_path.display());
                return None;
            }
        };
        let meta: ChunkMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(
                    "Corrupt chunk sidecar {}: {e}. Treating as miss.",
                    meta_path.display()
                );
                return None;
            }
        };

        let path_clone = data_path.clone();
        let frame = task::spawn_blocking(move || {
            LazyFrame::scan_parquet(&path_clone, Default::default())?.collect()
        })
        .await;
        let series = match frame {
            Ok(Ok(df)) => match ObservationSeries::from_data_frame(&df) {
                Ok(series) => series,
                Err(e) => {
                    warn!(
                        "Corrupt chunk data {}: {e}. Treating as miss.",
                        data_path.display()
                    );
                    return None;
                }
            },
            Ok(Err(e)) => {
                warn!(
                    "Failed to load chunk {}: {e}. Treating as miss.",
                    data_path.display()
                );
                return None;
            }
            Err(e) => {
                warn!("Chunk read task failed for {}: {e}", data_path.display());
                return None;
            }
        };

        if !series
            .iter()
            .all(|obs| meta.interval.contains(obs.timestamp))
        {
            warn!(
                "Chunk {} holds data outside its declared interval {}. Treating as miss.",
                data_path.display(),
                meta.interval
            );
            return None;
        }
        debug!(
            "Cache hit for {station}/{variable}: {} observations in {}",
            series.len(),
            meta.interval
        );
        Some((meta.interval, series))
    }

    /// Replaces the chunk for a (station, variable) pair entirely.
    ///
    /// Callers are responsible for passing the correct union of old and new
    /// data; the store does not merge. The write is all-or-nothing: both
    /// files go through temp-file-and-rename, data before sidecar.
    pub async fn put_series_chunk(
        &self,
        station: &str,
        variable: VariableId,
        interval: Interval,
        series: &ObservationSeries,
    ) -> Result<(), StoreError> {
        let (data_path, meta_path) = self.chunk_paths(station, variable);
        let mut df = series
            .to_data_frame()
            .map_err(|e| StoreError::ChunkWritePolars(data_path.clone(), e))?;

        let dir = self.data_dir.clone();
        let target = data_path.clone();
        task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut temp = NamedTempFile::new_in(&dir)
                .map_err(|e| StoreError::ChunkWriteIo(target.clone(), e))?;
            ParquetWriter::new(&mut temp)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| StoreError::ChunkWritePolars(target.clone(), e))?;
            temp.persist(&target)
                .map_err(|e| StoreError::ChunkWriteIo(target.clone(), e.error))?;
            Ok(())
        })
        .await??;

        let meta_bytes = serde_json::to_vec_pretty(&ChunkMeta { interval })
            .map_err(|e| StoreError::MetadataEncode(meta_path.clone(), e))?;
        let dir = self.data_dir.clone();
        let target = meta_path.clone();
        task::spawn_blocking(move || write_atomic(&dir, &target, &meta_bytes))
            .await?
            .map_err(|e| StoreError::ChunkWriteIo(meta_path, e))?;

        debug!(
            "Cached {} observations for {station}/{variable} covering {interval}",
            series.len()
        );
        Ok(())
    }

    /// Removes every cached document and chunk, leaving an empty store.
    pub async fn clear(&self) -> Result<(), StoreError> {
        fs::remove_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::Clear(self.root.clone(), e))?;
        for dir in [&self.metadata_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::DirCreation(dir.clone(), e))?;
        }
        Ok(())
    }
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
