//! On-disk cache of preprocessed series.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/input/<filename>.safetensors   samples [C, T]
//! <root>/label/<filename>.safetensors   labels  [L, T]
//! ```
//!
//! Loading is best-effort: any problem reading either file is a miss.
//! Writing reports its error to the caller, which decides whether to care.
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::io::{StFile, StWriter, EXTENSION};
use crate::preprocess::ProcessedSeries;

const INPUT_DIR: &str = "input";
const LABEL_DIR: &str = "label";
const TENSOR_KEY: &str = "data";

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    regenerate: bool,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), regenerate: false }
    }

    /// Treat every lookup as a miss; stores still happen.
    pub fn regenerate(mut self, regenerate: bool) -> Self {
        self.regenerate = regenerate;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_path(&self, filename: &str) -> PathBuf {
        self.root.join(INPUT_DIR).join(format!("{filename}.{EXTENSION}"))
    }

    pub fn label_path(&self, filename: &str) -> PathBuf {
        self.root.join(LABEL_DIR).join(format!("{filename}.{EXTENSION}"))
    }

    /// Cached series for `filename`, or `None` on any miss.
    pub fn try_load(&self, filename: &str) -> Option<ProcessedSeries> {
        if self.regenerate {
            debug!("cache: regenerate requested for {filename}");
            return None;
        }
        match self.load(filename) {
            Ok(series) => {
                info!(
                    "cache: loaded {filename} (samples {:?}, labels {:?})",
                    series.samples().dim(),
                    series.labels().dim()
                );
                Some(series)
            }
            Err(e) => {
                debug!("cache: miss for {filename}: {e:#}");
                None
            }
        }
    }

    fn load(&self, filename: &str) -> Result<ProcessedSeries> {
        let samples = StFile::open(&self.input_path(filename))?.matrix_f32(TENSOR_KEY)?;
        let labels = StFile::open(&self.label_path(filename))?.matrix_f32(TENSOR_KEY)?;
        ProcessedSeries::new(samples, labels)
    }

    /// Write both files, creating `input/` and `label/` as needed.
    pub fn store(&self, filename: &str, series: &ProcessedSeries) -> Result<()> {
        for (path, arr) in [
            (self.input_path(filename), series.samples()),
            (self.label_path(filename), series.labels()),
        ] {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            let mut w = StWriter::new();
            w.add_array(TENSOR_KEY, &arr.view().into_dyn());
            w.write(&path)?;
            info!("cache: saved {}", path.display());
        }
        Ok(())
    }
}
