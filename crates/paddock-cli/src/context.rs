use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use paddock_runtime::{Freshness, Paddock};
use std::path::{Path, PathBuf};

use crate::args::OutputFormat;

/// Per-invocation state shared by every handler
pub struct ExecutionContext {
    data_dir: PathBuf,
    pub format: OutputFormat,
    paddock: OnceCell<Paddock>,
}

impl ExecutionContext {
    pub fn new(data_dir: PathBuf, format: OutputFormat) -> Self {
        Self {
            data_dir,
            format,
            paddock: OnceCell::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Opened on first use so `init` never needs a valid config
    pub fn paddock(&self) -> Result<&Paddock> {
        self.paddock.get_or_try_init(|| {
            Paddock::open(self.data_dir.clone()).with_context(|| {
                format!("failed to open data directory {}", self.data_dir.display())
            })
        })
    }
}

pub fn freshness(refresh: bool) -> Freshness {
    if refresh {
        Freshness::ForceRefresh
    } else {
        Freshness::PreferCached
    }
}
