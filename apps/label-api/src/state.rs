//! Shared application state

use label_core::{load_config, LabelConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::store::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UploadStore>,
    /// Persisted label configuration document
    pub config_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(store: UploadStore, config_path: PathBuf) -> Self {
        Self {
            store: Arc::new(store),
            config_path: Arc::new(config_path),
        }
    }

    /// Fresh copy of the persisted configuration for one request
    pub fn load_config(&self) -> LabelConfig {
        load_config(Some(self.config_path.as_path()))
    }

    /// Directory relative font paths are resolved against
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_path.parent()
    }
}
