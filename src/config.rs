use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::PipelineResult;

/// Runtime settings: an optional TOML file overlaid by `ROSSMANN_*` variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directories searched, in order, for the two source files
    pub data_dirs: Vec<PathBuf>,
    pub sales_file: String,
    pub store_file: String,
    pub top_n: usize,
    /// The store picker is only offered up to this many distinct stores
    pub store_picker_limit: usize,
    pub log_dir: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut data_dirs = vec![PathBuf::from("data"), PathBuf::from("../data")];
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            data_dirs.push(exe_dir.join("data"));
        }
        Self {
            data_dirs,
            sales_file: "train.csv".to_string(),
            store_file: "store.csv".to_string(),
            top_n: 10,
            store_picker_limit: 200,
            log_dir: None,
            export_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load from `path` (extension optional, file optional) and the environment.
    pub fn load(path: &str) -> PipelineResult<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ROSSMANN")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("data_dirs"),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}
