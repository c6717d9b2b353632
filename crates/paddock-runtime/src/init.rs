use crate::Result;
use crate::config::{CONFIG_FILE, Config};
use paddock_providers::get_all_providers;
use paddock_types::Provider;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum ConfigStatus {
    Created { config_path: PathBuf },
    LoadedExisting { config_path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct PayloadRoot {
    pub provider: Provider,
    pub root: PathBuf,
    pub enabled: bool,
    pub exists: bool,
}

#[derive(Debug, Clone)]
pub struct InitResult {
    pub data_dir: PathBuf,
    pub config_status: ConfigStatus,
    pub payload_roots: Vec<PayloadRoot>,
    pub cache_path: Option<PathBuf>,
}

pub struct InitService;

impl InitService {
    /// Write a default config if none exists and report where each
    /// provider's payloads are expected
    pub fn run(data_dir: &Path) -> Result<InitResult> {
        std::fs::create_dir_all(data_dir)?;
        let config_path = data_dir.join(CONFIG_FILE);

        let (config, config_status) = if config_path.exists() {
            (
                Config::load_from(&config_path)?,
                ConfigStatus::LoadedExisting {
                    config_path: config_path.clone(),
                },
            )
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            (config, ConfigStatus::Created { config_path })
        };

        let payload_roots = get_all_providers()
            .iter()
            .map(|meta| {
                let root = config.provider_root(meta.provider, data_dir);
                PayloadRoot {
                    provider: meta.provider,
                    exists: root.is_dir(),
                    enabled: config.providers.get(meta.provider).enabled,
                    root,
                }
            })
            .collect();

        let cache_path = config
            .cache
            .enabled
            .then(|| config.cache_path(data_dir));

        Ok(InitResult {
            data_dir: data_dir.to_path_buf(),
            config_status,
            payload_roots,
            cache_path,
        })
    }
}
