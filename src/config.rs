use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen: String,
    pub uploads_dir: String,
    pub downloads_dir: String,
    pub max_upload_size: usize,
    pub janitor_interval_secs: u64,
    pub download_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            uploads_dir: "./uploads".to_string(),
            downloads_dir: "./downloads".to_string(),
            max_upload_size: 10 * 1024 * 1024,
            janitor_interval_secs: 30 * 60,
            download_grace_secs: 1,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Path::new("config.toml");
        if config_path.exists() {
            let mut file = std::fs::File::open(config_path).expect("failed to open config.toml");
            let mut contents = String::new();
            file.read_to_string(&mut contents)
                .expect("failed to read config.toml");
            toml::from_str(&contents).expect("failed to parse config.toml")
        } else {
            let default_config = Config::default();
            let toml_string = toml::to_string_pretty(&default_config)
                .expect("failed to serialize default config");
            let mut file =
                std::fs::File::create(config_path).expect("failed to create config.toml");
            file.write_all(toml_string.as_bytes())
                .expect("failed to write config.toml");
            default_config
        }
    }

    pub fn from_env_config() -> Self {
        let mut final_cfg = Self::load();

        // PORT overrides the port half of the configured listen address.
        if let Ok(port) = std::env::var("PORT") {
            if let Some((host, _)) = final_cfg.listen.rsplit_once(':') {
                final_cfg.listen = format!("{host}:{port}");
            }
        }
        std::fs::create_dir_all(&final_cfg.uploads_dir).expect("create uploads dir");
        std::fs::create_dir_all(&final_cfg.downloads_dir).expect("create downloads dir");
        final_cfg
    }

    pub fn max_upload_mb(&self) -> usize {
        self.max_upload_size / (1024 * 1024)
    }
}
