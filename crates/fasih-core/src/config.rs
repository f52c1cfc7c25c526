//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + an optional
//! explicit file + `APP_*` env vars (`__` separates nesting levels), then
//! extracts typed [`Settings`] with defaults for every key.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], with `extra` merged over the environment files.
    pub fn load_with(extra: Option<&Path>) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        if let Some(path) = extra {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file {} does not exist",
                    path.display()
                ))
                .into());
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, env_name: "test".to_string() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        match self.env_name.as_str() {
            "prod" | "production" => {
                if self.get::<bool>("embedding.use_fake").unwrap_or(false) {
                    return Err(Error::InvalidConfig(
                        "fake embeddings are not allowed in production".to_string(),
                    )
                    .into());
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        self.retrieval.validate()?;
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }
        if self.embedding.use_fake && self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub corpus_path: String,
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            corpus_path: "data/processed/all_chunks_final.json".to_string(),
            index_dir: "data/vectordb".to_string(),
        }
    }
}

impl DataSettings {
    pub fn corpus_path(&self) -> PathBuf {
        expand_path(&self.corpus_path)
    }

    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }
}

/// Tuning knobs of the retrieval pipeline.
///
/// The fusion blend and RRF rescale were tuned by hand on the seven odes and
/// are kept configurable rather than fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub rrf_k: f32,
    pub score_blend: f32,
    pub rrf_scale: f32,
    pub exact_confidence: f32,
    pub over_fetch: usize,
    pub default_k: usize,
    pub default_threshold: f32,
    pub unify_letters: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            lexical_weight: 0.7,
            semantic_weight: 0.3,
            rrf_k: 60.0,
            score_blend: 0.7,
            rrf_scale: 10.0,
            exact_confidence: 0.9,
            over_fetch: 2,
            default_k: 5,
            default_threshold: 0.0,
            unify_letters: true,
        }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.lexical_weight < 0.0 || self.semantic_weight < 0.0 {
            return Err(Error::InvalidConfig("retrieval weights must be non-negative".into()));
        }
        if self.lexical_weight + self.semantic_weight <= 0.0 {
            return Err(Error::InvalidConfig("retrieval weights must not sum to zero".into()));
        }
        if self.rrf_k <= 0.0 {
            return Err(Error::InvalidConfig(format!("retrieval.rrf_k must be > 0, got {}", self.rrf_k)));
        }
        if !(0.0..=1.0).contains(&self.score_blend) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.score_blend must be within [0, 1], got {}",
                self.score_blend
            )));
        }
        if self.over_fetch == 0 {
            return Err(Error::InvalidConfig("retrieval.over_fetch must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
    pub batch_size: usize,
    pub device: DeviceKind,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, max_len: 512, use_fake: false, fake_dim: 768, batch_size: 32, device: DeviceKind::Auto }
    }
}

/// Where the encoder runs. `auto` takes Metal when it is compiled in and present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Auto,
    Cpu,
    Metal,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let config = Config::from_figment(Figment::new());
        let settings = config.settings().expect("settings");
        assert_eq!(settings, Settings::default());
        assert!((settings.retrieval.lexical_weight - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.retrieval.over_fetch, 2);
    }

    #[test]
    fn toml_overrides_single_keys() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("fasih.toml");
        std::fs::write(&path, "[retrieval]\nrrf_k = 30.0\n[embedding]\nuse_fake = true\n")
            .expect("write");
        let config = Config::from_figment(Figment::new().merge(Toml::file(&path)));
        let settings = config.settings().expect("settings");
        assert!((settings.retrieval.rrf_k - 30.0).abs() < f32::EPSILON);
        assert!((settings.retrieval.score_blend - 0.7).abs() < f32::EPSILON);
        assert!(settings.embedding.use_fake);
        assert_eq!(config.get::<f32>("retrieval.rrf_k").expect("key"), 30.0);
    }

    #[test]
    fn invalid_blend_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.score_blend = 1.5;
        let config = Config::from_figment(Figment::from(Serialized::defaults(settings)));
        assert!(matches!(
            config.settings().map_err(|e| e.downcast::<Error>()),
            Err(Ok(Error::InvalidConfig(_)))
        ));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut retrieval = RetrievalSettings::default();
        retrieval.lexical_weight = 0.0;
        retrieval.semantic_weight = 0.0;
        assert!(retrieval.validate().is_err());
    }

    #[test]
    fn device_is_parsed_and_unknown_names_fail() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("fasih.toml");
        std::fs::write(&path, "[embedding]\ndevice = \"cpu\"\n").expect("write");
        let config = Config::from_figment(Figment::new().merge(Toml::file(&path)));
        assert_eq!(config.settings().expect("settings").embedding.device, DeviceKind::Cpu);
        assert_eq!(Settings::default().embedding.device, DeviceKind::Auto);

        std::fs::write(&path, "[embedding]\ndevice = \"gpu\"\n").expect("write");
        let config = Config::from_figment(Figment::new().merge(Toml::file(&path)));
        assert!(config.settings().is_err());
    }
}
