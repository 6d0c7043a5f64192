use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{IndexKind, IndexSpec, Metric, SearchParams};

pub struct Config {
    figment: Figment,
    /// Directory relative storage paths are resolved against.
    base: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("COLDATA_").split("__"));

        Ok(Self { figment, base: None })
    }

    /// Loads from an explicit TOML file on top of the defaults, skipping the
    /// `RUST_ENV` profile files. Relative storage paths are taken relative to
    /// the file's directory.
    pub fn from_file(path: &Path) -> Self {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("COLDATA_").split("__"));
        let base = path.parent().map(Path::to_path_buf);
        Self { figment, base }
    }

    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(base) = &self.base {
            settings.store.uri = resolve_with_base(base, &settings.store.uri);
            settings.vector.uri = resolve_with_base(base, &settings.vector.uri);
            settings.model.snapshot_folder = resolve_with_base(base, &settings.model.snapshot_folder);
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub vector: VectorConfig,
    pub text: ChunkingConfig,
    pub model: ModelConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.text.validate()?;
        self.vector.validate()?;
        if self.vector.metric_type == Metric::InnerProduct && !self.model.normalize_embeddings {
            return Err(Error::InvalidConfig(
                "vector.metric_type = \"IP\" requires model.normalize_embeddings = true".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { uri: "data/lancedb".into(), collection: "dataset".into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Lance,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub backend: VectorBackend,
    pub uri: String,
    pub collection: String,
    pub index_type: IndexKind,
    pub metric_type: Metric,
    pub nlist: usize,
    pub num_sub_vectors: usize,
    pub nprobe: usize,
    pub limit: usize,
    pub renew: bool,
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Lance,
            uri: "data/lancedb".into(),
            collection: "dataset_chunks".into(),
            index_type: IndexKind::IvfFlat,
            metric_type: Metric::InnerProduct,
            nlist: 1024,
            num_sub_vectors: 16,
            nprobe: 32,
            limit: 4,
            renew: true,
            batch_size: 128,
            show_progress: true,
        }
    }
}

impl VectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("vector.batch_size must be > 0".into()));
        }
        if self.limit == 0 {
            return Err(Error::InvalidConfig("vector.limit must be > 0".into()));
        }
        if self.collection.is_empty() {
            return Err(Error::InvalidConfig("vector.collection must not be empty".into()));
        }
        Ok(())
    }

    pub fn index_spec(&self, dimension: usize) -> IndexSpec {
        IndexSpec {
            dimension,
            kind: self.index_type,
            metric: self.metric_type,
            nlist: self.nlist,
            num_sub_vectors: self.num_sub_vectors,
        }
    }

    pub fn search_params(&self) -> SearchParams { SearchParams { nprobe: self.nprobe } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face repo id, or a local directory holding the model files.
    pub model_name: String,
    pub revision: String,
    pub snapshot_folder: String,
    pub device: String,
    pub max_length: usize,
    pub normalize_embeddings: bool,
    /// Use the deterministic hashing embedder instead of a model.
    pub fake: bool,
    pub fake_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "sentence-transformers/all-MiniLM-L6-v2".into(),
            revision: "main".into(),
            snapshot_folder: "output/snapshot".into(),
            device: "cpu".into(),
            max_length: 512,
            normalize_embeddings: true,
            fake: false,
            fake_dim: 384,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Expands `location` and joins it onto `base` when it is a relative local path.
///
/// Absolute paths and `scheme://` URIs come back expanded but otherwise unchanged.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, location: S) -> String {
    let location = location.as_ref();
    let expanded = expand_path(location);
    if location.contains("://") || expanded.is_absolute() || base.as_os_str().is_empty() {
        return expanded.display().to_string();
    }
    base.join(expanded).display().to_string()
}
