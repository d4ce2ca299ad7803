//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_CHUNKING__LENGTH`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONTENT_STORE_FILE: &str = "content_store.json";
pub const VECTOR_INDEX_DIR: &str = "lancedb";

pub struct Config {
    figment: Figment,
    base: Option<PathBuf>,
}

impl Config {
    /// Config files and relative `paths.*` both resolve against the current directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::layered(Path::new("."), None)
    }

    /// Like [`Config::load`], with config files looked up under `base` and
    /// relative `paths.*` resolved against it.
    pub fn load_in(base: &Path) -> anyhow::Result<Self> {
        Self::layered(base, Some(base.to_path_buf()))
    }

    fn layered(dir: &Path, base: Option<PathBuf>) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The full typed settings tree, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        settings.base_dir.clone_from(&self.base);
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub rerank: RerankConfig,
    pub convert: ConvertConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    /// Directory relative `paths.*` entries resolve against; the process
    /// working directory when unset.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        if self.rerank.provider == RerankProvider::Http && self.rerank.url.trim().is_empty() {
            return Err(Error::InvalidConfig("rerank.url is required for the http reranker".into()));
        }
        Ok(())
    }

    pub fn input_dir(&self) -> PathBuf {
        self.resolve(&self.paths.input_dir)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.resolve(&self.paths.storage_dir)
    }

    fn resolve(&self, p: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => resolve_with_base(base, p),
            None => expand_path(p),
        }
    }

    pub fn content_store_path(&self) -> PathBuf {
        self.storage_dir().join(CONTENT_STORE_FILE)
    }

    pub fn vector_index_path(&self) -> PathBuf {
        self.storage_dir().join(VECTOR_INDEX_DIR)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: String,
    pub storage_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { input_dir: "./data".into(), storage_dir: "./storage".into() }
    }
}

/// Window length and overlap for the splitter, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub length: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { length: 1000, overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 {
            return Err(Error::InvalidConfig("chunking.length must be > 0".into()));
        }
        if self.overlap >= self.length {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.length ({})",
                self.overlap, self.length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Ollama,
    Local,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// Overrides the provider's known dimension.
    pub dim: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Ollama, model: "nomic-embed-text".into(), dim: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { model: "llama3.2:3b".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:11434".into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankProvider {
    Lexical,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub provider: RerankProvider,
    pub url: String,
    pub model: String,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: RerankProvider::Lexical,
            url: String::new(),
            model: "ms-marco-TinyBERT-L-2-v2".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub docling_bin: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self { docling_bin: "docling".into() }
    }
}

/// How a finished indexing run writes the Content Store snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Only this run's records; earlier records are dropped.
    #[default]
    Replace,
    /// Earlier records are kept and this run's records appended.
    Merge,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub write_mode: WriteMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10, top_n: 3 }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 || self.top_n == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k and retrieval.top_n must be > 0".into()));
        }
        if self.top_n > self.top_k {
            return Err(Error::InvalidConfig(format!(
                "retrieval.top_n ({}) cannot exceed retrieval.top_k ({})",
                self.top_n, self.top_k
            )));
        }
        Ok(())
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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
