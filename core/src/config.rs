use crate::error::{MatchError, Result, ValidationError};
use crate::index::Bm25Params;
use crate::tokenizer::{Normalizer, DEFAULT_STOPWORDS};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_k1() -> f64 { 1.5 }
fn default_b() -> f64 { 0.75 }
fn default_top_n() -> usize { 10 }
fn default_stopwords() -> Vec<String> { DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect() }

/// Matching options. Every field may be omitted from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_k1")]
    pub k1: f64,
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
    #[serde(default)]
    pub stem: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { k1: default_k1(), b: default_b(), top_n: default_top_n(), stopwords: default_stopwords(), stem: false }
    }
}

impl MatchConfig {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MatchError::io(path, e))?;
        let config: MatchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.bm25().validate()
    }

    pub fn bm25(&self) -> Bm25Params {
        Bm25Params { k1: self.k1, b: self.b }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(&self.stopwords, self.stem)
    }
}
