//! fastsubs-core
//!
//! Backoff n-gram language model index and top-k lexical substitute search.
//!
//! Given an ARPA model and a sentence, the engine lists the vocabulary words
//! most likely to appear at a position in place of the word that is there,
//! best first, without scoring the entire vocabulary for every query.
//!
//! Public API:
//! - `LanguageModel` / `ModelBuilder` - backoff model with per-context sorted continuations
//! - `FastSubs` - top-k substitute engine over a loaded model
//! - `Heap`, `Hpair` - fixed-capacity binary heap of (token, log-probability) pairs
//! - `Ngram`, `Token`, `SymbolTable` - keys and vocabulary
//! - `SentenceEncoder` - raw text line -> token sentence
//! - `output` - fastsubs line formats
//! - `sampling` - weighted choice of one substitute
//! - `Config` - limits and input handling, loadable from TOML
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Core modules
pub mod heap;
pub use heap::{Heap, Hpair, Scored};

pub mod ngram;
pub use ngram::{Ngram, Token, NULL_TOKEN};

pub mod symtab;
pub use symtab::SymbolTable;

pub mod arpa;
pub use arpa::ArpaRecord;

pub mod model;
pub use model::{LanguageModel, ModelBuilder, LOG0};

pub mod engine;
pub use engine::{EngineStats, FastSubs};

// Input / output around the core
pub mod sentence;
pub use sentence::{Sentence, SentenceEncoder};

pub mod output;
pub use output::OutputFormat;

pub mod sampling;

/// Substitute search configuration.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of substitutes per position (clamped to vocabulary size - 1)
    pub max_substitutes: u32,
    /// Stop once the substitutes cover this much probability mass; 1.0 = no limit
    pub probability_mass: f64,
    /// Never propose the word being substituted
    pub exclude_target: bool,

    /// Entries in the context -> substitutes cache, 0 disables caching
    pub max_cache_size: usize,

    // Sentence handling
    /// Marker prepended to each input sentence
    pub sentence_start: String,
    /// Marker appended to each input sentence
    pub sentence_end: String,
    /// Model word used for input words outside the vocabulary
    pub unknown_word: String,
    /// Apply Unicode NFC normalization to input words before lookup
    pub normalize_unicode: bool,

    /// Output line format
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // no count limit, no mass limit
            max_substitutes: u32::MAX,
            probability_mass: 1.0,
            exclude_target: false,
            max_cache_size: 1000,
            sentence_start: "<s>".to_string(),
            sentence_end: "</s>".to_string(),
            unknown_word: "<unk>".to_string(),
            normalize_unicode: false,
            format: OutputFormat::Tsv,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parse config {}", path.display()))
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
