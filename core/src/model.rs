//! Backoff n-gram language model index.
//!
//! Holds the raw ARPA tables (log10 probability and backoff weight per n-gram)
//! plus, for every context, the tokens directly observed after it sorted by
//! descending probability. The sorted lists are what lets the substitute
//! engine walk candidates best-first instead of scoring the whole vocabulary.
//!
//! Built once through [`ModelBuilder`] (or [`LanguageModel::load`]) and
//! read-only afterwards.
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::arpa::{self, ArpaRecord};
use crate::heap::{Heap, Hpair};
use crate::ngram::{Ngram, Token, NULL_TOKEN};
use crate::symtab::SymbolTable;

/// log10 value standing in for probability zero (SRILM convention).
pub const LOG0: f32 = -99.0;

type HeapMap = AHashMap<Ngram, Heap<Hpair>>;

/// Collects model records and builds the [`LanguageModel`] index.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    symbols: SymbolTable,
    order: usize,
    nvocab: Token,
    log_p: AHashMap<Ngram, f32>,
    log_b: AHashMap<Ngram, f32>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Add one record. A repeated n-gram overwrites the earlier values.
    pub fn add(&mut self, record: ArpaRecord) -> Result<()> {
        let ArpaRecord {
            logp,
            ngram,
            backoff,
        } = record;
        if ngram.is_empty() {
            bail!("model record without tokens");
        }
        if ngram.tokens().contains(&NULL_TOKEN) {
            bail!("model record contains the reserved null token: {:?}", ngram);
        }

        self.order = self.order.max(ngram.len());
        self.nvocab = self.nvocab.max(ngram.max_token());

        if let Some(b) = backoff {
            self.log_b.insert(ngram.clone(), b);
        }
        self.log_p.insert(ngram, logp);
        Ok(())
    }

    /// Convenience for building models in code: `words` is a space separated n-gram.
    pub fn add_words(&mut self, logp: f32, words: &str, backoff: Option<f32>) -> Result<()> {
        let ngram: Ngram = words
            .split_whitespace()
            .map(|w| self.symbols.intern(w))
            .collect();
        self.add(ArpaRecord {
            logp,
            ngram,
            backoff,
        })
    }

    /// Build the per-context heaps and freeze the model.
    pub fn build(self) -> Result<LanguageModel> {
        let ModelBuilder {
            symbols,
            order,
            nvocab,
            log_p,
            log_b,
        } = self;

        info!("initializing heaps...");
        let p_heap = build_heaps(&log_p);
        let b_heap = build_heaps(&log_b);

        if !p_heap.contains_key(&[] as &[Token]) {
            bail!("model has no unigram entries: the empty context cannot be resolved");
        }
        let missing = (1..=nvocab)
            .filter(|&t| !log_p.contains_key(&[t][..]))
            .count();
        if missing > 0 {
            warn!(
                "{} of {} tokens have no unigram entry and can only be proposed through longer contexts",
                missing, nvocab
            );
        }

        let hpairs: usize = p_heap.values().map(Heap::len).sum();
        info!(
            "model ready: order={} vocab={} logP={} logB={} logP_heaps={} logB_heaps={} hpairs={}",
            order,
            nvocab,
            log_p.len(),
            log_b.len(),
            p_heap.len(),
            b_heap.len(),
            hpairs
        );

        Ok(LanguageModel {
            symbols,
            order,
            nvocab,
            log_p,
            log_b,
            p_heap,
            b_heap,
        })
    }
}

/// Group `entries` by context: context -> heap of (final token, value), sorted
/// max-first.
///
/// Counts first so every heap is allocated at its exact size.
fn build_heaps(entries: &AHashMap<Ngram, f32>) -> HeapMap {
    let mut counts: AHashMap<&[Token], usize> = AHashMap::new();
    for ngram in entries.keys() {
        if let Some((context, _)) = ngram.split_last() {
            *counts.entry(context).or_insert(0) += 1;
        }
    }
    debug!("counted {} contexts", counts.len());

    let mut heaps: HeapMap = counts
        .into_iter()
        .map(|(context, n)| (Ngram::from(context), Heap::with_capacity(n)))
        .collect();

    for (ngram, &value) in entries {
        if let Some((context, token)) = ngram.split_last() {
            if let Some(heap) = heaps.get_mut(context) {
                heap.insert_min(Hpair::new(token, value));
            }
        }
    }

    for heap in heaps.values_mut() {
        heap.sort_max();
    }
    heaps
}

/// Immutable backoff language model with per-context sorted continuations.
#[derive(Debug)]
pub struct LanguageModel {
    symbols: SymbolTable,
    order: usize,
    nvocab: Token,
    log_p: AHashMap<Ngram, f32>,
    log_b: AHashMap<Ngram, f32>,
    p_heap: HeapMap,
    b_heap: HeapMap,
}

impl LanguageModel {
    /// Load an ARPA model file (`.gz` is decompressed on the fly).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("reading {}...", path.display());
        let reader = arpa::open(path)?;
        Self::from_reader(reader).with_context(|| format!("load model {}", path.display()))
    }

    /// Load an ARPA model from any line reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut builder = ModelBuilder::new();
        arpa::read_into(reader, &mut builder)?;
        builder.build()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Longest n-gram length in the model.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Highest token id in the model.
    pub fn nvocab(&self) -> Token {
        self.nvocab
    }

    /// log10 P(last token | rest) for a full n-gram, [`LOG0`] if never observed.
    pub fn log_p(&self, ngram: &[Token]) -> f32 {
        self.log_p.get(ngram).copied().unwrap_or(LOG0)
    }

    /// Whether the n-gram has a direct probability entry.
    pub fn has_log_p(&self, ngram: &[Token]) -> bool {
        self.log_p.contains_key(ngram)
    }

    /// log10 backoff weight of a context, 0 when none was recorded.
    pub fn log_b(&self, context: &[Token]) -> f32 {
        self.log_b.get(context).copied().unwrap_or(0.0)
    }

    /// Tokens observed directly after `context` with their log10 probability,
    /// best first.
    pub fn log_p_heap(&self, context: &[Token]) -> Option<&Heap<Hpair>> {
        self.p_heap.get(context)
    }

    /// Tokens `w` for which `context w` carries a backoff weight, with that
    /// weight, largest first.
    pub fn log_b_heap(&self, context: &[Token]) -> Option<&Heap<Hpair>> {
        self.b_heap.get(context)
    }

    /// Full backoff score of `token` after `context` (log10).
    ///
    /// Uses the direct probability of the longest matching context, adding the
    /// backoff weight of every longer context that had to be skipped. Scores
    /// every vocabulary token, so it doubles as the brute-force reference for
    /// the substitute engine.
    pub fn score(&self, context: &[Token], token: Token) -> f32 {
        let mut key: Vec<Token> = Vec::with_capacity(context.len() + 1);
        let mut backoff = 0.0f32;
        let mut ctx = context;
        loop {
            key.clear();
            key.extend_from_slice(ctx);
            key.push(token);
            if let Some(&p) = self.log_p.get(&key[..]) {
                return backoff + p;
            }
            if ctx.is_empty() {
                return LOG0;
            }
            backoff += self.log_b(ctx);
            ctx = &ctx[1..];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> LanguageModel {
        let mut b = ModelBuilder::new();
        b.add_words(-0.1, "the", Some(-0.3)).unwrap();
        b.add_words(-1.0, "cat", Some(-0.2)).unwrap();
        b.add_words(-1.2, "dog", None).unwrap();
        b.add_words(-0.05, "the cat", Some(-0.4)).unwrap();
        b.add_words(-0.7, "the dog", None).unwrap();
        b.add_words(-0.01, "the cat the", None).unwrap();
        b.build().unwrap()
    }

    fn tok(lm: &LanguageModel, w: &str) -> Token {
        lm.symbols().get(w).unwrap()
    }

    #[test]
    fn order_and_vocab() {
        let lm = tiny();
        assert_eq!(lm.order(), 3);
        assert_eq!(lm.nvocab(), 3);
    }

    #[test]
    fn lookups_with_defaults() {
        let lm = tiny();
        let (the, cat, dog) = (tok(&lm, "the"), tok(&lm, "cat"), tok(&lm, "dog"));
        assert_eq!(lm.log_p(&[the, cat]), -0.05);
        assert_eq!(lm.log_p(&[cat, dog]), LOG0);
        assert_eq!(lm.log_b(&[the]), -0.3);
        assert_eq!(lm.log_b(&[dog]), 0.0);
        assert_eq!(lm.log_b(&[the, cat]), -0.4);
    }

    #[test]
    fn heaps_hold_direct_continuations_sorted() {
        let lm = tiny();
        let (the, cat, dog) = (tok(&lm, "the"), tok(&lm, "cat"), tok(&lm, "dog"));

        let uni = lm.log_p_heap(&[]).unwrap();
        let toks: Vec<Token> = uni.iter().map(|p| p.token).collect();
        assert_eq!(toks, vec![the, cat, dog]);

        let after_the = lm.log_p_heap(&[the]).unwrap();
        assert_eq!(after_the.as_slice(), &[Hpair::new(cat, -0.05), Hpair::new(dog, -0.7)]);
        assert_eq!(after_the.len(), after_the.capacity());

        assert_eq!(lm.log_p_heap(&[the, cat]).unwrap().len(), 1);
        assert!(lm.log_p_heap(&[dog]).is_none());
    }

    #[test]
    fn backoff_heaps_mirror_weights() {
        let lm = tiny();
        let (the, cat) = (tok(&lm, "the"), tok(&lm, "cat"));
        let uni = lm.log_b_heap(&[]).unwrap();
        assert_eq!(uni.as_slice(), &[Hpair::new(cat, -0.2), Hpair::new(the, -0.3)]);
        let after_the = lm.log_b_heap(&[the]).unwrap();
        assert_eq!(after_the.as_slice(), &[Hpair::new(cat, -0.4)]);
        assert!(lm.log_b_heap(&[cat]).is_none());
    }

    #[test]
    fn score_composes_backoff() {
        let lm = tiny();
        let (the, cat, dog) = (tok(&lm, "the"), tok(&lm, "cat"), tok(&lm, "dog"));
        // direct hits
        assert_eq!(lm.score(&[the], cat), -0.05);
        assert_eq!(lm.score(&[the, cat], the), -0.01);
        // the cat -> dog: back off twice, to "cat" then to the unigram
        let expected = lm.log_b(&[the, cat]) + lm.log_b(&[cat]) + lm.log_p(&[dog]);
        assert!((lm.score(&[the, cat], dog) - expected).abs() < 1e-6);
        // unknown context token contributes no weight
        assert!((lm.score(&[99], dog) - -1.2).abs() < 1e-6);
        // token without any unigram
        assert_eq!(lm.score(&[the], 99), LOG0);
    }

    #[test]
    fn model_without_unigrams_is_rejected() {
        let mut b = ModelBuilder::new();
        b.add_words(-0.5, "a b", None).unwrap();
        assert!(b.build().is_err());
    }

    #[test]
    fn repeated_record_overwrites() {
        let mut b = ModelBuilder::new();
        b.add_words(-1.0, "a", None).unwrap();
        b.add_words(-2.0, "a", Some(-0.5)).unwrap();
        let lm = b.build().unwrap();
        let a = tok(&lm, "a");
        assert_eq!(lm.log_p(&[a]), -2.0);
        assert_eq!(lm.log_p_heap(&[]).unwrap().len(), 1);
        assert_eq!(lm.log_b(&[a]), -0.5);
    }

    #[test]
    fn null_token_records_are_rejected() {
        let mut b = ModelBuilder::new();
        let err = b.add(ArpaRecord {
            logp: -1.0,
            ngram: Ngram::new(vec![NULL_TOKEN]),
            backoff: None,
        });
        assert!(err.is_err());
    }
}
