// core/src/engine.rs
//
// Top-k lexical substitutes from a backoff n-gram model.
//
// For the word at a sentence position the candidates are scored by the model
// given the preceding words. Instead of scoring the whole vocabulary, the
// engine merges the pre-sorted continuation lists of the context and of each
// of its backoff suffixes, best first, and stops as soon as the count or
// probability-mass limit is reached.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::heap::{Heap, Hpair, Scored};
use crate::model::LanguageModel;
use crate::ngram::{Ngram, Token, NULL_TOKEN};
use crate::Config;

/// Per-engine query counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Queries answered (including cache hits).
    pub calls: usize,
    /// Substitutes returned over all calls.
    pub substitutes: usize,
    /// Frontier extractions performed by the merge.
    pub pops: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl EngineStats {
    pub fn substitutes_per_call(&self) -> f64 {
        ratio(self.substitutes, self.calls)
    }

    pub fn pops_per_call(&self) -> f64 {
        ratio(self.pops, self.calls)
    }

    /// Cache hit rate in percent, None before the first cache access.
    pub fn cache_hit_rate(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses;
        (total > 0).then(|| self.cache_hits as f64 * 100.0 / total as f64)
    }
}

fn ratio(a: usize, b: usize) -> f64 {
    if b == 0 {
        0.0
    } else {
        a as f64 / b as f64
    }
}

/// One backoff level of the current query: the context suffix starting at
/// `start`, its sorted continuations and the summed backoff weight of all
/// longer suffixes.
#[derive(Clone, Copy)]
struct Level<'m> {
    start: usize,
    offset: f32,
    heap: Option<&'m Heap<Hpair>>,
}

/// Frontier entry: the next unread element of one level.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    level: usize,
    index: usize,
    logp: f32,
}

impl Scored for Cursor {
    fn score(&self) -> f32 {
        self.logp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    context: Ngram,
    excluded: Token,
    max_count: usize,
    max_mass: u64,
}

/// Substitute search over a loaded model.
///
/// Holds the per-query scratch space (merge frontier, result buffer, result
/// cache); one engine per thread, the model itself can be shared.
pub struct FastSubs<'m> {
    model: &'m LanguageModel,
    max_count: usize,
    max_mass: f64,
    exclude_target: bool,
    levels: Vec<Level<'m>>,
    frontier: Heap<Cursor>,
    key: Vec<Token>,
    subs: Vec<Hpair>,
    cache: Option<LruCache<CacheKey, Vec<Hpair>>>,
    stats: EngineStats,
}

impl<'m> FastSubs<'m> {
    /// Create an engine using the limits, target policy and cache size in `cfg`.
    pub fn new(model: &'m LanguageModel, cfg: &Config) -> Self {
        let levels = model.order().max(1);
        let max_count = clamp_count(cfg.max_substitutes as usize, model.nvocab());
        Self {
            model,
            max_count,
            max_mass: cfg.probability_mass,
            exclude_target: cfg.exclude_target,
            levels: Vec::with_capacity(levels),
            frontier: Heap::with_capacity(levels),
            key: Vec::with_capacity(levels + 1),
            subs: Vec::with_capacity(max_count.min(model.nvocab() as usize)),
            cache: NonZeroUsize::new(cfg.max_cache_size).map(LruCache::new),
            stats: EngineStats::default(),
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Substitutes for the token at 1-based `position` of `sentence`, using the
    /// engine's configured limits.
    pub fn query(&mut self, sentence: &[Token], position: usize) -> &[Hpair] {
        self.query_with(sentence, position, self.max_count, self.max_mass)
    }

    /// Substitutes for the token at 1-based `position`, stopping after
    /// `max_count` results or once their summed probability reaches `max_mass`
    /// (a mass of 1.0 or more means no mass limit).
    ///
    /// Results are best first, each token at most once, scored with the full
    /// backoff probability given up to `order - 1` preceding tokens. Positions
    /// outside the sentence give no results.
    pub fn query_with(
        &mut self,
        sentence: &[Token],
        position: usize,
        max_count: usize,
        max_mass: f64,
    ) -> &[Hpair] {
        self.subs.clear();
        if position == 0 || position > sentence.len() {
            return &self.subs;
        }
        self.stats.calls += 1;

        let max_count = clamp_count(max_count, self.model.nvocab());
        let target = sentence[position - 1];
        let excluded = if self.exclude_target { target } else { NULL_TOKEN };
        let context = context_before(sentence, position, self.model.order());

        let key = self.cache.as_ref().map(|_| CacheKey {
            context: Ngram::from(context),
            excluded,
            max_count,
            max_mass: max_mass.to_bits(),
        });
        if let (Some(cache), Some(key)) = (self.cache.as_mut(), key.as_ref()) {
            if let Some(hit) = cache.get(key) {
                self.stats.cache_hits += 1;
                self.stats.substitutes += hit.len();
                self.subs.extend_from_slice(hit);
                return &self.subs;
            }
            self.stats.cache_misses += 1;
        }

        self.collect(context, excluded, max_count, max_mass);
        self.stats.substitutes += self.subs.len();

        if let (Some(cache), Some(key)) = (self.cache.as_mut(), key) {
            cache.put(key, self.subs.clone());
        }
        &self.subs
    }

    /// Drop cached results and reset the cache counters.
    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
        self.stats.cache_hits = 0;
        self.stats.cache_misses = 0;
    }

    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }

    fn collect(&mut self, context: &[Token], excluded: Token, max_count: usize, max_mass: f64) {
        let mass_cap = if max_mass >= 1.0 {
            f64::INFINITY
        } else {
            max_mass
        };

        let model = self.model;

        // levels[0] is the full context, the last one the empty context
        self.levels.clear();
        let mut offset = 0.0f32;
        for start in 0..=context.len() {
            let suffix = &context[start..];
            self.levels.push(Level {
                start,
                offset,
                heap: model.log_p_heap(suffix),
            });
            if !suffix.is_empty() {
                offset += model.log_b(suffix);
            }
        }

        self.frontier.clear();
        for (level, l) in self.levels.iter().enumerate() {
            if let Some(first) = l.heap.and_then(|h| h.peek()) {
                self.frontier.insert_max(Cursor {
                    level,
                    index: 0,
                    logp: first.logp + l.offset,
                });
            }
        }

        let mut mass = 0.0f64;
        while self.subs.len() < max_count && !self.frontier.is_empty() {
            let cursor = self.frontier.delete_max();
            self.stats.pops += 1;

            let level = self.levels[cursor.level];
            let Some(heap) = level.heap else { continue };
            let pairs = heap.as_slice();
            let token = pairs[cursor.index].token;

            if let Some(next) = pairs.get(cursor.index + 1) {
                self.frontier.insert_max(Cursor {
                    level: cursor.level,
                    index: cursor.index + 1,
                    logp: next.logp + level.offset,
                });
            }

            if token == excluded || self.shadowed(context, level.start, token) {
                continue;
            }

            self.subs.push(Hpair::new(token, cursor.logp));
            mass += 10f64.powf(cursor.logp as f64);
            if mass >= mass_cap {
                break;
            }
        }
    }

    /// True if a context longer than the one starting at `start` observes
    /// `token` directly; that level's score is the authoritative one.
    fn shadowed(&mut self, context: &[Token], start: usize, token: Token) -> bool {
        for s in 0..start {
            self.key.clear();
            self.key.extend_from_slice(&context[s..]);
            self.key.push(token);
            if self.model.has_log_p(&self.key) {
                return true;
            }
        }
        false
    }
}

/// A word is never its own bound: at most `nvocab - 1` substitutes.
fn clamp_count(n: usize, nvocab: Token) -> usize {
    n.min((nvocab as usize).saturating_sub(1))
}

/// Up to `order - 1` tokens before 1-based `position`, cut after the last
/// null token.
fn context_before(sentence: &[Token], position: usize, order: usize) -> &[Token] {
    let history = &sentence[..position - 1];
    let mut start = history.len().saturating_sub(order.saturating_sub(1));
    if let Some(null) = history[start..].iter().rposition(|&t| t == NULL_TOKEN) {
        start += null + 1;
    }
    &history[start..]
}
