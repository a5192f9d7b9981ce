// core/src/sentence.rs
//
// Raw text line -> token sentence for the substitute engine.

use unicode_normalization::UnicodeNormalization;

use crate::ngram::{Token, NULL_TOKEN};
use crate::symtab::SymbolTable;
use crate::Config;

/// A tokenized input sentence, start and end markers included.
///
/// `tokens[i]` and `words[i]` describe the same position; position `k`
/// (1-based) in engine queries is index `k - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    pub words: Vec<String>,
}

impl Sentence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The word at 1-based `position`.
    pub fn word(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.words.get(i))
            .map(String::as_str)
    }

    /// 1-based positions worth querying: everything after the start marker.
    /// Sentences shorter than two tokens have none.
    pub fn positions(&self) -> std::ops::RangeInclusive<usize> {
        2..=self.len()
    }
}

/// Maps whitespace separated words to model tokens.
///
/// Words outside the vocabulary become the model's unknown word when it has
/// one, otherwise [`NULL_TOKEN`], which the engine treats as a context break.
pub struct SentenceEncoder<'a> {
    symbols: &'a SymbolTable,
    start: Option<(String, Token)>,
    end: Option<(String, Token)>,
    unknown: Token,
    normalize: bool,
}

impl<'a> SentenceEncoder<'a> {
    pub fn new(symbols: &'a SymbolTable, cfg: &Config) -> Self {
        let marker = |m: &str| {
            (!m.is_empty()).then(|| (m.to_string(), symbols.get(m).unwrap_or(NULL_TOKEN)))
        };
        Self {
            symbols,
            start: marker(&cfg.sentence_start),
            end: marker(&cfg.sentence_end),
            unknown: symbols.get(&cfg.unknown_word).unwrap_or(NULL_TOKEN),
            normalize: cfg.normalize_unicode,
        }
    }

    pub fn token(&self, word: &str) -> Token {
        self.symbols.get(word).unwrap_or(self.unknown)
    }

    pub fn encode(&self, line: &str) -> Sentence {
        let mut sentence = Sentence {
            tokens: Vec::new(),
            words: Vec::new(),
        };
        if let Some((word, token)) = &self.start {
            sentence.tokens.push(*token);
            sentence.words.push(word.clone());
        }
        for raw in line.split_whitespace() {
            let word = if self.normalize {
                raw.nfc().collect::<String>()
            } else {
                raw.to_string()
            };
            sentence.tokens.push(self.token(&word));
            sentence.words.push(word);
        }
        if let Some((word, token)) = &self.end {
            sentence.tokens.push(*token);
            sentence.words.push(word.clone());
        }
        sentence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> SymbolTable {
        let mut st = SymbolTable::new();
        for w in ["<s>", "</s>", "<unk>", "the", "cat", "caf\u{e9}"] {
            st.intern(w);
        }
        st
    }

    #[test]
    fn wraps_with_markers_and_maps_unknown() {
        let st = symbols();
        let enc = SentenceEncoder::new(&st, &Config::default());
        let s = enc.encode("the  zebra\tcat\n");
        assert_eq!(s.words, vec!["<s>", "the", "zebra", "cat", "</s>"]);
        assert_eq!(
            s.tokens,
            vec![
                st.get("<s>").unwrap(),
                st.get("the").unwrap(),
                st.get("<unk>").unwrap(),
                st.get("cat").unwrap(),
                st.get("</s>").unwrap(),
            ]
        );
        assert_eq!(s.word(1), Some("<s>"));
        assert_eq!(s.word(3), Some("zebra"));
        assert_eq!(s.word(0), None);
        assert_eq!(s.positions().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn unknown_without_unk_is_null() {
        let mut st = SymbolTable::new();
        st.intern("the");
        let enc = SentenceEncoder::new(&st, &Config::default());
        let s = enc.encode("the dog");
        // markers missing from the model are null as well
        assert_eq!(s.tokens, vec![NULL_TOKEN, 1, NULL_TOKEN, NULL_TOKEN]);
    }

    #[test]
    fn short_sentences_have_no_positions() {
        let st = symbols();
        let cfg = Config {
            sentence_start: String::new(),
            sentence_end: String::new(),
            ..Config::default()
        };
        let enc = SentenceEncoder::new(&st, &cfg);
        assert_eq!(enc.encode("the").positions().count(), 0);
        assert_eq!(enc.encode("").positions().count(), 0);
        assert_eq!(enc.encode("the cat").positions().count(), 1);
    }

    #[test]
    fn nfc_normalization_is_optional() {
        let st = symbols();
        let decomposed = "cafe\u{301}";
        let plain = SentenceEncoder::new(&st, &Config::default());
        assert_eq!(plain.encode(decomposed).tokens[1], st.get("<unk>").unwrap());

        let cfg = Config {
            normalize_unicode: true,
            ..Config::default()
        };
        let nfc = SentenceEncoder::new(&st, &cfg);
        let s = nfc.encode(decomposed);
        assert_eq!(s.tokens[1], st.get("caf\u{e9}").unwrap());
        assert_eq!(s.words[1], "caf\u{e9}");
    }
}
