// core/src/symtab.rs
//
// String <-> token table. Ids are handed out sequentially from 1 in
// first-seen order; 0 stays reserved for NULL_TOKEN.

use ahash::AHashMap;

use crate::ngram::{Token, NULL_TOKEN};

#[derive(Debug, Clone)]
pub struct SymbolTable {
    ids: AHashMap<String, Token>,
    /// names[token]; slot 0 is the empty name of NULL_TOKEN
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            ids: AHashMap::new(),
            names: vec![String::new()],
        }
    }

    /// Return the token for `word`, assigning the next id if it is new.
    pub fn intern(&mut self, word: &str) -> Token {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.names.len() as Token;
        self.ids.insert(word.to_string(), id);
        self.names.push(word.to_string());
        id
    }

    pub fn get(&self, word: &str) -> Option<Token> {
        self.ids.get(word).copied()
    }

    /// Name of `token`, or None for NULL_TOKEN and unknown ids.
    pub fn name(&self, token: Token) -> Option<&str> {
        if token == NULL_TOKEN {
            return None;
        }
        self.names.get(token as usize).map(String::as_str)
    }

    /// Number of interned words.
    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
