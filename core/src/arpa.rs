//! ARPA model file reader.
//!
//! Each n-gram line is `<log10 p>\t<tokens, oldest first>[\t<log10 backoff>]`.
//! Header and section lines (`\data\`, `ngram 1=…`, `\1-grams:`, `\end\`) and
//! blank lines are skipped. Any other line that does not parse is fatal: a
//! model with a bad record cannot be partially trusted.
use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::model::ModelBuilder;
use crate::ngram::Ngram;
use crate::symtab::SymbolTable;

/// One parsed model record.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpaRecord {
    pub logp: f32,
    pub ngram: Ngram,
    pub backoff: Option<f32>,
}

/// Open a model file for line reading, transparently decompressing `.gz`.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open model {}", path.display()))?;
    let gz = path.extension().and_then(|e| e.to_str()) == Some("gz");
    let reader: Box<dyn BufRead> = if gz {
        Box::new(BufReader::with_capacity(1 << 20, GzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(1 << 20, file))
    };
    Ok(reader)
}

/// Parse a single line. Returns `Ok(None)` for lines that carry no n-gram.
pub fn parse_line(line: &str, symbols: &mut SymbolTable) -> Result<Option<ArpaRecord>> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.is_empty() || line.starts_with('\\') || line.starts_with('n') {
        return Ok(None);
    }

    let mut fields = line.splitn(3, '\t');
    let (Some(prob), Some(words)) = (fields.next(), fields.next()) else {
        bail!("expected at least 2 tab-separated fields");
    };

    let logp = parse_log10(prob).with_context(|| format!("bad probability {:?}", prob))?;

    let ngram: Ngram = words.split_whitespace().map(|w| symbols.intern(w)).collect();
    if ngram.is_empty() {
        bail!("record has no tokens");
    }

    let backoff = match fields.next().map(str::trim) {
        Some(b) if !b.is_empty() => {
            Some(parse_log10(b).with_context(|| format!("bad backoff weight {:?}", b))?)
        }
        _ => None,
    };

    Ok(Some(ArpaRecord {
        logp,
        ngram,
        backoff,
    }))
}

fn parse_log10(field: &str) -> Result<f32> {
    let v: f32 = field.trim().parse()?;
    if v.is_nan() {
        bail!("NaN is not a log-probability");
    }
    Ok(v)
}

/// Read every record from `reader` into `builder`. Returns the record count.
pub fn read_into<R: BufRead>(reader: R, builder: &mut ModelBuilder) -> Result<usize> {
    let mut records = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {}", lineno + 1))?;
        let parsed = parse_line(&line, builder.symbols_mut())
            .with_context(|| format!("malformed model record at line {}", lineno + 1))?;
        if let Some(record) = parsed {
            builder.add(record)?;
            records += 1;
        }
    }
    debug!("arpa: {} records", records);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_with_and_without_backoff() {
        let mut st = SymbolTable::new();
        let r = parse_line("-0.5\tthe cat\t-0.25\n", &mut st)
            .unwrap()
            .unwrap();
        assert_eq!(r.logp, -0.5);
        assert_eq!(r.backoff, Some(-0.25));
        assert_eq!(
            r.ngram.tokens(),
            &[st.get("the").unwrap(), st.get("cat").unwrap()]
        );

        let r = parse_line("-1.25\tdog", &mut st).unwrap().unwrap();
        assert_eq!(r.backoff, None);
        assert_eq!(r.ngram.len(), 1);
    }

    #[test]
    fn skips_headers_and_blank_lines() {
        let mut st = SymbolTable::new();
        for line in ["", "\n", "\\data\\", "ngram 1=3", "\\1-grams:", "\\end\\"] {
            assert!(parse_line(line, &mut st).unwrap().is_none(), "{:?}", line);
        }
        assert!(st.is_empty());
    }

    #[test]
    fn rejects_malformed_records() {
        let mut st = SymbolTable::new();
        assert!(parse_line("-0.5 the cat", &mut st).is_err());
        assert!(parse_line("abc\tthe", &mut st).is_err());
        assert!(parse_line("-0.5\tthe\tzz", &mut st).is_err());
        assert!(parse_line("NaN\tthe", &mut st).is_err());
        assert!(parse_line("-0.5\t  ", &mut st).is_err());
    }

    #[test]
    fn empty_trailing_backoff_field_is_absent() {
        let mut st = SymbolTable::new();
        let r = parse_line("-0.5\tthe\t", &mut st).unwrap().unwrap();
        assert_eq!(r.backoff, None);
    }

    #[test]
    fn read_into_reports_line_number() {
        let text = "\\data\\\nngram 1=2\n\n\\1-grams:\n-1.0\ta\n-x\tb\n";
        let mut builder = ModelBuilder::new();
        let err = read_into(text.as_bytes(), &mut builder).unwrap_err();
        assert!(format!("{:#}", err).contains("line 6"), "{:#}", err);
    }
}
