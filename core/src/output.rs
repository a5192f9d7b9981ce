//! fastsubs output lines.
//!
//! TSV (default): the original word, then one `\t<substitute> <log10 p>` field
//! per substitute, best first:
//!
//! ```text
//! cat	dog -0.72000003	cat -0.81250000	mouse -1.50000000
//! ```
//!
//! JSON: one object per line, `{"word":"cat","substitutes":[["dog",-0.72],…]}`.
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::heap::Hpair;
use crate::symtab::SymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tsv,
    Json,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    word: &'a str,
    substitutes: Vec<(&'a str, f32)>,
}

/// Write one output line for `word` and its substitutes.
pub fn write_line<W: Write>(
    out: &mut W,
    format: OutputFormat,
    word: &str,
    subs: &[Hpair],
    symbols: &SymbolTable,
) -> io::Result<()> {
    match format {
        OutputFormat::Tsv => {
            out.write_all(word.as_bytes())?;
            for s in subs {
                write!(out, "\t{} {:.8}", symbols.name(s.token).unwrap_or(""), s.logp)?;
            }
            out.write_all(b"\n")
        }
        OutputFormat::Json => {
            let line = JsonLine {
                word,
                substitutes: subs
                    .iter()
                    .map(|s| (symbols.name(s.token).unwrap_or(""), s.logp))
                    .collect(),
            };
            serde_json::to_writer(&mut *out, &line)?;
            out.write_all(b"\n")
        }
    }
}

/// Parse a TSV output line back into (word, [(substitute, log10 p)]).
///
/// Fields are whitespace separated: the word, then substitute / log-probability
/// pairs. Pairs whose probability does not parse are dropped.
pub fn parse_tsv_line(line: &str) -> Option<(&str, Vec<(&str, f64)>)> {
    let mut fields = line.split_whitespace();
    let word = fields.next()?;
    let mut subs = Vec::new();
    while let (Some(sub), Some(logp)) = (fields.next(), fields.next()) {
        if let Ok(lp) = logp.parse::<f64>() {
            subs.push((sub, lp));
        }
    }
    Some((word, subs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut st = SymbolTable::new();
        st.intern("dog");
        st.intern("mouse");
        st
    }

    #[test]
    fn tsv_line_format() {
        let st = table();
        let subs = [Hpair::new(1, -0.5), Hpair::new(2, -1.25)];
        let mut buf = Vec::new();
        write_line(&mut buf, OutputFormat::Tsv, "cat", &subs, &st).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "cat\tdog -0.50000000\tmouse -1.25000000\n"
        );
    }

    #[test]
    fn tsv_line_without_substitutes() {
        let st = table();
        let mut buf = Vec::new();
        write_line(&mut buf, OutputFormat::Tsv, "</s>", &[], &st).unwrap();
        assert_eq!(buf, b"</s>\n");
    }

    #[test]
    fn json_line_format() {
        let st = table();
        let subs = [Hpair::new(2, -1.5)];
        let mut buf = Vec::new();
        write_line(&mut buf, OutputFormat::Json, "cat", &subs, &st).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["word"], "cat");
        assert_eq!(v["substitutes"][0][0], "mouse");
        assert_eq!(v["substitutes"][0][1].as_f64(), Some(-1.5));
        assert_eq!(*buf.last().unwrap(), b'\n');
    }

    #[test]
    fn parse_written_tsv() {
        let (word, subs) = parse_tsv_line("cat\tdog -0.50000000\tmouse -1.25000000\n").unwrap();
        assert_eq!(word, "cat");
        assert_eq!(subs, vec![("dog", -0.5), ("mouse", -1.25)]);

        let (word, subs) = parse_tsv_line("cat dog x mouse -2").unwrap();
        assert_eq!(word, "cat");
        assert_eq!(subs, vec![("mouse", -2.0)]);

        assert!(parse_tsv_line("   ").is_none());
    }
}
