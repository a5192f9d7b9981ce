//! Sample one substitute per word from fastsubs TSV output.
//!
//! Usage:
//!   fastsubs -n 100 model.arpa.gz < sentences.txt | wordsub -s 1
//!
//! Each output line is `word\tsubstitute`, the substitute drawn with
//! probability proportional to 10^logp among the listed candidates. Words
//! without candidates are written alone.

use anyhow::{Context, Result};
use clap::Parser;
use fastsubs_core::output::parse_tsv_line;
use fastsubs_core::sampling::pick_weighted;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{self, BufRead, BufWriter, Write};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "wordsub")]
#[command(about = "Pick one random substitute per word from fastsubs output")]
struct Args {
    /// Random seed (default: seeded from the operating system)
    #[arg(short, long)]
    seed: Option<u64>,
}

fn run<R: BufRead, W: Write, G: Rng + ?Sized>(input: R, out: &mut W, rng: &mut G) -> Result<usize> {
    let mut lines = 0usize;
    for (lineno, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("read input line {}", lineno + 1))?;
        let Some((word, subs)) = parse_tsv_line(&line) else {
            continue;
        };
        match pick_weighted(&subs, rng) {
            Some(sub) => writeln!(out, "{}\t{}", word, sub)?,
            None => writeln!(out, "{}", word)?,
        }
        lines += 1;
    }
    out.flush()?;
    Ok(lines)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => {
            debug!("seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let mut out = BufWriter::new(io::stdout().lock());
    let n = run(io::stdin().lock(), &mut out, &mut rng)?;
    info!("{} words", n);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "\
the\tthe -0.10000000\tcat -1.30000000
cat\tdog -0.20000000\tcat -0.40000000\tmouse -2.00000000

</s>
";

    fn sample(seed: u64) -> String {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = Vec::new();
        run(INPUT.as_bytes(), &mut out, &mut rng).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn one_line_per_word() {
        let text = sample(3);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0] == "the\tthe" || lines[0] == "the\tcat", "{}", lines[0]);
        let (word, sub) = lines[1].split_once('\t').unwrap();
        assert_eq!(word, "cat");
        assert!(["dog", "cat", "mouse"].contains(&sub));
        assert_eq!(lines[2], "</s>");
    }

    #[test]
    fn seeded_runs_repeat() {
        assert_eq!(sample(11), sample(11));
    }
}
