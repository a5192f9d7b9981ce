//! Top-k lexical substitutes for every word of every input sentence.
//!
//! Usage:
//!   fastsubs -n 100 model.arpa.gz < sentences.txt > subs.tsv
//!   fastsubs -p 0.99 --exclude-target -i sentences.txt -o subs.tsv model.arpa
//!   fastsubs --config fastsubs.toml --format json model.arpa.gz
//!
//! Reads one sentence per line and writes one line per word (end marker
//! included): the word, then its substitutes with their log10 probabilities.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use fastsubs_core::{output, Config, FastSubs, LanguageModel, OutputFormat, SentenceEncoder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fastsubs")]
#[command(about = "List the most likely substitutes for each word under a backoff n-gram model")]
struct Args {
    /// Maximum substitutes per word (default: the whole vocabulary)
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Stop once the substitutes cover this much probability mass (1.0 = no limit)
    #[arg(short = 'p', long)]
    probability: Option<f64>,

    /// Input sentences (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration; command line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never propose the word being substituted
    #[arg(long)]
    exclude_target: bool,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// ARPA language model (.gz is decompressed)
    model: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Tsv,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Tsv => OutputFormat::Tsv,
            Format::Json => OutputFormat::Json,
        }
    }
}

impl Args {
    /// Config file values (or defaults) with the command line flags applied.
    fn config(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load_toml(path)?,
            None => Config::default(),
        };
        if let Some(n) = self.count {
            cfg.max_substitutes = n;
        }
        if let Some(p) = self.probability {
            cfg.probability_mass = p;
        }
        if self.exclude_target {
            cfg.exclude_target = true;
        }
        if let Some(f) = self.format {
            cfg.format = f.into();
        }
        if cfg.max_substitutes == 0 {
            bail!("substitute count must be at least 1");
        }
        if cfg.probability_mass.is_nan() || cfg.probability_mass <= 0.0 {
            bail!("probability mass must be positive, got {}", cfg.probability_mass);
        }
        Ok(cfg)
    }
}

/// Totals for one run.
#[derive(Debug, Default, PartialEq, Eq)]
struct RunSummary {
    sentences: usize,
    words: usize,
}

/// Substitute every position of every sentence in `input`.
fn run<R: BufRead, W: Write>(
    model: &LanguageModel,
    cfg: &Config,
    input: R,
    out: &mut W,
) -> Result<RunSummary> {
    let encoder = SentenceEncoder::new(model.symbols(), cfg);
    let mut engine = FastSubs::new(model, cfg);
    let mut summary = RunSummary::default();
    let started = Instant::now();

    for (lineno, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("read input line {}", lineno + 1))?;
        let sentence = encoder.encode(&line);
        for pos in sentence.positions() {
            let subs = engine.query(&sentence.tokens, pos);
            let word = sentence.word(pos).unwrap_or("");
            output::write_line(out, cfg.format, word, subs, model.symbols())?;
            summary.words += 1;
        }
        summary.sentences += 1;
    }
    out.flush()?;

    let stats = engine.stats();
    info!(
        "{} sentences, {} words in {:.2?}: {:.1} substitutes/word, {:.1} pops/word",
        summary.sentences,
        summary.words,
        started.elapsed(),
        stats.substitutes_per_call(),
        stats.pops_per_call()
    );
    if let Some(rate) = stats.cache_hit_rate() {
        info!("cache: {} entries, {:.1}% hit rate", engine.cache_size(), rate);
    }
    Ok(summary)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let cfg = args.config()?;

    let model = LanguageModel::load(&args.model)?;
    info!(
        "n={} p={} exclude_target={}",
        cfg.max_substitutes, cfg.probability_mass, cfg.exclude_target
    );

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open input {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("create output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    run(&model, &cfg, input, &mut out)?;
    Ok(())
}
