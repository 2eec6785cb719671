use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pinin::fuzzy::FuzzyRules;
use pinin::{Format, Keyboard, Logic, PinIn, PinInConfig, Segment, TreeSearcher};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pinin", about = "Pinyin fuzzy search over Chinese text")]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a corpus (one entry per line) and write engine and index images
    Build {
        /// Phonetic table source (`U+XXXX: readings` lines)
        #[arg(long)]
        table: PathBuf,

        /// Corpus file, one entry per line
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long, default_value = "contain")]
        logic: Logic,

        /// Engine config in TOML
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "pinin.engine")]
        engine_out: PathBuf,

        #[arg(long, default_value = "pinin.index")]
        index_out: PathBuf,
    },
    /// Run queries against images written by `build`
    Search {
        #[arg(long, default_value = "pinin.engine")]
        engine: PathBuf,

        #[arg(long, default_value = "pinin.index")]
        index: PathBuf,

        /// Override the stored keyboard scheme; the index is rebuilt
        #[arg(long)]
        keyboard: Option<Keyboard>,

        #[arg(long)]
        json: bool,

        /// Queries; read from stdin, one per line, when omitted
        queries: Vec<String>,
    },
    /// Show the readings of every character of a text
    Expand {
        #[arg(long)]
        table: PathBuf,

        #[arg(long, default_value = "unicode")]
        format: Format,

        /// Also list whole-text reading combinations, up to this many
        #[arg(long, default_value_t = 0)]
        combinations: usize,

        #[arg(long)]
        json: bool,

        text: String,
    },
}

#[derive(Serialize)]
struct SearchReport<'a> {
    query: &'a str,
    ids: Vec<usize>,
    matches: Vec<&'a str>,
}

#[derive(Serialize)]
struct CharReport {
    ch: char,
    readings: Vec<String>,
}

#[derive(Serialize)]
struct ExpandReport {
    chars: Vec<CharReport>,
    combination_count: usize,
    combinations: Vec<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn log_config(config: &PinInConfig) {
    let rules = FuzzyRules::from_config(config).describe();
    tracing::info!(
        keyboard = %config.keyboard,
        double_pinyin = config.keyboard.is_double_pinyin(),
        fuzzy = %if rules.is_empty() { "none".to_string() } else { rules.join(",") },
        first_char = config.first_char,
        "active config"
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Build {
            table,
            corpus,
            logic,
            config,
            engine_out,
            index_out,
        } => build(table, corpus, logic, config, engine_out, index_out),
        Command::Search {
            engine,
            index,
            keyboard,
            json,
            queries,
        } => search(engine, index, keyboard, json, queries),
        Command::Expand {
            table,
            format,
            combinations,
            json,
            text,
        } => expand(table, format, combinations, json, &text),
    }
}

fn build(
    table: PathBuf,
    corpus: PathBuf,
    logic: Logic,
    config: Option<PathBuf>,
    engine_out: PathBuf,
    index_out: PathBuf,
) -> Result<()> {
    let pinin = Arc::new(PinIn::new(&table).context("loading phonetic table")?);
    if let Some(path) = config {
        pinin.commit(PinInConfig::load_toml(&path)?);
    }
    log_config(&pinin.get_config());

    let mut searcher = TreeSearcher::from_engine(logic, Arc::clone(&pinin));
    let file = File::open(&corpus).with_context(|| format!("opening corpus {}", corpus.display()))?;
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("reading corpus {}", corpus.display()))?;
        let entry = line.trim();
        if !entry.is_empty() {
            searcher.put_string(entry);
        }
    }
    searcher.shrink_to_fit();

    if !pinin.serialize(&engine_out) {
        bail!("failed to write engine image {}", engine_out.display());
    }
    if !searcher.serialize(&index_out) {
        bail!("failed to write index image {}", index_out.display());
    }
    eprintln!(
        "indexed {} entries ({} logic) into {}",
        searcher.len(),
        logic,
        index_out.display()
    );
    Ok(())
}

fn search(
    engine: PathBuf,
    index: PathBuf,
    keyboard: Option<Keyboard>,
    json: bool,
    queries: Vec<String>,
) -> Result<()> {
    let pinin = PinIn::deserialize(&engine, keyboard.unwrap_or(Keyboard::Null))
        .with_context(|| format!("loading engine image {}", engine.display()))?;
    let mut searcher = TreeSearcher::deserialize(&index, Arc::new(pinin))
        .with_context(|| format!("loading index image {}", index.display()))?;
    if keyboard.is_some() {
        searcher.refresh();
    }
    log_config(&searcher.get_pinin().get_config());

    let queries = if queries.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("reading queries from stdin")?
    } else {
        queries
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for query in queries.iter().map(|q| q.trim()).filter(|q| !q.is_empty()) {
        let ids = searcher.execute_search(query);
        let matches = searcher.get_str_list_by_ids(&ids)?;
        if json {
            let report = SearchReport { query, ids, matches };
            writeln!(out, "{}", serde_json::to_string(&report)?)?;
        } else {
            writeln!(out, "{query}: {} match(es)", ids.len())?;
            for (id, item) in ids.iter().zip(matches) {
                writeln!(out, "  {id}\t{item}")?;
            }
        }
    }
    Ok(())
}

fn expand(table: PathBuf, format: Format, limit: usize, json: bool, text: &str) -> Result<()> {
    let pinin = PinIn::new(&table).context("loading phonetic table")?;
    log_config(&pinin.get_config());
    let encoding = pinin.encode(text);

    let chars: Vec<CharReport> = encoding
        .units()
        .iter()
        .map(|unit| CharReport {
            ch: unit.ch(),
            readings: unit
                .pinyins()
                .iter()
                .map(|p| p.reading().format(format))
                .collect(),
        })
        .collect();
    let combinations: Vec<String> = encoding
        .combinations()
        .take(limit)
        .map(|combo| {
            combo
                .iter()
                .map(|segment| match segment {
                    Segment::Literal(c) => c.to_string(),
                    Segment::Reading(r) => r.format(format),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    let report = ExpandReport {
        chars,
        combination_count: encoding.combination_count(),
        combinations,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for c in &report.chars {
        if c.readings.is_empty() {
            println!("{}\t-", c.ch);
        } else {
            println!("{}\t{}", c.ch, c.readings.join(" "));
        }
    }
    if limit > 0 {
        println!("{} combination(s)", report.combination_count);
        for line in &report.combinations {
            println!("  {line}");
        }
    }
    Ok(())
}
