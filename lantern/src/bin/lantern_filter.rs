//! Run the extendedness filter over a stream of alerts
//!
//! Reads one JSON object of DIASource properties per line and writes one JSON
//! outcome per line to stdout as soon as the line is evaluated, so the tool
//! can sit at the end of a live pipe. Lines that cannot be decoded (invalid
//! UTF-8, invalid JSON, missing or mistyped properties) are reported on stderr
//! and skipped; the tool exits with an error once all input is processed.
//!
//! # Usage
//!
//! ```bash
//! # Strict thresholds, passes only
//! cargo run --release --bin lantern_filter -- --input alerts.jsonl
//!
//! # Lenient thresholds, include rejections and their reasons
//! cargo run --release --bin lantern_filter -- -i alerts.jsonl --preset lenient --emit-rejections
//!
//! # Custom thresholds
//! cargo run --release --bin lantern_filter -- --print-thresholds > thresholds.json
//! cargo run --release --bin lantern_filter -- -i alerts.jsonl --thresholds thresholds.json
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use lantern::{
    AlertProperties, ExtendednessFilter, FilterOutcome, Rejection, ThresholdConfig,
    ThresholdPreset,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lantern_filter",
    about = "Select extended variable source candidates from DIASource alerts",
    long_about = None
)]
struct Args {
    /// JSON-lines file of alert properties (reads stdin if not given)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Threshold preset: strict or lenient
    #[arg(short, long, default_value_t = ThresholdPreset::Strict)]
    preset: ThresholdPreset,

    /// JSON threshold file (overrides --preset)
    #[arg(short, long)]
    thresholds: Option<PathBuf>,

    /// Also write rejected alerts with their rejection reason
    #[arg(long)]
    emit_rejections: bool,

    /// Property echoed into each output record to identify the alert
    #[arg(long, default_value = "lsst_diaSource_diaSourceId")]
    id_field: String,

    /// Print the effective thresholds as JSON and exit
    #[arg(long)]
    print_thresholds: bool,
}

/// Tally of one run over an input stream
#[derive(Debug, Default)]
struct Summary {
    passed: usize,
    rejected: BTreeMap<Rejection, usize>,
    malformed: usize,
}

impl Summary {
    fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    fn log(&self) {
        log::info!(
            "Evaluated {} alerts: {} passed, {} rejected, {} malformed",
            self.passed + self.rejected_total(),
            self.passed,
            self.rejected_total(),
            self.malformed
        );
        for (reason, count) in &self.rejected {
            log::info!("  {count:>8}  {reason}");
        }
    }

    /// Fails if any input record was malformed
    fn check(&self) -> anyhow::Result<()> {
        if self.malformed > 0 {
            bail!("{} malformed alert record(s) in input", self.malformed);
        }
        Ok(())
    }
}

fn load_config(args: &Args) -> anyhow::Result<ThresholdConfig> {
    match &args.thresholds {
        Some(path) => ThresholdConfig::load_from_file(path)
            .with_context(|| format!("loading thresholds from {}", path.display())),
        None => {
            log::info!("Using {} threshold preset", args.preset);
            Ok(args.preset.config())
        }
    }
}

fn write_thresholds(config: &ThresholdConfig, mut out: impl Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, config)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    })
}

/// Decode one raw input line, echoing the identifying property if present
fn decode_line(
    line: &[u8],
    id_field: &str,
) -> anyhow::Result<(Option<Value>, AlertProperties)> {
    let value: Value = serde_json::from_slice(line).context("invalid JSON")?;
    let id = value.get(id_field).cloned();
    let alert = AlertProperties::from_value(value)?;
    Ok((id, alert))
}

/// Filter every line of `input`, writing each outcome to `out` as it is
/// produced.
fn run(
    args: &Args,
    filter: &ExtendednessFilter,
    input: impl BufRead,
    mut out: impl Write,
) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();

    for (index, line) in input.split(b'\n').enumerate() {
        let line_number = index + 1;
        let line = line.context("reading input")?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let (id, alert) = match decode_line(&line, &args.id_field) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::error!("Line {line_number}: {e:#}");
                summary.malformed += 1;
                continue;
            }
        };

        let outcome = filter.evaluate(&alert);
        match outcome {
            FilterOutcome::Pass(_) => summary.passed += 1,
            FilterOutcome::Rejected(reason) => {
                *summary.rejected.entry(reason).or_default() += 1;
                if !args.emit_rejections {
                    continue;
                }
            }
        }

        let mut record = serde_json::to_value(outcome)?;
        if let Value::Object(map) = &mut record {
            map.insert("line".to_string(), Value::from(line_number));
            if let Some(id) = id {
                map.insert("id".to_string(), id);
            }
        }
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
        out.flush()?;
    }

    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    if args.print_thresholds {
        return write_thresholds(&config, io::stdout().lock());
    }
    let filter = ExtendednessFilter::with_config(config);

    let input = open_input(args.input.as_ref())?;
    let out = BufWriter::new(io::stdout().lock());
    let summary = run(&args, &filter, input, out)?;
    summary.log();
    summary.check()
}
