/// Wave Fit — fit the SID combined-waveform model to sampled chip output.
///
/// Usage:
///   wave-fit fit --wave 7 --chip E [--data DIR] [--params FILE | --zero] [--seed N]
///                [--iterations N] [--seconds S]
///   wave-fit fit --wave 3,5,6,7 --chip G --seconds 600
///   wave-fit score --wave 7 --chip E [--params FILE] [--dump]
///   wave-fit table --wave 6 (--chip E | --params FILE) --output WAVE6.CSV
///   wave-fit presets
///
/// Reference captures are read from `DIR/WAVE{n}.CSV`, one column per chip.
/// Every accepted improvement is printed as a parameter block that `--params`
/// accepts back as a seed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use sidwave_dsp::optimizer::search_rng;
use sidwave_dsp::presets::{PRESETS, preset_for};
use sidwave_dsp::reference::load_reference;
use sidwave_dsp::scorer::{render_table, score_with_report};
use sidwave_dsp::{ChipId, Optimizer, ParameterSet, ReferenceTable, StopSignal, WaveformType};

#[derive(Parser)]
#[command(name = "wave-fit")]
#[command(about = "Fit the SID combined-waveform model to sampled chip output")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for better parameters, printing each accepted improvement
    Fit(FitArgs),

    /// Score a parameter set against a capture
    Score {
        #[command(flatten)]
        source: SourceArgs,

        /// Print every `index reference predicted` row
        #[arg(long)]
        dump: bool,
    },

    /// Write the 4096-entry table a parameter set produces
    Table {
        /// Waveform type (3, 5, 6 or 7)
        #[arg(short, long)]
        wave: WaveformType,

        /// Chip whose preset to render
        #[arg(short, long)]
        chip: Option<ChipId>,

        /// Parameter file to render instead of a preset
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Output CSV (one value per row)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the recorded fits
    Presets,
}

#[derive(Args)]
struct SourceArgs {
    /// Waveform type (3, 5, 6 or 7)
    #[arg(short, long)]
    wave: WaveformType,

    /// Chip column letter in the capture files (A-Z)
    #[arg(short, long)]
    chip: ChipId,

    /// Directory holding WAVE3.CSV .. WAVE7.CSV
    #[arg(short, long, default_value = "sidwaves")]
    data: PathBuf,

    /// Seed parameter file (default: recorded preset, else all zero)
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Start from all-zero parameters even when a preset exists
    #[arg(long, conflicts_with = "params")]
    zero: bool,
}

#[derive(Args)]
struct FitArgs {
    /// Waveform type(s); several run in parallel, one search each
    #[arg(short, long, value_delimiter = ',', required = true)]
    wave: Vec<WaveformType>,

    /// Chip column letter in the capture files (A-Z)
    #[arg(short, long)]
    chip: ChipId,

    /// Directory holding WAVE3.CSV .. WAVE7.CSV
    #[arg(short, long, default_value = "sidwaves")]
    data: PathBuf,

    /// Seed parameter file (single waveform only)
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Start from all-zero parameters even when a preset exists
    #[arg(long, conflicts_with = "params")]
    zero: bool,

    /// RNG seed for a reproducible run (per-wave seeds are derived from it)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop each search after this many candidates
    #[arg(long)]
    iterations: Option<u64>,

    /// Stop all searches after this many seconds
    #[arg(long)]
    seconds: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fit(args) => cmd_fit(args),
        Commands::Score { source, dump } => cmd_score(&source, dump),
        Commands::Table {
            wave,
            chip,
            params,
            output,
        } => cmd_table(wave, chip, params.as_deref(), &output),
        Commands::Presets => cmd_presets(),
    }
}

fn read_params(path: &Path) -> Result<ParameterSet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read parameter file {}", path.display()))?;
    text.parse()
        .with_context(|| format!("invalid parameter file {}", path.display()))
}

/// Seed precedence: `--params`, then the recorded preset, then all zero.
fn seed_params(params: Option<&Path>, zero: bool, chip: ChipId, wave: WaveformType) -> Result<ParameterSet> {
    if let Some(path) = params {
        return read_params(path);
    }
    if zero {
        return Ok(ParameterSet::default());
    }
    Ok(match preset_for(chip, wave) {
        Some(p) => {
            info!("chip {chip} wave {wave}: seeding from preset (recorded score {})", p.score);
            p.params
        }
        None => ParameterSet::default(),
    })
}

fn load(dir: &Path, wave: WaveformType, chip: ChipId) -> Result<ReferenceTable> {
    info!("reading chip {chip} wave {wave} from {}", dir.display());
    load_reference(dir, wave, chip).with_context(|| format!("cannot load reference for wave {wave}, chip {chip}"))
}

// ─── Fit ────────────────────────────────────────────────────────────────────

fn cmd_fit(args: FitArgs) -> Result<()> {
    if args.params.is_some() && args.wave.len() > 1 {
        bail!("--params seeds a single waveform; pass one --wave");
    }
    let limit = args
        .seconds
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--seconds must be a finite, non-negative number of seconds")?;

    // Validate and load everything before any search starts.
    let mut jobs = Vec::with_capacity(args.wave.len());
    for &wave in &args.wave {
        let reference = load(&args.data, wave, args.chip)?;
        let seed = seed_params(args.params.as_deref(), args.zero, args.chip, wave)?;
        jobs.push((wave, reference, seed));
    }

    let stop = StopSignal::new();
    if let Some(limit) = limit {
        let timer = stop.clone();
        thread::spawn(move || {
            thread::sleep(limit);
            info!("time limit reached, stopping");
            timer.stop();
        });
    }

    let multi = jobs.len() > 1;
    thread::scope(|s| {
        for (wave, reference, seed) in &jobs {
            let stop = stop.clone();
            let rng_seed = args.seed.map(|base| base.wrapping_add(wave.code() as u64));
            s.spawn(move || run_search(*wave, reference, *seed, rng_seed, args.iterations, stop, multi));
        }
    });
    Ok(())
}

fn run_search(
    wave: WaveformType,
    reference: &ReferenceTable,
    seed: ParameterSet,
    rng_seed: Option<u64>,
    iterations: Option<u64>,
    stop: StopSignal,
    tagged: bool,
) {
    let mut opt = Optimizer::new(seed, wave, reference, search_rng(rng_seed)).with_stop_signal(stop.clone());
    if let Some(limit) = iterations {
        opt = opt.with_iteration_limit(limit);
    }

    let closed = |err: io::Error| {
        // Nobody is reading any more, so end every search, not just this one.
        warn!("wave {wave}: cannot write output ({err}), stopping");
        stop.stop();
    };
    match emit(tagged, wave, &format!("// initial score {}\n", opt.initial_score())) {
        Ok(()) => {
            for improvement in opt.by_ref() {
                if let Err(err) = emit(tagged, wave, &format!("{improvement}")) {
                    closed(err);
                    break;
                }
            }
        }
        Err(err) => closed(err),
    }

    let best = opt.best();
    info!(
        "wave {wave}: best score {} after {} iterations (started at {})",
        best.score,
        opt.iterations(),
        opt.initial_score()
    );
}

/// Write one block to stdout without interleaving with other searches.
fn emit(tagged: bool, wave: WaveformType, block: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if tagged {
        writeln!(out, "// wave {wave}\n{block}")?;
    } else {
        writeln!(out, "{block}")?;
    }
    out.flush()
}

// ─── Score ──────────────────────────────────────────────────────────────────

fn cmd_score(source: &SourceArgs, dump: bool) -> Result<()> {
    let reference = load(&source.data, source.wave, source.chip)?;
    let params = seed_params(source.params.as_deref(), source.zero, source.chip, source.wave)?;
    let report = score_with_report(&params, source.wave, &reference);

    let mut out = io::stdout().lock();
    if dump {
        for row in &report.samples {
            writeln!(out, "{} {} {}", row.index, row.reference, row.predicted)?;
        }
    }
    writeln!(out, "// score {}", report.score)?;
    write!(out, "{params}")?;
    Ok(())
}

// ─── Table ──────────────────────────────────────────────────────────────────

fn cmd_table(wave: WaveformType, chip: Option<ChipId>, params: Option<&Path>, output: &Path) -> Result<()> {
    let params = match (params, chip) {
        (Some(path), _) => read_params(path)?,
        (None, Some(chip)) => match preset_for(chip, wave) {
            Some(p) => p.params,
            None => bail!("no recorded preset for chip {chip} wave {wave}; pass --params"),
        },
        (None, None) => bail!("pass --chip or --params"),
    };

    let table = render_table(wave, &params);
    let mut csv = String::with_capacity(table.samples().len() * 4);
    for s in table.samples() {
        csv.push_str(&s.to_string());
        csv.push('\n');
    }
    fs::write(output, csv).with_context(|| format!("failed to write {}", output.display()))?;
    info!("wave {wave} table written to {}", output.display());
    Ok(())
}

// ─── Presets ────────────────────────────────────────────────────────────────

fn cmd_presets() -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{:<4} {:>4} {:>6}  {:>10} {:>10} {:>10} {:>12} {:>10}",
        "chip", "wave", "score", "bias", "pulse", "top_bit", "distance", "st_mix"
    )?;
    for p in &PRESETS {
        let q = &p.params;
        writeln!(
            out,
            "{:<4} {:>4} {:>6}  {:>10} {:>10} {:>10} {:>12} {:>10}",
            p.chip, p.wave, p.score, q.bias, q.pulse_strength, q.top_bit, q.distance, q.st_mix
        )?;
    }
    Ok(())
}
