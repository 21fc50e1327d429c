use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use canvas::calibration::{Calibration, CalibrationError};
use canvas::engine::{EngineCore, EngineError};
use canvas::triangle::{Side, SolidError, SolidEstimate, TriangleSolid, VERTEX_LABELS};
use canvas::viewport::{SourcePoint, ViewPoint, Viewport};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid point `{0}`; expected `x,y`")]
    InvalidPoint(String),
    #[error("cannot open {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Solid(#[from] SolidError),
    #[error("line {line}: {source}")]
    Replay { line: usize, source: EngineError },
}

#[derive(Parser, Debug)]
#[command(name = "stockpile", about = "Estimate stockpile volume and mass from a photographed triangle")]
struct Cli {
    #[command(flatten)]
    calibration: CalibrationArgs,

    #[arg(long, env = "STOCKPILE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct CalibrationArgs {
    /// JSON file with any of `pixel_size_m`, `k_vol`, `k_den`.
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    /// Meters per source-image pixel.
    #[arg(long, env = "STOCKPILE_PIXEL_SIZE_M", global = true)]
    pixel_size: Option<f64>,

    #[arg(long, env = "STOCKPILE_K_VOL", global = true)]
    k_vol: Option<f64>,

    #[arg(long, env = "STOCKPILE_K_DEN", global = true)]
    k_den: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the cone for three source-image points.
    Estimate(EstimateArgs),
    /// Replay a JSON-lines command log against a fresh engine.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[arg(value_parser = parse_point, allow_hyphen_values = true)]
    a: SourcePoint,
    #[arg(value_parser = parse_point, allow_hyphen_values = true)]
    b: SourcePoint,
    #[arg(value_parser = parse_point, allow_hyphen_values = true)]
    c: SourcePoint,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,
}

/// Output of `estimate`.
#[derive(Debug, Serialize)]
struct EstimateReport {
    calibration: Calibration,
    vertices: Vec<SourcePoint>,
    sides: Vec<Side>,
    estimate: SolidEstimate,
}

#[derive(Debug, Serialize)]
struct VertexReport {
    label: &'static str,
    source: SourcePoint,
    view: ViewPoint,
}

/// Engine state after a replay.
#[derive(Debug, Serialize)]
struct SessionReport {
    commands: usize,
    calibration: Calibration,
    viewport: Option<Viewport>,
    vertices: Vec<VertexReport>,
    sides: Vec<Side>,
    estimate: Option<SolidEstimate>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level).with_writer(io::stderr).init();

    let calibration = resolve_calibration(&cli.calibration)?;
    tracing::debug!(?calibration, "calibration resolved");

    match cli.command {
        Command::Estimate(args) => run_estimate(calibration, &args),
        Command::Replay(args) => run_replay(calibration, &args),
    }
}

fn run_estimate(calibration: Calibration, args: &EstimateArgs) -> Result<(), CliError> {
    let report = estimate_report(calibration, [args.a, args.b, args.c])?;
    print_json(&report)
}

fn run_replay(calibration: Calibration, args: &ReplayArgs) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file =
            File::open(&args.input).map_err(|source| CliError::Open { path: args.input.clone(), source })?;
        Box::new(BufReader::new(file))
    };

    let mut core = EngineCore::new();
    core.set_calibration(calibration).map_err(|source| CliError::Replay { line: 0, source })?;
    let commands = replay(&mut core, reader)?;
    tracing::info!(commands, "replay complete");
    print_json(&session_report(&core, commands))
}

/// Merge calibration sources: defaults, then the JSON file, then flags.
fn resolve_calibration(args: &CalibrationArgs) -> Result<Calibration, CliError> {
    let mut calibration = match &args.calibration {
        Some(path) => {
            let file = File::open(path)
                .map_err(|source| CliError::Open { path: path.display().to_string(), source })?;
            serde_json::from_reader::<_, Calibration>(BufReader::new(file))?
        }
        None => Calibration::default(),
    };
    if let Some(pixel_size_m) = args.pixel_size {
        calibration.pixel_size_m = pixel_size_m;
    }
    if let Some(k_vol) = args.k_vol {
        calibration.k_vol = k_vol;
    }
    if let Some(k_den) = args.k_den {
        calibration.k_den = k_den;
    }
    calibration.validate()?;
    Ok(calibration)
}

fn estimate_report(calibration: Calibration, points: [SourcePoint; 3]) -> Result<EstimateReport, CliError> {
    let mut triangle = TriangleSolid::new();
    triangle.replace(&points)?;
    let estimate = triangle.estimate_solid(&calibration)?;
    tracing::info!(volume = estimate.volume, mass = estimate.mass, "estimate computed");
    Ok(EstimateReport {
        calibration,
        vertices: points.to_vec(),
        sides: triangle.side_lengths(calibration.pixel_size_m),
        estimate,
    })
}

/// Apply every command line from `reader`. Returns the number applied.
fn replay(core: &mut EngineCore, reader: impl BufRead) -> Result<usize, CliError> {
    let mut applied = 0_usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(json) = command_line(&line) else {
            continue;
        };
        let actions = core.apply_json(json).map_err(|source| CliError::Replay { line: index + 1, source })?;
        tracing::debug!(line = index + 1, ?actions, "command applied");
        applied = applied.saturating_add(1);
    }
    Ok(applied)
}

/// The JSON payload of a log line, or `None` for blanks and `#` comments.
fn command_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') { None } else { Some(trimmed) }
}

fn session_report(core: &EngineCore, commands: usize) -> SessionReport {
    let vertices = core
        .triangle()
        .vertices()
        .iter()
        .zip(core.vertices_in_view())
        .zip(VERTEX_LABELS)
        .map(|((&source, view), label)| VertexReport { label, source, view })
        .collect();
    SessionReport {
        commands,
        calibration: core.calibration(),
        viewport: core.viewport().copied(),
        vertices,
        sides: core.side_lengths(),
        estimate: core.estimate().ok(),
    }
}

fn parse_point(raw: &str) -> Result<SourcePoint, CliError> {
    let invalid = || CliError::InvalidPoint(raw.to_owned());
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
    let y = y.trim().parse::<f64>().map_err(|_| invalid())?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(invalid());
    }
    Ok(SourcePoint::new(x, y))
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
