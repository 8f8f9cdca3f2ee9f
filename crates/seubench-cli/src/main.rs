use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use seubench_core::{BitFlipInjector, BreakpointMarkers, LoopCount, PrintMode};
use seubench_error::BenchError;
use seubench_kernels::{BenchConfig, KernelKind, RunOutcome, run_configured};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CliConfig {
    config_path: Option<PathBuf>,
    kernel: Option<KernelKind>,
    loop_count: Option<LoopCount>,
    warmup_count: Option<u64>,
    change_rate: Option<u64>,
    printing: Option<PrintMode>,
    inject_probability: Option<f64>,
    inject_seed: u64,
    report_path: Option<PathBuf>,
    log_json: bool,
}

fn print_help() {
    let help = "\
seubench: self-checking SEU fault-injection benchmark runner

USAGE:
    seubench [OPTIONS]

The structured YAML log goes to stdout; diagnostics go to stderr
(filtered by RUST_LOG, default warn).

OPTIONS:
    --kernel <NAME>          aes|cache|matrix|qsort (default aes)
    --config <PATH>          TOML configuration file
    --loops <N|unbounded>    Measured iterations
    --warmup <N>             Warm-up iterations before the start marker
    --change-rate <N>        Iterations between fresh reseeds
    --robust                 List mismatching pairs (default)
    --terse                  One count per tag
    --inject <P>             Off-target bit flips with probability P per stage
    --inject-seed <N>        Seed for --inject (default 0)
    --report <PATH>          Write the run report as JSON
    --log-json               JSON diagnostics on stderr
    -h, --help               Show this help
";
    println!("{help}");
}

fn next_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str, String> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_args(args: &[String]) -> Result<CliConfig, String> {
    let mut cli = CliConfig::default();

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--kernel" => {
                let value = next_value(args, &mut index, "--kernel")?;
                cli.kernel = Some(value.parse().map_err(|e: BenchError| e.to_string())?);
            }
            "--config" => {
                cli.config_path = Some(PathBuf::from(next_value(args, &mut index, "--config")?));
            }
            "--loops" => {
                let value = next_value(args, &mut index, "--loops")?;
                cli.loop_count = Some(value.parse().map_err(|e: BenchError| e.to_string())?);
            }
            "--warmup" => {
                let value = next_value(args, &mut index, "--warmup")?;
                cli.warmup_count = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid --warmup value: {value}"))?,
                );
            }
            "--change-rate" => {
                let value = next_value(args, &mut index, "--change-rate")?;
                cli.change_rate = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid --change-rate value: {value}"))?,
                );
            }
            "--robust" => cli.printing = Some(PrintMode::Robust),
            "--terse" => cli.printing = Some(PrintMode::Terse),
            "--inject" => {
                let value = next_value(args, &mut index, "--inject")?;
                let probability = value
                    .parse::<f64>()
                    .map_err(|_| format!("invalid --inject value: {value}"))?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(format!("--inject must be within 0..=1, got {value}"));
                }
                cli.inject_probability = Some(probability);
            }
            "--inject-seed" => {
                let value = next_value(args, &mut index, "--inject-seed")?;
                cli.inject_seed = value
                    .parse()
                    .map_err(|_| format!("invalid --inject-seed value: {value}"))?;
            }
            "--report" => {
                cli.report_path = Some(PathBuf::from(next_value(args, &mut index, "--report")?));
            }
            "--log-json" => cli.log_json = true,
            "-h" | "--help" => {
                print_help();
                return Err(String::new());
            }
            unknown => return Err(format!("unknown option: {unknown}")),
        }
        index += 1;
    }

    Ok(cli)
}

/// File settings (or kernel defaults) with command-line overrides on top.
fn bench_config(cli: &CliConfig) -> Result<BenchConfig, String> {
    let mut config = match &cli.config_path {
        Some(path) => BenchConfig::load(path).map_err(|e| e.to_string())?,
        None => BenchConfig::for_kernel(cli.kernel.unwrap_or_default()),
    };
    if let Some(kernel) = cli.kernel {
        config.kernel = kernel;
    }
    if let Some(loop_count) = cli.loop_count {
        config.loop_count = loop_count;
    }
    if let Some(warmup_count) = cli.warmup_count {
        config.warmup_count = warmup_count;
    }
    if cli.change_rate.is_some() {
        config.change_rate = cli.change_rate;
    }
    if let Some(printing) = cli.printing {
        config.printing = printing;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    // A subscriber may already be installed (tests); keep it.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn write_report(path: &Path, outcome: &RunOutcome) -> Result<(), String> {
    let payload = serde_json::to_vec_pretty(outcome)
        .map_err(|error| format!("report_serialize_failed: {error}"))?;
    std::fs::write(path, payload)
        .map_err(|error| format!("report_write_failed path={} error={error}", path.display()))
}

fn execute<W: Write>(cli: &CliConfig, sink: W) -> Result<RunOutcome, String> {
    let config = bench_config(cli)?;
    let faults = cli
        .inject_probability
        .map(|probability| BitFlipInjector::new(cli.inject_seed, probability));
    if let Some(probability) = cli.inject_probability {
        info!(
            target: "seubench.cli",
            probability,
            seed = cli.inject_seed,
            "off-target fault injection enabled"
        );
    }

    let outcome = run_configured(&config, sink, BreakpointMarkers, faults).map_err(|e| {
        if e.is_user_recoverable() {
            format!("configuration rejected: {e}")
        } else {
            e.to_string()
        }
    })?;

    if let Some(path) = &cli.report_path {
        write_report(path, &outcome)?;
    }
    info!(target: "seubench.cli", "{}", outcome.triage_line());
    Ok(outcome)
}

fn run(args: &[String]) -> Result<bool, String> {
    let cli = parse_args(args)?;
    init_tracing(cli.log_json);
    let stdout = io::stdout();
    let outcome = execute(&cli, stdout.lock())?;
    if !outcome.warmup_clean() {
        error!(target: "seubench.cli", "{}", outcome.triage_line());
    }
    Ok(outcome.warmup_clean())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        // Warm-up mismatches mean the benchmark itself is broken.
        Ok(false) => ExitCode::from(1),
        Err(error) if error.is_empty() => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR seubench failed: {error}");
            ExitCode::from(2)
        }
    }
}
