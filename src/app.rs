//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the stderr log subscriber
//! - runs the fit or the pseudo-experiment batch
//! - prints the result to stdout

use std::io::IsTerminal;

use clap::Parser;

use crate::cli::{Command, FitArgs, MinimizerArgs, ToyArgs};
use crate::data::REFERENCE_TRUTH;
use crate::domain::{Dataset, DecayParams, FitConfig, Strategy};
use crate::error::{AppError, EXIT_INVALID_INPUT};

pub mod pipeline;

/// Entry point for the `decayfit` binary.
pub fn run() -> Result<(), AppError> {
    // `decayfit` with no subcommand (or with only flags) behaves like
    // `decayfit fit ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_ansi(colour_logs(&std::io::stderr()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Toys(args) => handle_toys(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.minimizer)?;
    let dataset = Dataset::reference();
    let run = pipeline::run_fit(&dataset, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
        return Ok(());
    }

    print!("{}", crate::report::format_summary(&run.result));
    if args.details {
        print!("{}", crate::report::format_details(&run.report));
    }
    Ok(())
}

fn handle_toys(args: ToyArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.minimizer)?;
    let truth = DecayParams::new(args.truth_lambda, args.truth_a0);
    if !(truth.lambda.is_finite() && truth.a0.is_finite()) {
        return Err(AppError::new(EXIT_INVALID_INPUT, "Toy truth must be finite."));
    }
    if truth != REFERENCE_TRUTH {
        tracing::info!(lambda = truth.lambda, a0 = truth.a0, "toys use a custom truth");
    }

    let template = Dataset::reference();
    let summary = pipeline::run_toys(&template, &config, truth, args.n_toys, args.seed)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", crate::report::format_toy_summary(&summary));
    }
    Ok(())
}

/// Colour escapes only when the log stream is a terminal.
fn colour_logs(stream: &impl IsTerminal) -> bool {
    stream.is_terminal()
}

/// Resolve CLI flags into a [`FitConfig`].
pub fn fit_config_from_args(args: &MinimizerArgs) -> Result<FitConfig, AppError> {
    let strategy = Strategy::from_level(args.strategy).ok_or_else(|| {
        AppError::new(
            EXIT_INVALID_INPUT,
            format!("Strategy must be 0, 1 or 2 (got {}).", args.strategy),
        )
    })?;
    Ok(FitConfig {
        backend: args.backend.clone(),
        algorithm: args.algorithm.clone(),
        initial: DecayParams::new(args.lambda0, args.a0),
        steps: DecayParams::new(args.step_lambda, args.step_a0),
        strategy,
        max_function_calls: args.max_calls,
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        minos: args.minos,
    })
}

/// Rewrite argv so `decayfit` defaults to `decayfit fit`.
///
/// Rules:
/// - `decayfit`                           -> `decayfit fit`
/// - `decayfit --minos ...`               -> `decayfit fit --minos ...`
/// - `decayfit --help/--version/-h/-V`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "toys");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_fit() {
        assert_eq!(rewrite_args(argv(&["decayfit"])), argv(&["decayfit", "fit"]));
    }

    #[test]
    fn leading_flags_go_to_fit() {
        assert_eq!(
            rewrite_args(argv(&["decayfit", "--minos", "--details"])),
            argv(&["decayfit", "fit", "--minos", "--details"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for items in [&["decayfit", "toys", "-n", "3"][..], &["decayfit", "--help"][..]] {
            assert_eq!(rewrite_args(argv(items)), argv(items));
        }
    }

    #[test]
    fn logs_to_a_file_have_no_colour() {
        let path = std::env::temp_dir().join(format!("decayfit-log-{}.txt", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        assert!(!colour_logs(&file));
        drop(file);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn config_from_default_flags_matches_default_config() {
        let cli = crate::cli::Cli::parse_from(["decayfit", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args.minimizer).unwrap();
        let expected = FitConfig::default();
        assert_eq!(config.backend, expected.backend);
        assert_eq!(config.initial, expected.initial);
        assert_eq!(config.steps, expected.steps);
        assert_eq!(config.strategy, expected.strategy);
        assert_eq!(config.max_function_calls, expected.max_function_calls);
        assert_eq!(config.tolerance, expected.tolerance);
    }
}
