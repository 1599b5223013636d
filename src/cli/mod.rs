//! Command-line parsing for the decay fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "decayfit",
    version,
    about = "Chi-square fit of an exponential decay with asymmetric errors"
)]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error); logs go to stderr.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the embedded reference dataset and print the result.
    Fit(FitArgs),
    /// Fit pseudo-datasets drawn around a known truth and summarize the spread.
    Toys(ToyArgs),
}

/// Minimizer setup shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct MinimizerArgs {
    /// Minimizer backend.
    #[arg(long, default_value = "argmin")]
    pub backend: String,

    /// Minimization algorithm (`migrad` is an alias of `lbfgs`).
    #[arg(long, default_value = "migrad")]
    pub algorithm: String,

    /// Start value for the decay constant λ.
    #[arg(long = "lambda0", default_value_t = 0.2, allow_negative_numbers = true)]
    pub lambda0: f64,

    /// Start value for the initial activity A0.
    #[arg(long = "a0", default_value_t = 900.0, allow_negative_numbers = true)]
    pub a0: f64,

    /// Initial step size for λ.
    #[arg(long, default_value_t = 0.01)]
    pub step_lambda: f64,

    /// Initial step size for A0.
    #[arg(long = "step-a0", default_value_t = 10.0)]
    pub step_a0: f64,

    /// Effort spent on curvature: 0 fast, 1 default, 2 thorough.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub strategy: u8,

    /// Ceiling on objective evaluations.
    #[arg(long, default_value_t = 10_000)]
    pub max_calls: u64,

    /// Ceiling on solver iterations.
    #[arg(long, default_value_t = 10_000)]
    pub max_iterations: u64,

    /// Convergence tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub tolerance: f64,

    /// Also compute asymmetric errors by profile scan.
    #[arg(long)]
    pub minos: bool,
}

/// Options for `decayfit fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub minimizer: MinimizerArgs,

    /// Print covariance, MINOS errors and the per-point residual table.
    #[arg(long)]
    pub details: bool,

    /// Print the full report as JSON instead of text.
    #[arg(long, conflicts_with = "details")]
    pub json: bool,
}

/// Options for `decayfit toys`.
#[derive(Debug, Args, Clone)]
pub struct ToyArgs {
    #[command(flatten)]
    pub minimizer: MinimizerArgs,

    /// Number of pseudo-experiments.
    #[arg(short = 'n', long = "n", default_value_t = 100)]
    pub n_toys: usize,

    /// Random seed for pseudo-data generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// True decay constant used to generate the toys.
    #[arg(long, default_value_t = 0.1)]
    pub truth_lambda: f64,

    /// True initial activity used to generate the toys.
    #[arg(long = "truth-a0", default_value_t = 1000.0)]
    pub truth_a0: f64,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults_reproduce_reference_setup() {
        let cli = Cli::parse_from(["decayfit", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let m = args.minimizer;
        assert_eq!(m.backend, "argmin");
        assert_eq!(m.algorithm, "migrad");
        assert_eq!((m.lambda0, m.a0), (0.2, 900.0));
        assert_eq!((m.step_lambda, m.step_a0), (0.01, 10.0));
        assert_eq!(m.strategy, 2);
        assert_eq!((m.max_calls, m.max_iterations), (10_000, 10_000));
        assert_eq!(m.tolerance, 1e-6);
        assert!(!m.minos && !args.details && !args.json);
        assert_eq!(cli.log_level, tracing::Level::WARN);
    }

    #[test]
    fn strategy_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["decayfit", "fit", "--strategy", "3"]).is_err());
    }

    #[test]
    fn toys_accept_count_seed_and_global_log_level() {
        let cli = Cli::parse_from([
            "decayfit", "toys", "-n", "25", "--seed", "7", "--log-level", "debug",
        ]);
        let Command::Toys(args) = cli.command else {
            panic!("expected toys");
        };
        assert_eq!(args.n_toys, 25);
        assert_eq!(args.seed, 7);
        assert_eq!(args.truth_lambda, 0.1);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn json_and_details_are_exclusive() {
        assert!(Cli::try_parse_from(["decayfit", "fit", "--json", "--details"]).is_err());
    }
}
