//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{FitResult, MinosError, ParamIndex, PointResidual};
use crate::report::{FitReport, ToySummary};

/// The four result lines printed after every fit.
pub fn format_summary(result: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Fit success: {}\n",
        if result.converged { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "lambda = {} ± {}\n",
        fmt_g(result.params.lambda),
        fmt_g(result.errors.lambda)
    ));
    out.push_str(&format!(
        "A0     = {} ± {}\n",
        fmt_g(result.params.a0),
        fmt_g(result.errors.a0)
    ));
    out.push_str(&format!(
        "chi2   = {} (Npoints = {}, Npar = {})\n",
        fmt_g(result.chi2),
        result.n_points,
        result.n_params
    ));
    out
}

/// Diagnostics shown with `--details`.
pub fn format_details(report: &FitReport) -> String {
    let r = &report.result;
    let mut out = String::new();

    out.push_str(&format!(
        "\nMinimizer: {}/{} (strategy {})\n",
        report.backend,
        report.algorithm,
        report.strategy.level()
    ));
    out.push_str(&format!(
        "EDM = {:.3e} | calls = {} | iterations = {}\n",
        r.edm, r.function_calls, r.iterations
    ));
    match report.chi2_per_ndf {
        Some(per) => out.push_str(&format!(
            "chi2/ndf = {} / {} = {}\n",
            fmt_g(r.chi2),
            report.ndf,
            fmt_g(per)
        )),
        None => out.push_str(&format!("chi2/ndf = {} / 0\n", fmt_g(r.chi2))),
    }

    out.push_str("\nCovariance:\n");
    match &r.covariance {
        Some(cov) => {
            out.push_str(&format!("{:<8} {:>14} {:>14}\n", "", "lambda", "A0"));
            for which in ParamIndex::ALL {
                let row = &cov[which.index()];
                out.push_str(&format!(
                    "{:<8} {:>14.6e} {:>14.6e}\n",
                    which.name(),
                    row[0],
                    row[1]
                ));
            }
            if let Some(rho) = report.correlation {
                out.push_str(&format!("corr(lambda, A0) = {rho:.4}\n"));
            }
        }
        None => out.push_str("  (not available: Hessian is not positive definite)\n"),
    }

    if r.minos_lambda.is_some() || r.minos_a0.is_some() {
        out.push_str("\nMINOS errors:\n");
        for which in ParamIndex::ALL {
            if let Some(me) = r.minos(which) {
                out.push_str(&format_minos_line(which, &me));
            }
        }
    }

    out.push_str("\nResiduals (diff = predicted - observed):\n");
    out.push_str(&format_residual_table(&report.residuals));
    out
}

fn format_minos_line(which: ParamIndex, me: &MinosError) -> String {
    let flag = |valid: bool| if valid { "" } else { " (invalid)" };
    format!(
        "{:<8} {}{}  +{}{}\n",
        which.name(),
        fmt_g(me.lower),
        flag(me.lower_valid),
        fmt_g(me.upper),
        flag(me.upper_valid)
    )
}

fn format_residual_table(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>6} {:>10} {:>10} {:>10} {:>8} {:>8} {:>8}\n",
            "t", "observed", "predicted", "diff", "error", "pull", "chi2"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<10} {:-<10} {:-<10} {:-<8} {:-<8} {:-<8}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(&format!(
            "{:>6.1} {:>10.2} {:>10.2} {:>10.2} {:>8.2} {:>8.3} {:>8.3}\n",
            r.point.t, r.point.observed, r.predicted, r.diff, r.error_used, r.pull, r.chi2_term
        ));
    }
    out
}

/// Summary printed by the `toys` subcommand.
pub fn format_toy_summary(summary: &ToySummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Toys: {} (seed {}) | converged: {} ({:.1}%)\n",
        summary.n_toys,
        summary.seed,
        summary.n_converged,
        100.0 * summary.converged_fraction()
    ));
    out.push_str(&format!("mean chi2 = {}\n\n", fmt_g(summary.chi2_mean)));

    out.push_str(&format!(
        "{:<8} {:>12} {:>12} {:>12} {:>12} {:>10} {:>10}\n",
        "param", "truth", "mean", "std", "mean err", "pull mean", "pull std"
    ));
    for which in ParamIndex::ALL {
        let p = summary.param(which);
        out.push_str(&format!(
            "{:<8} {:>12} {:>12} {:>12} {:>12} {:>10.3} {:>10.3}\n",
            which.name(),
            fmt_g(p.truth),
            fmt_g(p.mean),
            fmt_g(p.std_dev),
            fmt_g(p.mean_error),
            p.pull_mean,
            p.pull_std
        ));
    }
    out
}

/// Six significant digits, trailing zeros dropped; scientific notation for
/// very large or very small magnitudes.
pub fn fmt_g(v: f64) -> String {
    const SIG: i32 = 6;
    if !v.is_finite() {
        return format!("{v}");
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let exp = v.abs().log10().floor() as i32;
    if !(-5..SIG).contains(&exp) {
        let s = format!("{:.*e}", (SIG - 1) as usize, v);
        return match s.split_once('e') {
            Some((mantissa, e)) => format!("{}e{e}", trim_zeros(mantissa)),
            None => s,
        };
    }
    let decimals = (SIG - 1 - exp).max(0) as usize;
    trim_zeros(&format!("{v:.decimals$}")).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, DecayParams, FitConfig};
    use crate::report::{FitReport, summarize_toys};

    fn result(converged: bool) -> FitResult {
        FitResult {
            params: DecayParams::new(0.0998, 1001.5),
            errors: DecayParams::new(0.0021, 17.25),
            chi2: 1.8296,
            converged,
            n_points: 9,
            n_params: 2,
            covariance: Some([[4.41e-6, 0.0296], [0.0296, 297.6]]),
            edm: 3.2e-11,
            function_calls: 187,
            iterations: 12,
            minos_lambda: Some(MinosError {
                lower: -0.002,
                upper: 0.0022,
                lower_valid: true,
                upper_valid: false,
            }),
            minos_a0: None,
        }
    }

    #[test]
    fn summary_is_four_lines() {
        let s = format_summary(&result(true));
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Fit success: yes",
                "lambda = 0.0998 ± 0.0021",
                "A0     = 1001.5 ± 17.25",
                "chi2   = 1.8296 (Npoints = 9, Npar = 2)",
            ]
        );
        assert!(format_summary(&result(false)).starts_with("Fit success: no\n"));
    }

    #[test]
    fn details_include_covariance_minos_and_residuals() {
        let report = FitReport::new(&FitConfig::default(), &Dataset::reference(), &result(true));
        let s = format_details(&report);
        assert!(s.contains("Minimizer: argmin/migrad (strategy 2)"));
        assert!(s.contains("corr(lambda, A0)"));
        assert!(s.contains("MINOS errors:"));
        assert!(s.contains("(invalid)"));
        // header + rule + nine points
        let table = s.split("Residuals").nth(1).unwrap();
        assert_eq!(table.lines().count(), 1 + 2 + 9);
    }

    #[test]
    fn toy_summary_mentions_every_parameter() {
        let fits = vec![result(true), result(true)];
        let s = format_toy_summary(&summarize_toys(&DecayParams::new(0.1, 1000.0), &fits, 3));
        assert!(s.starts_with("Toys: 2 (seed 3) | converged: 2 (100.0%)"));
        assert!(s.contains("\nlambda "));
        assert!(s.contains("\nA0 "));
    }

    #[test]
    fn general_number_format() {
        assert_eq!(fmt_g(0.1), "0.1");
        assert_eq!(fmt_g(1000.0), "1000");
        assert_eq!(fmt_g(1621.6), "1621.6");
        assert_eq!(fmt_g(0.00212345678), "0.00212346");
        assert_eq!(fmt_g(2.5e-7), "2.5e-7");
        assert_eq!(fmt_g(1234567.0), "1.23457e6");
        assert_eq!(fmt_g(0.0), "0");
        assert_eq!(fmt_g(f64::NAN), "NaN");
    }
}
