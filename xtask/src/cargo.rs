//! Shared cargo invocation with timed, coloured reporting.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Target triple of the nRF52840 (Cortex-M4F).
pub const TARGET: &str = "thumbv7em-none-eabihf";

/// Crates with host-side tests.
pub const TESTED_PACKAGES: &[&str] = &["device-hal", "ncp-update", "firmware"];

/// What to do when a step fails.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    Abort,
    Warn,
}

/// Run `cargo <args>`, print a status line, and return the output.
pub fn step(label: &str, args: &[&str], on_failure: OnFailure) -> Result<Option<Output>> {
    println!("{}", format!("  {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
        println!();
        return Ok(Some(output));
    }

    match on_failure {
        OnFailure::Abort => {
            eprintln!("{}", format!("  ✗ {label} failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            eprintln!("{}", String::from_utf8_lossy(&output.stdout));
            anyhow::bail!("{label} failed");
        }
        OnFailure::Warn => {
            eprintln!("{}", format!("  ⚠ {label} reported problems").yellow().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            println!();
            Ok(None)
        }
    }
}

/// `-p a -p b ...` for [`TESTED_PACKAGES`].
pub fn package_args() -> Vec<&'static str> {
    TESTED_PACKAGES.iter().flat_map(|p| ["-p", *p]).collect()
}

/// Summaries of every `test result:` line in cargo test output.
pub fn test_summaries(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split("test result:").nth(1))
        .map(|summary| summary.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_args_interleave_flag() {
        assert_eq!(
            package_args(),
            ["-p", "device-hal", "-p", "ncp-update", "-p", "firmware"]
        );
    }

    #[test]
    fn summaries_collected_per_binary() {
        let output = "running 2 tests\n\
                      test result: ok. 2 passed; 0 failed\n\
                      running 1 test\n\
                      test result: ok. 1 passed; 0 failed\n";
        assert_eq!(
            test_summaries(output),
            ["ok. 2 passed; 0 failed", "ok. 1 passed; 0 failed"]
        );
    }

    #[test]
    fn no_summary_when_nothing_ran() {
        assert!(test_summaries("error: could not compile").is_empty());
    }
}
