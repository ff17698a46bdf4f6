use crate::cargo::{step, OnFailure, TARGET};
use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking workspace builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    step(
        "Checking host build (std + mocks)",
        &["check", "--workspace", "--all-targets", "--features", "device-hal/std"],
        OnFailure::Abort,
    )?;

    step(
        "Checking device-hal (no_std)",
        &["check", "-p", "device-hal", "--target", TARGET, "--features", "defmt"],
        OnFailure::Abort,
    )?;

    step(
        "Checking ncp-update (no_std)",
        &["check", "-p", "ncp-update", "--target", TARGET, "--features", "defmt"],
        OnFailure::Abort,
    )?;

    step(
        "Checking firmware (nRF52840)",
        &["check", "-p", "firmware", "--target", TARGET, "--features", "hardware"],
        OnFailure::Abort,
    )?;

    step(
        "Running clippy lints",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        OnFailure::Warn,
    )?;

    if step("Checking code formatting", &["fmt", "--all", "--check"], OnFailure::Warn)?
        .is_none()
    {
        eprintln!("     Run 'cargo fmt --all' to fix");
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
