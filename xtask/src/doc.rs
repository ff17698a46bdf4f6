use crate::cargo::{step, OnFailure};
use anyhow::Result;
use colored::Colorize;

/// Library crates with public API docs. The firmware binary needs the
/// `hardware` feature and an embedded target, so it is left out.
const DOCUMENTED_PACKAGES: &[&str] = &["device-hal", "ncp-update"];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let mut args = vec!["doc", "--no-deps", "--document-private-items"];
    for &package in DOCUMENTED_PACKAGES {
        args.extend(["-p", package]);
    }
    if open {
        args.push("--open");
    }
    step("Building HAL docs", &args, OnFailure::Abort)?;

    if !open {
        for package in DOCUMENTED_PACKAGES {
            println!(
                "   {}",
                format!(
                    "target/doc/{}/index.html",
                    package.replace('-', "_")
                )
                .dimmed()
            );
        }
        println!(
            "   {}",
            "Or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
        println!();
    }

    Ok(())
}
