//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - QPU leasing and task orchestration for Slurm",
        style("Alsvid").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  alsvid-qrmi    Resource client layer and adapter registry");
    println!("  alsvid-slurm   SPANK-side lease lifecycle");
    println!("  alsvid-cli     Command-line task runner");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/hiq-lab/alsvid").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
