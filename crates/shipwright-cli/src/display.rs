//! Display formatting for CLI output

use console::style;
use shipwright_core::ReleaseEntry;

/// Print the end-of-run release banner
pub fn print_banner(release: &str, success: bool) {
    let status = if success {
        style("SUCCESS").green().bold()
    } else {
        style("FAILED").red().bold()
    };
    println!("+++++++++++++++++++++++++++++++++++++++");
    println!("Release:  {release}");
    println!("Status:   {status}");
    println!("+++++++++++++++++++++++++++++++++++++++");
}

/// Print the release listing, newest first
pub fn print_releases(entries: &[ReleaseEntry]) {
    println!("Available releases:");
    for entry in entries {
        let stamp = entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("  {}  {}", style(&entry.name).cyan(), stamp);
    }
}

/// Note that the newest release was reused unchanged
pub fn print_reused(release: &str) {
    println!(
        "{}",
        style("No changes detected in configuration").yellow()
    );
    println!("Reusing existing release: {release}");
}
