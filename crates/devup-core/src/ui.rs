//! Terminal output helpers using the `colored` crate.

use colored::Colorize;

const RULE_WIDTH: usize = 50;

/// Print a bold heading line.
pub fn heading(msg: &str) {
    println!("{}", msg.bold());
}

/// Print a horizontal separator.
pub fn rule() {
    println!("{}", "=".repeat(RULE_WIDTH).dimmed());
}

/// Print an "install" action (cyan)
pub fn installing(what: &str) {
    println!("  {} {}", "install".cyan(), what);
}

/// Print a "start" action (magenta)
pub fn starting(what: &str, detail: &str) {
    println!("  {} {} ({})", "start".magenta(), what, detail.dimmed());
}

/// Print a "stop" action (yellow)
pub fn stopping(what: &str) {
    println!("  {} {}", "stop".yellow(), what);
}

/// Print an "ok" result (green)
pub fn ok(msg: &str) {
    println!("  {} {}", "ok".green(), msg);
}

/// Print a "failed" result (red)
pub fn failed(msg: &str) {
    println!("  {} {}", "failed".red(), msg);
}

/// Print a labelled link, e.g. `Python API: http://localhost:8000`.
pub fn link(label: &str, url: &str) {
    println!("  {:<18} {}", format!("{}:", label), url.cyan().underline());
}

/// Print a dimmed hint line.
pub fn hint(msg: &str) {
    println!("{}", msg.dimmed());
}
