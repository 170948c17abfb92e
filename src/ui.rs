//! Terminal presentation: spinners, phase lines, failure banners.
//!
//! Everything here is cosmetic.  Diagnostics go through `tracing`; this module
//! only renders what an operator watching a restore needs to see:
//!
//! - a spinner while a job runs,
//! - `✓ <message>` when a phase succeeds,
//! - a boxed banner with job name, namespace and reason when it fails.
//!
//! The `render_*` functions return plain strings so tests can check the text
//! without a terminal.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames, same style as indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

static RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}
fn icon_done() -> console::StyledObject<&'static str> {
    style("✓").cyan().bold()
}
fn icon_note() -> console::StyledObject<&'static str> {
    style("!").yellow().bold()
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Indeterminate spinner for `label`, drawn on stderr and hidden when stderr
/// is not a terminal.
pub fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(s) = ProgressStyle::with_template("  {spinner:.cyan}  {msg} {elapsed:.dim}") {
        pb.set_style(s.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── Phase lines ──────────────────────────────────────────────────────────────

pub fn job_created(name: &str, namespace: &str) {
    println!(
        "  {}  created job {} in namespace {}",
        style("•").dim(),
        style(name).bold(),
        style(namespace).bold()
    );
}

pub fn phase_ok(message: &str) {
    println!("  {}  {}", icon_ok(), style(message).bold());
}

pub fn phase_err(phase: &str, message: &str) {
    println!("  {}  {}", icon_err(), style(phase).bold());
    eprintln!();
    eprintln!("  {} {}", style("Error:").red().bold(), message);
}

/// The boxed report printed when a job ends in `Failed`.
pub fn render_failure_banner(header: &str, job: &str, namespace: &str, reason: &str) -> String {
    format!(
        "{RULE}\n{header}\nJob Name:  {job}\nNamespace: {namespace}\n\nJob failed: {reason}\n{RULE}"
    )
}

pub fn failure_banner(header: &str, job: &str, namespace: &str, reason: &str) {
    println!("  {}  {}", icon_err(), style(header).bold());
    eprintln!();
    for line in render_failure_banner(header, job, namespace, reason).lines() {
        eprintln!("  {}", style(line).white());
    }
    eprintln!();
}

// ─── Summary ──────────────────────────────────────────────────────────────────

pub fn print_success(message: &str) {
    println!();
    println!("  {} {}", icon_done(), style(message).cyan().bold());
    println!();
}

/// A heads-up that is not an error: the command still exits 0.
pub fn print_notice(message: &str) {
    eprintln!();
    eprintln!("  {}  {}", icon_note(), style(message).yellow());
    eprintln!();
}

pub fn print_failure(message: &str) {
    eprintln!();
    eprintln!("  {}  {}", icon_err(), style(message).red().bold());
    eprintln!();
}

// ─── Dry-run report ───────────────────────────────────────────────────────────

/// Print pre-rendered dry-run lines under a heading.
pub fn print_dry_run(lines: &[String]) {
    println!();
    println!("  {}", style("[Dry Run] No changes will be made.").yellow().bold());
    for line in lines {
        println!("  {line}");
    }
    println!();
}

// ─── Tests ────────────────────────────────────────────────────────────────────
