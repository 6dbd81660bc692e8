//! Console output for deploy and undeploy runs

use colored::{ColoredString, Colorize};

/// Outcome class of a console line, which picks its marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Note,
    Done,
    Caution,
    Failed,
}

impl Tone {
    fn marker(self) -> ColoredString {
        match self {
            Self::Note => "•".cyan(),
            Self::Done => "✓".green().bold(),
            Self::Caution => "!".yellow().bold(),
            Self::Failed => "✗".red().bold(),
        }
    }
}

fn line(tone: Tone, msg: &str) -> String {
    format!("{} {msg}", tone.marker())
}

pub fn info(msg: &str) {
    println!("{}", line(Tone::Note, msg));
}

pub fn success(msg: &str) {
    println!("{}", line(Tone::Done, msg));
}

/// Written to stderr, like errors
pub fn warn(msg: &str) {
    eprintln!("{}", line(Tone::Caution, msg));
}

pub fn error(msg: &str) {
    eprintln!("{}", line(Tone::Failed, msg));
}

/// Indented secondary detail under the previous line
pub fn dim(msg: &str) {
    println!("    {}", msg.dimmed());
}

/// Title of a run, underlined to its display width
pub fn header(title: &str) {
    let width = title.chars().count();
    println!("\n{}\n{}", title.bold(), "═".repeat(width).dimmed());
}

/// Labelled value, e.g. `server:      http://localhost:8002`
pub fn kv(key: &str, value: &str) {
    let label = format!("{key}:");
    println!("  {} {value}", format!("{label:<12}").dimmed());
}

/// Progress line for the n-th command of a phase
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {msg}", step_label(num, total).cyan());
}

/// Counter padded to the width of `total`, e.g. `( 3/14)`
fn step_label(num: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("({num:>width$}/{total})")
}

/// Count with a naive English plural, e.g. "1 file" or "3 files"
pub fn count(n: usize, singular: &str) -> String {
    match n {
        1 => format!("1 {singular}"),
        _ => format!("{n} {singular}s"),
    }
}
