// src/utils/log.rs

//! Run-report formatting on top of the `log` facade.
//!
//! Headers, numbered steps, and summaries share one layout so a sync run
//! reads the same whichever logger the binary installs.

/// Width of header rules.
const RULE_WIDTH: usize = 60;

/// Format a numbered step line.
pub fn step_line(step_num: usize, total: usize, message: &str) -> String {
    format!("[STEP {}/{}] {}", step_num, total, message)
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    ::log::info!("{}", step_line(step_num, total, message));
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    ::log::info!("{}", border);
    ::log::info!("  {}", title);
    ::log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    ::log::info!("    {}", message);
}

pub fn success(message: &str) {
    ::log::info!("✓ {}", message);
}

/// Format the lines of a summary section.
pub fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    std::iter::once(format!("[SUMMARY] {}", title))
        .chain(
            items
                .iter()
                .map(|(key, value)| format!("    {}: {}", key, value)),
        )
        .collect()
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        ::log::info!("{}", line);
    }
}
