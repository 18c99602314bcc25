//! `strobe list`: print the scenario registry.

use strobe_scenarios::Scenario;

/// Prints one line per scenario: name, FIFO marker and description.
pub fn run() -> Result<i32, Box<dyn std::error::Error>> {
    for line in listing() {
        println!("{line}");
    }
    Ok(0)
}

fn listing() -> Vec<String> {
    let width = Scenario::ALL
        .iter()
        .map(|s| s.name().len())
        .max()
        .unwrap_or(0);
    Scenario::ALL
        .iter()
        .map(|s| {
            let marker = if s.needs_fifo_mode() { "[mode]" } else { "" };
            format!("{:width$}  {:6}  {}", s.name(), marker, s.description())
        })
        .collect()
}
