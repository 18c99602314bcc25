//! `strobe run`: load configuration, apply overrides, run one scenario.

use std::path::Path;

use strobe_config::HarnessConfig;
use strobe_scenarios::{Scenario, ScenarioReport};

use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the named scenario and prints its report. A failing scenario is an
/// error, so the exit code is 0 whenever a report is printed.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let scenario: Scenario = args.scenario.parse()?;
    let mut config = load(global.config.as_deref())?;
    apply_overrides(&mut config, args);
    tracing::debug!(
        %scenario,
        seed = config.harness.seed,
        mode = ?config.fifo.mode,
        waveform = ?config.waveform.path,
        "configuration loaded"
    );

    let report = scenario.run(&config)?;
    if !global.quiet || args.format == ReportFormat::Json {
        println!("{}", render(&report, args.format)?);
    }
    Ok(0)
}

fn load(config: Option<&str>) -> Result<HarnessConfig, strobe_config::ConfigError> {
    match config {
        Some(path) => strobe_config::load_config_file(Path::new(path)),
        None => strobe_config::load_config(&std::env::current_dir()?),
    }
}

fn apply_overrides(config: &mut HarnessConfig, args: &RunArgs) {
    if let Some(mode) = args.mode {
        config.fifo.mode = Some(mode.into());
    }
    if let Some(seed) = args.seed {
        config.harness.seed = seed;
    }
    if let Some(path) = &args.waveform {
        config.waveform.path = Some(path.clone());
    }
}

fn render(report: &ScenarioReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(report.to_string()),
        ReportFormat::Json => serde_json::to_string_pretty(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModeArg;
    use std::path::PathBuf;
    use strobe_config::FifoMode;

    fn args(scenario: &str) -> RunArgs {
        RunArgs {
            scenario: scenario.to_string(),
            mode: None,
            seed: None,
            waveform: None,
            format: ReportFormat::Text,
        }
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config =
            strobe_config::load_config_from_str("[harness]\nseed = 3\n[fifo]\nmode = \"async\"\n")
                .unwrap();
        let mut run_args = args("fifo-depth-stress");
        run_args.mode = Some(ModeArg::Sync);
        run_args.seed = Some(99);
        run_args.waveform = Some(PathBuf::from("wave.vcd"));
        apply_overrides(&mut config, &run_args);
        assert_eq!(config.fifo.mode, Some(FifoMode::Sync));
        assert_eq!(config.harness.seed, 99);
        assert_eq!(config.waveform.path, Some(PathBuf::from("wave.vcd")));
    }

    #[test]
    fn no_overrides_keep_file_values() {
        let mut config = strobe_config::load_config_from_str("[harness]\nseed = 3\n").unwrap();
        apply_overrides(&mut config, &args("spi-smoke"));
        assert_eq!(config.harness.seed, 3);
        assert!(config.fifo.mode.is_none());
        assert!(config.waveform.path.is_none());
    }

    #[test]
    fn loads_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[harness]\nseed = 17\n").unwrap();
        let config = load(path.to_str()).unwrap();
        assert_eq!(config.harness.seed, 17);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load(path.to_str()).is_err());
    }

    #[test]
    fn unknown_scenario_fails_before_loading() {
        let global = GlobalArgs {
            quiet: true,
            config: Some("/nonexistent/strobe.toml".to_string()),
        };
        let err = run(&args("nope"), &global).unwrap_err();
        assert_eq!(err.to_string(), "unknown scenario 'nope'");
    }

    #[test]
    fn runs_single_byte_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strobe.toml");
        std::fs::write(&path, "[spi]\nsettle = \"100ns\"\ngap = \"0ns\"\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            config: path.to_str().map(str::to_string),
        };
        assert_eq!(run(&args("spi-single-byte"), &global).unwrap(), 0);
    }

    #[test]
    fn json_render_has_scenario_name() {
        let config = strobe_config::load_config_from_str("[spi]\ngap = \"0ns\"\n").unwrap();
        let report = Scenario::SpiCommandOnly.run(&config).unwrap();
        let json = render(&report, ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["scenario"], "spi-command-only");
        assert!(value.get("mode").is_none());
        assert!(render(&report, ReportFormat::Text)
            .unwrap()
            .starts_with("PASS spi-command-only"));
    }
}
