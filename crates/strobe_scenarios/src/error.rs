//! Scenario error type.

use strobe_config::ConfigError;
use strobe_sim::SimError;
use strobe_verify::VerifyError;

/// Why a scenario did not pass.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The configuration could not be resolved. Raised before simulation starts.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A check failed or a component reported a failure.
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// The simulation kernel failed outside any component.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// No scenario has this name.
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
}
