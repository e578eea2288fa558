//! # Controller
//!
//! The simulation orchestrator, the Henri adaptive decision engine, test
//! scenarios and realtime playback.

pub mod henri;
pub mod orchestrator;
pub mod playback;
pub mod scenario;

pub use henri::{Decision, DecisionEngine, Mode, DECISION_LOG_CAPACITY};
pub use orchestrator::{ModuleFailure, PersistedState, Simulator, TickReport, COMFORTABLE_SCORE, HISTORY_CAPACITY};
pub use playback::{Playback, SharedSimulator};
pub use scenario::Scenario;
