//! OfferLab Core — weighted offer ranking with click-driven weight adaptation.
//!
//! Three layers, each calling only the one below:
//! - Weighted sampler: one draw proportional to integer weight
//! - Ranking generator: a full weighted permutation per trial
//! - Adaptive simulator: ranks, simulates clicks on the top two offers,
//!   and steps weights toward target click shares
//!
//! Randomness always comes from a caller-supplied [`rng::DrawSource`].

pub mod config;
pub mod domain;
pub mod ranking;
pub mod report;
pub mod rng;
pub mod sampler;
pub mod simulator;

pub use config::{ConfigError, SimulationConfig};
pub use domain::{ClickCounters, InputViolation, TargetRatios, WeightedItem};
pub use ranking::rank_all;
pub use report::{ItemReport, SimulationReport};
pub use rng::{session_rng, DrawSource, RngHierarchy, ScriptedDraws};
pub use sampler::{pick, pick_index, CumulativeWeightTable, SampleError};
pub use simulator::{
    adjust_weights, Adjustment, ClickModel, SimulationError, Simulator, SimulatorState,
    TrialOutcome,
};
