//! Fusion Simulation Harness
//!
//! Deterministic scenarios for exercising `fusion_core` end to end. A seeded
//! [`Oracle`] moves a target along an analytic trajectory and produces noisy
//! laser and radar packages; the [`ScenarioRunner`] feeds them to a
//! [`FusionEkf`](fusion_core::FusionEkf) and scores the estimate.
//!
//! # Usage
//!
//! ```
//! use fusion_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_duration(5.0)
//!     .run(ScenarioId::Straight)
//!     .unwrap();
//! assert!(result.position_rmse[0] < 1.0);
//! ```

mod error;
mod oracle;
mod runner;
pub mod scenarios;

pub use error::SimError;
pub use oracle::{Oracle, Trajectory};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
