//! # Convergence Simulation
//!
//! Runs many entry-log trackers against replicated stores that only agree
//! eventually, to check the log converges under churn.
//!
//! ## Conditions Simulated
//!
//! - Store updates duplicated and reordered between replicas
//! - Presence notifications delivered twice
//! - Rosters lagging behind the newest joiner
//! - Clients leaving with writes still in flight
//!
//! ## Modules
//!
//! - `replica`: last-write-wins replicas and the relay hub
//! - `convergence`: clients, churn and the final report

pub mod convergence;
pub mod replica;

pub use convergence::{ConvergenceReport, ConvergenceSimulation, SETTLE_ROUNDS};
pub use replica::{DeliveryConditions, HubStats, ReplicaHub, ReplicaId, ReplicaStore, StateUpdate};
