//! elasticity-core: subscriber price-elasticity prediction engine.
//!
//! Three predictors (acquisition, repeat loss, tier migration) driven by one
//! immutable ModelConfig, plus the profile mixer that blends behavioural
//! archetypes into per-segment elasticities.

pub mod acquisition;
pub mod archetype;
pub mod config;
pub mod engine;
pub mod error;
pub mod migration;
pub mod numerics;
pub mod profile_mixer;
pub mod repeat_loss;
pub mod rng;
pub mod scenario;
pub mod segment_axes;
pub mod types;
