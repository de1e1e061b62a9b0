use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Profile weights for {context} sum to zero; at least one archetype must receive a positive weight")]
    ZeroWeightTotal { context: String },

    #[error("Profile weights sum to {total}, expected 1.0")]
    UnnormalizedWeights { total: f64 },

    #[error("Negative weight {weight} for archetype '{archetype}'")]
    NegativeWeight { archetype: String, weight: f64 },

    #[error("Archetype '{name}' not found in catalog")]
    UnknownArchetype { name: String },

    #[error("Time-lag distribution for '{owner}' is invalid: {reason}")]
    InvalidTimeLag { owner: String, reason: String },

    #[error("Segment '{name}' is invalid: {reason}")]
    InvalidSegment { name: String, reason: String },

    #[error("Segment '{name}' appears more than once in the batch")]
    DuplicateSegment { name: String },

    #[error("Invalid promotion: {reason}")]
    InvalidPromotion { reason: String },

    #[error("Invalid scenario: {reason}")]
    InvalidScenario { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
