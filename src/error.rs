//! Error types for the VRPTW solver.
//!
//! Errors fall into three fatal categories: bad customer data, bad
//! configuration, and broken solution structure. Time-window or capacity
//! violations are not errors; they are carried by the `feasible` flags.

use thiserror::Error;

/// Malformed or missing customer data, raised before any evolution starts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read instance file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid CSV record: {0}")]
    Csv(#[from] csv::Error),

    #[error("instance contains no customers besides the depot")]
    NoCustomers,

    #[error("depot (customer 0) is missing")]
    MissingDepot,

    #[error("customer ids must be 0..{expected} without gaps, found id {found}")]
    NonContiguousIds { expected: usize, found: usize },

    #[error("customer {0} appears more than once")]
    DuplicateCustomer(usize),

    #[error("customer {id}: {reason}")]
    InvalidCustomer { id: usize, reason: String },

    #[error("customer {id} demands {demand}, more than the vehicle capacity {capacity}")]
    DemandExceedsCapacity { id: usize, demand: f64, capacity: f64 },
}

/// Inconsistent tuning parameters, reported before any generation runs.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population_size must be at least 1")]
    EmptyPopulation,

    #[error("tournament_size must be at least 1")]
    EmptyTournament,

    #[error("elitism_count ({elitism}) exceeds population_size ({population})")]
    TooManyElites { elitism: usize, population: usize },

    #[error("{name} must lie in [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("max_fleet_size must be at least 1")]
    EmptyFleet,

    #[error("cannot read configuration file: {0}")]
    Read(String),
}

/// A solution whose routes do not cover every customer exactly once.
///
/// This is a programming error in an operator, never a recoverable state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("customer id {0} is outside 1..={1}")]
    UnknownCustomer(usize, usize),

    #[error("customer {0} is visited more than once")]
    Duplicate(usize),

    #[error("customer {0} is never visited")]
    Missing(usize),
}

/// Top-level error returned by the solver entry points.
#[derive(Debug, Error)]
pub enum VrptwError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("structural invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = VrptwError> = std::result::Result<T, E>;
