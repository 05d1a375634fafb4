//! VRPTW Evolutionary Solver Library
//!
//! A genetic algorithm for the Vehicle Routing Problem with Time Windows
//! (VRPTW).
//!
//! # Features
//!
//! - Solomon-style CSV instances with a precomputed distance matrix
//! - Route evaluation with arrival times, waiting, late customers and load
//! - Giant-tour representation with a greedy capacity split
//! - Tournament selection, order crossover, swap and insertion mutation, elitism
//! - Reproducible runs from a single seed, with or without rayon
//! - Multi-seed benchmarking and text/JSON reports
//!
//! # Example
//!
//! ```no_run
//! use vrptw_evo::config::EvolutionConfig;
//! use vrptw_evo::heuristics::genetic::EvolutionaryAlgorithm;
//! use vrptw_evo::instance::Instance;
//!
//! let instance = Instance::from_file("r101.csv").unwrap();
//! let mut ea = EvolutionaryAlgorithm::new(instance, EvolutionConfig::default()).unwrap();
//! let outcome = ea.run().unwrap();
//!
//! println!("Vehicles: {}, distance: {:.2}", outcome.best.vehicles, outcome.best.total_distance);
//! ```

pub mod error;
pub mod config;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod benchmark;
pub mod report;

pub use config::EvolutionConfig;
pub use error::{Result, VrptwError};
pub use heuristics::genetic::EvolutionaryAlgorithm;
pub use instance::Instance;
pub use solution::Solution;
