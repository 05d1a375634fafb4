//! Tuning parameters for the evolutionary search.
//!
//! Defaults follow the standard tuning of the solver (30 individuals over
//! 50 generations, 80% crossover, 20% mutation, tournaments of 3, 2 elites,
//! vehicles of capacity 200 and a fleet of 25).

use crate::error::ConfigError;
use crate::heuristics::operators::MutationType;
use crate::solution::FitnessModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Evolutionary algorithm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Number of individuals in the population
    pub population_size: usize,
    /// Number of generations to evolve
    pub generations: usize,
    /// Probability of crossover per pair of parents
    pub crossover_rate: f64,
    /// Probability of mutation per offspring
    pub mutation_rate: f64,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Best individuals copied unchanged into the next generation
    pub elitism_count: usize,
    /// Maximum load per vehicle
    pub vehicle_capacity: f64,
    /// Number of vehicles available
    pub max_fleet_size: usize,
    /// Overrides every customer's service duration when set
    pub service_time: Option<f64>,
    /// Which mutation operator to apply
    pub mutation_type: MutationType,
    /// Probability of picking swap under `MutationType::Mixed`
    pub swap_share: f64,
    /// Weight of the vehicle count in the fitness
    pub vehicle_weight: f64,
    /// Weight of the total distance in the fitness
    pub distance_weight: f64,
    /// Added to the fitness of infeasible solutions (0 disables it)
    pub infeasibility_penalty: f64,
    /// Log progress every N generations
    pub progress_interval: usize,
    /// Wall-clock budget in seconds
    pub time_limit: Option<f64>,
    /// Evaluate and breed offspring on the rayon thread pool
    pub parallel: bool,
    /// Check the permutation invariant of every new individual
    pub validate_offspring: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            population_size: 30,
            generations: 50,
            crossover_rate: 0.8,
            mutation_rate: 0.2,
            tournament_size: 3,
            elitism_count: 2,
            vehicle_capacity: 200.0,
            max_fleet_size: 25,
            service_time: None,
            mutation_type: MutationType::Mixed,
            swap_share: 0.5,
            vehicle_weight: 10_000.0,
            distance_weight: 1.0,
            infeasibility_penalty: 0.0,
            progress_interval: 10,
            time_limit: None,
            parallel: true,
            validate_offspring: cfg!(debug_assertions),
            seed: 42,
        }
    }
}

impl EvolutionConfig {
    /// Larger population and longer run for higher quality solutions
    pub fn enhanced() -> Self {
        EvolutionConfig {
            population_size: 100,
            generations: 200,
            elitism_count: 5,
            ..Default::default()
        }
    }

    /// Load a (possibly partial) JSON configuration; missing keys keep
    /// their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Read(format!("{:?}: {}", path.as_ref(), e)))?;
        let config: EvolutionConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Read(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn fitness_model(&self) -> FitnessModel {
        FitnessModel {
            vehicle_capacity: self.vehicle_capacity,
            max_fleet_size: self.max_fleet_size,
            service_time: self.service_time,
            vehicle_weight: self.vehicle_weight,
            distance_weight: self.distance_weight,
            infeasibility_penalty: self.infeasibility_penalty,
        }
    }

    /// Reject inconsistent parameters before any generation runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::EmptyTournament);
        }
        if self.elitism_count > self.population_size {
            return Err(ConfigError::TooManyElites {
                elitism: self.elitism_count,
                population: self.population_size,
            });
        }
        if self.max_fleet_size == 0 {
            return Err(ConfigError::EmptyFleet);
        }

        for (name, value) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("swap_share", self.swap_share),
        ] {
            // NaN fails the range check too
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }

        if !(self.vehicle_capacity > 0.0 && self.vehicle_capacity.is_finite()) {
            return Err(ConfigError::NotPositive {
                name: "vehicle_capacity",
                value: self.vehicle_capacity,
            });
        }
        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) {
                return Err(ConfigError::NotPositive { name: "time_limit", value: limit });
            }
        }

        let mut non_negative = vec![
            ("vehicle_weight", self.vehicle_weight),
            ("distance_weight", self.distance_weight),
            ("infeasibility_penalty", self.infeasibility_penalty),
        ];
        if let Some(service) = self.service_time {
            non_negative.push(("service_time", service));
        }
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Negative { name, value });
            }
        }

        Ok(())
    }
}
