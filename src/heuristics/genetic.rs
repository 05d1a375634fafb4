//! Evolutionary algorithm for the VRPTW.
//!
//! The controller moves through three phases:
//! - `Init`: build and evaluate a random population, record the best.
//! - `Evolving`: per generation, evaluate, keep the elites, breed the rest
//!   of the population (tournament selection, order crossover, swap or
//!   insertion mutation), replace the population and update the best.
//! - `Done`: return the best solution seen over the whole run.
//!
//! Randomness comes from a single seeded `ChaCha8Rng`. Each offspring slot
//! gets its own seed drawn sequentially from it, so a run gives the same
//! result with or without rayon.

use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::heuristics::construction::init_population;
use crate::heuristics::operators::GeneticOperators;
use crate::instance::Instance;
use crate::solution::{FitnessModel, Solution};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::time::Instant;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Evolving,
    Done,
}

/// Progress information emitted after initialization and every generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub generation: usize,
    /// Best-so-far fitness
    pub best_fitness: f64,
    pub vehicles: usize,
    pub distance: f64,
    pub feasible: bool,
    /// Best fitness within the current population
    pub population_best: f64,
    pub mean_fitness: f64,
    pub std_fitness: f64,
    pub feasible_count: usize,
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub best: Solution,
    /// Best-so-far fitness after initialization and after each generation
    pub history: Vec<f64>,
    pub generations: usize,
    /// Wall-clock seconds
    pub elapsed: f64,
}

/// First individual with the lowest fitness
fn first_best(population: &[Solution]) -> Option<&Solution> {
    population
        .iter()
        .fold(None, |best: Option<&Solution>, s| match best {
            Some(b) if b.fitness <= s.fitness => Some(b),
            _ => Some(s),
        })
}

/// Replace `best` when `candidate` is strictly fitter; an equal fitness
/// keeps the earlier-found solution.
fn update_best(best: &mut Option<Solution>, candidate: &Solution) -> bool {
    let improved = best
        .as_ref()
        .map_or(true, |b| candidate.fitness < b.fitness);
    if improved {
        *best = Some(candidate.clone());
    }
    improved
}

/// Evolutionary algorithm implementation
pub struct EvolutionaryAlgorithm {
    config: EvolutionConfig,
    instance: Instance,
    model: FitnessModel,
    population: Vec<Solution>,
    best: Option<Solution>,
    history: Vec<f64>,
    rng: ChaCha8Rng,
    generation: usize,
    phase: Phase,
}

impl EvolutionaryAlgorithm {
    /// Validate the configuration and the instance against it.
    pub fn new(instance: Instance, config: EvolutionConfig) -> Result<Self> {
        config.validate()?;
        instance.check_capacity(config.vehicle_capacity)?;

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let model = config.fitness_model();

        Ok(EvolutionaryAlgorithm {
            config,
            instance,
            model,
            population: Vec::new(),
            best: None,
            history: Vec::new(),
            rng,
            generation: 0,
            phase: Phase::Init,
        })
    }

    fn operators(&self) -> GeneticOperators<'_> {
        GeneticOperators::new(
            &self.instance,
            self.model,
            self.config.mutation_type,
            self.config.swap_share,
        )
    }

    fn check_structure(&self, solutions: &[Solution]) -> Result<()> {
        if self.config.validate_offspring {
            let n = self.instance.num_customers();
            for solution in solutions {
                solution.validate(n)?;
            }
        }
        Ok(())
    }

    /// Build the random initial population and record its best member.
    fn initialize_population(&mut self) -> Result<()> {
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.generation = 0;
        self.history.clear();

        self.population = init_population(
            &self.instance,
            self.config.population_size,
            &self.model,
            &mut self.rng,
        );
        self.check_structure(&self.population)?;
        self.evaluate_population();

        self.best = first_best(&self.population).cloned();
        if let Some(best) = &self.best {
            self.history.push(best.fitness);
        }
        self.phase = Phase::Evolving;
        Ok(())
    }

    /// Recompute the fitness of every individual.
    fn evaluate_population(&mut self) {
        let instance = &self.instance;
        let model = &self.model;

        if self.config.parallel {
            self.population
                .par_iter_mut()
                .for_each(|s| s.evaluate(instance, model));
        } else {
            self.population
                .iter_mut()
                .for_each(|s| s.evaluate(instance, model));
        }
    }

    /// Create new generation
    fn evolve(&mut self) -> Result<()> {
        self.evaluate_population();
        self.population.sort_by_key(|s| OrderedFloat(s.fitness));

        let elite_count = self.config.elitism_count;
        let slots = self.config.population_size - elite_count;
        let seeds: Vec<u64> = (0..slots).map(|_| self.rng.gen()).collect();

        let ops = self.operators();
        let population = &self.population;
        let tournament_size = self.config.tournament_size;
        let crossover_rate = self.config.crossover_rate;
        let mutation_rate = self.config.mutation_rate;

        let breed = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            ops.breed(population, tournament_size, crossover_rate, mutation_rate, &mut rng)
        };

        let offspring: Vec<Solution> = if self.config.parallel {
            seeds.into_par_iter().map(&breed).collect()
        } else {
            seeds.into_iter().map(&breed).collect()
        };
        self.check_structure(&offspring)?;

        let mut next = Vec::with_capacity(self.config.population_size);
        next.extend(self.population.iter().take(elite_count).cloned());
        next.extend(offspring);
        self.population = next;

        if let Some(candidate) = first_best(&self.population) {
            if update_best(&mut self.best, candidate) {
                log::debug!(
                    "Generation {}: new best fitness {:.2}",
                    self.generation + 1,
                    candidate.fitness
                );
            }
        }

        if let Some(best) = &self.best {
            self.history.push(best.fitness);
        }
        self.generation += 1;
        Ok(())
    }

    /// Summary of the current generation
    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        let best = self.best.as_ref()?;
        let fitness: Vec<f64> = self.population.iter().map(|s| s.fitness).collect();

        let std_fitness = if fitness.len() > 1 {
            fitness.iter().std_dev()
        } else {
            0.0
        };

        Some(ProgressSnapshot {
            generation: self.generation,
            best_fitness: best.fitness,
            vehicles: best.vehicles,
            distance: best.total_distance,
            feasible: best.feasible,
            population_best: first_best(&self.population).map_or(f64::INFINITY, |s| s.fitness),
            mean_fitness: fitness.iter().mean(),
            std_fitness,
            feasible_count: self.population.iter().filter(|s| s.feasible).count(),
        })
    }

    /// Run the evolutionary algorithm
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.run_with_observer(|_| {})
    }

    /// Run the evolutionary algorithm, handing a snapshot to `observer`
    /// after initialization and after every generation.
    pub fn run_with_observer<F>(&mut self, mut observer: F) -> Result<RunOutcome>
    where
        F: FnMut(&ProgressSnapshot),
    {
        let start = Instant::now();
        log::info!(
            "Initializing population of {} individuals...",
            self.config.population_size
        );

        self.initialize_population()?;
        if let Some(snapshot) = self.snapshot() {
            log::info!(
                "Generation 0: Best fitness = {:.2}, Vehicles = {}, Distance = {:.2}",
                snapshot.best_fitness,
                snapshot.vehicles,
                snapshot.distance
            );
            observer(&snapshot);
        }

        while self.generation < self.config.generations {
            if let Some(limit) = self.config.time_limit {
                if start.elapsed().as_secs_f64() >= limit {
                    log::info!(
                        "Time limit of {:.1}s reached after {} generations",
                        limit,
                        self.generation
                    );
                    break;
                }
            }

            self.evolve()?;

            if let Some(snapshot) = self.snapshot() {
                let interval = self.config.progress_interval;
                if interval > 0 && self.generation % interval == 0 {
                    log::info!(
                        "Generation {}: Best fitness = {:.2}, Vehicles = {}, Distance = {:.2}, Feasible = {}",
                        snapshot.generation,
                        snapshot.best_fitness,
                        snapshot.vehicles,
                        snapshot.distance,
                        snapshot.feasible
                    );
                }
                observer(&snapshot);
            }
        }

        self.phase = Phase::Done;

        let best = self
            .best
            .clone()
            .ok_or(crate::error::ConfigError::EmptyPopulation)?;
        let elapsed = start.elapsed().as_secs_f64();
        log::info!(
            "Finished after {} generations in {:.2}s: {} vehicles, distance {:.2}, feasible {}",
            self.generation,
            elapsed,
            best.vehicles,
            best.total_distance,
            best.feasible
        );

        Ok(RunOutcome {
            best,
            history: self.history.clone(),
            generations: self.generation,
            elapsed,
        })
    }

    pub fn best_solution(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    pub fn population(&self) -> &[Solution] {
        &self.population
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn current_generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VrptwError;
    use crate::heuristics::operators::MutationType;
    use crate::instance::Customer;

    fn create_test_instance() -> Instance {
        let coords = [
            (12.0, 5.0),
            (3.0, 18.0),
            (25.0, 25.0),
            (7.0, 30.0),
            (30.0, 8.0),
            (18.0, 14.0),
            (2.0, 2.0),
            (27.0, 19.0),
            (11.0, 24.0),
            (21.0, 3.0),
        ];
        let mut customers = vec![Customer::depot(15.0, 15.0, 400.0)];
        for (i, &(x, y)) in coords.iter().enumerate() {
            let id = i + 1;
            customers.push(Customer::new(
                id,
                x,
                y,
                (id % 5 + 3) as f64,
                (id * 7 % 40) as f64,
                (id * 7 % 40) as f64 + 60.0,
                5.0,
            ));
        }
        Instance::new("ten", customers).unwrap()
    }

    fn test_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 10,
            generations: 5,
            vehicle_capacity: 20.0,
            validate_offspring: true,
            seed: 2024,
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_small_instance() {
        let instance = create_test_instance();
        let mut ea = EvolutionaryAlgorithm::new(instance, test_config()).unwrap();
        assert_eq!(ea.phase(), Phase::Init);

        let outcome = ea.run().unwrap();

        assert_eq!(ea.phase(), Phase::Done);
        assert_eq!(outcome.generations, 5);
        assert_eq!(outcome.best.validate(10), Ok(()));
        assert!(outcome.best.routes.iter().all(|r| r.demand() <= 20.0));
        assert!(outcome.best.fitness <= outcome.history[0]);
        assert_eq!(ea.population().len(), 10);
    }

    #[test]
    fn test_best_fitness_is_monotone() {
        let config = EvolutionConfig {
            generations: 30,
            ..test_config()
        };
        let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), config).unwrap();
        let outcome = ea.run().unwrap();

        assert_eq!(outcome.history.len(), 31);
        assert!(outcome.history.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*outcome.history.last().unwrap(), outcome.best.fitness);
    }

    #[test]
    fn test_elitism_keeps_population_best() {
        let config = EvolutionConfig {
            generations: 20,
            elitism_count: 1,
            ..test_config()
        };
        let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), config).unwrap();

        let mut population_best = Vec::new();
        ea.run_with_observer(|s| population_best.push(s.population_best))
            .unwrap();

        assert_eq!(population_best.len(), 21);
        assert!(population_best.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_equal_fitness_keeps_earlier_best() {
        let instance = create_test_instance();
        let model = test_config().fitness_model();
        let earlier = Solution::from_routes(&instance, vec![(1..=10).collect()], &model);
        let mut tied = Solution::from_routes(&instance, vec![(1..=10).rev().collect()], &model);
        tied.fitness = earlier.fitness;

        let mut best = None;
        assert!(update_best(&mut best, &earlier));
        assert!(!update_best(&mut best, &tied));
        assert_eq!(best.as_ref().map(|b| b.sequence()), Some(earlier.sequence()));

        let mut better = tied.clone();
        better.fitness = earlier.fitness - 1.0;
        assert!(update_best(&mut best, &better));
        assert_eq!(best.map(|b| b.sequence()), Some(better.sequence()));
    }

    #[test]
    fn test_first_best_prefers_earliest_on_ties() {
        let instance = create_test_instance();
        let model = test_config().fitness_model();
        let mut population: Vec<Solution> = [vec![3, 1, 2], vec![1, 2, 3], vec![2, 3, 1]]
            .into_iter()
            .map(|head| {
                let mut seq = head;
                seq.extend(4..=10);
                let mut s = Solution::from_routes(&instance, vec![seq], &model);
                s.fitness = 50.0;
                s
            })
            .collect();
        population[0].fitness = 60.0;

        let best = first_best(&population).unwrap();
        assert_eq!(best.sequence()[..3], [1, 2, 3]);
    }

    #[test]
    fn test_deterministic_replay() {
        let run = |parallel: bool| {
            let config = EvolutionConfig {
                generations: 15,
                parallel,
                ..test_config()
            };
            let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), config).unwrap();
            let outcome = ea.run().unwrap();
            (outcome.history, outcome.best.sequence())
        };

        let first = run(true);
        assert_eq!(first, run(true));
        assert_eq!(first, run(false));
    }

    #[test]
    fn test_rerun_restarts_from_seed() {
        let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), test_config()).unwrap();
        let a = ea.run().unwrap();
        let b = ea.run().unwrap();
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_mutation_policies_keep_invariant() {
        for mutation_type in [MutationType::Swap, MutationType::Insertion, MutationType::Mixed] {
            let config = EvolutionConfig {
                generations: 10,
                mutation_rate: 1.0,
                mutation_type,
                ..test_config()
            };
            let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), config).unwrap();
            let outcome = ea.run().unwrap();
            assert_eq!(outcome.best.validate(10), Ok(()));
            for individual in ea.population() {
                assert_eq!(individual.validate(10), Ok(()));
            }
        }
    }

    #[test]
    fn test_snapshot_statistics() {
        let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), test_config()).unwrap();
        assert!(ea.snapshot().is_none());

        ea.run().unwrap();
        let snapshot = ea.snapshot().unwrap();
        assert_eq!(snapshot.generation, 5);
        assert!(snapshot.mean_fitness >= snapshot.population_best);
        assert!(snapshot.std_fitness >= 0.0);
        assert!(snapshot.feasible_count <= 10);
    }

    #[test]
    fn test_time_limit_stops_early() {
        let config = EvolutionConfig {
            generations: 1_000,
            time_limit: Some(1e-9),
            ..test_config()
        };
        let mut ea = EvolutionaryAlgorithm::new(create_test_instance(), config).unwrap();
        let outcome = ea.run().unwrap();
        assert_eq!(outcome.generations, 0);
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn test_rejects_bad_config_and_data() {
        let config = EvolutionConfig {
            elitism_count: 11,
            ..test_config()
        };
        assert!(matches!(
            EvolutionaryAlgorithm::new(create_test_instance(), config),
            Err(VrptwError::Config(_))
        ));

        let config = EvolutionConfig {
            vehicle_capacity: 5.0,
            ..test_config()
        };
        assert!(matches!(
            EvolutionaryAlgorithm::new(create_test_instance(), config),
            Err(VrptwError::Data(_))
        ));
    }
}
