//! Benchmarking module for the evolutionary VRPTW solver.
//!
//! Runs the algorithm over several seeds (in parallel with rayon), collects
//! one row per run and aggregates them per instance.

use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::heuristics::genetic::EvolutionaryAlgorithm;
use crate::instance::Instance;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Result of a single seeded run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub instance: String,
    pub seed: u64,
    pub vehicles: usize,
    pub distance: f64,
    pub fitness: f64,
    pub feasible: bool,
    /// Customers reached after their due time
    pub late_customers: usize,
    pub generations: usize,
    /// Computation time in seconds
    pub time: f64,
}

/// Aggregated statistics over the runs on one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatistics {
    pub instance: String,
    pub num_runs: usize,
    pub num_feasible: usize,
    pub avg_fitness: f64,
    pub std_fitness: f64,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub avg_distance: f64,
    pub best_vehicles: usize,
    pub avg_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeds per instance
    pub num_runs: usize,
    /// Run seeds in parallel
    pub parallel: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            parallel: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    fn run_seed(instance: &Instance, base: &EvolutionConfig, seed: u64, parallel: bool) -> Result<RunResult> {
        let config = EvolutionConfig {
            seed,
            // Seeds already share the thread pool
            parallel: base.parallel && !parallel,
            ..base.clone()
        };

        let mut ea = EvolutionaryAlgorithm::new(instance.clone(), config)?;
        let outcome = ea.run()?;

        Ok(RunResult {
            instance: instance.name.clone(),
            seed,
            vehicles: outcome.best.vehicles,
            distance: outcome.best.total_distance,
            fitness: outcome.best.fitness,
            feasible: outcome.best.feasible,
            late_customers: outcome.best.late_customers(),
            generations: outcome.generations,
            time: outcome.elapsed,
        })
    }

    /// Run seeds `base.seed .. base.seed + num_runs` on an instance
    pub fn run(&mut self, instance: &Instance, base: &EvolutionConfig) -> Result<()> {
        log::info!(
            "Running benchmark on instance: {} ({} runs)",
            instance.name,
            self.config.num_runs
        );

        let seeds: Vec<u64> = (0..self.config.num_runs as u64)
            .map(|i| base.seed.wrapping_add(i))
            .collect();
        let parallel = self.config.parallel;

        let runs: Result<Vec<RunResult>> = if parallel {
            seeds
                .par_iter()
                .map(|&seed| Self::run_seed(instance, base, seed, parallel))
                .collect()
        } else {
            seeds
                .iter()
                .map(|&seed| Self::run_seed(instance, base, seed, parallel))
                .collect()
        };

        self.results.extend(runs?);
        Ok(())
    }

    /// Run the benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[Instance], base: &EvolutionConfig) -> Result<()> {
        for instance in instances {
            self.run(instance, base)?;
        }
        Ok(())
    }

    /// Compute statistics for each instance
    pub fn compute_statistics(&self) -> Vec<RunStatistics> {
        let mut by_instance: BTreeMap<&str, Vec<&RunResult>> = BTreeMap::new();
        for result in &self.results {
            by_instance.entry(result.instance.as_str()).or_default().push(result);
        }

        by_instance
            .into_iter()
            .map(|(name, runs)| {
                let fitness: Vec<f64> = runs.iter().map(|r| r.fitness).collect();
                let distances: Vec<f64> = runs.iter().map(|r| r.distance).collect();
                let times: Vec<f64> = runs.iter().map(|r| r.time).collect();

                let std_fitness = if fitness.len() > 1 {
                    fitness.iter().std_dev()
                } else {
                    0.0
                };

                RunStatistics {
                    instance: name.to_string(),
                    num_runs: runs.len(),
                    num_feasible: runs.iter().filter(|r| r.feasible).count(),
                    avg_fitness: fitness.iter().mean(),
                    std_fitness,
                    best_fitness: fitness.iter().cloned().fold(f64::INFINITY, f64::min),
                    worst_fitness: fitness.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    avg_distance: distances.iter().mean(),
                    best_vehicles: runs.iter().map(|r| r.vehicles).fold(usize::MAX, usize::min),
                    avg_time: times.iter().mean(),
                }
            })
            .collect()
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        VRPTW Benchmark Report\n");
        report.push_str("========================================\n\n");

        report.push_str("-".repeat(84).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<16} {:>9} {:>12} {:>12} {:>10} {:>10} {:>10}\n",
            "Instance", "Feasible", "Avg Fitness", "Best", "Std", "Vehicles", "Avg Time"
        ));
        report.push_str("-".repeat(84).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<16} {:>9} {:>12.2} {:>12.2} {:>10.2} {:>10} {:>10.3}\n",
                stat.instance,
                format!("{}/{}", stat.num_feasible, stat.num_runs),
                stat.avg_fitness,
                stat.best_fitness,
                stat.std_fitness,
                stat.best_vehicles,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(84).as_str());
        report.push('\n');

        if let Some(best) = self.best_result() {
            report.push_str(&format!(
                "\nBest run: {} seed {} ({} vehicles, distance {:.2}, feasible {})\n",
                best.instance, best.seed, best.vehicles, best.distance, best.feasible
            ));
        }

        report
    }

    /// Lowest-fitness run over everything recorded
    pub fn best_result(&self) -> Option<&RunResult> {
        self.results.iter().min_by_key(|r| OrderedFloat(r.fitness))
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

/// Helper function to load every `.csv` instance in a directory
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<Instance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "csv").unwrap_or(false) {
                match Instance::from_file(&path) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => log::warn!("Skipping {:?}: {}", path, e),
                }
            }
        }
    }

    instances.sort_by_key(|i| i.num_customers());

    instances
}
