//! Solution reports: the plain-text solution file and a JSON summary.

use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::solution::Solution;

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render the human-readable report for a solution.
pub fn render_report(title: &str, solution: &Solution, config: &EvolutionConfig) -> String {
    let mut report = String::new();

    report.push_str(&format!("{}\n", title));
    report.push_str(&format!("Generated: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
    report.push_str("=".repeat(80).as_str());
    report.push_str("\n\n");

    report.push_str(&format!("Number of vehicles: {}\n", solution.vehicles));
    report.push_str(&format!("Total distance: {:.2}\n", solution.total_distance));
    report.push_str(&format!("Feasible: {}\n", solution.feasible));
    report.push_str(&format!("Fitness: {:.2}\n\n", solution.fitness));

    report.push_str("Routes:\n");
    report.push_str("-".repeat(80).as_str());
    report.push_str("\n\n");

    for (i, route) in solution.routes.iter().enumerate() {
        let stops: Vec<String> = std::iter::once(0)
            .chain(route.customers.iter().copied())
            .chain(std::iter::once(0))
            .map(|id| id.to_string())
            .collect();

        report.push_str(&format!("Vehicle {}:\n", i + 1));
        report.push_str(&format!("  Customers: {}\n", stops.join(" -> ")));
        report.push_str(&format!("  Distance: {:.2}\n", route.distance()));
        report.push_str(&format!("  Demand: {}/{}\n", route.demand(), config.vehicle_capacity));
        report.push_str(&format!("  Feasible: {}\n\n", route.feasible()));
    }

    report
}

/// Write the text report to `path`.
pub fn write_report<P: AsRef<Path>>(path: P, solution: &Solution, config: &EvolutionConfig) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(render_report("VRPTW Solution", solution, config).as_bytes())?;
    writer.flush()?;
    log::info!("Solution saved to: {:?}", path.as_ref());
    Ok(())
}

/// Machine-readable summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub instance: String,
    pub seed: u64,
    pub vehicles: usize,
    pub total_distance: f64,
    pub feasible: bool,
    pub fitness: f64,
    pub late_customers: usize,
    pub routes: Vec<Vec<usize>>,
    pub generated_at: String,
}

impl SolutionSummary {
    pub fn new(instance: &str, solution: &Solution, config: &EvolutionConfig) -> Self {
        SolutionSummary {
            instance: instance.to_string(),
            seed: config.seed,
            vehicles: solution.vehicles,
            total_distance: solution.total_distance,
            feasible: solution.feasible,
            fitness: solution.fitness,
            late_customers: solution.late_customers(),
            routes: solution.routes.iter().map(|r| r.customers.clone()).collect(),
            generated_at: Local::now().to_rfc3339(),
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Customer, Instance};

    fn solved() -> (Solution, EvolutionConfig) {
        let instance = Instance::new(
            "tiny",
            vec![
                Customer::depot(0.0, 0.0, 1000.0),
                Customer::new(1, 3.0, 4.0, 5.0, 0.0, 100.0, 0.0),
                Customer::new(2, 6.0, 8.0, 7.0, 0.0, 100.0, 0.0),
                Customer::new(3, -3.0, -4.0, 9.0, 0.0, 100.0, 0.0),
            ],
        )
        .unwrap();
        let config = EvolutionConfig::default();
        let solution =
            Solution::from_routes(&instance, vec![vec![1, 2], vec![3]], &config.fitness_model());
        (solution, config)
    }

    #[test]
    fn test_render_report() {
        let (solution, config) = solved();
        let text = render_report("VRPTW Solution", &solution, &config);

        assert!(text.starts_with("VRPTW Solution\n"));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("Generated: "));
        assert_eq!(lines[2], "=".repeat(80));
        assert_eq!(lines[4], "Number of vehicles: 2");
        assert!(text.contains("Routes:\n"));
        assert!(text.ends_with("  Feasible: true\n\n"));
        assert!(text.contains("Number of vehicles: 2"));
        assert!(text.contains("Total distance: 30.00"));
        assert!(text.contains("Vehicle 1:\n  Customers: 0 -> 1 -> 2 -> 0"));
        assert!(text.contains("  Demand: 12/200"));
        assert!(text.contains("Vehicle 2:\n  Customers: 0 -> 3 -> 0"));
    }

    #[test]
    fn test_write_report_and_json() {
        let (solution, config) = solved();
        let dir = std::env::temp_dir();
        let txt = dir.join(format!("vrptw_report_{}.txt", std::process::id()));
        let json = dir.join(format!("vrptw_summary_{}.json", std::process::id()));

        write_report(&txt, &solution, &config).unwrap();
        let summary = SolutionSummary::new("tiny", &solution, &config);
        summary.write_json(&json).unwrap();

        let text = std::fs::read_to_string(&txt).unwrap();
        let back: SolutionSummary =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        std::fs::remove_file(&txt).ok();
        std::fs::remove_file(&json).ok();

        assert!(text.contains("Fitness:"));
        assert_eq!(back.routes, vec![vec![1, 2], vec![3]]);
        assert_eq!(back.vehicles, 2);
    }
}
