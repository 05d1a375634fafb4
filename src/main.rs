//! VRPTW Evolutionary Solver - Command Line Interface
//!
//! Solves Vehicle Routing Problem with Time Windows instances with a
//! genetic algorithm.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use vrptw_evo::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use vrptw_evo::config::EvolutionConfig;
use vrptw_evo::heuristics::genetic::EvolutionaryAlgorithm;
use vrptw_evo::heuristics::operators::MutationType;
use vrptw_evo::instance::Instance;
use vrptw_evo::report::{render_report, write_report, SolutionSummary};
use vrptw_evo::Result;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "vrptw-evo")]
#[command(version = "1.0")]
#[command(about = "An evolutionary solver for the Vehicle Routing Problem with Time Windows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        /// Path to the instance CSV file
        #[arg(short, long)]
        instance: PathBuf,

        /// JSON configuration file (missing keys keep their defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Parameter preset, ignored when --config is given
        #[arg(long, value_enum, default_value = "standard")]
        preset: Preset,

        /// Population size
        #[arg(short, long)]
        population: Option<usize>,

        /// Number of generations
        #[arg(short, long)]
        generations: Option<usize>,

        /// Crossover probability
        #[arg(long)]
        crossover_rate: Option<f64>,

        /// Mutation probability
        #[arg(long)]
        mutation_rate: Option<f64>,

        /// Tournament size
        #[arg(long)]
        tournament_size: Option<usize>,

        /// Number of elites kept per generation
        #[arg(long)]
        elitism: Option<usize>,

        /// Vehicle capacity
        #[arg(long)]
        capacity: Option<f64>,

        /// Maximum number of vehicles
        #[arg(long)]
        fleet: Option<usize>,

        /// Mutation operator
        #[arg(long, value_enum)]
        mutation: Option<Mutation>,

        /// Fitness penalty added to infeasible solutions
        #[arg(long)]
        penalty: Option<f64>,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output solution to file
        #[arg(short, long, default_value = "vrptw_solution.txt")]
        output: PathBuf,

        /// Also write a JSON summary
        #[arg(long)]
        json: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run several seeds on one instance or a directory of instances
    Benchmark {
        /// Path to the instance CSV file
        #[arg(short, long, required_unless_present = "dir")]
        instance: Option<PathBuf>,

        /// Directory containing instance files
        #[arg(short, long, conflicts_with = "instance")]
        dir: Option<PathBuf>,

        /// Number of runs per instance
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// First seed, runs use seed..seed+runs
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance CSV file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Preset {
    /// 30 individuals, 50 generations
    Standard,
    /// 100 individuals, 200 generations
    Enhanced,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Mutation {
    Swap,
    Insertion,
    Mixed,
}

impl From<Mutation> for MutationType {
    fn from(m: Mutation) -> Self {
        match m {
            Mutation::Swap => MutationType::Swap,
            Mutation::Insertion => MutationType::Insertion,
            Mutation::Mixed => MutationType::Mixed,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve {
            instance,
            config,
            preset,
            population,
            generations,
            crossover_rate,
            mutation_rate,
            tournament_size,
            elitism,
            capacity,
            fleet,
            mutation,
            penalty,
            time_limit,
            seed,
            output,
            json,
            verbose,
        } => load_config(config.as_deref(), preset).and_then(|mut cfg| {
            if let Some(v) = population {
                cfg.population_size = v;
            }
            if let Some(v) = generations {
                cfg.generations = v;
            }
            if let Some(v) = crossover_rate {
                cfg.crossover_rate = v;
            }
            if let Some(v) = mutation_rate {
                cfg.mutation_rate = v;
            }
            if let Some(v) = tournament_size {
                cfg.tournament_size = v;
            }
            if let Some(v) = elitism {
                cfg.elitism_count = v;
            }
            if let Some(v) = capacity {
                cfg.vehicle_capacity = v;
            }
            if let Some(v) = fleet {
                cfg.max_fleet_size = v;
            }
            if let Some(m) = mutation {
                cfg.mutation_type = m.into();
            }
            if let Some(v) = penalty {
                cfg.infeasibility_penalty = v;
            }
            if time_limit.is_some() {
                cfg.time_limit = time_limit;
            }
            if let Some(v) = seed {
                cfg.seed = v;
            }
            solve_instance(&instance, cfg, &output, json.as_deref(), verbose)
        }),

        Commands::Benchmark {
            instance,
            dir,
            runs,
            config,
            seed,
            output,
        } => load_config(config.as_deref(), Preset::Standard).and_then(|mut cfg| {
            if let Some(v) = seed {
                cfg.seed = v;
            }
            run_benchmark(instance.as_deref(), dir.as_deref(), runs, cfg, &output)
        }),

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>, preset: Preset) -> Result<EvolutionConfig> {
    let config = match (path, preset) {
        (Some(path), _) => EvolutionConfig::from_json_file(path)?,
        (None, Preset::Standard) => EvolutionConfig::default(),
        (None, Preset::Enhanced) => EvolutionConfig::enhanced(),
    };
    Ok(config)
}

fn solve_instance(
    path: &Path,
    config: EvolutionConfig,
    output: &Path,
    json: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    println!("Loading instance from {:?}...", path);
    let instance = Instance::from_file(path)?;
    let name = instance.name.clone();

    if verbose {
        println!("{}", instance.statistics());
        println!(
            "Minimum vehicles by capacity: {}",
            instance.min_vehicles(config.vehicle_capacity)
        );
    }

    println!("Algorithm parameters:");
    println!("  Population size: {}", config.population_size);
    println!("  Generations: {}", config.generations);
    println!("  Crossover rate: {}", config.crossover_rate);
    println!("  Mutation rate: {}", config.mutation_rate);
    println!("  Tournament size: {}", config.tournament_size);
    println!("  Elitism count: {}", config.elitism_count);
    println!("  Vehicle capacity: {}", config.vehicle_capacity);
    println!("  Seed: {}", config.seed);

    let mut ea = EvolutionaryAlgorithm::new(instance, config)?;

    let bar = ProgressBar::new(ea.config().generations as u64);
    bar.set_style(
        ProgressStyle::with_template("[{bar:40}] {pos}/{len} gen ({elapsed}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let outcome = ea.run_with_observer(|snapshot| {
        bar.set_position(snapshot.generation as u64);
        bar.set_message(format!(
            "best {:.2} ({} vehicles, feasible {})",
            snapshot.best_fitness, snapshot.vehicles, snapshot.feasible
        ));
    })?;
    bar.finish_and_clear();

    let config = ea.config();
    let best = &outcome.best;

    println!("\n========== Final Solution ==========");
    println!("Instance: {}", name);
    println!("Number of vehicles: {}", best.vehicles);
    println!("Total distance: {:.2}", best.total_distance);
    println!("Feasible: {}", best.feasible);
    println!("Fitness: {:.2}", best.fitness);
    println!("Late customers: {}", best.late_customers());
    println!("Generations: {}", outcome.generations);
    println!("Time: {:.3}s", outcome.elapsed);

    if verbose {
        println!("\n{}", render_report(&format!("VRPTW Solution for {}", name), best, config));
    }

    write_report(output, best, config)?;
    println!("\nSolution saved to: {:?}", output);

    if let Some(json) = json {
        SolutionSummary::new(&name, best, config).write_json(json)?;
        println!("Summary saved to: {:?}", json);
    }

    Ok(())
}

fn run_benchmark(
    instance: Option<&Path>,
    dir: Option<&Path>,
    runs: usize,
    config: EvolutionConfig,
    output: &Path,
) -> Result<()> {
    let instances = match (instance, dir) {
        (Some(path), _) => vec![Instance::from_file(path)?],
        (None, Some(dir)) => {
            println!("Loading instances from {:?}...", dir);
            load_instances_from_dir(dir)
        }
        (None, None) => Vec::new(),
    };

    println!("Found {} instances", instances.len());
    if instances.is_empty() {
        eprintln!("No instances found!");
        return Ok(());
    }

    std::fs::create_dir_all(output)?;

    let mut benchmark = Benchmark::new(BenchmarkConfig {
        num_runs: runs,
        ..Default::default()
    });

    for (i, instance) in instances.iter().enumerate() {
        println!(
            "\n[{}/{}] Processing {} (n={})...",
            i + 1,
            instances.len(),
            instance.name,
            instance.num_customers()
        );
        benchmark.run(instance, &config)?;
    }

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(path: &Path) -> Result<()> {
    let instance = Instance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let capacity = EvolutionConfig::default().vehicle_capacity;
    println!("\nCapacity:");
    println!("  Default vehicle capacity: {}", capacity);
    println!("  Lower bound on vehicles: {}", instance.min_vehicles(capacity));

    let customers: Vec<_> = instance.customers.iter().filter(|c| !c.is_depot()).collect();
    let depot = instance.depot();
    let unreachable: Vec<usize> = customers
        .iter()
        .filter(|c| instance.distance(0, c.id) > c.due_time)
        .map(|c| c.id)
        .collect();
    let no_return: Vec<usize> = customers
        .iter()
        .filter(|c| {
            let earliest = instance.distance(0, c.id).max(c.ready_time);
            earliest + c.service_time + instance.distance(c.id, 0) > depot.due_time
        })
        .map(|c| c.id)
        .collect();

    println!("\nTime windows:");
    println!("  Depot horizon: [{:.1}, {:.1}]", depot.ready_time, depot.due_time);
    println!("  Unreachable before due time: {:?}", unreachable);
    println!("  Cannot return to depot in time: {:?}", no_return);

    Ok(())
}
