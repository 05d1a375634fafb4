//! Route construction: greedy capacity split and random initial population.

use crate::instance::Instance;
use crate::solution::{FitnessModel, Solution};
use rand::prelude::*;

/// Cut a giant tour into routes, opening a new route whenever the next
/// customer would push the load over `capacity`.
///
/// Time windows are not looked at, so the resulting routes may still be
/// late. Never produces an empty route.
pub fn split_by_capacity(sequence: &[usize], instance: &Instance, capacity: f64) -> Vec<Vec<usize>> {
    let mut routes = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut load = 0.0;

    for &id in sequence {
        let demand = instance.customer(id).demand;
        if load + demand > capacity && !current.is_empty() {
            routes.push(std::mem::take(&mut current));
            load = 0.0;
        }
        current.push(id);
        load += demand;
    }

    if !current.is_empty() {
        routes.push(current);
    }

    routes
}

/// Split a giant tour and evaluate the resulting solution.
pub fn solution_from_sequence(sequence: &[usize], instance: &Instance, model: &FitnessModel) -> Solution {
    let routes = split_by_capacity(sequence, instance, model.vehicle_capacity);
    Solution::from_routes(instance, routes, model)
}

/// Shuffle all customers and split them by capacity.
pub fn random_solution<R: Rng + ?Sized>(instance: &Instance, model: &FitnessModel, rng: &mut R) -> Solution {
    let mut sequence = instance.customer_ids();
    sequence.shuffle(rng);
    solution_from_sequence(&sequence, instance, model)
}

/// Build `population_size` independent random solutions.
pub fn init_population<R: Rng + ?Sized>(
    instance: &Instance,
    population_size: usize,
    model: &FitnessModel,
    rng: &mut R,
) -> Vec<Solution> {
    let population: Vec<Solution> = (0..population_size)
        .map(|_| random_solution(instance, model, rng))
        .collect();

    let feasible = population.iter().filter(|s| s.feasible).count();
    log::debug!(
        "Initialized population: {} (feasible: {}, infeasible: {})",
        population.len(),
        feasible,
        population.len() - feasible
    );

    population
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Customer;
    use rand_chacha::ChaCha8Rng;

    fn line_instance(demands: &[f64]) -> Instance {
        let mut customers = vec![Customer::depot(0.0, 0.0, 10_000.0)];
        for (i, &d) in demands.iter().enumerate() {
            customers.push(Customer::new(i + 1, (i + 1) as f64, 0.0, d, 0.0, 10_000.0, 0.0));
        }
        Instance::new("line", customers).unwrap()
    }

    #[test]
    fn test_split_respects_capacity() {
        let instance = line_instance(&[8.0, 5.0, 7.0, 10.0, 2.0]);
        let routes = split_by_capacity(&[1, 2, 3, 4, 5], &instance, 15.0);
        assert_eq!(routes, vec![vec![1, 2], vec![3], vec![4, 5]]);
    }

    #[test]
    fn test_split_exact_fit_and_empty() {
        let instance = line_instance(&[5.0, 5.0, 5.0]);
        assert_eq!(split_by_capacity(&[3, 1, 2], &instance, 10.0), vec![vec![3, 1], vec![2]]);
        assert!(split_by_capacity(&[], &instance, 10.0).is_empty());
    }

    #[test]
    fn test_init_population() {
        let instance = line_instance(&[4.0, 9.0, 3.0, 6.0, 5.0, 7.0, 2.0, 8.0]);
        let model = FitnessModel {
            vehicle_capacity: 12.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let population = init_population(&instance, 15, &model, &mut rng);
        assert_eq!(population.len(), 15);

        for solution in &population {
            assert_eq!(solution.validate(instance.num_customers()), Ok(()));
            assert!(solution.routes.iter().all(|r| !r.is_empty()));
            assert!(solution.routes.iter().all(|r| r.demand() <= 12.0));
        }
    }

    #[test]
    fn test_random_solution_is_seeded() {
        let instance = line_instance(&[1.0; 12]);
        let model = FitnessModel::default();
        let a = random_solution(&instance, &model, &mut ChaCha8Rng::seed_from_u64(3));
        let b = random_solution(&instance, &model, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a.sequence(), b.sequence());
    }
}
