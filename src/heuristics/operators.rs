//! Genetic operators for the VRPTW.
//!
//! Crossover and mutation work on the giant tour (all customers in route
//! order, depot separators dropped) and then re-split it by capacity, so
//! every offspring visits each customer exactly once.

use crate::heuristics::construction::solution_from_sequence;
use crate::instance::Instance;
use crate::solution::{FitnessModel, Solution};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mutation operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationType {
    /// Exchange two customers
    Swap,
    /// Move one customer to another position
    Insertion,
    /// Swap with probability `swap_share`, insertion otherwise
    Mixed,
}

/// Tournament selection (lower fitness wins).
///
/// Contestants are drawn uniformly with replacement. A tournament at
/// least as large as the population is the whole population. On ties
/// the first contestant drawn is kept. `population` must not be empty.
pub fn tournament_select<'a, R: Rng + ?Sized>(
    population: &'a [Solution],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Solution {
    debug_assert!(!population.is_empty());

    if tournament_size >= population.len() {
        let mut best = &population[0];
        for candidate in &population[1..] {
            if candidate.fitness < best.fitness {
                best = candidate;
            }
        }
        return best;
    }

    let mut best_idx = rng.gen_range(0..population.len());
    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        if population[idx].fitness < population[best_idx].fitness {
            best_idx = idx;
        }
    }

    &population[best_idx]
}

/// Order Crossover (OX) with the inclusive slice `[start, end]` of `parent_a`.
///
/// The slice keeps its positions in the child; the other positions are
/// filled left to right with the remaining ids in `parent_b`'s order.
pub fn order_crossover_with_slice(
    parent_a: &[usize],
    parent_b: &[usize],
    start: usize,
    end: usize,
) -> Vec<usize> {
    let n = parent_a.len();
    debug_assert!(start <= end && end < n);

    let mut child = vec![usize::MAX; n];
    child[start..=end].copy_from_slice(&parent_a[start..=end]);

    let segment: HashSet<usize> = parent_a[start..=end].iter().copied().collect();
    let mut rest = parent_b.iter().copied().filter(|id| !segment.contains(id));

    for slot in child.iter_mut().filter(|slot| **slot == usize::MAX) {
        match rest.next() {
            Some(id) => *slot = id,
            None => break,
        }
    }

    if child.contains(&usize::MAX) {
        // Parents are not permutations of the same ids
        return parent_a.to_vec();
    }

    child
}

/// Order Crossover (OX) with a random slice.
///
/// The slice lies between two distinct cut points, so it is never the
/// whole sequence and the child always takes some order from `parent_b`.
pub fn order_crossover<R: Rng + ?Sized>(parent_a: &[usize], parent_b: &[usize], rng: &mut R) -> Vec<usize> {
    let n = parent_a.len();
    if n < 2 {
        return parent_a.to_vec();
    }

    let (start, end) = random_slice(n, rng);
    order_crossover_with_slice(parent_a, parent_b, start, end)
}

/// Inclusive slice `[start, end]` of a sequence of length `n >= 2`,
/// spanning at most `n - 1` positions.
fn random_slice<R: Rng + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n - 1);
    if b >= a {
        b += 1;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    (lo, hi - 1)
}

/// Swap mutation: exchange two distinct positions.
pub fn swap_mutation<R: Rng + ?Sized>(sequence: &mut [usize], rng: &mut R) {
    let n = sequence.len();
    if n < 2 {
        return;
    }

    let i = rng.gen_range(0..n);
    let mut j = rng.gen_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    sequence.swap(i, j);
}

/// Insertion mutation: move one customer to a different position.
pub fn insertion_mutation<R: Rng + ?Sized>(sequence: &mut Vec<usize>, rng: &mut R) {
    let n = sequence.len();
    if n < 2 {
        return;
    }

    let from = rng.gen_range(0..n);
    let node = sequence.remove(from);
    let mut to = rng.gen_range(0..n - 1);
    if to >= from {
        to += 1;
    }
    sequence.insert(to, node);
}

/// Solution-level operators bound to one instance and fitness model.
#[derive(Debug, Clone, Copy)]
pub struct GeneticOperators<'a> {
    instance: &'a Instance,
    model: FitnessModel,
    mutation_type: MutationType,
    swap_share: f64,
}

impl<'a> GeneticOperators<'a> {
    pub fn new(
        instance: &'a Instance,
        model: FitnessModel,
        mutation_type: MutationType,
        swap_share: f64,
    ) -> Self {
        GeneticOperators {
            instance,
            model,
            mutation_type,
            swap_share,
        }
    }

    pub fn model(&self) -> &FitnessModel {
        &self.model
    }

    /// OX on the giant tours of both parents, then capacity split.
    pub fn crossover<R: Rng + ?Sized>(&self, parent_a: &Solution, parent_b: &Solution, rng: &mut R) -> Solution {
        let child = order_crossover(&parent_a.sequence(), &parent_b.sequence(), rng);
        solution_from_sequence(&child, self.instance, &self.model)
    }

    /// Apply the configured mutation and re-split.
    pub fn mutate<R: Rng + ?Sized>(&self, solution: &Solution, rng: &mut R) -> Solution {
        let mut sequence = solution.sequence();

        let use_swap = match self.mutation_type {
            MutationType::Swap => true,
            MutationType::Insertion => false,
            MutationType::Mixed => rng.gen::<f64>() < self.swap_share,
        };

        if use_swap {
            swap_mutation(&mut sequence, rng);
        } else {
            insertion_mutation(&mut sequence, rng);
        }

        solution_from_sequence(&sequence, self.instance, &self.model)
    }

    /// Select two parents, cross them with probability `crossover_rate`
    /// (otherwise clone the first), then mutate with probability
    /// `mutation_rate`.
    pub fn breed<R: Rng + ?Sized>(
        &self,
        population: &[Solution],
        tournament_size: usize,
        crossover_rate: f64,
        mutation_rate: f64,
        rng: &mut R,
    ) -> Solution {
        let parent_a = tournament_select(population, tournament_size, rng);
        let parent_b = tournament_select(population, tournament_size, rng);

        let child = if rng.gen::<f64>() < crossover_rate {
            self.crossover(parent_a, parent_b, rng)
        } else {
            parent_a.clone()
        };

        if rng.gen::<f64>() < mutation_rate {
            self.mutate(&child, rng)
        } else {
            child
        }
    }
}
