//! Solution representation and evaluation for the VRPTW.
//!
//! A [`Solution`] is an ordered list of [`Route`]s. Routes store only the
//! customers they visit; the depot is implied at both ends. Every metric
//! (distance, demand, arrival times, feasibility, fitness) is derived from
//! the customer sequences by [`evaluate_route`] and [`Solution::evaluate`].

use crate::error::InvariantViolation;
use crate::instance::Instance;
use serde::{Deserialize, Serialize};

/// Parameters turning route metrics into a scalar fitness (lower is better).
///
/// The vehicle weight is large enough that one vehicle less always beats
/// any distance saving on realistic instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessModel {
    pub vehicle_capacity: f64,
    pub max_fleet_size: usize,
    /// Overrides every customer's service duration when set
    pub service_time: Option<f64>,
    pub vehicle_weight: f64,
    pub distance_weight: f64,
    /// Added once to the fitness of an infeasible solution
    pub infeasibility_penalty: f64,
}

impl Default for FitnessModel {
    fn default() -> Self {
        FitnessModel {
            vehicle_capacity: 200.0,
            max_fleet_size: 25,
            service_time: None,
            vehicle_weight: 10_000.0,
            distance_weight: 1.0,
            infeasibility_penalty: 0.0,
        }
    }
}

impl FitnessModel {
    pub fn fitness(&self, vehicles: usize, distance: f64, feasible: bool) -> f64 {
        let penalty = if feasible { 0.0 } else { self.infeasibility_penalty };
        vehicles as f64 * self.vehicle_weight + distance * self.distance_weight + penalty
    }
}

/// Timing at one visited customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub customer: usize,
    pub arrival: f64,
    /// `max(arrival, ready_time)`
    pub service_start: f64,
    pub departure: f64,
    pub wait: f64,
}

/// A customer reached after its due time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowViolation {
    pub customer: usize,
    pub arrival: f64,
    pub due: f64,
}

/// Everything [`evaluate_route`] derives from a customer sequence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteEvaluation {
    pub distance: f64,
    pub demand: f64,
    pub stops: Vec<Stop>,
    pub violations: Vec<TimeWindowViolation>,
    /// Arrival time back at the depot
    pub return_time: f64,
    pub late_return: bool,
    pub overloaded: bool,
    pub feasible: bool,
}

/// Walk a route from the depot at time 0 and back.
///
/// Early arrivals wait until the ready time; a stop is violated when the
/// arrival is after its due time. The route is feasible when no stop is
/// violated, the vehicle is back at the depot before the depot closes, and
/// the load fits `vehicle_capacity`.
pub fn evaluate_route(
    route: &[usize],
    instance: &Instance,
    vehicle_capacity: f64,
    service_time: Option<f64>,
) -> RouteEvaluation {
    if route.is_empty() {
        return RouteEvaluation {
            feasible: true,
            ..Default::default()
        };
    }

    let mut distance = 0.0;
    let mut demand = 0.0;
    let mut time = 0.0;
    let mut stops = Vec::with_capacity(route.len());
    let mut violations = Vec::new();
    let mut prev = 0;

    for &id in route {
        let customer = instance.customer(id);
        let travel = instance.distance(prev, id);
        distance += travel;

        let arrival = time + travel;
        if arrival > customer.due_time {
            violations.push(TimeWindowViolation {
                customer: id,
                arrival,
                due: customer.due_time,
            });
        }

        let service_start = arrival.max(customer.ready_time);
        let departure = service_start + service_time.unwrap_or(customer.service_time);
        stops.push(Stop {
            customer: id,
            arrival,
            service_start,
            departure,
            wait: service_start - arrival,
        });

        demand += customer.demand;
        time = departure;
        prev = id;
    }

    let back = instance.distance(prev, 0);
    distance += back;
    let return_time = time + back;

    let late_return = return_time > instance.depot().due_time;
    let overloaded = demand > vehicle_capacity;

    RouteEvaluation {
        distance,
        demand,
        stops,
        feasible: violations.is_empty() && !late_return && !overloaded,
        violations,
        return_time,
        late_return,
        overloaded,
    }
}

/// One vehicle's tour: the customers visited between two depot stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub customers: Vec<usize>,
    pub metrics: RouteEvaluation,
}

impl Route {
    pub fn new(customers: Vec<usize>, instance: &Instance, model: &FitnessModel) -> Self {
        let metrics = evaluate_route(&customers, instance, model.vehicle_capacity, model.service_time);
        Route { customers, metrics }
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn distance(&self) -> f64 {
        self.metrics.distance
    }

    pub fn demand(&self) -> f64 {
        self.metrics.demand
    }

    pub fn feasible(&self) -> bool {
        self.metrics.feasible
    }
}

/// A complete fleet assignment (one individual of the population)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub routes: Vec<Route>,
    /// Number of non-empty routes
    pub vehicles: usize,
    pub total_distance: f64,
    pub feasible: bool,
    /// Scalarized objective, lower is better
    pub fitness: f64,
}

impl Solution {
    /// Build a solution from customer sequences and evaluate it.
    pub fn from_routes(instance: &Instance, routes: Vec<Vec<usize>>, model: &FitnessModel) -> Self {
        let routes = routes
            .into_iter()
            .map(|customers| Route::new(customers, instance, model))
            .collect();

        let mut solution = Solution {
            routes,
            vehicles: 0,
            total_distance: 0.0,
            feasible: false,
            fitness: f64::INFINITY,
        };
        solution.aggregate(model);
        solution
    }

    /// Recompute every route metric and the aggregates.
    pub fn evaluate(&mut self, instance: &Instance, model: &FitnessModel) {
        for route in &mut self.routes {
            route.metrics =
                evaluate_route(&route.customers, instance, model.vehicle_capacity, model.service_time);
        }
        self.aggregate(model);
    }

    fn aggregate(&mut self, model: &FitnessModel) {
        self.vehicles = self.routes.iter().filter(|r| !r.is_empty()).count();
        self.total_distance = self.routes.iter().map(|r| r.distance()).sum();
        self.feasible =
            self.routes.iter().all(|r| r.feasible()) && self.vehicles <= model.max_fleet_size;
        self.fitness = model.fitness(self.vehicles, self.total_distance, self.feasible);
    }

    /// Check that customers `1..=num_customers` each appear exactly once.
    pub fn validate(&self, num_customers: usize) -> Result<(), InvariantViolation> {
        let mut seen = vec![false; num_customers + 1];

        for &id in self.routes.iter().flat_map(|r| r.customers.iter()) {
            if id == 0 || id > num_customers {
                return Err(InvariantViolation::UnknownCustomer(id, num_customers));
            }
            if seen[id] {
                return Err(InvariantViolation::Duplicate(id));
            }
            seen[id] = true;
        }

        match seen.iter().skip(1).position(|&s| !s) {
            Some(missing) => Err(InvariantViolation::Missing(missing + 1)),
            None => Ok(()),
        }
    }

    /// All customers in visiting order, route boundaries dropped
    pub fn sequence(&self) -> Vec<usize> {
        self.routes
            .iter()
            .flat_map(|r| r.customers.iter().copied())
            .collect()
    }

    /// Number of customers reached after their due time
    pub fn late_customers(&self) -> usize {
        self.routes.iter().map(|r| r.metrics.violations.len()).sum()
    }

    pub fn total_demand(&self) -> f64 {
        self.routes.iter().map(|r| r.demand()).sum()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution")?;
        writeln!(f, "  Vehicles: {}", self.vehicles)?;
        writeln!(f, "  Distance: {:.2}", self.total_distance)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Fitness: {:.2}", self.fitness)?;
        for (i, route) in self.routes.iter().enumerate() {
            writeln!(f, "  Route {}: {:?}", i + 1, route.customers)?;
        }
        Ok(())
    }
}
