//! Module for loading and representing VRPTW instances.
//!
//! Instances are read from CSV files using the Solomon column layout
//! (`NUMBER, XCOORD, YCOORD, DEMAND, READY_TIME, DUE_DATE, SERVICE_TIME`).
//! Customer 0 is the depot. Euclidean distances between every pair of
//! locations are computed once at load time.

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Euclidean distance between two `(x, y)` coordinates.
#[inline]
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// A customer (or the depot when `id == 0`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer identifier, 0 is the depot
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Quantity to deliver
    pub demand: f64,
    /// Earliest service start
    pub ready_time: f64,
    /// Latest allowed arrival
    pub due_time: f64,
    /// Service duration
    pub service_time: f64,
}

impl Customer {
    pub fn new(
        id: usize,
        x: f64,
        y: f64,
        demand: f64,
        ready_time: f64,
        due_time: f64,
        service_time: f64,
    ) -> Self {
        Customer { id, x, y, demand, ready_time, due_time, service_time }
    }

    /// Depot at the given location, open during `[0, due_time]`.
    pub fn depot(x: f64, y: f64, due_time: f64) -> Self {
        Customer::new(0, x, y, 0.0, 0.0, due_time, 0.0)
    }

    pub fn is_depot(&self) -> bool {
        self.id == 0
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Width of the time window
    pub fn window_width(&self) -> f64 {
        self.due_time - self.ready_time
    }
}

/// One CSV row, accepting both Solomon headers and lower-case names.
#[derive(Debug, Deserialize)]
struct CustomerRecord {
    #[serde(rename = "NUMBER", alias = "id", alias = "number")]
    id: usize,
    #[serde(rename = "XCOORD", alias = "x")]
    x: f64,
    #[serde(rename = "YCOORD", alias = "y")]
    y: f64,
    #[serde(rename = "DEMAND", alias = "demand")]
    demand: f64,
    #[serde(rename = "READY_TIME", alias = "ready_time")]
    ready_time: f64,
    #[serde(rename = "DUE_DATE", alias = "due_time", alias = "due_date")]
    due_time: f64,
    #[serde(rename = "SERVICE_TIME", alias = "service_time")]
    service_time: f64,
}

impl From<CustomerRecord> for Customer {
    fn from(r: CustomerRecord) -> Self {
        Customer::new(r.id, r.x, r.y, r.demand, r.ready_time, r.due_time, r.service_time)
    }
}

/// Serialized form of an [`Instance`]; the matrix is rebuilt on load.
#[derive(Debug, Deserialize)]
struct InstanceData {
    name: String,
    customers: Vec<Customer>,
}

impl TryFrom<InstanceData> for Instance {
    type Error = DataError;

    fn try_from(data: InstanceData) -> Result<Self, DataError> {
        Instance::new(data.name, data.customers)
    }
}

/// A complete VRPTW instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "InstanceData")]
pub struct Instance {
    /// Name of the instance (file stem when loaded from disk)
    pub name: String,
    /// All locations, indexed by id; `customers[0]` is the depot
    pub customers: Vec<Customer>,
    /// Precomputed distance matrix
    #[serde(skip)]
    pub distance_matrix: Vec<Vec<f64>>,
}

impl Instance {
    /// Build an instance from customer records, validating them first.
    ///
    /// Records may come in any order; they are sorted by id and must then
    /// cover `0..N` exactly once.
    pub fn new(name: impl Into<String>, mut customers: Vec<Customer>) -> Result<Self, DataError> {
        customers.sort_by_key(|c| c.id);
        Self::check_customers(&customers)?;

        let distance_matrix = Self::compute_distance_matrix(&customers);

        Ok(Instance {
            name: name.into(),
            customers,
            distance_matrix,
        })
    }

    /// Parse an instance from a CSV file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "instance".to_string());

        let file = File::open(path)?;
        let instance = Self::from_reader(file, name)?;
        log::info!(
            "Loaded instance {} from {:?} ({} customers)",
            instance.name,
            path,
            instance.num_customers()
        );
        Ok(instance)
    }

    /// Parse an instance from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R, name: impl Into<String>) -> Result<Self, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut customers = Vec::new();
        for record in csv_reader.deserialize::<CustomerRecord>() {
            customers.push(Customer::from(record?));
        }

        Self::new(name, customers)
    }

    fn check_customers(customers: &[Customer]) -> Result<(), DataError> {
        match customers.first() {
            Some(c) if c.id == 0 => {}
            _ => return Err(DataError::MissingDepot),
        }
        if customers.len() < 2 {
            return Err(DataError::NoCustomers);
        }

        for (expected, c) in customers.iter().enumerate() {
            if c.id != expected {
                if expected > 0 && customers[expected - 1].id == c.id {
                    return Err(DataError::DuplicateCustomer(c.id));
                }
                return Err(DataError::NonContiguousIds {
                    expected: customers.len(),
                    found: c.id,
                });
            }

            let invalid = |reason: &str| DataError::InvalidCustomer {
                id: c.id,
                reason: reason.to_string(),
            };

            if !c.x.is_finite() || !c.y.is_finite() {
                return Err(invalid("coordinates must be finite"));
            }
            if !c.demand.is_finite() || c.demand < 0.0 {
                return Err(invalid("demand must be a non-negative number"));
            }
            if !c.service_time.is_finite() || c.service_time < 0.0 {
                return Err(invalid("service time must be a non-negative number"));
            }
            if !c.ready_time.is_finite() || !c.due_time.is_finite() || c.ready_time > c.due_time {
                return Err(invalid("time window must satisfy ready_time <= due_time"));
            }
        }

        if customers[0].demand != 0.0 {
            return Err(DataError::InvalidCustomer {
                id: 0,
                reason: "depot demand must be 0".to_string(),
            });
        }

        Ok(())
    }

    /// Reject instances where a single customer cannot fit in any vehicle.
    pub fn check_capacity(&self, capacity: f64) -> Result<(), DataError> {
        match self.customers.iter().skip(1).find(|c| c.demand > capacity) {
            Some(c) => Err(DataError::DemandExceedsCapacity {
                id: c.id,
                demand: c.demand,
                capacity,
            }),
            None => Ok(()),
        }
    }

    /// Compute Euclidean distance matrix
    fn compute_distance_matrix(customers: &[Customer]) -> Vec<Vec<f64>> {
        let n = customers.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let d = distance(customers[i].coords(), customers[j].coords());
                matrix[i][j] = d;
                matrix[j][i] = d;
            }
        }

        matrix
    }

    /// Get the distance between two locations
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    #[inline]
    pub fn customer(&self, id: usize) -> &Customer {
        &self.customers[id]
    }

    pub fn depot(&self) -> &Customer {
        &self.customers[0]
    }

    /// Number of customers, depot excluded
    pub fn num_customers(&self) -> usize {
        self.customers.len() - 1
    }

    /// Customer ids `1..=N`
    pub fn customer_ids(&self) -> Vec<usize> {
        (1..=self.num_customers()).collect()
    }

    pub fn total_demand(&self) -> f64 {
        self.customers.iter().map(|c| c.demand).sum()
    }

    /// Lower bound on the fleet size imposed by capacity alone
    pub fn min_vehicles(&self, capacity: f64) -> usize {
        (self.total_demand() / capacity).ceil() as usize
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let customers = &self.customers[1..];
        let n = customers.len() as f64;

        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.customers.len() {
            for j in i + 1..self.customers.len() {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = distances.iter().sum::<f64>() / distances.len() as f64;
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        let avg_window = customers.iter().map(|c| c.window_width()).sum::<f64>() / n;
        let tightest_window = customers
            .iter()
            .map(|c| c.window_width())
            .fold(f64::INFINITY, f64::min);

        InstanceStatistics {
            name: self.name.clone(),
            num_customers: customers.len(),
            total_demand: self.total_demand(),
            horizon: self.depot().due_time,
            avg_distance,
            max_distance,
            avg_window,
            tightest_window,
            avg_service_time: customers.iter().map(|c| c.service_time).sum::<f64>() / n,
        }
    }
}

/// Statistics about a VRPTW instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_customers: usize,
    pub total_demand: f64,
    pub horizon: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub avg_window: f64,
    pub tightest_window: f64,
    pub avg_service_time: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Locations: {} (1 depot + {} customers)", self.num_customers + 1, self.num_customers)?;
        writeln!(f, "  Total demand: {:.1}", self.total_demand)?;
        writeln!(f, "  Scheduling horizon: {:.1}", self.horizon)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)?;
        writeln!(f, "  Avg time window: {:.2}", self.avg_window)?;
        writeln!(f, "  Tightest time window: {:.2}", self.tightest_window)?;
        writeln!(f, "  Avg service time: {:.2}", self.avg_service_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
NUMBER,XCOORD,YCOORD,DEMAND,READY_TIME,DUE_DATE,SERVICE_TIME
2,6.0,8.0,20.0,0,100,5
0,0.0,0.0,0.0,0,230,0
1,3.0,4.0,10.0,0,50,5
";

    #[test]
    fn test_distance_calculation() {
        assert!((distance((0.0, 0.0), (3.0, 4.0)) - 5.0).abs() < 1e-10);
        assert_eq!(distance((1.5, -2.0), (1.5, -2.0)), 0.0);
    }

    #[test]
    fn test_load_from_csv_sorts_by_id() {
        let instance = Instance::from_reader(CSV.as_bytes(), "tiny").unwrap();

        assert_eq!(instance.num_customers(), 2);
        assert_eq!(instance.customer_ids(), vec![1, 2]);
        assert!(instance.depot().is_depot());
        assert_eq!(instance.customer(2).demand, 20.0);
        assert_eq!(instance.depot().due_time, 230.0);
        assert!((instance.distance(0, 2) - 10.0).abs() < 1e-10);
        assert!((instance.distance(2, 1) - 5.0).abs() < 1e-10);
        assert_eq!(instance.distance(1, 2), instance.distance(2, 1));
    }

    #[test]
    fn test_lowercase_headers() {
        let csv = "id,x,y,demand,ready_time,due_time,service_time\n\
                   0,0,0,0,0,100,0\n\
                   1,1,1,5,0,100,1\n";
        let instance = Instance::from_reader(csv.as_bytes(), "lower").unwrap();
        assert_eq!(instance.num_customers(), 1);
    }

    #[test]
    fn test_missing_depot() {
        let csv = "NUMBER,XCOORD,YCOORD,DEMAND,READY_TIME,DUE_DATE,SERVICE_TIME\n\
                   1,1,1,5,0,100,1\n";
        let err = Instance::from_reader(csv.as_bytes(), "x").unwrap_err();
        assert!(matches!(err, DataError::MissingDepot));
    }

    #[test]
    fn test_duplicate_and_gap() {
        let depot = Customer::depot(0.0, 0.0, 100.0);
        let c1 = Customer::new(1, 1.0, 0.0, 1.0, 0.0, 10.0, 0.0);
        let c3 = Customer::new(3, 1.0, 0.0, 1.0, 0.0, 10.0, 0.0);

        let err = Instance::new("dup", vec![depot.clone(), c1.clone(), c1.clone()]).unwrap_err();
        assert!(matches!(err, DataError::DuplicateCustomer(1)));

        let err = Instance::new("gap", vec![depot, c1, c3]).unwrap_err();
        assert!(matches!(err, DataError::NonContiguousIds { found: 3, .. }));
    }

    #[test]
    fn test_invalid_window_and_empty() {
        let depot = Customer::depot(0.0, 0.0, 100.0);
        let bad = Customer::new(1, 1.0, 0.0, 1.0, 20.0, 10.0, 0.0);
        let err = Instance::new("tw", vec![depot.clone(), bad]).unwrap_err();
        assert!(matches!(err, DataError::InvalidCustomer { id: 1, .. }));

        let err = Instance::new("empty", vec![depot]).unwrap_err();
        assert!(matches!(err, DataError::NoCustomers));
    }

    #[test]
    fn test_rejects_bad_values() {
        let depot = Customer::depot(0.0, 0.0, 100.0);
        let cases = [
            Customer::new(1, f64::NAN, 0.0, 1.0, 0.0, 10.0, 0.0),
            Customer::new(1, 1.0, f64::INFINITY, 1.0, 0.0, 10.0, 0.0),
            Customer::new(1, 1.0, 0.0, -1.0, 0.0, 10.0, 0.0),
            Customer::new(1, 1.0, 0.0, 1.0, 0.0, 10.0, -2.0),
        ];

        for bad in cases {
            let err = Instance::new("bad", vec![depot.clone(), bad]).unwrap_err();
            assert!(matches!(err, DataError::InvalidCustomer { id: 1, .. }));
        }
    }

    #[test]
    fn test_depot_with_demand() {
        let mut depot = Customer::depot(0.0, 0.0, 100.0);
        depot.demand = 3.0;
        let c1 = Customer::new(1, 1.0, 0.0, 1.0, 0.0, 10.0, 0.0);

        let err = Instance::new("depot", vec![depot, c1]).unwrap_err();
        assert!(matches!(err, DataError::InvalidCustomer { id: 0, .. }));
    }

    #[test]
    fn test_json_restores_distances() {
        let instance = Instance::from_reader(CSV.as_bytes(), "tiny").unwrap();
        let json = serde_json::to_string(&instance).unwrap();
        assert!(!json.contains("distance_matrix"));

        let back: Instance = serde_json::from_str(&json).unwrap();
        assert_eq!(back.distance_matrix, instance.distance_matrix);
        assert!((back.distance(0, 2) - 10.0).abs() < 1e-10);

        let gap = r#"{"name":"gap","customers":[
            {"id":0,"x":0,"y":0,"demand":0,"ready_time":0,"due_time":10,"service_time":0},
            {"id":2,"x":1,"y":1,"demand":1,"ready_time":0,"due_time":10,"service_time":0}]}"#;
        assert!(serde_json::from_str::<Instance>(gap).is_err());
    }

    #[test]
    fn test_malformed_record() {
        let csv = "NUMBER,XCOORD,YCOORD,DEMAND,READY_TIME,DUE_DATE,SERVICE_TIME\n\
                   0,0,0,0,0,100,0\n\
                   1,abc,1,5,0,100,1\n";
        let err = Instance::from_reader(csv.as_bytes(), "bad").unwrap_err();
        assert!(matches!(err, DataError::Csv(_)));
    }

    #[test]
    fn test_capacity_check() {
        let instance = Instance::from_reader(CSV.as_bytes(), "tiny").unwrap();
        assert!(instance.check_capacity(20.0).is_ok());
        assert!(matches!(
            instance.check_capacity(15.0),
            Err(DataError::DemandExceedsCapacity { id: 2, .. })
        ));
        assert_eq!(instance.min_vehicles(15.0), 2);
    }

    #[test]
    fn test_statistics() {
        let instance = Instance::from_reader(CSV.as_bytes(), "tiny").unwrap();
        let stats = instance.statistics();
        assert_eq!(stats.num_customers, 2);
        assert_eq!(stats.total_demand, 30.0);
        assert_eq!(stats.tightest_window, 50.0);
        assert!((stats.max_distance - 10.0).abs() < 1e-10);
        assert!(stats.to_string().contains("tiny"));
    }
}
