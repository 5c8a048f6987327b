//! Multi-source integration.
//!
//! Joins the eight source tables into one denormalized `IntegratedRecord` per
//! order and computes every derived analytical field. All joins are left
//! outer: an order with no fleet, warehouse, external or feedback row is
//! still emitted with those fields `None`. Field computation is strictly
//! row-local, so the build is a single pass over orders once the auxiliary
//! tables are indexed.

use crate::classifier::Classifier;
use chrono::Datelike;
use crate::error::Result;
use crate::models::{
    normalize_value, Client, Driver, ExternalFactor, Feedback, FleetLog, IntegratedRecord, Order,
    Severity, Warehouse, WarehouseLog, FAILURE_STATUSES,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// The eight collections handed in by the loader collaborator, already parsed
/// into typed values.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub orders: Vec<Order>,
    pub fleet_logs: Vec<FleetLog>,
    pub warehouse_logs: Vec<WarehouseLog>,
    pub external_factors: Vec<ExternalFactor>,
    pub feedback: Vec<Feedback>,
    pub warehouses: Vec<Warehouse>,
    pub clients: Vec<Client>,
    pub drivers: Vec<Driver>,
}

/// Distinct normalized entity values present in the integrated dataset,
/// supplied to the query parser as its matching vocabulary.
#[derive(Debug, Clone, Default)]
pub struct KnownEntities {
    pub cities: Vec<String>,
    pub clients: Vec<String>,
    pub warehouses: Vec<String>,
}

/// The authoritative queryable dataset. Built once, immutable thereafter;
/// concurrent read-only queries need no locking.
#[derive(Debug)]
pub struct DatasetSnapshot {
    pub records: Vec<IntegratedRecord>,
    pub entities: KnownEntities,
    pub built_at: DateTime<Utc>,
}

/// Shared handle over the current snapshot. Rebuild is copy-and-swap: a new
/// snapshot is constructed off to the side and swapped in atomically, so
/// in-flight queries keep reading the snapshot they started with.
pub struct DatasetHandle {
    inner: RwLock<Arc<DatasetSnapshot>>,
}

impl DatasetHandle {
    pub fn new(snapshot: DatasetSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<DatasetSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn swap(&self, snapshot: DatasetSnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(snapshot);
    }
}

pub struct Integrator {
    classifier: Classifier,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

impl Integrator {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Builds the integrated dataset: left joins keyed by
    /// order/client/warehouse/driver id, derived fields, root-cause
    /// classification. Input tables are not mutated.
    pub fn build(&self, sources: &SourceTables) -> Result<DatasetSnapshot> {
        info!("Building integrated dataset from {} orders", sources.orders.len());

        let fleet_by_order = index_fleet_logs(&sources.fleet_logs);
        let warehouse_log_by_order = index_warehouse_logs(&sources.warehouse_logs);
        let external_by_order = index_external_factors(&sources.external_factors);
        let feedback_by_order = index_feedback(&sources.feedback);

        let warehouses_by_id: HashMap<i64, &Warehouse> = sources
            .warehouses
            .iter()
            .map(|w| (w.warehouse_id, w))
            .collect();
        let clients_by_id: HashMap<i64, &Client> =
            sources.clients.iter().map(|c| (c.client_id, c)).collect();
        let drivers_by_id: HashMap<i64, &Driver> =
            sources.drivers.iter().map(|d| (d.driver_id, d)).collect();

        // Orders carry no warehouse key of their own; attribution falls back
        // to the first warehouse located in the order's city when no
        // warehouse log names one.
        let mut warehouse_by_city: HashMap<String, i64> = HashMap::new();
        for warehouse in &sources.warehouses {
            if let Some(city) = &warehouse.city {
                warehouse_by_city
                    .entry(normalize_value(city))
                    .or_insert(warehouse.warehouse_id);
            }
        }

        let mut records = Vec::with_capacity(sources.orders.len());
        let mut seen_orders: HashMap<i64, ()> = HashMap::new();

        for order in &sources.orders {
            if seen_orders.insert(order.order_id, ()).is_some() {
                warn!("Duplicate order_id {} in orders table, keeping first row", order.order_id);
                continue;
            }

            let fleet = fleet_by_order.get(&order.order_id);
            let warehouse_log = warehouse_log_by_order.get(&order.order_id);
            let external = external_by_order.get(&order.order_id);
            let feedback = feedback_by_order.get(&order.order_id);

            let client = clients_by_id.get(&order.client_id);
            let driver = fleet
                .and_then(|f| f.driver_id)
                .and_then(|id| drivers_by_id.get(&id));

            let warehouse_id = warehouse_log
                .and_then(|w| w.warehouse_id)
                .or_else(|| warehouse_by_city.get(&normalize_value(&order.city)).copied());
            let warehouse = warehouse_id.and_then(|id| warehouses_by_id.get(&id));

            let mut record = integrate_one(order, fleet, warehouse_log, external, feedback);
            record.client_name = client.map(|c| c.client_name.clone());
            record.contact_person = client.and_then(|c| c.contact_person.clone());
            record.warehouse_id = warehouse_id;
            record.warehouse_name = warehouse.map(|w| w.warehouse_name.clone());
            record.driver_name = driver.map(|d| d.driver_name.clone());
            record.partner_company = driver.and_then(|d| d.partner_company.clone());

            record.root_cause = self.classifier.classify(&record);
            records.push(record);
        }

        let entities = extract_entities(&records);
        debug!(
            "Known entities: {} cities, {} clients, {} warehouses",
            entities.cities.len(),
            entities.clients.len(),
            entities.warehouses.len()
        );

        info!("Integrated dataset ready: {} records", records.len());
        Ok(DatasetSnapshot {
            records,
            entities,
            built_at: Utc::now(),
        })
    }
}

/// Joins one order against its (already collapsed) auxiliary rows and
/// computes the derived fields.
fn integrate_one(
    order: &Order,
    fleet: Option<&FleetLog>,
    warehouse_log: Option<&WarehouseLog>,
    external: Option<&ExternalFactor>,
    feedback: Option<&CollapsedFeedback>,
) -> IntegratedRecord {
    let is_delayed = match (order.actual_delivery_date, order.promised_delivery_date) {
        (Some(actual), Some(promised)) => actual > promised,
        _ => false,
    };
    let is_failed = FAILURE_STATUSES.contains(&normalize_value(&order.status).as_str());

    let delay_days = match (order.actual_delivery_date, order.promised_delivery_date) {
        (Some(actual), Some(promised)) => Some((actual - promised).num_days().max(0)),
        _ => None,
    };

    let severity = match (is_failed, delay_days.unwrap_or(0)) {
        (true, _) => Severity::Critical,
        (false, d) if d > 5 => Severity::High,
        (false, d) if d > 2 => Severity::Medium,
        _ => Severity::Low,
    };

    IntegratedRecord {
        order_id: order.order_id,
        client_id: order.client_id,
        city: order.city.clone(),
        state: order.state.clone(),
        order_date: order.order_date,
        promised_delivery_date: order.promised_delivery_date,
        actual_delivery_date: order.actual_delivery_date,
        status: order.status.clone(),
        failure_reason: order.failure_reason.clone(),
        amount: order.amount,
        client_name: None,
        contact_person: None,
        warehouse_id: None,
        warehouse_name: None,
        driver_id: fleet.and_then(|f| f.driver_id),
        driver_name: None,
        partner_company: None,
        vehicle_number: fleet.and_then(|f| f.vehicle_number.clone()),
        route_code: fleet.and_then(|f| f.route_code.clone()),
        gps_delay_notes: fleet.and_then(|f| f.gps_delay_notes.clone()),
        departure_time: fleet.and_then(|f| f.departure_time),
        arrival_time: fleet.and_then(|f| f.arrival_time),
        picking_start: warehouse_log.and_then(|w| w.picking_start),
        picking_end: warehouse_log.and_then(|w| w.picking_end),
        dispatch_time: warehouse_log.and_then(|w| w.dispatch_time),
        warehouse_notes: warehouse_log.and_then(|w| w.notes.clone()),
        traffic_condition: external.and_then(|e| e.traffic_condition.clone()),
        weather_condition: external.and_then(|e| e.weather_condition.clone()),
        event_type: external.and_then(|e| e.event_type.clone()),
        feedback_text: feedback.map(|f| f.text.clone()),
        sentiment: feedback.and_then(|f| f.sentiment.clone()),
        rating: feedback.and_then(|f| f.mean_rating()),
        is_delayed,
        is_failed,
        delay_days,
        day_of_week: order.order_date.weekday(),
        severity,
        root_cause: None,
    }
}

/// Collapses 0..n fleet rows per order into one: first-wins for structured
/// fields, free-text delay notes concatenated.
fn index_fleet_logs(logs: &[FleetLog]) -> HashMap<i64, FleetLog> {
    let mut by_order: HashMap<i64, FleetLog> = HashMap::new();
    for log in logs {
        match by_order.get_mut(&log.order_id) {
            Some(existing) => {
                merge_note(&mut existing.gps_delay_notes, log.gps_delay_notes.as_deref());
                if existing.driver_id.is_none() {
                    existing.driver_id = log.driver_id;
                }
            }
            None => {
                by_order.insert(log.order_id, log.clone());
            }
        }
    }
    by_order
}

fn index_warehouse_logs(logs: &[WarehouseLog]) -> HashMap<i64, WarehouseLog> {
    let mut by_order: HashMap<i64, WarehouseLog> = HashMap::new();
    for log in logs {
        match by_order.get_mut(&log.order_id) {
            Some(existing) => {
                merge_note(&mut existing.notes, log.notes.as_deref());
            }
            None => {
                by_order.insert(log.order_id, log.clone());
            }
        }
    }
    by_order
}

fn index_external_factors(factors: &[ExternalFactor]) -> HashMap<i64, ExternalFactor> {
    let mut by_order: HashMap<i64, ExternalFactor> = HashMap::new();
    for factor in factors {
        match by_order.get_mut(&factor.order_id) {
            Some(existing) => {
                merge_note(&mut existing.event_type, factor.event_type.as_deref());
            }
            None => {
                by_order.insert(factor.order_id, factor.clone());
            }
        }
    }
    by_order
}

/// Multiple feedback rows collapse to one joined text, the first sentiment
/// and the mean rating.
#[derive(Debug, Clone)]
struct CollapsedFeedback {
    text: String,
    sentiment: Option<String>,
    ratings: Vec<f64>,
}

impl CollapsedFeedback {
    fn mean_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            None
        } else {
            Some(self.ratings.iter().sum::<f64>() / self.ratings.len() as f64)
        }
    }
}

fn index_feedback(rows: &[Feedback]) -> HashMap<i64, CollapsedFeedback> {
    let mut by_order: HashMap<i64, CollapsedFeedback> = HashMap::new();
    for row in rows {
        match by_order.get_mut(&row.order_id) {
            Some(existing) => {
                existing.text.push_str(" | ");
                existing.text.push_str(&row.feedback_text);
                if let Some(rating) = row.rating {
                    existing.ratings.push(rating);
                }
            }
            None => {
                by_order.insert(
                    row.order_id,
                    CollapsedFeedback {
                        text: row.feedback_text.clone(),
                        sentiment: row.sentiment.clone(),
                        ratings: row.rating.into_iter().collect(),
                    },
                );
            }
        }
    }
    by_order
}

fn merge_note(existing: &mut Option<String>, incoming: Option<&str>) {
    if let Some(new_note) = incoming {
        match existing {
            Some(note) => {
                note.push_str(", ");
                note.push_str(new_note);
            }
            None => *existing = Some(new_note.to_string()),
        }
    }
}

fn extract_entities(records: &[IntegratedRecord]) -> KnownEntities {
    let mut cities: Vec<String> = records.iter().map(|r| normalize_value(&r.city)).collect();
    cities.sort();
    cities.dedup();

    let mut clients: Vec<String> = records
        .iter()
        .filter_map(|r| r.client_name.as_deref().map(normalize_value))
        .collect();
    clients.sort();
    clients.dedup();

    let mut warehouses: Vec<String> = records
        .iter()
        .filter_map(|r| r.warehouse_name.as_deref().map(normalize_value))
        .collect();
    warehouses.sort();
    warehouses.dedup();

    KnownEntities {
        cities,
        clients,
        warehouses,
    }
}
