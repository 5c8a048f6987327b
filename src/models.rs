use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order statuses that count as outright delivery failures.
pub const FAILURE_STATUSES: &[&str] = &["failed", "cancelled", "returned", "undelivered"];

/// One row per order; root unit of analysis.
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: i64,
    pub client_id: i64,
    pub city: String,
    pub state: Option<String>,
    pub order_date: NaiveDate,
    pub promised_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub status: String,
    pub failure_reason: Option<String>,
    pub amount: f64,
}

/// Fleet telemetry for an order, 0..1 after integration.
#[derive(Debug, Clone)]
pub struct FleetLog {
    pub order_id: i64,
    pub driver_id: Option<i64>,
    pub vehicle_number: Option<String>,
    pub route_code: Option<String>,
    pub gps_delay_notes: Option<String>,
    pub departure_time: Option<NaiveDateTime>,
    pub arrival_time: Option<NaiveDateTime>,
}

/// Warehouse handling record for an order, 0..1 after integration.
#[derive(Debug, Clone)]
pub struct WarehouseLog {
    pub order_id: i64,
    pub warehouse_id: Option<i64>,
    pub picking_start: Option<NaiveDateTime>,
    pub picking_end: Option<NaiveDateTime>,
    pub dispatch_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

/// Ambient conditions recorded around an order's delivery window.
#[derive(Debug, Clone)]
pub struct ExternalFactor {
    pub order_id: i64,
    pub traffic_condition: Option<String>,
    pub weather_condition: Option<String>,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Feedback {
    pub order_id: i64,
    pub feedback_text: String,
    pub sentiment: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Warehouse {
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub city: Option<String>,
    pub capacity: Option<i64>,
    pub manager_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub client_id: i64,
    pub client_name: String,
    pub contact_person: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Driver {
    pub driver_id: i64,
    pub driver_name: String,
    pub partner_company: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
}

/// The fixed root-cause category set. Classification priority is the
/// declaration order here; see `classifier::Classifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    StockUnavailability,
    AddressIssues,
    WarehouseOperations,
    VehicleIssues,
    TrafficCongestion,
    WeatherDisruption,
    CustomerReturns,
    ProcessingDelays,
}

impl RootCause {
    pub fn label(&self) -> &'static str {
        match self {
            RootCause::StockUnavailability => "Stock Unavailability",
            RootCause::AddressIssues => "Address Issues",
            RootCause::WarehouseOperations => "Warehouse Operations",
            RootCause::VehicleIssues => "Vehicle Issues",
            RootCause::TrafficCongestion => "Traffic Congestion",
            RootCause::WeatherDisruption => "Weather Disruption",
            RootCause::CustomerReturns => "Customer Returns",
            RootCause::ProcessingDelays => "Processing Delays",
        }
    }
}

impl fmt::Display for RootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// One order's data after joining all domain tables and computing the
/// derived analytical fields. Auxiliary joins that found no row leave the
/// corresponding fields `None`; the order itself is never dropped.
#[derive(Debug, Clone)]
pub struct IntegratedRecord {
    // Order core
    pub order_id: i64,
    pub client_id: i64,
    pub city: String,
    pub state: Option<String>,
    pub order_date: NaiveDate,
    pub promised_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub status: String,
    pub failure_reason: Option<String>,
    pub amount: f64,

    // Client dimension
    pub client_name: Option<String>,
    pub contact_person: Option<String>,

    // Warehouse dimension
    pub warehouse_id: Option<i64>,
    pub warehouse_name: Option<String>,

    // Fleet log + driver dimension
    pub driver_id: Option<i64>,
    pub driver_name: Option<String>,
    pub partner_company: Option<String>,
    pub vehicle_number: Option<String>,
    pub route_code: Option<String>,
    pub gps_delay_notes: Option<String>,
    pub departure_time: Option<NaiveDateTime>,
    pub arrival_time: Option<NaiveDateTime>,

    // Warehouse log
    pub picking_start: Option<NaiveDateTime>,
    pub picking_end: Option<NaiveDateTime>,
    pub dispatch_time: Option<NaiveDateTime>,
    pub warehouse_notes: Option<String>,

    // External factors
    pub traffic_condition: Option<String>,
    pub weather_condition: Option<String>,
    pub event_type: Option<String>,

    // Customer feedback
    pub feedback_text: Option<String>,
    pub sentiment: Option<String>,
    pub rating: Option<f64>,

    // Derived analytical fields, computed once at integration time
    pub is_delayed: bool,
    pub is_failed: bool,
    pub delay_days: Option<i64>,
    pub day_of_week: Weekday,
    pub severity: Severity,
    pub root_cause: Option<RootCause>,
}

impl IntegratedRecord {
    /// A record qualifies for root-cause analysis iff it was delayed or failed.
    pub fn is_problem(&self) -> bool {
        self.is_delayed || self.is_failed
    }
}

/// Normalized form used everywhere reference values are compared:
/// lower-cased and trimmed, exact thereafter.
pub fn normalize_value(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Full English day name, used as a stable grouping key in results.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
