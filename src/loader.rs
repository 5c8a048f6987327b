//! CSV loading collaborator.
//!
//! Parses the eight source files into typed collections before the core ever
//! sees them. Orders are mandatory and must carry an `order_id` column;
//! every auxiliary file is tolerant — a missing file loads as empty, a
//! malformed row is logged and skipped.

use crate::error::{AnalyzerError, Result};
use crate::integrator::SourceTables;
use crate::models::{
    Client, Driver, ExternalFactor, Feedback, FleetLog, Order, Warehouse, WarehouseLog,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct Loader {
    data_dir: PathBuf,
}

impl Loader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Loads every source table. Fails only on a missing/structurally broken
    /// orders file; auxiliary tables degrade to empty collections.
    pub fn load(&self) -> Result<SourceTables> {
        let orders = self.load_orders()?;
        info!("Loaded {} orders", orders.len());

        Ok(SourceTables {
            orders,
            fleet_logs: self.load_auxiliary("fleet_logs.csv", RawFleetLog::into_typed),
            warehouse_logs: self.load_auxiliary("warehouse_logs.csv", RawWarehouseLog::into_typed),
            external_factors: self
                .load_auxiliary("external_factors.csv", RawExternalFactor::into_typed),
            feedback: self.load_auxiliary("feedback.csv", RawFeedback::into_typed),
            warehouses: self.load_auxiliary("warehouses.csv", RawWarehouse::into_typed),
            clients: self.load_auxiliary("clients.csv", RawClient::into_typed),
            drivers: self.load_auxiliary("drivers.csv", RawDriver::into_typed),
        })
    }

    fn load_orders(&self) -> Result<Vec<Order>> {
        let path = self.data_dir.join("orders.csv");
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            AnalyzerError::Load(format!("Cannot open {}: {}", path.display(), e))
        })?;

        let headers = reader.headers()?.clone();
        if !headers.iter().any(|h| h == "order_id") {
            return Err(AnalyzerError::Schema(format!(
                "orders.csv is missing the order_id column (found: {})",
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut orders = Vec::new();
        for row in reader.deserialize::<RawOrder>() {
            match row {
                Ok(raw) => match raw.into_typed() {
                    Ok(order) => orders.push(order),
                    Err(e) => warn!("Skipping order row: {}", e),
                },
                Err(e) => warn!("Skipping unparseable order row: {}", e),
            }
        }
        Ok(orders)
    }

    fn load_auxiliary<R, T>(&self, filename: &str, convert: fn(R) -> Option<T>) -> Vec<T>
    where
        R: DeserializeOwned,
    {
        let path = self.data_dir.join(filename);
        if !path.exists() {
            warn!("{} not found, continuing without it", path.display());
            return Vec::new();
        }
        let mut reader = match csv::Reader::from_path(&path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Cannot open {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let mut rows = Vec::new();
        for row in reader.deserialize::<R>() {
            match row {
                Ok(raw) => {
                    if let Some(typed) = convert(raw) {
                        rows.push(typed);
                    }
                }
                Err(e) => warn!("Skipping row in {}: {}", filename, e),
            }
        }
        info!("Loaded {} rows from {}", rows.len(), filename);
        rows
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// Raw row shapes: dates arrive as strings in mixed formats, numeric fields
// may be blank. Parsing to typed values happens here so the core only ever
// sees date values, not strings.

fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    order_id: i64,
    client_id: Option<i64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    order_date: Option<String>,
    #[serde(default)]
    promised_delivery_date: Option<String>,
    #[serde(default)]
    actual_delivery_date: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
    amount: Option<f64>,
}

impl RawOrder {
    fn into_typed(self) -> Result<Order> {
        let order_date = self
            .order_date
            .as_deref()
            .and_then(parse_date)
            .ok_or_else(|| {
                AnalyzerError::Load(format!("order {} has no valid order_date", self.order_id))
            })?;
        Ok(Order {
            order_id: self.order_id,
            client_id: self.client_id.unwrap_or(0),
            city: non_empty(self.city).unwrap_or_default(),
            state: non_empty(self.state),
            order_date,
            promised_delivery_date: self.promised_delivery_date.as_deref().and_then(parse_date),
            actual_delivery_date: self.actual_delivery_date.as_deref().and_then(parse_date),
            status: non_empty(self.status).unwrap_or_else(|| "Unknown".to_string()),
            failure_reason: non_empty(self.failure_reason),
            amount: self.amount.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawFleetLog {
    order_id: Option<i64>,
    driver_id: Option<i64>,
    #[serde(default)]
    vehicle_number: Option<String>,
    #[serde(default)]
    route_code: Option<String>,
    #[serde(default)]
    gps_delay_notes: Option<String>,
    #[serde(default)]
    departure_time: Option<String>,
    #[serde(default)]
    arrival_time: Option<String>,
}

impl RawFleetLog {
    fn into_typed(self) -> Option<FleetLog> {
        Some(FleetLog {
            order_id: self.order_id?,
            driver_id: self.driver_id,
            vehicle_number: non_empty(self.vehicle_number),
            route_code: non_empty(self.route_code),
            gps_delay_notes: non_empty(self.gps_delay_notes),
            departure_time: self.departure_time.as_deref().and_then(parse_datetime),
            arrival_time: self.arrival_time.as_deref().and_then(parse_datetime),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawWarehouseLog {
    order_id: Option<i64>,
    warehouse_id: Option<i64>,
    #[serde(default)]
    picking_start: Option<String>,
    #[serde(default)]
    picking_end: Option<String>,
    #[serde(default)]
    dispatch_time: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl RawWarehouseLog {
    fn into_typed(self) -> Option<WarehouseLog> {
        Some(WarehouseLog {
            order_id: self.order_id?,
            warehouse_id: self.warehouse_id,
            picking_start: self.picking_start.as_deref().and_then(parse_datetime),
            picking_end: self.picking_end.as_deref().and_then(parse_datetime),
            dispatch_time: self.dispatch_time.as_deref().and_then(parse_datetime),
            notes: non_empty(self.notes),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawExternalFactor {
    order_id: Option<i64>,
    #[serde(default)]
    traffic_condition: Option<String>,
    #[serde(default)]
    weather_condition: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
}

impl RawExternalFactor {
    fn into_typed(self) -> Option<ExternalFactor> {
        Some(ExternalFactor {
            order_id: self.order_id?,
            traffic_condition: non_empty(self.traffic_condition),
            weather_condition: non_empty(self.weather_condition),
            event_type: non_empty(self.event_type),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawFeedback {
    order_id: Option<i64>,
    #[serde(default)]
    feedback_text: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    rating: Option<f64>,
}

impl RawFeedback {
    fn into_typed(self) -> Option<Feedback> {
        Some(Feedback {
            order_id: self.order_id?,
            feedback_text: non_empty(self.feedback_text)?,
            sentiment: non_empty(self.sentiment),
            rating: self.rating,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawWarehouse {
    warehouse_id: Option<i64>,
    #[serde(default)]
    warehouse_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    capacity: Option<i64>,
    #[serde(default)]
    manager_name: Option<String>,
}

impl RawWarehouse {
    fn into_typed(self) -> Option<Warehouse> {
        Some(Warehouse {
            warehouse_id: self.warehouse_id?,
            warehouse_name: non_empty(self.warehouse_name)?,
            city: non_empty(self.city),
            capacity: self.capacity,
            manager_name: non_empty(self.manager_name),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawClient {
    client_id: Option<i64>,
    #[serde(default)]
    client_name: Option<String>,
    #[serde(default)]
    contact_person: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl RawClient {
    fn into_typed(self) -> Option<Client> {
        Some(Client {
            client_id: self.client_id?,
            client_name: non_empty(self.client_name)?,
            contact_person: non_empty(self.contact_person),
            city: non_empty(self.city),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawDriver {
    driver_id: Option<i64>,
    #[serde(default)]
    driver_name: Option<String>,
    #[serde(default)]
    partner_company: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl RawDriver {
    fn into_typed(self) -> Option<Driver> {
        Some(Driver {
            driver_id: self.driver_id?,
            driver_name: non_empty(self.driver_name)?,
            partner_company: non_empty(self.partner_company),
            city: non_empty(self.city),
            status: non_empty(self.status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("loader-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_orders_and_tolerate_missing_auxiliaries() {
        let dir = temp_dir();
        fs::write(
            dir.join("orders.csv"),
            "order_id,client_id,city,state,order_date,promised_delivery_date,actual_delivery_date,status,failure_reason,amount\n\
             1,10,Mumbai,MH,2025-08-04,2025-08-06,2025-08-08,Delivered,,1500.5\n\
             2,11,Delhi,DL,2025-08-05 10:30:00,2025-08-07,,Failed,Out of stock,900\n",
        )
        .unwrap();

        let tables = Loader::new(&dir).load().unwrap();
        assert_eq!(tables.orders.len(), 2);
        assert_eq!(
            tables.orders[0].actual_delivery_date,
            NaiveDate::from_ymd_opt(2025, 8, 8)
        );
        assert_eq!(
            tables.orders[1].order_date,
            NaiveDate::from_ymd_opt(2025, 8, 5).unwrap()
        );
        assert_eq!(
            tables.orders[1].failure_reason.as_deref(),
            Some("Out of stock")
        );
        assert!(tables.fleet_logs.is_empty());
        assert!(tables.clients.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_order_id_column_is_schema_error() {
        let dir = temp_dir();
        fs::write(
            dir.join("orders.csv"),
            "id,city,order_date,status,amount\n1,Mumbai,2025-08-04,Delivered,100\n",
        )
        .unwrap();

        let err = Loader::new(&dir).load().unwrap_err();
        assert!(matches!(err, AnalyzerError::Schema(_)));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bad_auxiliary_rows_are_skipped() {
        let dir = temp_dir();
        fs::write(
            dir.join("orders.csv"),
            "order_id,client_id,city,order_date,status,amount\n1,10,Mumbai,2025-08-04,Delivered,100\n",
        )
        .unwrap();
        fs::write(
            dir.join("warehouse_logs.csv"),
            "order_id,warehouse_id,picking_start,dispatch_time,notes\n\
             1,7,2025-08-04 08:00:00,2025-08-04 13:00:00,picking backlog\n\
             ,,,bad,row\n",
        )
        .unwrap();

        let tables = Loader::new(&dir).load().unwrap();
        assert_eq!(tables.warehouse_logs.len(), 1);
        assert_eq!(tables.warehouse_logs[0].warehouse_id, Some(7));

        fs::remove_dir_all(&dir).unwrap();
    }
}
