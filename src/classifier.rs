//! Deterministic root-cause classification.
//!
//! Each delayed or failed order is assigned exactly one `RootCause` by an
//! ordered list of (category, predicate) rules. The first matching rule wins,
//! so overlapping signals (heavy traffic on top of a stock-out, say) always
//! resolve to the category closest to the operational root. Trigger phrases
//! live in vocabulary tables, not in control flow, so the policy can be tuned
//! without touching the rule walk.

use crate::models::{IntegratedRecord, RootCause};
use chrono::Duration;

/// Out-of-stock phrasing seen in `failure_reason` and warehouse notes.
const STOCK_PHRASES: &[&str] = &[
    "out of stock",
    "stock unavailable",
    "stockout",
    "stock shortage",
    "inventory shortage",
    "item unavailable",
];

/// Address/location ambiguity phrasing in `failure_reason` and GPS notes.
const ADDRESS_PHRASES: &[&str] = &[
    "address",
    "unable to locate",
    "location not found",
    "wrong pincode",
    "landmark",
];

/// Operational-delay phrasing in warehouse notes and `failure_reason`.
const WAREHOUSE_PHRASES: &[&str] = &[
    "picking backlog",
    "picking delay",
    "dispatch delay",
    "dispatch delayed",
    "warehouse delay",
    "staff shortage",
    "backlog",
];

/// Breakdown/maintenance phrasing in GPS notes and `failure_reason`.
const VEHICLE_PHRASES: &[&str] = &[
    "breakdown",
    "vehicle",
    "maintenance",
    "flat tyre",
    "engine",
];

/// `traffic_condition` values treated as congested.
const HEAVY_TRAFFIC_PHRASES: &[&str] = &["heavy", "severe", "congest", "jam", "gridlock"];
const TRAFFIC_REASON_PHRASES: &[&str] = &["traffic", "congestion"];

/// `weather_condition` values treated as disruptive.
const BAD_WEATHER_PHRASES: &[&str] = &[
    "rain", "storm", "fog", "snow", "cyclone", "hail", "thunder",
];
const WEATHER_REASON_PHRASES: &[&str] = &["weather", "rain", "storm", "fog"];

/// Customer refusal/return phrasing.
const RETURN_PHRASES: &[&str] = &["refused", "rejected", "return", "did not accept"];

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Picking-start to dispatch duration above which the warehouse itself is
    /// considered the delay, in hours.
    pub dispatch_threshold_hours: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dispatch_threshold_hours: 4,
        }
    }
}

type Predicate = fn(&IntegratedRecord, &ClassifierConfig) -> bool;

struct Rule {
    cause: RootCause,
    predicate: Predicate,
}

/// Assigns a `RootCause` to problem records; pure function of record state.
pub struct Classifier {
    config: ClassifierConfig,
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            rules: priority_rules(),
        }
    }

    /// Returns `None` for on-time successful orders; every delayed or failed
    /// order receives a category, `ProcessingDelays` being the guaranteed
    /// fallback.
    pub fn classify(&self, record: &IntegratedRecord) -> Option<RootCause> {
        if !record.is_problem() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(record, &self.config))
            .map(|rule| rule.cause)
    }
}

/// The classification policy, in priority order. Signals closer to the
/// operational root are asserted before environmental signals, which are
/// frequently present but non-causal.
fn priority_rules() -> Vec<Rule> {
    vec![
        Rule {
            cause: RootCause::StockUnavailability,
            predicate: |r, _| {
                contains_any(r.failure_reason.as_deref(), STOCK_PHRASES)
                    || contains_any(r.warehouse_notes.as_deref(), STOCK_PHRASES)
            },
        },
        Rule {
            cause: RootCause::AddressIssues,
            predicate: |r, _| {
                contains_any(r.failure_reason.as_deref(), ADDRESS_PHRASES)
                    || contains_any(r.gps_delay_notes.as_deref(), ADDRESS_PHRASES)
            },
        },
        Rule {
            cause: RootCause::WarehouseOperations,
            predicate: |r, config| {
                dispatch_exceeds_threshold(r, config)
                    || contains_any(r.warehouse_notes.as_deref(), WAREHOUSE_PHRASES)
                    || contains_any(r.failure_reason.as_deref(), WAREHOUSE_PHRASES)
            },
        },
        Rule {
            cause: RootCause::VehicleIssues,
            predicate: |r, _| {
                contains_any(r.gps_delay_notes.as_deref(), VEHICLE_PHRASES)
                    || contains_any(r.failure_reason.as_deref(), VEHICLE_PHRASES)
            },
        },
        Rule {
            cause: RootCause::TrafficCongestion,
            predicate: |r, _| {
                contains_any(r.traffic_condition.as_deref(), HEAVY_TRAFFIC_PHRASES)
                    || contains_any(r.failure_reason.as_deref(), TRAFFIC_REASON_PHRASES)
            },
        },
        Rule {
            cause: RootCause::WeatherDisruption,
            predicate: |r, _| {
                contains_any(r.weather_condition.as_deref(), BAD_WEATHER_PHRASES)
                    || contains_any(r.failure_reason.as_deref(), WEATHER_REASON_PHRASES)
            },
        },
        Rule {
            cause: RootCause::CustomerReturns,
            predicate: |r, _| {
                r.status.trim().eq_ignore_ascii_case("returned")
                    || contains_any(r.failure_reason.as_deref(), RETURN_PHRASES)
            },
        },
        // Catch-all: a qualifying record is never left unclassified.
        Rule {
            cause: RootCause::ProcessingDelays,
            predicate: |_, _| true,
        },
    ]
}

fn dispatch_exceeds_threshold(record: &IntegratedRecord, config: &ClassifierConfig) -> bool {
    match (record.picking_start, record.dispatch_time) {
        (Some(start), Some(dispatch)) => {
            dispatch - start > Duration::hours(config.dispatch_threshold_hours)
        }
        _ => false,
    }
}

fn contains_any(text: Option<&str>, phrases: &[&str]) -> bool {
    match text {
        Some(t) => {
            let lowered = t.to_lowercase();
            phrases.iter().any(|p| lowered.contains(p))
        }
        None => false,
    }
}
