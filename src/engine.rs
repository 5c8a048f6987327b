//! Filter & aggregation over the integrated dataset.
//!
//! A record passes a `Filter` iff it satisfies every populated field
//! (conjunctive); matching is exact on normalized reference values.
//! `AnalysisResult` is a tagged variant over the four intents, each carrying
//! its own well-typed payload. Every per-query condition resolves to a
//! defined value: empty groups yield `None` averages and zero-valued results,
//! never an error.

use crate::integrator::DatasetSnapshot;
use crate::models::{day_name, normalize_value, IntegratedRecord, RootCause};
use crate::parser::{Filter, Intent};
use chrono::Weekday;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay above which a problem order counts as a critical case, in days.
    pub critical_delay_days: i64,
    /// Incremental order volume assumed when a predictive query states none.
    pub default_projection_volume: u64,
    /// How many rollup rows to keep for worst days / most affected cities.
    pub rollup_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_delay_days: 5,
            default_projection_volume: 10_000,
            rollup_limit: 5,
        }
    }
}

/// Per-root-cause aggregate row.
#[derive(Debug, Clone, Serialize)]
pub struct CauseStat {
    pub cause: RootCause,
    pub failure_count: usize,
    pub lost_revenue: f64,
    pub average_delay_days: Option<f64>,
    pub critical_cases: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayStat {
    pub day: String,
    pub failure_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityStat {
    pub city: String,
    pub failure_count: usize,
    pub lost_revenue: f64,
}

/// The `explain_causes` payload: ranked per-cause breakdown plus global
/// worst-day and most-affected-city rollups.
#[derive(Debug, Clone, Serialize)]
pub struct CauseAnalysis {
    pub total_orders: usize,
    pub affected_orders: usize,
    pub total_lost_revenue: f64,
    pub average_delay_days: Option<f64>,
    pub causes: Vec<CauseStat>,
    pub worst_days: Vec<DayStat>,
    pub affected_cities: Vec<CityStat>,
    /// Set when the filter matched zero records, so reporting can say
    /// "no matching orders" instead of rendering empty aggregates.
    pub no_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonPartition {
    pub key: String,
    pub total_orders: usize,
    pub failure_rate: Option<f64>,
    pub analysis: CauseAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonDelta {
    pub left: String,
    pub right: String,
    pub failure_rate_delta: Option<f64>,
    pub lost_revenue_delta: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonAnalysis {
    /// Dimension the filtered set was partitioned by: city, client or
    /// warehouse.
    pub dimension: String,
    pub partitions: Vec<ComparisonPartition>,
    pub deltas: Vec<ComparisonDelta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendBucket {
    pub label: String,
    pub orders: usize,
    pub failures: usize,
    pub lost_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    /// "daily" when the filter carries an explicit period, else
    /// "day_of_week" in canonical Monday..Sunday order.
    pub granularity: String,
    pub buckets: Vec<TrendBucket>,
    pub no_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectedCause {
    pub cause: RootCause,
    /// Share of baseline failures attributed to this cause, in [0,1].
    pub share: f64,
    pub expected_failures: f64,
}

/// Linear extrapolation of the baseline failure rate and cause mix onto an
/// incremental order volume. Not a fitted model, and flagged as such.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    pub baseline_orders: usize,
    pub baseline_failures: usize,
    pub failure_rate: Option<f64>,
    pub incremental_volume: u64,
    pub expected_failures: f64,
    pub by_cause: Vec<ProjectedCause>,
    pub is_projection: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Causes(CauseAnalysis),
    Comparison(ComparisonAnalysis),
    Trends(TrendAnalysis),
    Projection(Projection),
}

pub struct AnalysisEngine {
    config: EngineConfig,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Executes a structured query against an immutable snapshot. Always
    /// returns a fully-formed result for any filter/intent, including the
    /// empty ones.
    pub fn run(
        &self,
        snapshot: &DatasetSnapshot,
        filter: &Filter,
        intent: Intent,
        projection_volume: Option<u64>,
    ) -> AnalysisResult {
        let rows = self.apply_filter(&snapshot.records, filter);
        debug!(
            "Filter matched {} of {} records",
            rows.len(),
            snapshot.records.len()
        );

        match intent {
            Intent::ExplainCauses => AnalysisResult::Causes(self.explain_causes(&rows)),
            Intent::Compare => AnalysisResult::Comparison(self.compare(&rows, filter)),
            Intent::AnalyzeTrends => AnalysisResult::Trends(self.trends(&rows, filter)),
            Intent::Predict => AnalysisResult::Projection(self.predict(
                &rows,
                projection_volume.unwrap_or(self.config.default_projection_volume),
            )),
        }
    }

    /// Conjunctive filtering; an empty filter passes every record.
    pub fn apply_filter<'a>(
        &self,
        records: &'a [IntegratedRecord],
        filter: &Filter,
    ) -> Vec<&'a IntegratedRecord> {
        records
            .iter()
            .filter(|r| matches_filter(r, filter))
            .collect()
    }

    fn explain_causes(&self, rows: &[&IntegratedRecord]) -> CauseAnalysis {
        let problems: Vec<&IntegratedRecord> =
            rows.iter().copied().filter(|r| r.root_cause.is_some()).collect();

        let mut by_cause: HashMap<RootCause, Vec<&IntegratedRecord>> = HashMap::new();
        for &record in &problems {
            if let Some(cause) = record.root_cause {
                by_cause.entry(cause).or_default().push(record);
            }
        }

        let causes: Vec<CauseStat> = by_cause
            .into_iter()
            .map(|(cause, group)| CauseStat {
                cause,
                failure_count: group.len(),
                lost_revenue: group.iter().map(|r| r.amount).sum(),
                average_delay_days: mean_delay(&group),
                critical_cases: group
                    .iter()
                    .filter(|r| r.delay_days.unwrap_or(0) > self.config.critical_delay_days)
                    .count(),
            })
            .sorted_by(|a, b| {
                b.failure_count
                    .cmp(&a.failure_count)
                    .then(b.lost_revenue.total_cmp(&a.lost_revenue))
                    .then(a.cause.cmp(&b.cause))
            })
            .collect();

        let worst_days: Vec<DayStat> = problems
            .iter()
            .map(|r| day_name(r.day_of_week))
            .counts()
            .into_iter()
            .map(|(day, failure_count)| DayStat {
                day: day.to_string(),
                failure_count,
            })
            .sorted_by(|a, b| b.failure_count.cmp(&a.failure_count).then(a.day.cmp(&b.day)))
            .take(self.config.rollup_limit)
            .collect();

        let mut by_city: HashMap<String, (usize, f64)> = HashMap::new();
        for record in &problems {
            let entry = by_city.entry(normalize_value(&record.city)).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += record.amount;
        }
        let affected_cities: Vec<CityStat> = by_city
            .into_iter()
            .map(|(city, (failure_count, lost_revenue))| CityStat {
                city,
                failure_count,
                lost_revenue,
            })
            .sorted_by(|a, b| {
                b.failure_count
                    .cmp(&a.failure_count)
                    .then(b.lost_revenue.total_cmp(&a.lost_revenue))
                    .then(a.city.cmp(&b.city))
            })
            .take(self.config.rollup_limit)
            .collect();

        CauseAnalysis {
            total_orders: rows.len(),
            affected_orders: problems.len(),
            total_lost_revenue: problems.iter().map(|r| r.amount).sum(),
            average_delay_days: mean_delay(&problems),
            causes,
            worst_days,
            affected_cities,
            no_data: rows.is_empty(),
        }
    }

    /// Partitions the filtered set by the compared dimension and runs the
    /// cause aggregation independently per partition, plus pairwise deltas.
    fn compare(&self, rows: &[&IntegratedRecord], filter: &Filter) -> ComparisonAnalysis {
        let (dimension, keys) = comparison_dimension(rows, filter);

        let partitions: Vec<ComparisonPartition> = keys
            .iter()
            .map(|key| {
                let subset: Vec<&IntegratedRecord> = rows
                    .iter()
                    .copied()
                    .filter(|r| partition_key(r, &dimension).as_deref() == Some(key.as_str()))
                    .collect();
                let analysis = self.explain_causes(&subset);
                let failure_rate = if subset.is_empty() {
                    None
                } else {
                    Some(analysis.affected_orders as f64 / subset.len() as f64)
                };
                ComparisonPartition {
                    key: key.clone(),
                    total_orders: subset.len(),
                    failure_rate,
                    analysis,
                }
            })
            .collect();

        let mut deltas = Vec::new();
        for (i, left) in partitions.iter().enumerate() {
            for right in partitions.iter().skip(i + 1) {
                let failure_rate_delta = match (left.failure_rate, right.failure_rate) {
                    (Some(a), Some(b)) => Some(a - b),
                    _ => None,
                };
                deltas.push(ComparisonDelta {
                    left: left.key.clone(),
                    right: right.key.clone(),
                    failure_rate_delta,
                    lost_revenue_delta: left.analysis.total_lost_revenue
                        - right.analysis.total_lost_revenue,
                });
            }
        }

        ComparisonAnalysis {
            dimension,
            partitions,
            deltas,
        }
    }

    fn trends(&self, rows: &[&IntegratedRecord], filter: &Filter) -> TrendAnalysis {
        let explicit_period = filter.date_from.is_some() || filter.date_to.is_some();

        let buckets = if explicit_period {
            rows.iter()
                .map(|r| r.order_date)
                .unique()
                .sorted()
                .map(|date| {
                    let day_rows: Vec<&&IntegratedRecord> =
                        rows.iter().filter(|r| r.order_date == date).collect();
                    bucket(date.to_string(), &day_rows)
                })
                .collect()
        } else {
            const WEEK: [Weekday; 7] = [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ];
            WEEK.iter()
                .map(|day| {
                    let day_rows: Vec<&&IntegratedRecord> =
                        rows.iter().filter(|r| r.day_of_week == *day).collect();
                    bucket(day_name(*day).to_string(), &day_rows)
                })
                .collect()
        };

        TrendAnalysis {
            granularity: if explicit_period {
                "daily".to_string()
            } else {
                "day_of_week".to_string()
            },
            buckets,
            no_data: rows.is_empty(),
        }
    }

    fn predict(&self, rows: &[&IntegratedRecord], incremental_volume: u64) -> Projection {
        let baseline_orders = rows.len();
        let failures: Vec<&IntegratedRecord> =
            rows.iter().copied().filter(|r| r.root_cause.is_some()).collect();
        let baseline_failures = failures.len();

        let failure_rate = if baseline_orders == 0 {
            None
        } else {
            Some(baseline_failures as f64 / baseline_orders as f64)
        };
        let expected_failures = failure_rate.unwrap_or(0.0) * incremental_volume as f64;

        let by_cause: Vec<ProjectedCause> = failures
            .iter()
            .filter_map(|r| r.root_cause)
            .counts()
            .into_iter()
            .map(|(cause, count)| {
                let share = count as f64 / baseline_failures as f64;
                ProjectedCause {
                    cause,
                    share,
                    expected_failures: expected_failures * share,
                }
            })
            .sorted_by(|a, b| b.share.total_cmp(&a.share).then(a.cause.cmp(&b.cause)))
            .collect();

        Projection {
            baseline_orders,
            baseline_failures,
            failure_rate,
            incremental_volume,
            expected_failures,
            by_cause,
            is_projection: true,
        }
    }
}

fn matches_filter(record: &IntegratedRecord, filter: &Filter) -> bool {
    if !filter.cities.is_empty() && !filter.cities.contains(&normalize_value(&record.city)) {
        return false;
    }
    if !filter.clients.is_empty() {
        let matched = record
            .client_name
            .as_deref()
            .map(|name| filter.clients.contains(&normalize_value(name)))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if !filter.warehouses.is_empty() {
        let matched = record
            .warehouse_name
            .as_deref()
            .map(|name| filter.warehouses.contains(&normalize_value(name)))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if !filter.drivers.is_empty() {
        let matched = record
            .driver_name
            .as_deref()
            .map(|name| filter.drivers.contains(&normalize_value(name)))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if let Some(from) = filter.date_from {
        if record.order_date < from {
            return false;
        }
    }
    if let Some(to) = filter.date_to {
        if record.order_date > to {
            return false;
        }
    }
    true
}

/// Picks the comparison dimension: the filter field naming two or more
/// values wins, otherwise the filtered set is partitioned by city.
fn comparison_dimension(rows: &[&IntegratedRecord], filter: &Filter) -> (String, Vec<String>) {
    if filter.cities.len() >= 2 {
        return ("city".to_string(), filter.cities.clone());
    }
    if filter.clients.len() >= 2 {
        return ("client".to_string(), filter.clients.clone());
    }
    if filter.warehouses.len() >= 2 {
        return ("warehouse".to_string(), filter.warehouses.clone());
    }
    let cities: Vec<String> = rows
        .iter()
        .map(|r| normalize_value(&r.city))
        .unique()
        .sorted()
        .collect();
    ("city".to_string(), cities)
}

fn partition_key(record: &IntegratedRecord, dimension: &str) -> Option<String> {
    match dimension {
        "city" => Some(normalize_value(&record.city)),
        "client" => record.client_name.as_deref().map(normalize_value),
        "warehouse" => record.warehouse_name.as_deref().map(normalize_value),
        _ => None,
    }
}

fn bucket(label: String, rows: &[&&IntegratedRecord]) -> TrendBucket {
    let failures: Vec<&&&IntegratedRecord> =
        rows.iter().filter(|r| r.root_cause.is_some()).collect();
    TrendBucket {
        label,
        orders: rows.len(),
        failures: failures.len(),
        lost_revenue: failures.iter().map(|r| r.amount).sum(),
    }
}

fn mean_delay(rows: &[&IntegratedRecord]) -> Option<f64> {
    let delays: Vec<i64> = rows.iter().filter_map(|r| r.delay_days).collect();
    if delays.is_empty() {
        None
    } else {
        Some(delays.iter().sum::<i64>() as f64 / delays.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::integrator::{Integrator, SourceTables};
    use crate::models::Order;
    use chrono::NaiveDate;

    fn order(id: i64, city: &str, status: &str, delay: i64, amount: f64) -> Order {
        let promised = NaiveDate::from_ymd_opt(2025, 8, 6).unwrap();
        Order {
            order_id: id,
            client_id: 1,
            city: city.to_string(),
            state: None,
            order_date: NaiveDate::from_ymd_opt(2025, 8, 4).unwrap(),
            promised_delivery_date: Some(promised),
            actual_delivery_date: Some(promised + chrono::Duration::days(delay)),
            status: status.to_string(),
            failure_reason: None,
            amount,
        }
    }

    fn snapshot(orders: Vec<Order>) -> DatasetSnapshot {
        Integrator::new(Classifier::default())
            .build(&SourceTables {
                orders,
                ..Default::default()
            })
            .unwrap()
    }

    fn city_filter(cities: &[&str]) -> Filter {
        Filter {
            cities: cities.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_filter_passes_all_records() {
        let snap = snapshot(vec![
            order(1, "Mumbai", "Delivered", 0, 100.0),
            order(2, "Delhi", "Delivered", 0, 100.0),
        ]);
        let engine = AnalysisEngine::default();
        assert_eq!(
            engine.apply_filter(&snap.records, &Filter::default()).len(),
            2
        );
    }

    #[test]
    fn test_city_match_is_exact_not_substring() {
        let snap = snapshot(vec![order(1, "Navi Mumbai", "Delivered", 0, 100.0)]);
        let engine = AnalysisEngine::default();
        assert!(engine
            .apply_filter(&snap.records, &city_filter(&["mumbai"]))
            .is_empty());
        assert_eq!(
            engine
                .apply_filter(&snap.records, &city_filter(&["navi mumbai"]))
                .len(),
            1
        );
    }

    #[test]
    fn test_cause_counts_sum_to_affected_total() {
        let snap = snapshot(vec![
            order(1, "Mumbai", "Cancelled", 0, 500.0),
            order(2, "Mumbai", "Delivered", 3, 300.0),
            order(3, "Mumbai", "Delivered", 0, 200.0),
            order(4, "Delhi", "Returned", 0, 400.0),
        ]);
        let engine = AnalysisEngine::default();
        let result = engine.run(&snap, &Filter::default(), Intent::ExplainCauses, None);
        let AnalysisResult::Causes(analysis) = result else {
            panic!("expected cause analysis");
        };
        let summed: usize = analysis.causes.iter().map(|c| c.failure_count).sum();
        assert_eq!(summed, analysis.affected_orders);
        assert_eq!(analysis.affected_orders, 3);
        assert_eq!(analysis.total_orders, 4);
    }

    #[test]
    fn test_causes_sorted_by_count_then_revenue() {
        let mut stock_a = order(1, "Mumbai", "Failed", 0, 100.0);
        stock_a.failure_reason = Some("Out of stock".to_string());
        let mut stock_b = order(2, "Mumbai", "Failed", 0, 100.0);
        stock_b.failure_reason = Some("Out of stock".to_string());
        let mut address = order(3, "Mumbai", "Failed", 0, 100.0);
        address.failure_reason = Some("Wrong address".to_string());
        let mut weather = order(4, "Mumbai", "Failed", 0, 900.0);
        weather.failure_reason = Some("Weather disruption".to_string());

        let snap = snapshot(vec![stock_a, stock_b, address, weather]);
        let engine = AnalysisEngine::default();
        let AnalysisResult::Causes(analysis) =
            engine.run(&snap, &Filter::default(), Intent::ExplainCauses, None)
        else {
            panic!("expected cause analysis");
        };

        assert_eq!(analysis.causes[0].cause, RootCause::StockUnavailability);
        // Tie on count between address and weather resolves by revenue.
        assert_eq!(analysis.causes[1].cause, RootCause::WeatherDisruption);
        assert_eq!(analysis.causes[2].cause, RootCause::AddressIssues);
    }

    #[test]
    fn test_filter_conjunctivity() {
        let snap = snapshot(vec![
            order(1, "Mumbai", "Cancelled", 0, 100.0),
            order(2, "Mumbai", "Delivered", 4, 100.0),
            order(3, "Delhi", "Cancelled", 0, 100.0),
        ]);
        let engine = AnalysisEngine::default();

        let f1 = city_filter(&["mumbai"]);
        let f2 = Filter {
            date_from: NaiveDate::from_ymd_opt(2025, 8, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 8, 31),
            ..Default::default()
        };
        let combined = Filter {
            cities: f1.cities.clone(),
            date_from: f2.date_from,
            date_to: f2.date_to,
            ..Default::default()
        };

        let sequential: Vec<i64> = {
            let first: Vec<IntegratedRecord> = engine
                .apply_filter(&snap.records, &f1)
                .into_iter()
                .cloned()
                .collect();
            engine
                .apply_filter(&first, &f2)
                .iter()
                .map(|r| r.order_id)
                .collect()
        };
        let direct: Vec<i64> = engine
            .apply_filter(&snap.records, &combined)
            .iter()
            .map(|r| r.order_id)
            .collect();
        assert_eq!(sequential, direct);
    }

    #[test]
    fn test_empty_dataset_yields_zero_valued_result() {
        let snap = snapshot(vec![]);
        let engine = AnalysisEngine::default();
        let AnalysisResult::Causes(analysis) =
            engine.run(&snap, &Filter::default(), Intent::ExplainCauses, None)
        else {
            panic!("expected cause analysis");
        };
        assert!(analysis.no_data);
        assert_eq!(analysis.total_orders, 0);
        assert_eq!(analysis.affected_orders, 0);
        assert_eq!(analysis.total_lost_revenue, 0.0);
        assert_eq!(analysis.average_delay_days, None);
        assert!(analysis.causes.is_empty());
    }

    #[test]
    fn test_compare_with_empty_partitions() {
        let snap = snapshot(vec![order(1, "Pune", "Delivered", 0, 100.0)]);
        let engine = AnalysisEngine::default();
        let filter = Filter {
            cities: vec!["mumbai".to_string(), "delhi".to_string()],
            ..Default::default()
        };
        let AnalysisResult::Comparison(cmp) =
            engine.run(&snap, &filter, Intent::Compare, None)
        else {
            panic!("expected comparison");
        };
        assert_eq!(cmp.partitions.len(), 2);
        for partition in &cmp.partitions {
            assert_eq!(partition.total_orders, 0);
            assert_eq!(partition.failure_rate, None);
            assert!(partition.analysis.no_data);
        }
        assert_eq!(cmp.deltas.len(), 1);
        assert_eq!(cmp.deltas[0].failure_rate_delta, None);
    }

    #[test]
    fn test_trends_day_of_week_covers_whole_week() {
        let snap = snapshot(vec![order(1, "Mumbai", "Cancelled", 0, 100.0)]);
        let engine = AnalysisEngine::default();
        let AnalysisResult::Trends(trends) =
            engine.run(&snap, &Filter::default(), Intent::AnalyzeTrends, None)
        else {
            panic!("expected trends");
        };
        assert_eq!(trends.granularity, "day_of_week");
        assert_eq!(trends.buckets.len(), 7);
        assert_eq!(trends.buckets[0].label, "Monday");
        // 2025-08-04 is a Monday.
        assert_eq!(trends.buckets[0].failures, 1);
    }

    #[test]
    fn test_trends_daily_when_period_given() {
        let snap = snapshot(vec![order(1, "Mumbai", "Cancelled", 0, 100.0)]);
        let engine = AnalysisEngine::default();
        let filter = Filter {
            date_from: NaiveDate::from_ymd_opt(2025, 8, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 8, 31),
            ..Default::default()
        };
        let AnalysisResult::Trends(trends) =
            engine.run(&snap, &filter, Intent::AnalyzeTrends, None)
        else {
            panic!("expected trends");
        };
        assert_eq!(trends.granularity, "daily");
        assert_eq!(trends.buckets.len(), 1);
        assert_eq!(trends.buckets[0].label, "2025-08-04");
    }

    #[test]
    fn test_projection_is_linear_and_flagged() {
        // 100 orders, 12 failures, 5 of them stock-outs.
        let mut orders = Vec::new();
        for i in 0..88 {
            orders.push(order(i, "Mumbai", "Delivered", 0, 100.0));
        }
        for i in 88..93 {
            let mut o = order(i, "Mumbai", "Failed", 0, 100.0);
            o.failure_reason = Some("Out of stock".to_string());
            orders.push(o);
        }
        for i in 93..100 {
            orders.push(order(i, "Mumbai", "Cancelled", 0, 100.0));
        }
        let snap = snapshot(orders);
        let engine = AnalysisEngine::default();
        let AnalysisResult::Projection(projection) =
            engine.run(&snap, &Filter::default(), Intent::Predict, Some(20_000))
        else {
            panic!("expected projection");
        };

        assert!(projection.is_projection);
        assert_eq!(projection.baseline_orders, 100);
        assert_eq!(projection.baseline_failures, 12);
        assert_eq!(projection.expected_failures, 2400.0);
        let stock = projection
            .by_cause
            .iter()
            .find(|c| c.cause == RootCause::StockUnavailability)
            .unwrap();
        assert!((stock.expected_failures - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_on_empty_baseline() {
        let snap = snapshot(vec![]);
        let engine = AnalysisEngine::default();
        let AnalysisResult::Projection(projection) =
            engine.run(&snap, &Filter::default(), Intent::Predict, Some(1_000))
        else {
            panic!("expected projection");
        };
        assert_eq!(projection.failure_rate, None);
        assert_eq!(projection.expected_failures, 0.0);
        assert!(projection.by_cause.is_empty());
    }
}
