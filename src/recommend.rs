//! Rule-based recommendation mapping.
//!
//! Each dominant root cause maps to a canned, parameter-filled advice string.
//! Deterministic by construction: an external collaborator may attach richer
//! narrative text to the same result, but this mapping stays fully computable
//! without one.

use crate::engine::{AnalysisResult, CauseAnalysis};
use crate::models::RootCause;

/// How many top causes receive a recommendation line.
const TOP_CAUSES: usize = 3;

/// Maps an analysis result to an ordered list of corrective actions.
/// Returns an empty list iff the result contains zero problem records, to
/// signal that no corrective action is needed.
pub fn recommend(result: &AnalysisResult) -> Vec<String> {
    match result {
        AnalysisResult::Causes(analysis) => recommend_for_causes(analysis),
        AnalysisResult::Comparison(cmp) => {
            // Advise on the worst-performing partition.
            let worst = cmp
                .partitions
                .iter()
                .filter(|p| p.analysis.affected_orders > 0)
                .max_by(|a, b| {
                    a.failure_rate
                        .unwrap_or(0.0)
                        .total_cmp(&b.failure_rate.unwrap_or(0.0))
                });
            match worst {
                Some(partition) => {
                    let mut lines = vec![format!(
                        "Prioritize operational improvements in {}: highest failure rate among compared groups",
                        partition.key
                    )];
                    lines.extend(recommend_for_causes(&partition.analysis));
                    lines
                }
                None => Vec::new(),
            }
        }
        AnalysisResult::Trends(trends) => {
            if trends.no_data {
                return Vec::new();
            }
            let worst = trends
                .buckets
                .iter()
                .max_by_key(|b| b.failures)
                .filter(|b| b.failures > 0);
            match worst {
                Some(bucket) => vec![format!(
                    "Focus additional resources on {} to handle higher failure rates",
                    bucket.label
                )],
                None => Vec::new(),
            }
        }
        AnalysisResult::Projection(projection) => {
            if projection.baseline_failures == 0 {
                return Vec::new();
            }
            let mut lines = vec![format!(
                "Plan capacity for roughly {:.0} additional failures at current performance before onboarding {} more orders",
                projection.expected_failures, projection.incremental_volume
            )];
            if let Some(dominant) = projection.by_cause.first() {
                lines.push(cause_advice(dominant.cause, "all regions"));
            }
            lines
        }
    }
}

fn recommend_for_causes(analysis: &CauseAnalysis) -> Vec<String> {
    if analysis.affected_orders == 0 {
        return Vec::new();
    }

    let region = analysis
        .affected_cities
        .first()
        .map(|c| c.city.as_str())
        .unwrap_or("all regions");

    let mut lines: Vec<String> = analysis
        .causes
        .iter()
        .take(TOP_CAUSES)
        .map(|stat| cause_advice(stat.cause, region))
        .collect();

    if let Some(worst) = analysis.worst_days.first() {
        lines.push(format!(
            "Focus additional resources on {}s to handle higher failure rates",
            worst.day
        ));
    }

    lines
}

fn cause_advice(cause: RootCause, region: &str) -> String {
    match cause {
        RootCause::StockUnavailability => format!(
            "Improve demand forecasting and inventory planning for {region}, with automatic replenishment alerts"
        ),
        RootCause::AddressIssues => format!(
            "Implement address verification at order placement for {region} and a correction flow for drivers"
        ),
        RootCause::WarehouseOperations => format!(
            "Review picking and dispatch processes in {region}; add staffing during peak periods"
        ),
        RootCause::VehicleIssues => format!(
            "Tighten preventive vehicle maintenance schedules for the {region} fleet"
        ),
        RootCause::TrafficCongestion => format!(
            "Optimize delivery routes in {region} to avoid peak traffic hours; adjust routes in real time"
        ),
        RootCause::WeatherDisruption => format!(
            "Develop weather contingency plans for {region} and proactive customer communication during disruptions"
        ),
        RootCause::CustomerReturns => format!(
            "Improve order confirmation and delivery-slot communication with customers in {region}"
        ),
        RootCause::ProcessingDelays => format!(
            "Audit end-to-end order processing SLAs in {region} to locate unattributed delays"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CauseStat, CityStat, DayStat, Projection};

    fn causes_result(affected: usize) -> AnalysisResult {
        AnalysisResult::Causes(CauseAnalysis {
            total_orders: affected + 2,
            affected_orders: affected,
            total_lost_revenue: 1000.0,
            average_delay_days: Some(2.0),
            causes: if affected > 0 {
                vec![CauseStat {
                    cause: RootCause::StockUnavailability,
                    failure_count: affected,
                    lost_revenue: 1000.0,
                    average_delay_days: None,
                    critical_cases: 0,
                }]
            } else {
                Vec::new()
            },
            worst_days: if affected > 0 {
                vec![DayStat {
                    day: "Monday".to_string(),
                    failure_count: affected,
                }]
            } else {
                Vec::new()
            },
            affected_cities: if affected > 0 {
                vec![CityStat {
                    city: "mumbai".to_string(),
                    failure_count: affected,
                    lost_revenue: 1000.0,
                }]
            } else {
                Vec::new()
            },
            no_data: false,
        })
    }

    #[test]
    fn test_non_empty_for_any_problem_records() {
        let lines = recommend(&causes_result(3));
        assert!(!lines.is_empty());
        assert!(lines[0].contains("mumbai"));
        assert!(lines.iter().any(|l| l.contains("Monday")));
    }

    #[test]
    fn test_empty_when_no_problem_records() {
        assert!(recommend(&causes_result(0)).is_empty());
    }

    #[test]
    fn test_projection_names_dominant_cause() {
        let result = AnalysisResult::Projection(Projection {
            baseline_orders: 100,
            baseline_failures: 12,
            failure_rate: Some(0.12),
            incremental_volume: 20_000,
            expected_failures: 2400.0,
            by_cause: vec![crate::engine::ProjectedCause {
                cause: RootCause::TrafficCongestion,
                share: 0.5,
                expected_failures: 1200.0,
            }],
            is_projection: true,
        });
        let lines = recommend(&result);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("2400"));
        assert!(lines[1].contains("routes"));
    }
}
