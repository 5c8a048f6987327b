//! Query orchestration: parse, filter, aggregate, recommend, audit.
//!
//! `RootCauseAnalyzer` wires the rule-based core to its optional
//! collaborators. The LLM interpretation is preferred when a client is
//! configured; any failure there falls back to the rule-based parser, so a
//! query always produces a response.

use crate::audit::AuditLog;
use crate::engine::{AnalysisEngine, AnalysisResult};
use crate::integrator::{DatasetHandle, DatasetSnapshot};
use crate::llm::LlmClient;
use crate::parser::{Filter, Intent, ParsedQuery, QueryParser};
use crate::recommend::recommend;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Everything produced for one query, handed to presentation and audit.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub filter: Filter,
    pub intent: Intent,
    pub confidence: f64,
    /// True when the filter/intent came from the AI collaborator rather than
    /// the rule-based parser.
    pub ai_enhanced: bool,
    pub result: AnalysisResult,
    pub recommendations: Vec<String>,
    pub narrative: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct RootCauseAnalyzer {
    handle: DatasetHandle,
    engine: AnalysisEngine,
    llm: Option<LlmClient>,
    audit: Option<AuditLog>,
}

impl RootCauseAnalyzer {
    pub fn new(snapshot: DatasetSnapshot, engine: AnalysisEngine) -> Self {
        Self {
            handle: DatasetHandle::new(snapshot),
            engine,
            llm: None,
            audit: None,
        }
    }

    pub fn with_llm(mut self, llm: LlmClient) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Replaces the dataset atomically; in-flight queries keep reading the
    /// snapshot they started with.
    pub fn reload(&self, snapshot: DatasetSnapshot) {
        self.handle.swap(snapshot);
    }

    pub async fn process_query(&self, query: &str) -> QueryResponse {
        let snapshot = self.handle.snapshot();
        let today = Local::now().date_naive();

        let (parsed, ai_enhanced) = match &self.llm {
            Some(llm) => match llm.interpret_query(query, &snapshot.entities).await {
                Ok(parsed) => (parsed, true),
                Err(e) => {
                    warn!("AI interpretation failed, using rule-based parser: {}", e);
                    (self.rule_based_parse(&snapshot, query, today), false)
                }
            },
            None => (self.rule_based_parse(&snapshot, query, today), false),
        };
        let ParsedQuery {
            filter,
            intent,
            confidence,
            projection_volume,
        } = parsed;
        info!(
            "Query resolved: intent={:?} confidence={:.2} ai_enhanced={}",
            intent, confidence, ai_enhanced
        );

        let result = self.engine.run(&snapshot, &filter, intent, projection_volume);
        let recommendations = recommend(&result);

        let narrative = match &self.llm {
            Some(llm) => {
                let result_json = serde_json::to_string(&result).unwrap_or_default();
                match llm.narrative_summary(query, &result_json).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("Narrative generation failed: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let response = QueryResponse {
            query: query.to_string(),
            filter,
            intent,
            confidence,
            ai_enhanced,
            result,
            recommendations,
            narrative,
            timestamp: Utc::now(),
        };

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record(&response) {
                warn!("Audit write failed: {}", e);
            }
        }

        response
    }

    fn rule_based_parse(
        &self,
        snapshot: &DatasetSnapshot,
        query: &str,
        today: chrono::NaiveDate,
    ) -> ParsedQuery {
        QueryParser::new(snapshot.entities.clone()).parse(query, today)
    }
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Query: {}", self.query)?;
        writeln!(
            f,
            "Intent: {:?} (confidence {:.0}%{})",
            self.intent,
            self.confidence * 100.0,
            if self.ai_enhanced { ", AI-enhanced" } else { "" }
        )?;
        if !self.filter.cities.is_empty() {
            writeln!(f, "Cities: {}", self.filter.cities.join(", "))?;
        }
        if !self.filter.clients.is_empty() {
            writeln!(f, "Clients: {}", self.filter.clients.join(", "))?;
        }
        if !self.filter.warehouses.is_empty() {
            writeln!(f, "Warehouses: {}", self.filter.warehouses.join(", "))?;
        }
        if let (Some(from), Some(to)) = (self.filter.date_from, self.filter.date_to) {
            writeln!(f, "Period: {} to {}", from, to)?;
        }
        writeln!(f)?;

        match &self.result {
            AnalysisResult::Causes(analysis) => {
                if analysis.no_data {
                    writeln!(f, "No matching orders found.")?;
                } else {
                    writeln!(
                        f,
                        "Affected orders: {} of {} (lost revenue {:.2})",
                        analysis.affected_orders, analysis.total_orders, analysis.total_lost_revenue
                    )?;
                    if let Some(avg) = analysis.average_delay_days {
                        writeln!(f, "Average delay: {:.1} days", avg)?;
                    }
                    for stat in &analysis.causes {
                        writeln!(
                            f,
                            "  {}: {} failures, {:.2} lost revenue",
                            stat.cause, stat.failure_count, stat.lost_revenue
                        )?;
                    }
                }
            }
            AnalysisResult::Comparison(cmp) => {
                writeln!(f, "Comparison by {}:", cmp.dimension)?;
                for partition in &cmp.partitions {
                    match partition.failure_rate {
                        Some(rate) => writeln!(
                            f,
                            "  {}: {} orders, {:.1}% failure rate",
                            partition.key,
                            partition.total_orders,
                            rate * 100.0
                        )?,
                        None => writeln!(f, "  {}: no matching orders", partition.key)?,
                    }
                }
            }
            AnalysisResult::Trends(trends) => {
                if trends.no_data {
                    writeln!(f, "No matching orders found.")?;
                } else {
                    writeln!(f, "Trend ({}):", trends.granularity)?;
                    for bucket in &trends.buckets {
                        writeln!(
                            f,
                            "  {}: {} orders, {} failures",
                            bucket.label, bucket.orders, bucket.failures
                        )?;
                    }
                }
            }
            AnalysisResult::Projection(projection) => {
                writeln!(
                    f,
                    "Projection: {:.0} expected failures on {} additional orders",
                    projection.expected_failures, projection.incremental_volume
                )?;
                for cause in &projection.by_cause {
                    writeln!(
                        f,
                        "  {}: {:.0} expected ({:.0}% of failures)",
                        cause.cause,
                        cause.expected_failures,
                        cause.share * 100.0
                    )?;
                }
            }
        }

        if !self.recommendations.is_empty() {
            writeln!(f, "\nRecommendations:")?;
            for line in &self.recommendations {
                writeln!(f, "  - {}", line)?;
            }
        }
        if let Some(narrative) = &self.narrative {
            writeln!(f, "\nSummary:\n{}", narrative)?;
        }
        Ok(())
    }
}
