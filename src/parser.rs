//! Rule-based natural-language query parsing.
//!
//! Turns free text into a structured `Filter` + `Intent` with a deterministic
//! confidence score, using only the known-entity vocabulary supplied by the
//! integrator. Entity matching is substring-first with a Jaro-Winkler pass
//! over word windows to tolerate misspellings. Parsing never fails: an
//! unrecognized query yields an unrestricted filter and the default
//! `ExplainCauses` intent at low confidence.

use crate::integrator::KnownEntities;
use crate::models::normalize_value;
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use tracing::debug;

const COMPARE_WORDS: &[&str] = &["compare", "comparison", "versus", " vs ", "vs.", "better than"];
const TREND_WORDS: &[&str] = &["trend", "pattern", "over time", "seasonal", "week by week"];
const PREDICT_WORDS: &[&str] = &[
    "predict",
    "forecast",
    "expect",
    "if we",
    "onboard",
    "risk",
    "anticipate",
    "prepare for",
    "what will",
];
const EXPLAIN_WORDS: &[&str] = &["why", "reason", "cause", "explain", "what went wrong"];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Structured restrictions applied to the integrated dataset before
/// aggregation. Every field defaults to unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub cities: Vec<String>,
    pub clients: Vec<String>,
    pub warehouses: Vec<String>,
    pub drivers: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Filter {
    pub fn is_unrestricted(&self) -> bool {
        self.cities.is_empty()
            && self.clients.is_empty()
            && self.warehouses.is_empty()
            && self.drivers.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

/// What kind of answer the query is requesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ExplainCauses,
    Compare,
    AnalyzeTrends,
    Predict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub filter: Filter,
    pub intent: Intent,
    pub confidence: f64,
    /// Incremental order volume for predictive queries, when the text
    /// states one.
    pub projection_volume: Option<u64>,
}

pub struct QueryParser {
    entities: KnownEntities,
    fuzzy_threshold: f64,
    date_range_re: Regex,
    iso_date_re: Regex,
    volume_re: Regex,
}

impl QueryParser {
    pub fn new(entities: KnownEntities) -> Self {
        Self {
            entities,
            fuzzy_threshold: 0.92,
            date_range_re: Regex::new(
                r"(\d{4}-\d{2}-\d{2})\s*(?:to|through|until|and|-)\s*(\d{4}-\d{2}-\d{2})",
            )
            .unwrap(),
            iso_date_re: Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(),
            volume_re: Regex::new(
                r"(\d[\d,]*)\s*(?:more\s+|additional\s+|extra\s+|new\s+)?(?:orders|shipments|deliveries|volume)",
            )
            .unwrap(),
        }
    }

    /// Parses free text against the known-entity vocabulary. `today` anchors
    /// relative time phrases and is passed in so parsing stays deterministic.
    pub fn parse(&self, text: &str, today: NaiveDate) -> ParsedQuery {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let cities = self.match_entities(&lowered, &tokens, &self.entities.cities);
        let clients = self.match_entities(&lowered, &tokens, &self.entities.clients);
        let warehouses = self.match_entities(&lowered, &tokens, &self.entities.warehouses);

        let date_range = self.extract_date_range(&lowered, &tokens, today);
        let entity_count = cities.len() + clients.len() + warehouses.len();
        let (intent, unambiguous, collision) = self.detect_intent(&lowered, entity_count);

        let projection_volume = if intent == Intent::Predict {
            self.extract_volume(&lowered)
        } else {
            None
        };

        let mut confidence: f64 = 0.3;
        if !cities.is_empty() {
            confidence += 0.15;
        }
        if !clients.is_empty() {
            confidence += 0.15;
        }
        if !warehouses.is_empty() {
            confidence += 0.15;
        }
        if date_range.is_some() {
            confidence += 0.1;
        }
        if unambiguous {
            confidence += 0.2;
        }
        if collision {
            confidence -= 0.2;
        }
        if entity_count == 0 && date_range.is_none() {
            confidence -= 0.1;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let (date_from, date_to) = match date_range {
            Some((from, to)) => (Some(from), Some(to)),
            None => (None, None),
        };

        debug!(
            "Parsed query: intent={:?} entities={} confidence={:.2}",
            intent, entity_count, confidence
        );

        ParsedQuery {
            filter: Filter {
                cities,
                clients,
                warehouses,
                drivers: Vec::new(),
                date_from,
                date_to,
            },
            intent,
            confidence,
            projection_volume,
        }
    }

    /// Collects every known value mentioned in the text, not just the first.
    /// Substring match on the normalized value, then a fuzzy pass over word
    /// windows of the same length for near-misses.
    fn match_entities(&self, lowered: &str, tokens: &[&str], known: &[String]) -> Vec<String> {
        let mut found = Vec::new();
        for value in known {
            if lowered.contains(value.as_str()) {
                found.push(value.clone());
                continue;
            }
            let width = value.split_whitespace().count().max(1);
            let matched = tokens.windows(width).any(|window| {
                let candidate = window.join(" ");
                jaro_winkler(&candidate, value) >= self.fuzzy_threshold
            });
            if matched {
                found.push(value.clone());
            }
        }
        found
    }

    /// Resolves a date reference, most specific phrase first: an explicit
    /// ISO range beats a month name, which beats a relative phrase.
    fn extract_date_range(
        &self,
        lowered: &str,
        tokens: &[&str],
        today: NaiveDate,
    ) -> Option<(NaiveDate, NaiveDate)> {
        if let Some(caps) = self.date_range_re.captures(lowered) {
            let a = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok();
            let b = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok();
            if let (Some(a), Some(b)) = (a, b) {
                return Some((a.min(b), a.max(b)));
            }
        }

        if let Some(m) = self.iso_date_re.find(lowered) {
            if let Ok(d) = NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d") {
                return Some((d, d));
            }
        }

        for (name, month) in MONTHS {
            if tokens.contains(name) {
                // A month later than the current one refers to last year.
                let year = if *month > today.month() {
                    today.year() - 1
                } else {
                    today.year()
                };
                return Some(month_bounds(year, *month));
            }
        }

        if lowered.contains("yesterday") {
            let d = today - Duration::days(1);
            return Some((d, d));
        }
        if lowered.contains("last week") {
            return Some((today - Duration::days(7), today));
        }
        if lowered.contains("last month") {
            return Some((today - Duration::days(30), today));
        }
        if lowered.contains("this month") {
            let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
            return Some((first, today));
        }
        if lowered.contains("today") {
            return Some((today, today));
        }

        None
    }

    /// Intent keyword families; `ExplainCauses` is the default since most
    /// queries ask "why". Returns (intent, unambiguous, collision).
    fn detect_intent(&self, lowered: &str, entity_count: usize) -> (Intent, bool, bool) {
        let compare_hit = COMPARE_WORDS.iter().any(|w| lowered.contains(w))
            || (lowered.contains(" between ") && entity_count >= 2);
        let trend_hit = TREND_WORDS.iter().any(|w| lowered.contains(w));
        let predict_hit = PREDICT_WORDS.iter().any(|w| lowered.contains(w));
        let explain_hit = EXPLAIN_WORDS.iter().any(|w| lowered.contains(w));

        let families = [compare_hit, trend_hit, predict_hit]
            .iter()
            .filter(|hit| **hit)
            .count();

        let intent = if compare_hit {
            Intent::Compare
        } else if trend_hit {
            Intent::AnalyzeTrends
        } else if predict_hit {
            Intent::Predict
        } else {
            Intent::ExplainCauses
        };

        let unambiguous = families == 1 || (families == 0 && explain_hit);
        let collision = families >= 2;
        (intent, unambiguous, collision)
    }

    fn extract_volume(&self, lowered: &str) -> Option<u64> {
        let scrubbed = self.iso_date_re.replace_all(lowered, " ");
        self.volume_re
            .captures(&scrubbed)
            .and_then(|caps| caps[1].replace(',', "").parse::<u64>().ok())
    }
}

/// Inclusive first/last day of a month.
fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
    };
    (start, next - Duration::days(1))
}

/// Exposed so programmatic callers can normalize values the same way the
/// parser does before building a `Filter` by hand.
pub fn normalize_filter_value(value: &str) -> String {
    normalize_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new(KnownEntities {
            cities: vec!["mumbai".to_string(), "delhi".to_string(), "pune".to_string()],
            clients: vec!["mann group".to_string(), "saini llc".to_string()],
            warehouses: vec!["mumbai central wh".to_string()],
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 25).unwrap()
    }

    #[test]
    fn test_explain_query_with_city() {
        let parsed = parser().parse("Why are deliveries failing in Mumbai?", today());
        assert_eq!(parsed.intent, Intent::ExplainCauses);
        assert_eq!(parsed.filter.cities, vec!["mumbai"]);
        assert!(parsed.confidence > 0.5);
    }

    #[test]
    fn test_compare_query_collects_all_cities() {
        let parsed = parser().parse("Compare Mumbai and Delhi last month", today());
        assert_eq!(parsed.intent, Intent::Compare);
        assert_eq!(parsed.filter.cities, vec!["mumbai", "delhi"]);
        assert_eq!(parsed.filter.date_from, Some(today() - Duration::days(30)));
        assert_eq!(parsed.filter.date_to, Some(today()));
    }

    #[test]
    fn test_between_reads_as_comparison() {
        let parsed = parser().parse(
            "What is the difference between Mumbai and Delhi?",
            today(),
        );
        assert_eq!(parsed.intent, Intent::Compare);
    }

    #[test]
    fn test_trend_query() {
        let parsed = parser().parse("Show the delivery failure trend in Pune", today());
        assert_eq!(parsed.intent, Intent::AnalyzeTrends);
        assert_eq!(parsed.filter.cities, vec!["pune"]);
    }

    #[test]
    fn test_predict_query_extracts_volume() {
        let parsed = parser().parse(
            "What happens if we onboard Mann Group with 20,000 extra orders in Mumbai?",
            today(),
        );
        assert_eq!(parsed.intent, Intent::Predict);
        assert_eq!(parsed.projection_volume, Some(20_000));
        assert_eq!(parsed.filter.clients, vec!["mann group"]);
    }

    #[test]
    fn test_fuzzy_city_match() {
        let parsed = parser().parse("Why were orders late in Mumbia yesterday?", today());
        assert_eq!(parsed.filter.cities, vec!["mumbai"]);
        let yesterday = today() - Duration::days(1);
        assert_eq!(parsed.filter.date_from, Some(yesterday));
        assert_eq!(parsed.filter.date_to, Some(yesterday));
    }

    #[test]
    fn test_explicit_range_beats_relative_phrase() {
        let parsed = parser().parse(
            "Failures from 2025-08-01 to 2025-08-10, not last week",
            today(),
        );
        assert_eq!(
            parsed.filter.date_from,
            NaiveDate::from_ymd_opt(2025, 8, 1)
        );
        assert_eq!(parsed.filter.date_to, NaiveDate::from_ymd_opt(2025, 8, 10));
    }

    #[test]
    fn test_month_name_resolves_against_today() {
        let parsed = parser().parse("What warehouse problems occurred in August?", today());
        assert_eq!(
            parsed.filter.date_from,
            NaiveDate::from_ymd_opt(2025, 8, 1)
        );
        assert_eq!(parsed.filter.date_to, NaiveDate::from_ymd_opt(2025, 8, 31));

        // A month still in the future refers to last year.
        let parsed = parser().parse("Delivery issues in December", today());
        assert_eq!(
            parsed.filter.date_from,
            NaiveDate::from_ymd_opt(2024, 12, 1)
        );
    }

    #[test]
    fn test_unrecognized_query_never_fails() {
        let parsed = parser().parse("lorem ipsum dolor sit amet", today());
        assert!(parsed.filter.is_unrestricted());
        assert_eq!(parsed.intent, Intent::ExplainCauses);
        assert!(parsed.confidence < 0.5);
    }

    #[test]
    fn test_colliding_intent_families_lower_confidence() {
        let clean = parser().parse("Compare Mumbai and Delhi", today());
        let colliding = parser().parse("Compare the trend for Mumbai and Delhi", today());
        assert!(colliding.confidence < clean.confidence);
    }

    #[test]
    fn test_confidence_is_deterministic() {
        let a = parser().parse("Why are deliveries failing in Mumbai?", today());
        let b = parser().parse("Why are deliveries failing in Mumbai?", today());
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.filter, b.filter);
    }
}
