//! Delivery root-cause analytics engine.
//!
//! Joins eight logistics tables into an integrated, classified in-memory
//! dataset, parses free-text questions into structured filters and intents,
//! and answers them with quantified root-cause breakdowns, comparisons,
//! trends and projections, plus rule-based recommendations. Optional
//! collaborators add AI query interpretation, narrative summaries and audit
//! persistence on top of the deterministic core.

pub mod analyzer;
pub mod audit;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod integrator;
pub mod llm;
pub mod loader;
pub mod models;
pub mod parser;
pub mod recommend;
