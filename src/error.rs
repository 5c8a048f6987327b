use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Data loading error: {0}")]
    Load(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
