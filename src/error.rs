use thiserror::Error;

/// Failures that stop the pipeline for a season.
///
/// Row-level data problems never surface here; the cleaner drops and counts
/// them (see [`crate::cleaner::CleanReport`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source was unreachable, returned something that is not a
    /// play-by-play file, or lacks a column the cleaner depends on.
    #[error("data source error for season {season}: {message}")]
    DataSource { season: u16, message: String },

    /// The projector was handed a table without one of its fixed columns.
    #[error("schema violation: projected columns missing from input: {}", missing.join(", "))]
    SchemaViolation { missing: Vec<String> },
}

impl PipelineError {
    pub fn data_source(season: u16, err: impl std::fmt::Display) -> Self {
        Self::DataSource {
            season,
            message: err.to_string(),
        }
    }

    /// Wraps an `anyhow` chain, keeping every context layer in the message.
    pub fn from_chain(season: u16, err: &anyhow::Error) -> Self {
        Self::DataSource {
            season,
            message: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn schema_violation_lists_columns() {
        let err = PipelineError::SchemaViolation {
            missing: vec!["stadium".to_string(), "roof".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "schema violation: projected columns missing from input: stadium, roof"
        );
    }

    #[test]
    fn chain_keeps_context() {
        let inner = anyhow::anyhow!("connection refused").context("download season file");
        let err = PipelineError::from_chain(2022, &inner);
        let text = err.to_string();
        assert!(text.contains("season 2022"));
        assert!(text.contains("download season file: connection refused"));
    }
}
