//! Unified error model for the query pipeline.
use thiserror::Error;

/// Every way a pipeline run can fail, across all stages.
///
/// `SecurityBlocked` classifies the run as `Blocked`; everything else
/// classifies it as `Failed`. An empty result set is never represented
/// here: it is a successful execution with zero records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("SECURITY/{layer}: {reason}")]
    SecurityBlocked { layer: String, reason: String },

    /// Precondition failure: the token window closed before the pipeline ran.
    #[error("AUTH/expired: {0}")]
    AuthExpired(String),

    #[error("INTENT/unparsable: {0}")]
    UnparsableQuery(String),

    #[error("DISCOVERY/no-model: {0}")]
    ModelNotFound(String),

    #[error("MAPPING/low-confidence: {0}")]
    FieldMappingLowConfidence(String),

    #[error("EXECUTE/timeout: gave up after {attempts} attempts")]
    QueryTimeout { attempts: u32 },

    #[error("EXECUTE/unauthorized: {0}")]
    QueryUnauthorized(String),

    #[error("EXECUTE/malformed: {0}")]
    MalformedQuery(String),

    #[error("PIPELINE/unknown: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Whether this error came from the security gate.
    pub fn is_security_block(&self) -> bool {
        matches!(self, PipelineError::SecurityBlocked { .. })
    }
}

/// Platform failures surface under the pipeline taxonomy.
///
/// A bare conversion assumes a single attempt; the execution adapter
/// builds its own `QueryTimeout` after exhausting retries.
impl From<crate::model::ExecutionFailure> for PipelineError {
    fn from(failure: crate::model::ExecutionFailure) -> Self {
        use crate::model::ExecutionFailure;
        match failure {
            ExecutionFailure::Timeout => PipelineError::QueryTimeout { attempts: 1 },
            ExecutionFailure::Unauthorized { detail } => PipelineError::QueryUnauthorized(detail),
            ExecutionFailure::NotFound { detail } => PipelineError::ModelNotFound(detail),
            ExecutionFailure::Malformed { detail } => PipelineError::MalformedQuery(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_block_detection() {
        let err = PipelineError::SecurityBlocked {
            layer: "input_sanitization".to_string(),
            reason: "control characters".to_string(),
        };
        assert!(err.is_security_block());
        assert!(!PipelineError::Unknown("x".to_string()).is_security_block());
    }

    #[test]
    fn test_error_prefixes() {
        let err = PipelineError::QueryTimeout { attempts: 3 };
        assert!(err.to_string().starts_with("EXECUTE/timeout"));

        let err = PipelineError::ModelNotFound("no candidate above 0.3".to_string());
        assert!(err.to_string().starts_with("DISCOVERY/"));
    }
}
