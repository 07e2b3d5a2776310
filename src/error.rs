/// Failure at the GraphQL request/response boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphqlError {
    /// First message from the response's `errors` list
    #[error("{0}")]
    Response(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl GraphqlError {
    /// The backend reports a field this deployment does not expose, e.g.
    /// `field "createdAt" not found in type: 'user'`.
    pub fn is_missing_field(&self, field: &str) -> bool {
        match self {
            GraphqlError::Response(message) => {
                let message = message.to_lowercase();
                message.contains(&field.to_lowercase()) && message.contains("not found")
            }
            _ => false,
        }
    }
}

/// Terminal failures of a dashboard load. Everything else is absorbed where
/// it happens and only degrades the output.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid credentials. Please try again.")]
    Auth,

    #[error("Sign-in failed: {0}")]
    Network(String),

    /// Every query variant for the requested data failed
    #[error("{0}")]
    Schema(GraphqlError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_signal_is_case_insensitive() {
        let err = GraphqlError::Response(
            "field \"createdAt\" NOT FOUND in type: 'user'".to_string(),
        );
        assert!(err.is_missing_field("createdAt"));
        assert!(!err.is_missing_field("objectId"));
    }

    #[test]
    fn network_failures_never_look_like_schema_gaps() {
        let err = GraphqlError::Network("createdAt not found".to_string());
        assert!(!err.is_missing_field("createdAt"));
    }

    #[test]
    fn schema_error_surfaces_the_backend_message() {
        let err = DashboardError::Schema(GraphqlError::Response("boom".to_string()));
        assert_eq!(err.to_string(), "boom");
    }
}
