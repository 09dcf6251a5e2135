use http::StatusCode;
use serde_json::Value;
use tracing::error;

use crate::proxy::outcome::{
    OperationOutcome, AUTHORIZATION_FAILURE_TEXT, NOT_JSON_TEXT, NO_OUTCOME_TEXT,
};

/// Every upstream response collapses into exactly one of these. Callers
/// match on the tag; nothing downstream inspects response structure again.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    Success {
        payload: Value,
        status: u16,
    },
    AuthorizationFailure {
        outcome: OperationOutcome,
        status: u16,
    },
    /// Upstream understood the request and authored its own outcome (or at
    /// least a status); the upstream diagnostics pass through verbatim.
    DomainError {
        outcome: Value,
        status: u16,
    },
    TransportFailure {
        outcome: OperationOutcome,
        status: u16,
    },
}

impl NormalizedResult {
    pub fn status(&self) -> u16 {
        match self {
            NormalizedResult::Success { status, .. }
            | NormalizedResult::AuthorizationFailure { status, .. }
            | NormalizedResult::DomainError { status, .. }
            | NormalizedResult::TransportFailure { status, .. } => *status,
        }
    }

    /// Wire body for the inbound HTTP layer.
    pub fn body(&self) -> Value {
        match self {
            NormalizedResult::Success { payload, .. } => payload.clone(),
            NormalizedResult::AuthorizationFailure { outcome, .. }
            | NormalizedResult::TransportFailure { outcome, .. } => outcome.to_value(),
            NormalizedResult::DomainError { outcome, .. } => outcome.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, NormalizedResult::Success { .. })
    }

    /// Metrics label.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            NormalizedResult::Success { .. } => "success",
            NormalizedResult::AuthorizationFailure { .. } => "authorization_failure",
            NormalizedResult::DomainError { .. } => "domain_error",
            NormalizedResult::TransportFailure { .. } => "transport_failure",
        }
    }
}

/// Classify an upstream response body. The order is load-bearing: a 401 must
/// become an authorization failure before any generic handling, so credential
/// problems are never mis-reported as domain errors.
pub fn classify(
    resource_type: &str,
    status: StatusCode,
    www_authenticate: Option<&str>,
    body: &str,
) -> NormalizedResult {
    if status == StatusCode::UNAUTHORIZED {
        error!(
            "Something went wrong when trying to request {}. The response returned with a status code of {} and a body of {}",
            resource_type, status, body
        );
        return NormalizedResult::AuthorizationFailure {
            outcome: OperationOutcome::processing_error(AUTHORIZATION_FAILURE_TEXT),
            status: status.as_u16(),
        };
    }

    if status != StatusCode::OK {
        if let Ok(parsed) = serde_json::from_str::<Value>(body) {
            if parsed.get("resourceType").and_then(Value::as_str) == Some("OperationOutcome") {
                error!("upstream returned an OperationOutcome: {}", parsed);
                return NormalizedResult::DomainError {
                    outcome: parsed,
                    status: status.as_u16(),
                };
            }
        }

        error!(
            "Something went wrong when trying to request {}. The response returned with a status code of {} and a body of {}",
            resource_type, status, body
        );
        let diagnostics = match www_authenticate {
            Some(value) => {
                error!("{}", value);
                value.to_owned()
            }
            None => NO_OUTCOME_TEXT.to_owned(),
        };
        return NormalizedResult::DomainError {
            outcome: OperationOutcome::processing_error(diagnostics).to_value(),
            status: status.as_u16(),
        };
    }

    match serde_json::from_str::<Value>(body) {
        Ok(payload) => NormalizedResult::Success {
            payload,
            status: status.as_u16(),
        },
        Err(_) => {
            error!("Status Code: {}", status);
            error!("Response Text: {}", body);
            NormalizedResult::TransportFailure {
                outcome: OperationOutcome::processing_error(NOT_JSON_TEXT),
                status: status.as_u16(),
            }
        }
    }
}
