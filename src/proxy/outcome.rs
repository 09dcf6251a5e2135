use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Diagnostics text returned when no token could be obtained.
pub const TOKEN_FAILURE_TEXT: &str = "There was an issue getting a token for authorization";
pub const AUTHORIZATION_FAILURE_TEXT: &str = "There was an issue with authorization";
pub const NO_OUTCOME_TEXT: &str =
    "There was an issue with something that did not return an OperationOutcome";
pub const NOT_JSON_TEXT: &str =
    "The response returned from the upstream FHIR server was not JSON parseable, please see logs for what the server responded";
pub const BASE_URL_TEXT: &str =
    "This is the base URL of server. Unable to handle this request, as it does not contain a resource type or operation name.";

/// One issue entry of the diagnostic envelope. Field names are the wire
/// format; consumers expect exactly this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: String,
    pub code: String,
    pub diagnostics: String,
}

/// FHIR OperationOutcome envelope:
/// `{"resourceType":"OperationOutcome","issue":[{severity,code,diagnostics}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub issue: Vec<Issue>,
}

impl OperationOutcome {
    /// The uniform error envelope: severity "error", code "processing".
    pub fn processing_error(diagnostics: impl Into<String>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_owned(),
            issue: vec![Issue {
                severity: "error".to_owned(),
                code: "processing".to_owned(),
                diagnostics: diagnostics.into(),
            }],
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::OperationOutcome;

    #[test]
    fn envelope_is_wire_compatible() {
        let outcome = OperationOutcome::processing_error("boom");
        assert_eq!(
            outcome.to_value(),
            json!({
                "resourceType": "OperationOutcome",
                "issue": [
                    {"severity": "error", "code": "processing", "diagnostics": "boom"}
                ]
            })
        );
    }
}
