use std::collections::HashMap;

use serde_json::Value;

/// What to do with resource references in a successful payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStrategy {
    /// Leave the payload untouched.
    Identity,
    /// Rewrite relative `reference` values against the gateway's deploy URL
    /// so consumers follow them back through the gateway.
    ExpandReferences,
}

/// Lookup table: resource type -> strategy, defaulting to identity for
/// unrecognized types. Adding a new expandable type is a table insertion.
pub struct ExpansionTable {
    strategies: HashMap<&'static str, ExpansionStrategy>,
    deploy_url: Option<String>,
}

impl ExpansionTable {
    pub fn with_defaults(deploy_url: Option<String>) -> Self {
        let mut strategies = HashMap::new();
        strategies.insert("Condition", ExpansionStrategy::ExpandReferences);
        strategies.insert("Observation", ExpansionStrategy::ExpandReferences);

        // Normalized so joined references never get a double slash.
        let deploy_url = deploy_url.map(|mut url| {
            if !url.ends_with('/') {
                url.push('/');
            }
            url
        });

        Self {
            strategies,
            deploy_url,
        }
    }

    pub fn strategy_for(&self, resource_type: &str) -> ExpansionStrategy {
        self.strategies
            .get(resource_type)
            .copied()
            .unwrap_or(ExpansionStrategy::Identity)
    }

    pub fn apply(&self, resource_type: &str, mut payload: Value) -> Value {
        match (self.strategy_for(resource_type), &self.deploy_url) {
            (ExpansionStrategy::ExpandReferences, Some(base)) => {
                expand_references(&mut payload, base);
                payload
            }
            _ => payload,
        }
    }
}

fn expand_references(value: &mut Value, base: &str) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "reference" {
                    if let Value::String(reference) = child {
                        if is_relative_reference(reference) {
                            *reference = format!("{}{}", base, reference);
                        }
                    }
                } else {
                    expand_references(child, base);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                expand_references(item, base);
            }
        }
        _ => {}
    }
}

/// Relative references look like "Patient/123"; absolute URLs and internal
/// fragment references ("#contained") stay as they are.
fn is_relative_reference(reference: &str) -> bool {
    !reference.contains("://") && !reference.starts_with('#')
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{ExpansionStrategy, ExpansionTable};

    #[test]
    fn unrecognized_types_default_to_identity() {
        let table = ExpansionTable::with_defaults(Some("https://gw.example.com".into()));
        assert_eq!(table.strategy_for("Patient"), ExpansionStrategy::Identity);
        assert_eq!(
            table.strategy_for("Observation"),
            ExpansionStrategy::ExpandReferences
        );
    }

    #[test]
    fn relative_references_are_rewritten_against_deploy_url() {
        let table = ExpansionTable::with_defaults(Some("https://gw.example.com".into()));
        let payload = json!({
            "resourceType": "Observation",
            "subject": {"reference": "Patient/123"},
            "encounter": {"reference": "https://other.example.com/Encounter/9"},
            "derivedFrom": [{"reference": "#contained"}]
        });

        let expanded = table.apply("Observation", payload);
        assert_eq!(
            expanded["subject"]["reference"],
            "https://gw.example.com/Patient/123"
        );
        assert_eq!(
            expanded["encounter"]["reference"],
            "https://other.example.com/Encounter/9"
        );
        assert_eq!(expanded["derivedFrom"][0]["reference"], "#contained");
    }

    #[test]
    fn identity_without_deploy_url() {
        let table = ExpansionTable::with_defaults(None);
        let payload = json!({"subject": {"reference": "Patient/123"}});
        let expanded = table.apply("Observation", payload.clone());
        assert_eq!(expanded, payload);
    }
}
