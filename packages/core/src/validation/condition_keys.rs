//! Condition keys named by resources and operations must exist in every
//! service that binds them.

use serde_json::Value;

use crate::knowledge::condition_keys::arn_namespace;
use crate::model::Model;
use crate::prelude::ids;
use crate::validation::{Validator, Violation, ViolationKind};

/// Keys under this prefix are global and never defined by a service.
const GLOBAL_PREFIX: &str = "aws:";

pub struct ConditionKeysValidator;

impl Validator for ConditionKeysValidator {
    fn name(&self) -> &'static str {
        "ConditionKeys"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        let index = model.condition_keys();

        for subject in model.traits().shapes_with_trait(&ids::condition_keys()) {
            let names: Vec<&str> = model
                .traits()
                .get(subject, &ids::condition_keys())
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .collect();

            for service_id in model.top_down().containing_services(model, subject) {
                let Some(service) = model.get_shape(service_id) else {
                    continue;
                };
                let namespace = arn_namespace(model, service);
                let defined = index.defined_keys(service_id);
                for name in &names {
                    let key = if name.contains(':') {
                        name.to_string()
                    } else {
                        format!("{}:{}", namespace, name)
                    };
                    if key.starts_with(GLOBAL_PREFIX) || defined.is_some_and(|d| d.contains_key(&key)) {
                        continue;
                    }
                    let known: Vec<&str> = defined
                        .map(|d| d.keys().map(String::as_str).collect())
                        .unwrap_or_default();
                    violations.push(Violation::error(
                        ViolationKind::ConditionKey,
                        subject,
                        format!(
                            "This {} scoped within the `{}` service refers to an undefined condition key `{}`. Expected one of the following defined condition keys: [{}]",
                            model
                                .get_shape(subject)
                                .map(|s| s.shape_type().as_str())
                                .unwrap_or("shape"),
                            service_id,
                            key,
                            known.iter().map(|k| format!("`{}`", k)).collect::<Vec<_>>().join(", ")
                        ),
                    ));
                }
            }
        }
        violations
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ModelAssembler;
    use crate::fragment::Fragment;
    use serde_json::json;

    fn violations(op_keys: serde_json::Value) -> Vec<Violation> {
        let fragment: Fragment = serde_json::from_value(json!({
            "namespace": "ns",
            "use": ["aws.iam#conditionKeys", "aws.iam#defineConditionKeys"],
            "shapes": {
                "MyService": {
                    "type": "service", "version": "1", "resources": ["MyResource"],
                    "traits": {"defineConditionKeys": {"otherservice:Bar": {"type": "String"}}}
                },
                "MyResource": {
                    "type": "resource", "identifiers": {"foo": "String"}, "operations": ["Op"]
                },
                "Op": {"type": "operation", "traits": {"conditionKeys": op_keys}}
            }
        }))
        .unwrap();
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment);
        let model = assembler.merge().unwrap().model;
        ConditionKeysValidator.validate(&model)
    }

    #[test]
    fn defined_inferred_and_global_keys_pass() {
        let found = violations(json!(["otherservice:Bar", "MyResourceFoo", "aws:SourceIp"]));
        assert!(found.is_empty(), "{found:#?}");
    }

    #[test]
    fn undefined_keys_are_reported_per_service() {
        let found = violations(json!(["myservice:Nope"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ViolationKind::ConditionKey);
        assert_eq!(found[0].shape_id, Some("ns#Op".parse().unwrap()));
        assert_eq!(
            found[0].message,
            "This operation scoped within the `ns#MyService` service refers to an undefined condition key `myservice:Nope`. Expected one of the following defined condition keys: [`myservice:MyResourceFoo`, `otherservice:Bar`]"
        );
    }
}
