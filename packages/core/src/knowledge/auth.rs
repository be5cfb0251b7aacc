//! Auth schemes of services and the effective schemes of their operations.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::Model;
use crate::shape_id::ShapeId;

#[derive(Debug, Default)]
pub struct AuthIndex {
    schemes: HashMap<ShapeId, Vec<ShapeId>>,
    service_auth: HashMap<ShapeId, Vec<ShapeId>>,
    operation_auth: HashMap<(ShapeId, ShapeId), Vec<ShapeId>>,
}

impl AuthIndex {
    pub fn build(model: &Model) -> Self {
        let mut index = AuthIndex::default();
        let traits = model.traits();

        for service in model.graph().root_shapes() {
            if service.as_service().is_none() {
                continue;
            }

            let mut schemes: Vec<ShapeId> = traits
                .applied_traits(&service.id)
                .keys()
                .filter(|t| traits.has_prelude(t, "authDefinition"))
                .cloned()
                .collect();
            schemes.sort();

            let effective = match auth_trait(model, &service.id) {
                Some(listed) => listed,
                None => schemes.clone(),
            };

            for operation in model.top_down().contained_operations(&service.id) {
                let resolved = match auth_trait(model, operation) {
                    Some(listed) => listed
                        .into_iter()
                        .filter(|scheme| schemes.contains(scheme))
                        .collect(),
                    None => effective.clone(),
                };
                index
                    .operation_auth
                    .insert((service.id.clone(), operation.clone()), resolved);
            }

            index.service_auth.insert(service.id.clone(), effective);
            index.schemes.insert(service.id.clone(), schemes);
        }

        index
    }

    /// Auth traits applied to the service, sorted by trait ID.
    pub fn service_schemes(&self, service: &ShapeId) -> &[ShapeId] {
        self.schemes.get(service).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The schemes a service uses: `@auth` order when present, else every
    /// scheme sorted.
    pub fn effective_service_auth(&self, service: &ShapeId) -> &[ShapeId] {
        self.service_auth.get(service).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The schemes an operation uses within `service`. An `@auth` on the
    /// operation replaces the service's list entirely.
    pub fn effective_operation_auth(&self, service: &ShapeId, operation: &ShapeId) -> &[ShapeId] {
        self.operation_auth
            .get(&(service.clone(), operation.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The `@auth` list of `id`, if the trait is present.
pub(crate) fn auth_trait(model: &Model, id: &ShapeId) -> Option<Vec<ShapeId>> {
    let values = model.traits().get_prelude(id, "auth")?.as_array()?;
    Some(
        values
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|s| s.parse().ok())
            .collect(),
    )
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ModelAssembler;
    use crate::fragment::Fragment;
    use serde_json::json;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    fn model() -> Model {
        let fragment: Fragment = serde_json::from_value(json!({
            "namespace": "ns",
            "shapes": {
                "Svc": {
                    "type": "service",
                    "version": "1",
                    "operations": ["Inherits", "Overrides", "Anonymous"],
                    "traits": {
                        "httpBearerAuth": {},
                        "httpBasicAuth": {},
                        "auth": ["httpBearerAuth", "httpBasicAuth"]
                    }
                },
                "Unordered": {
                    "type": "service",
                    "version": "1",
                    "traits": {"httpDigestAuth": {}, "httpBasicAuth": {}}
                },
                "Inherits": {"type": "operation"},
                "Overrides": {"type": "operation", "traits": {"auth": ["httpBasicAuth"]}},
                "Anonymous": {"type": "operation", "traits": {"auth": []}}
            }
        }))
        .unwrap();
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment);
        assembler.merge().unwrap().model
    }

    fn names(ids: &[ShapeId]) -> Vec<&str> {
        ids.iter().map(|i| i.name()).collect()
    }

    #[test]
    fn service_schemes_are_sorted_and_auth_orders_them() {
        let m = model();
        let auth = m.auth();
        assert_eq!(names(auth.service_schemes(&id("ns#Svc"))), vec!["httpBasicAuth", "httpBearerAuth"]);
        assert_eq!(
            names(auth.effective_service_auth(&id("ns#Svc"))),
            vec!["httpBearerAuth", "httpBasicAuth"]
        );
        assert_eq!(
            names(auth.effective_service_auth(&id("ns#Unordered"))),
            vec!["httpBasicAuth", "httpDigestAuth"]
        );
    }

    #[test]
    fn operation_auth_replaces_service_auth() {
        let m = model();
        let auth = m.auth();
        let svc = id("ns#Svc");
        assert_eq!(
            names(auth.effective_operation_auth(&svc, &id("ns#Inherits"))),
            vec!["httpBearerAuth", "httpBasicAuth"]
        );
        assert_eq!(
            names(auth.effective_operation_auth(&svc, &id("ns#Overrides"))),
            vec!["httpBasicAuth"]
        );
        assert!(auth.effective_operation_auth(&svc, &id("ns#Anonymous")).is_empty());
        assert!(auth.effective_operation_auth(&id("ns#Unordered"), &id("ns#Inherits")).is_empty());
    }
}
