//! `@paginated` operations point at members that can carry pagination.

use crate::knowledge::{resolve_member_path, PaginationInfo};
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::{OperationData, Shape, ShapeType};
use crate::validation::{Severity, Validator, Violation, ViolationKind};

pub struct PaginatedValidator;

impl Validator for PaginatedValidator {
    fn name(&self) -> &'static str {
        "Paginated"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for shape in model.shapes_of_type(ShapeType::Operation) {
            let Some(node) = model.traits().get_prelude(&shape.id, "paginated") else {
                continue;
            };
            let Some(operation) = shape.as_operation() else {
                continue;
            };
            let own = PaginationInfo::from_node(node);
            let check = Check { model, id: &shape.id, operation, service: None };

            let mut found = Vec::new();
            match check.input() {
                None => found.push(check.error("paginated operations require an input".into())),
                Some(_) => {
                    found.extend(check.property(&own, Property::InputToken));
                    found.extend(check.property(&own, Property::PageSize));
                    if let Some(member) = check.member(&own, Property::PageSize) {
                        if model.traits().has_prelude(&member.id, "required") {
                            found.push(Violation::danger(
                                ViolationKind::Paginated,
                                &shape.id,
                                format!(
                                    "paginated trait `pageSize` member `{}` should not be required",
                                    member.id.member().unwrap_or_default()
                                ),
                            ));
                        }
                    }
                }
            }
            match check.output() {
                None => found.push(check.error("paginated operations require an output".into())),
                Some(_) => {
                    found.extend(check.property(&own, Property::OutputToken));
                    found.extend(check.property(&own, Property::Items));
                }
            }

            if found.is_empty() {
                for service in model.top_down().containing_services(model, &shape.id) {
                    let Some(merged) = model.pagination().get(service, &shape.id) else {
                        continue;
                    };
                    let check = Check { service: Some(service), ..check };
                    for property in Property::ALL {
                        found.extend(check.property(merged, property));
                    }
                }
            }
            violations.extend(found);
        }
        violations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Property {
    InputToken,
    OutputToken,
    PageSize,
    Items,
}

impl Property {
    const ALL: [Property; 4] = [
        Property::InputToken,
        Property::PageSize,
        Property::OutputToken,
        Property::Items,
    ];

    fn name(self) -> &'static str {
        match self {
            Property::InputToken => "inputToken",
            Property::OutputToken => "outputToken",
            Property::PageSize => "pageSize",
            Property::Items => "items",
        }
    }

    fn value(self, info: &PaginationInfo) -> Option<&str> {
        match self {
            Property::InputToken => info.input_token.as_deref(),
            Property::OutputToken => info.output_token.as_deref(),
            Property::PageSize => info.page_size.as_deref(),
            Property::Items => info.items.as_deref(),
        }
    }

    fn on_output(self) -> bool {
        matches!(self, Property::OutputToken | Property::Items)
    }

    /// Tokens have to be configured once merged with the service.
    fn is_token(self) -> bool {
        matches!(self, Property::InputToken | Property::OutputToken)
    }

    fn valid_targets(self) -> &'static [ShapeType] {
        match self {
            Property::InputToken | Property::OutputToken => &[ShapeType::String],
            Property::PageSize => &[ShapeType::Integer],
            Property::Items => &[ShapeType::List, ShapeType::Map],
        }
    }
}

#[derive(Clone, Copy)]
struct Check<'a> {
    model: &'a Model,
    id: &'a ShapeId,
    operation: &'a OperationData,
    service: Option<&'a ShapeId>,
}

impl<'a> Check<'a> {
    fn input(&self) -> Option<&'a Shape> {
        self.model.get_shape(self.operation.input.as_ref()?)
    }

    fn output(&self) -> Option<&'a Shape> {
        self.model.get_shape(self.operation.output.as_ref()?)
    }

    fn error(&self, message: String) -> Violation {
        Violation::error(ViolationKind::Paginated, self.id, self.prefixed(message))
    }

    fn prefixed(&self, message: String) -> String {
        match self.service {
            Some(service) => format!("When bound within the `{}` service, {}", service, message),
            None => message,
        }
    }

    /// The member a property points at, following paths on the output.
    fn member(&self, info: &PaginationInfo, property: Property) -> Option<&'a Shape> {
        let path = property.value(info)?;
        if property.on_output() {
            let output = self.operation.output.as_ref()?;
            resolve_member_path(self.model, output, path)?.pop()
        } else {
            self.input()?.members.get(path)
        }
    }

    fn property(&self, info: &PaginationInfo, property: Property) -> Vec<Violation> {
        let name = property.name();
        let Some(path) = property.value(info) else {
            if self.service.is_some() && property.is_token() {
                return vec![self.error(format!("paginated trait `{}` is not configured", name))];
            }
            return Vec::new();
        };

        if !property.on_output() && path.contains('.') {
            return vec![self.error(format!("paginated trait `{}` does not allow path values", name))];
        }

        let Some(member) = self.member(info, property) else {
            return vec![self.error(format!(
                "paginated trait `{}` targets a member `{}` that does not exist",
                name, path
            ))];
        };

        let mut found = Vec::new();
        let member_name = member.id.member().unwrap_or_default();
        if property.is_token() && self.model.traits().has_prelude(&member.id, "required") {
            found.push(self.error(format!(
                "paginated trait `{}` member `{}` must not be required",
                name, member_name
            )));
        }

        if let Some(target) = member.target().and_then(|t| self.model.get_shape(t)) {
            let valid = property.valid_targets();
            if !valid.contains(&target.shape_type()) {
                let expected: Vec<String> = valid.iter().map(|t| format!("`{}`", t)).collect();
                found.push(self.error(format!(
                    "paginated trait `{}` member `{}` targets a {} shape, but must target one of the following: [{}]",
                    name,
                    member_name,
                    target.shape_type(),
                    expected.join(", ")
                )));
            }
        }

        if property.on_output() && path.split('.').count() > 2 {
            found.push(Violation::new(
                ViolationKind::Paginated,
                Severity::Warning,
                Some(self.id.clone()),
                self.prefixed(format!(
                    "paginated trait `{}` contains a path with more than two parts, which can make your API cumbersome to use",
                    name
                )),
            ));
        }
        found
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ModelAssembler;
    use crate::fragment::Fragment;
    use serde_json::json;

    fn violations(service_paginated: Option<serde_json::Value>, op_paginated: serde_json::Value) -> Vec<Violation> {
        let mut service = json!({"type": "service", "version": "1", "operations": ["ListThings"]});
        if let Some(p) = service_paginated {
            service["traits"] = json!({"paginated": p});
        }
        let fragment: Fragment = serde_json::from_value(json!({
            "namespace": "ns",
            "shapes": {
                "Svc": service,
                "ListThings": {"type": "operation", "input": "ListInput", "output": "ListOutput",
                               "traits": {"paginated": op_paginated}},
                "ListInput": {"type": "structure", "members": {
                    "nextToken": {"target": "String"},
                    "maxResults": {"target": "Integer", "traits": {"required": {}}},
                    "name": {"target": "String", "traits": {"required": {}}}
                }},
                "ListOutput": {"type": "structure", "members": {
                    "nextToken": {"target": "String"},
                    "things": {"target": "Things"},
                    "wrapper": {"target": "Wrapper"}
                }},
                "Wrapper": {"type": "structure", "members": {
                    "inner": {"target": "Inner"}
                }},
                "Inner": {"type": "structure", "members": {
                    "things": {"target": "Things"}
                }},
                "Things": {"type": "list", "member": {"target": "String"}}
            }
        }))
        .unwrap();
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment);
        let model = assembler.merge().unwrap().model;
        PaginatedValidator.validate(&model)
    }

    #[test]
    fn valid_configuration_passes() {
        let found = violations(
            None,
            json!({"inputToken": "nextToken", "outputToken": "nextToken", "items": "things"}),
        );
        assert!(found.is_empty(), "{found:#?}");
    }

    #[test]
    fn required_page_size_is_danger() {
        let found = violations(
            None,
            json!({"inputToken": "nextToken", "outputToken": "nextToken", "pageSize": "maxResults"}),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Danger);
        assert_eq!(found[0].message, "paginated trait `pageSize` member `maxResults` should not be required");
    }

    #[test]
    fn reports_member_problems() {
        let found = violations(
            None,
            json!({"inputToken": "name", "outputToken": "missing", "items": "nextToken", "pageSize": "a.b"}),
        );
        let messages: Vec<&str> = found.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "paginated trait `inputToken` member `name` must not be required",
                "paginated trait `pageSize` does not allow path values",
                "paginated trait `outputToken` targets a member `missing` that does not exist",
                "paginated trait `items` member `nextToken` targets a string shape, but must target one of the following: [`list`, `map`]",
            ]
        );
    }

    #[test]
    fn long_output_paths_warn() {
        let found = violations(
            None,
            json!({"inputToken": "nextToken", "outputToken": "nextToken", "items": "wrapper.inner.things"}),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn merged_service_configuration_is_checked() {
        let found = violations(Some(json!({"inputToken": "nextToken"})), json!({"items": "things"}));
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].message,
            "When bound within the `ns#Svc` service, paginated trait `outputToken` is not configured"
        );

        let found = violations(
            Some(json!({"inputToken": "nextToken", "outputToken": "nextToken"})),
            json!({"items": "things"}),
        );
        assert!(found.is_empty(), "{found:#?}");
    }
}
