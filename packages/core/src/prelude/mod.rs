//! Built-in shapes and trait definitions merged ahead of user fragments.
//!
//! The core vocabulary lives in namespace `smithy.api`; the IAM and service
//! metadata traits used for condition-key inference live in `aws.api` and
//! `aws.iam`. Both are shipped as fragment JSON and parsed once.

use std::sync::LazyLock;

use crate::fragment::Fragment;
use crate::shape_id::ShapeId;

static PRELUDE: LazyLock<Vec<Fragment>> = LazyLock::new(|| {
    let mut fragments = Fragment::parse_many(include_str!("prelude.json"))
        .expect("embedded prelude is valid fragment JSON");
    fragments.extend(
        Fragment::parse_many(include_str!("aws.json"))
            .expect("embedded aws vocabulary is valid fragment JSON"),
    );
    fragments
});

/// The prelude fragments, core vocabulary first.
pub fn fragments() -> &'static [Fragment] {
    &PRELUDE
}

/// Namespaces owned by the prelude. Fragments outside the prelude may not
/// apply traits to shapes in `smithy.api`.
pub const NAMESPACES: [&str; 3] = ["smithy.api", "aws.api", "aws.iam"];

/// Whether `id` names a shape defined by the prelude fragments.
pub fn is_prelude_shape(id: &ShapeId) -> bool {
    let root = id.name();
    fragments()
        .iter()
        .any(|f| f.namespace.as_deref() == Some(id.namespace()) && f.shapes.contains_key(root))
}

/// IDs of traits and shapes the engine gives meaning to.
pub mod ids {
    use crate::shape_id::ShapeId;

    pub fn aws_service() -> ShapeId {
        ShapeId::unchecked("aws.api", "service")
    }

    pub fn arn_reference() -> ShapeId {
        ShapeId::unchecked("aws.api", "arnReference")
    }

    pub fn condition_keys() -> ShapeId {
        ShapeId::unchecked("aws.iam", "conditionKeys")
    }

    pub fn define_condition_keys() -> ShapeId {
        ShapeId::unchecked("aws.iam", "defineConditionKeys")
    }

    pub fn disable_condition_key_inference() -> ShapeId {
        ShapeId::unchecked("aws.iam", "disableConditionKeyInference")
    }

    pub fn iam_resource() -> ShapeId {
        ShapeId::unchecked("aws.iam", "iamResource")
    }
}

// --- tests -------------------------------------------------------------------
