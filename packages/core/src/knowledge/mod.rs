//! Read-only indexes derived from a [`Model`](crate::model::Model).
//!
//! Each index is computed once per model on first access and cached in the
//! model, see [`Model::top_down`](crate::model::Model::top_down) and friends.
//!
//! | Index | Answers |
//! |-------|---------|
//! | [`TopDownIndex`] | which operations and resources a service or resource contains |
//! | [`IdentifierBindingIndex`] | how an operation binds its resource's identifiers |
//! | [`ConditionKeysIndex`] | IAM condition keys per service, resource and operation |
//! | [`AuthIndex`] | auth schemes of a service and the effective schemes of its operations |
//! | [`PaginationIndex`] | pagination settings after merging service defaults |
//!
//! [`UriPattern`] is not cached; it parses `@http` URIs on demand.

pub mod auth;
pub mod condition_keys;
pub mod http;
pub mod identifiers;
pub mod pagination;
pub mod top_down;

use std::sync::OnceLock;

pub use auth::AuthIndex;
pub use condition_keys::{ConditionKeyDefinition, ConditionKeysIndex};
pub use http::{Segment, UriPattern, UriPatternError};
pub use identifiers::{BindingType, IdentifierBindingIndex};
pub use pagination::{resolve_member_path, PaginationIndex, PaginationInfo};
pub use top_down::TopDownIndex;

#[derive(Debug, Default)]
pub(crate) struct KnowledgeCache {
    pub top_down: OnceLock<TopDownIndex>,
    pub identifiers: OnceLock<IdentifierBindingIndex>,
    pub condition_keys: OnceLock<ConditionKeysIndex>,
    pub auth: OnceLock<AuthIndex>,
    pub pagination: OnceLock<PaginationIndex>,
}
