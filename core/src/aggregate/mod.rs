//! Orchestrators that persist whole aggregates. A call issues one dispatch per step, strictly
//! in sequence, and stops at the first step that fails. Steps already applied stay applied, so
//! a failed call must be retried as a whole.

mod domain;
mod repo;
mod service;
mod user_layer;

pub use domain::{
    aggregate_ids, AggregateKind, DomainParent, DomainSchoolAdmin, DomainStudent, DomainTeacher,
    DomainUser, UserAggregate,
};
pub use repo::{AggregateRepo, ParentRepo, SchoolAdminRepo, StudentRepo, TeacherRepo};
pub use service::{ParentAggregateService, StudentAggregateService, StudentChildren};
pub use user_layer::{UserLayer, UserLayerRepos};
