//! Per-table repositories. Every method takes the call's [`OperationContext`] and a database
//! handle, and labels its errors with `<Repo>::<method>`.
//!
//! [`OperationContext`]: crate::database::OperationContext

pub(crate) mod common;
mod enrollment;
mod owned;
mod user;
mod usr_email;

pub use enrollment::{EnrollmentStatusHistoryRepo, EnrollmentStatusHistoryRepository};
pub use owned::{
    OwnedRowRepo, OwnedRowRepository, StudentParentRepo, TaggedUserRepo, UserAddressRepo,
    UserPhoneNumberRepo,
};
pub use user::{
    LegacyUserGroupRepo, LegacyUserGroupRepository, UserAccessPathRepo, UserAccessPathRepository,
    UserGroupMemberRepo, UserGroupMemberRepository, UserRepo, UserRepository,
};
pub use usr_email::{UsrEmailRepo, UsrEmailRepository};
