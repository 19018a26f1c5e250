use serde::{Deserialize, Serialize};

use crate::{
    database::OperationContext,
    manifest::{batch::BatchDetails, database::DatabaseDetails},
    options::UpsertOptions,
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tenant used when a command does not name one explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(default)]
    pub database: DatabaseDetails,

    #[serde(default)]
    pub features: UpsertOptions,

    #[serde(default)]
    pub batch: BatchDetails,
}

impl Manifest {
    pub fn upsert_options(&self) -> UpsertOptions {
        self.features
    }

    /// Operation context for `organization_id`, falling back to the manifest's own tenant.
    /// `None` when neither names one.
    pub fn operation_context(&self, organization_id: Option<&str>) -> Option<OperationContext> {
        let organization_id = organization_id.or(self.organization_id.as_deref())?;
        let ctx = OperationContext::new(organization_id);
        Some(match self.batch.timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        })
    }
}
