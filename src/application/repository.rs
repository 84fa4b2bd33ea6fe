use crate::domain::ports::{CallOutcome, RpcArg, RpcTransportBox};
use crate::domain::repository::{Commit, VersionSelector};
use crate::domain::service::DOMAIN_CONFIG_REPOSITORY;
use crate::domain::snapshot::Snapshot;
use crate::error::Result;

/// Typed client for the domain config `Repository` service.
pub struct DomainRepository {
    transport: RpcTransportBox,
}

impl DomainRepository {
    pub fn new(transport: RpcTransportBox) -> Self {
        Self { transport }
    }

    /// Checks out a snapshot. Any failure is returned as an error.
    pub async fn checkout(&self, selector: VersionSelector) -> Result<Snapshot> {
        let raw = self
            .transport
            .call(
                DOMAIN_CONFIG_REPOSITORY,
                "Checkout",
                &[RpcArg::json(selector)?],
            )
            .await?;
        Snapshot::parse(&raw)
    }

    /// Submits `commit` against `version`. A rejection comes back as [`CallOutcome::Failed`].
    pub async fn commit(&self, version: u64, commit: &Commit) -> Result<CallOutcome> {
        self.transport
            .call_tolerant(
                DOMAIN_CONFIG_REPOSITORY,
                "Commit",
                &[RpcArg::Raw(version.to_string()), RpcArg::json(commit)?],
            )
            .await
    }
}
