use crate::error::{OpsError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DOMAIN_CONFIG_REPOSITORY: &str = "domain_config_repository";
pub const INVOICING: &str = "invoicing";

/// Static metadata needed to reach one Thrift service through woorl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Thrift service (interface) name, e.g. `Repository`.
    pub interface: String,
    /// URL path the service is mounted on.
    pub path: String,
    /// Thrift schema file handed to woorl with `-s`.
    pub schema: PathBuf,
}

impl ServiceDescriptor {
    pub fn new(interface: &str, path: &str, schema: impl Into<PathBuf>) -> Self {
        Self {
            interface: interface.to_string(),
            path: path.to_string(),
            schema: schema.into(),
        }
    }
}

/// Immutable lookup table from logical service names to their descriptors.
///
/// Built once at startup and then shared by reference with the gateway.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
    /// The services known to the operational tooling.
    pub fn builtin() -> Self {
        Self::from_entries([
            (
                DOMAIN_CONFIG_REPOSITORY,
                ServiceDescriptor::new(
                    "Repository",
                    "/v1/domain/repository",
                    "../../damsel/proto/domain_config.thrift",
                ),
            ),
            (
                "withdrawal_management",
                ServiceDescriptor::new(
                    "Management",
                    "/v1/withdrawal",
                    "fistful-proto/proto/withdrawal.thrift",
                ),
            ),
            (
                "withdrawal_repairer",
                ServiceDescriptor::new(
                    "Repairer",
                    "/v1/repair/withdrawal",
                    "fistful-proto/proto/withdrawal.thrift",
                ),
            ),
            (
                "withdrawal_session_management",
                ServiceDescriptor::new(
                    "Management",
                    "/v1/withdrawal_session",
                    "fistful-proto/proto/withdrawal_session.thrift",
                ),
            ),
            (
                "shumpune_accounter",
                ServiceDescriptor::new(
                    "Accounter",
                    "/shumpune",
                    "shumaich-proto/proto/shumpune.thrift",
                ),
            ),
            (
                INVOICING,
                ServiceDescriptor::new(
                    "Invoicing",
                    "/v1/processing/invoicing",
                    "damsel/proto/payment_processing.thrift",
                ),
            ),
        ])
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, ServiceDescriptor)>) -> Self {
        Self {
            services: entries
                .into_iter()
                .map(|(name, descriptor)| (name.to_string(), descriptor))
                .collect(),
        }
    }

    /// Returns a registry where `service` uses `schema` instead of its default schema path.
    pub fn with_schema(mut self, service: &str, schema: impl Into<PathBuf>) -> Result<Self> {
        let descriptor = self
            .services
            .get_mut(service)
            .ok_or_else(|| OpsError::UnknownService(service.to_string()))?;
        descriptor.schema = schema.into();
        Ok(self)
    }

    /// Exact-match lookup; unknown names are an error.
    pub fn resolve(&self, service: &str) -> Result<&ServiceDescriptor> {
        self.services
            .get(service)
            .ok_or_else(|| OpsError::UnknownService(service.to_string()))
    }
}
