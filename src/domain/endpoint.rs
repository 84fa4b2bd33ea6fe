use super::service::ServiceDescriptor;
use std::env;

/// Where a tool looks for its host and port when they are not given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDefaults {
    pub host_env: &'static str,
    pub port_env: &'static str,
    pub host: &'static str,
    pub port: u16,
}

impl EndpointDefaults {
    /// Fistful-hosted services, including the domain config repository.
    pub const FISTFUL: Self = Self {
        host_env: "FISTFUL_IPADDR",
        port_env: "FISTFUL_PORT",
        host: "fistful_server",
        port: 8022,
    };

    pub const HELLGATE: Self = Self {
        host_env: "HELLGATE",
        port_env: "HELLGATE_PORT",
        host: "hellgate",
        port: 8022,
    };
}

/// A resolved host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Resolves host and port from the process environment.
    ///
    /// Precedence for each part: explicit argument, then environment variable, then default.
    pub fn resolve(host: Option<String>, port: Option<u16>, defaults: &EndpointDefaults) -> Self {
        Self::resolve_with(host, port, defaults, |key| env::var(key).ok())
    }

    /// Same as [`Endpoint::resolve`] with an injectable environment lookup.
    pub fn resolve_with(
        host: Option<String>,
        port: Option<u16>,
        defaults: &EndpointDefaults,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let host = host
            .filter(|h| !h.is_empty())
            .or_else(|| lookup(defaults.host_env).filter(|h| !h.is_empty()))
            .unwrap_or_else(|| defaults.host.to_string());
        let port = port
            .or_else(|| lookup(defaults.port_env).and_then(|p| p.trim().parse().ok()))
            .unwrap_or(defaults.port);
        Self { host, port }
    }

    /// Full service URL for `descriptor` on this endpoint.
    pub fn url(&self, descriptor: &ServiceDescriptor) -> String {
        format!("http://{}:{}{}", self.host, self.port, descriptor.path)
    }
}
