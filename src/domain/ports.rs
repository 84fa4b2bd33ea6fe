use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One positional argument of an RPC call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcArg {
    /// Structured argument, sent as compact JSON text.
    Json(Value),
    /// Scalar argument, sent unchanged.
    Raw(String),
}

impl RpcArg {
    pub fn json(value: impl serde::Serialize) -> Result<Self> {
        Ok(RpcArg::Json(serde_json::to_value(value)?))
    }

    pub fn to_wire(&self) -> String {
        match self {
            RpcArg::Json(value) => value.to_string(),
            RpcArg::Raw(text) => text.clone(),
        }
    }
}

impl From<Value> for RpcArg {
    fn from(value: Value) -> Self {
        RpcArg::Json(value)
    }
}

impl From<String> for RpcArg {
    fn from(text: String) -> Self {
        RpcArg::Raw(text)
    }
}

/// Result of a tolerant call: the remote either answered or rejected the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Completed(String),
    Failed,
}

impl CallOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CallOutcome::Failed)
    }
}

/// Port for invoking remote services by logical name.
///
/// `call` treats a rejected call as an error that callers are expected to
/// propagate; `call_tolerant` hands the rejection back as [`CallOutcome::Failed`].
/// Failing to reach the transport at all is an error for both.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, service: &str, function: &str, args: &[RpcArg]) -> Result<String>;

    async fn call_tolerant(
        &self,
        service: &str,
        function: &str,
        args: &[RpcArg],
    ) -> Result<CallOutcome>;
}

pub type RpcTransportBox = Box<dyn RpcTransport>;
