//! Adapters behind the `RpcTransport` port.

pub mod in_memory;
pub mod woorl;
