//! Application layer: the operations the `opsctl` commands run.
//!
//! Both operations talk to remote services only through the `RpcTransport`
//! port, so they run unchanged against the woorl gateway or an in-memory fake.

pub mod purge;
pub mod registration;
pub mod repository;
