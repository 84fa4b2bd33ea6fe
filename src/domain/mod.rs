//! Domain types shared by the operational commands.

pub mod endpoint;
pub mod payment;
pub mod ports;
pub mod repository;
pub mod service;
pub mod snapshot;
