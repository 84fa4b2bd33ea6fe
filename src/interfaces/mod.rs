//! Input adapters.

pub mod csv;
