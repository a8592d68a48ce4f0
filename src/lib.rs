pub mod core;
pub mod distribution;
pub mod domain;
pub mod issuance;
