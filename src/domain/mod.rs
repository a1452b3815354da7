pub mod models;
pub mod policy;
pub mod seed;
pub mod sla;
