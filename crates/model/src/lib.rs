pub mod client;
pub mod confirm;
pub mod errors;
pub mod ids;
pub mod schedule;
pub mod selection;
pub mod session;
pub mod subscription;
pub mod training;
pub mod tx;
