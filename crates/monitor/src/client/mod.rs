//! HTTP clients.

mod manager;

pub use manager::ManagerClient;
