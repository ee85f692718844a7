// Application layer - Services and the ports they depend on
pub mod dashboard_service;
pub mod poller;
pub mod preference_store;
pub mod transport;
