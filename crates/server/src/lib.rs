pub mod bootstrap;
pub mod correlation;
pub mod crm;
pub mod extract;
pub mod health;
pub mod routes;

pub use bootstrap::{bootstrap, build_router, serve, Application, BootstrapError};
pub use crm::LoggingCrmAdapter;
