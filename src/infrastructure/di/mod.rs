//! Dependency injection: wires settings, I/O implementations and services.

mod service_container;

pub use service_container::ServiceContainer;
