//! Application use cases: job control, billing, vector memory.

pub mod billing;
pub mod job_controller;
pub mod vector_memory;

pub use billing::BillingService;
pub use job_controller::JobController;
pub use vector_memory::VectorMemory;
