//! Repository layer
//!
//! Repositories are thin adapters over the provider HTTP clients. They
//! expose exactly the operations the dispatcher needs, without any business
//! logic, and turn client errors into `anyhow` errors with context.
//!
//! All repositories are trait-based to enable testing and mocking.

mod ci;
mod compute;

// Re-export traits
pub use ci::CiRepository;
pub use compute::ComputeRepository;

// Re-export implementations
pub use ci::HttpCiRepository;
pub use compute::HttpComputeRepository;
