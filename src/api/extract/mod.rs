pub mod models;
pub mod dto;
pub mod handlers;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use service::ExtractService;
