pub mod product;
pub mod report;

// Re-exports for convenience
pub use product::*;
pub use report::*;
