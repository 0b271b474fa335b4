pub mod builder;
mod types;

// Re-exports
pub use {
    builder::build,
    types::{Joint, Skeleton},
};
