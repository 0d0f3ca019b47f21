pub mod actions;
pub mod assertions;
pub mod setup;

// Re-export main utilities for use by test files
pub use assertions::ResponseAssertion;
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
