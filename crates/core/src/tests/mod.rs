#[cfg(feature = "sqlite")]
mod integration_tests;
