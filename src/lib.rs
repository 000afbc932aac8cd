pub mod completion;
pub mod config;
pub mod core;
pub mod insight;
pub mod market;
pub mod models;
pub mod report;
pub mod store;
#[cfg(test)]
pub mod test_helpers;
