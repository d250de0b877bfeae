pub mod insight;
pub mod metrics;
