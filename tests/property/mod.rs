pub mod cache;
pub mod circuit_breaker;
