//! File output for trace results.

pub mod export;
