//! On-disk formats

pub mod checkpoint;
