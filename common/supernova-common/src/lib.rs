//! Utility types shared by the CPU and system crates.

pub mod boxedarray;
pub mod num;
pub mod video;
