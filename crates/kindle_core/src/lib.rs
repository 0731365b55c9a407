//! Kindle Engine Core
//!
//! Contains the building blocks shared by every simulation system:
//! - Type registry and aspects
//! - Object arena
//! - Entity registry with lifecycle listeners
//! - Integer geometry and bit masks
//! - Configuration and fixed-step time

pub mod aspect;
pub mod bitset;
pub mod config;
pub mod ecs;
pub mod geom;
pub mod math;
pub mod pool;
pub mod time;
pub mod types;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
