//! Index-addressed object storage.

mod arena;

pub use arena::{Arena, Iter, IterMut};
