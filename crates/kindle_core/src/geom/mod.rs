//! Integer geometry used by contact scanning.

mod bitmask;
mod rect;

pub use bitmask::BitMask;
pub use rect::Rect;
