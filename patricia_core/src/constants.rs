//! Constants and configuration for Patricia tree

use crate::types::NodeId;

/// Arena slot of the root sentinel.
pub const ROOT: NodeId = 0;
/// Reserved id for an absent child (only the sentinel's right slot).
pub const NIL: NodeId = NodeId::MAX;
/// Largest number of arena slots addressable by a `NodeId` (NIL excluded).
pub const MAX_NODES: usize = NIL as usize;

/// Split position of the root sentinel; below every real bit position.
pub const ROOT_SPLIT: isize = -1;

/// Bits per key byte in the framed view: one presence bit + 8 data bits.
pub const FRAME_BITS: usize = 9;

pub const DEFAULT_CAPACITY: usize = 64;
