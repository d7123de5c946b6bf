#![no_std]
#![warn(missing_docs)]

//! Constant-capacity 32-bit handle allocators.
//!
//! Handles are compact identifiers that refer to slots in a caller-supplied
//! memory region. Each handle encodes a slot index and a generation counter,
//! so references to slots that have been freed (and possibly handed out
//! again) are detected with high probability. A configurable number of the
//! most significant bits can be reserved for caller-defined flags that
//! travel inside the handle.
//!
//! Three building blocks are provided, bottom-up:
//!
//! * [`SparseSet`]: the minimal dense↔sparse index mapping, maintaining
//!   `dense[sparse[i]] == i` for all live `i`. Doubles as a standalone LIFO
//!   index allocator after [`reset_identity`](SparseSet::reset_identity).
//! * [`SlotPool`]: the core allocator. One 32-bit word per slot serves as
//!   the live handle while the slot is in use and as a freelist link while
//!   it is free. Reuse order is LIFO, FIFO, or lock-free LIFO, selected at
//!   construction; records may interleave caller payload with the handle
//!   words.
//! * [`PackedPool`]: dense/sparse bookkeeping composed on top of
//!   [`SlotPool`]: live records stay contiguous even as handles are freed in
//!   arbitrary order, and every release reports which dense record moved so
//!   the caller can mirror the move in external arrays.
//!
//! None of the structures allocate: capacity is fixed at construction and
//! all state lives in storage the caller provides (see [`Storage`]).

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod pool;
pub mod sparse;
pub mod storage;

pub use crate::pool::packed::PackedPool;
pub use crate::pool::slot::{SharedSlotPool, SlotPool};
pub use crate::pool::{Handle, InitError, InitFlags, MoveReport, INVALID_INDEX};
pub use crate::sparse::{IndexWidth, SparseSet};
#[cfg(feature = "alloc")]
pub use crate::storage::HeapStorage;
pub use crate::storage::{SliceStorage, Storage};
