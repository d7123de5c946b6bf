//! Pool-based handle allocation.
//!
//! A pool hands out 32-bit [`Handle`]s referring to fixed-stride records in
//! caller-supplied storage. From most to least significant, a handle packs
//! an in-use bit, optional caller flags, a generation counter, and the slot
//! index:
//!
//! ```text
//! MSB                                                              LSB
//! +----------------------------------------------------------------+
//! | in-use | userflags (optional) | generation | slot index        |
//! +----------------------------------------------------------------+
//! ```
//!
//! With [`InitFlags::IN_USE_BELOW_INDEX`] the in-use bit instead sits just
//! above the index bits, leaving the most significant bits entirely to the
//! caller flags:
//!
//! ```text
//! MSB                                                              LSB
//! +----------------------------------------------------------------+
//! | userflags (optional) | generation | in-use | slot index        |
//! +----------------------------------------------------------------+
//! ```
//!
//! The same 32-bit word that holds a live handle doubles as the freelist
//! link while the slot is free; the in-use bit tells the two states apart.
//! Every reuse of a slot bumps its generation, so a stale handle to a
//! recycled slot no longer compares equal to the stored word and is
//! rejected.

pub mod packed;
pub mod slot;

use bitflags::bitflags;
use core::fmt::{self, Debug, Formatter};

/// Sentinel written into the dense-index field of released records; never a
/// valid slot index or dense position.
pub const INVALID_INDEX: u32 = u32::MAX;

/// A reference to a slot in a pool, stable until released.
///
/// The bit layout of a handle depends on how its pool was configured, so a
/// handle is only meaningful to the pool that issued it. With two or more
/// generation bits and the default layout, no issued handle is ever `0` or
/// `0xffff_ffff`, leaving both values free for use as sentinels by callers.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    /// Reconstructs a handle from its raw bit pattern.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Handle(bits)
    }

    /// Returns the raw bit pattern of the handle.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }
}

impl Debug for Handle {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        write!(fmt, "Handle({:#010x})", self.0)
    }
}

static_assertions::assert_eq_size!(Handle, u32);
static_assertions::assert_eq_align!(Handle, u32);

bitflags! {
    /// Configuration flags for pool construction.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct InitFlags: u32 {
        /// Reuse freed slots most-recently-freed first.
        const LIFO = 1 << 0;
        /// Reuse freed slots in the order they were freed. Reserves one
        /// slot for freelist bookkeeping, so one fewer handle is usable.
        const FIFO = 1 << 1;
        /// Allow concurrent acquire/release from multiple threads
        /// (lock-free, LIFO only). Slot 0 becomes a permanent sentinel,
        /// so one fewer handle is usable.
        const THREAD_SAFE = 1 << 2;
        /// Store the in-use bit just above the index bits instead of in
        /// the most significant bit.
        const IN_USE_BELOW_INDEX = 1 << 3;
    }
}

bitflags! {
    /// Constraint violations detected at pool construction.
    ///
    /// Every violated constraint is reported, so the error value may carry
    /// several bits at once.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct InitError: u32 {
        /// The index bits plus the requested userflag bits do not leave
        /// room for the in-use bit within 32 bits.
        const CONFIGURATION_UNSUPPORTED = 1 << 0;
        /// `THREAD_SAFE` was combined with `FIFO`, or requested where
        /// concurrency is not supported.
        const THREAD_SAFE_UNSUPPORTED = 1 << 1;
        /// The per-record payload size exceeds 65535 bytes.
        const USERDATA_TOO_BIG = 1 << 2;
        /// The byte offset of the handle within a record exceeds 255.
        const HANDLE_OFFSET_TOO_BIG = 1 << 3;
        /// The non-inline handle region of a record exceeds 255 bytes.
        const HANDLE_SIZE_TOO_BIG = 1 << 4;
        /// Contradictory flags were passed (both `LIFO` and `FIFO`).
        const INVALID_INPUT_FLAGS = 1 << 5;
    }
}

/// Where a release moved the back record of a packed region.
///
/// Returned by operations that keep live records contiguous by swapping the
/// back of the region into the vacated position. The caller is responsible
/// for mirroring the move in any external array indexed by dense position:
///
/// ```
/// # use handlepool::{InitFlags, PackedPool, SliceStorage};
/// # use core::mem::MaybeUninit;
/// # let mut backing = [MaybeUninit::<u32>::uninit(); 12];
/// # let mut names = ["", "", "", ""];
/// # let mut pool =
/// #     PackedPool::new(SliceStorage::from(&mut backing[..]), 4, InitFlags::LIFO).unwrap();
/// # let (d, handle) = pool.acquire().unwrap();
/// # names[d as usize] = "first";
/// let report = pool.release(handle).unwrap();
/// if report.moved() {
///     names[report.to as usize] = names[report.from as usize];
/// }
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveReport {
    /// Dense index the back record was moved from (the old back position).
    pub from: u32,
    /// Dense index the back record was moved to (the vacated position).
    pub to: u32,
}

impl MoveReport {
    /// Returns `true` if a record actually changed position, i.e. the
    /// released record was not already at the back of the packed region.
    #[inline]
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Reuse discipline, fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Policy {
    Lifo,
    Fifo,
    ConcurrentLifo,
}

/// Packed record descriptor: stride in the low 16 bits, handle byte offset
/// in bits 16..24, payload byte offset (= non-inline handle size, 0 when
/// the handle is inlined in the payload) in bits 24..32.
#[derive(Clone, Copy)]
pub(crate) struct RecordSpec(u32);

impl RecordSpec {
    #[inline]
    pub(crate) fn new(stride: u32, handle_offset: u32, userdata_offset: u32) -> Self {
        RecordSpec((stride & 0xffff) | ((handle_offset & 0xff) << 16) | ((userdata_offset & 0xff) << 24))
    }

    #[inline]
    pub(crate) fn stride(self) -> u32 {
        self.0 & 0xffff
    }

    #[inline]
    pub(crate) fn handle_offset(self) -> u32 {
        (self.0 >> 16) & 0xff
    }

    #[inline]
    pub(crate) fn userdata_offset(self) -> u32 {
        (self.0 >> 24) & 0xff
    }
}

#[derive(Debug)]
pub(crate) enum DebugEntry {
    Occupied { handle: Handle },
    Vacant { generation: u32, next_free_slot: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_spec_packing() {
        let spec = RecordSpec::new(16, 12, 4);
        assert_eq!(spec.stride(), 16);
        assert_eq!(spec.handle_offset(), 12);
        assert_eq!(spec.userdata_offset(), 4);

        let bare = RecordSpec::new(4, 0, 4);
        assert_eq!(bare.stride(), 4);
        assert_eq!(bare.handle_offset(), 0);
        assert_eq!(bare.userdata_offset(), 4);
    }

    #[test]
    fn move_report_moved() {
        assert!(MoveReport { from: 3, to: 1 }.moved());
        assert!(!MoveReport { from: 2, to: 2 }.moved());
    }
}
