//! The core slot allocator.
//!
//! A [`SlotPool`] manages a fixed number of 32-bit slot words inside
//! caller-supplied storage. Each word is either a live handle (in-use bit
//! set) or a freelist link naming the next free slot in its low bits.
//! Records may carry payload next to the word, either interleaved after a
//! separate handle word (`[handle][payload]…`) or with the word embedded in
//! the payload itself at a fixed offset, so a single block of memory holds
//! both bookkeeping and data.

use core::fmt::{self, Debug, Formatter};
use core::sync::atomic::{AtomicU32, Ordering};

use super::{DebugEntry, Handle, InitError, InitFlags, Policy, RecordSpec};
use crate::storage::Storage;

/// Returns the storage size in bytes required for a pool of `max_handles`
/// records with `userdata_size` payload bytes each.
///
/// Pass `inline_handles = true` when the handle word lives inside the
/// payload at a caller-chosen offset (the record then is exactly the
/// payload); `false` adds a separate 4-byte handle word per record.
///
/// # Examples
/// ```
/// # use handlepool::pool::slot::memory_size_needed;
/// assert_eq!(memory_size_needed(8, 0, false), 32);
/// assert_eq!(memory_size_needed(8, 12, false), 128);
/// assert_eq!(memory_size_needed(8, 16, true), 128);
/// ```
pub const fn memory_size_needed(max_handles: u32, userdata_size: u32, inline_handles: bool) -> usize {
    let handle_size = if inline_handles { 0 } else { 4 };
    max_handles as usize * (handle_size + userdata_size as usize)
}

/// A fixed-capacity allocator of generation-checked 32-bit handles.
///
/// Reuse order (LIFO, FIFO, or lock-free LIFO) and the handle bit layout
/// are selected through [`InitFlags`] at construction; see the
/// [module documentation](crate::pool) for the layout details.
///
/// # Examples
/// ```
/// use handlepool::{InitFlags, SliceStorage, SlotPool};
/// use core::mem::MaybeUninit;
///
/// let mut backing = [MaybeUninit::<u32>::uninit(); 16];
/// let mut pool =
///     SlotPool::new(SliceStorage::from(&mut backing[..]), 16, InitFlags::LIFO).unwrap();
///
/// let (index, handle) = pool.acquire().unwrap();
/// assert!(pool.contains(handle));
/// assert_eq!(pool.index_of(handle), index);
///
/// assert_eq!(pool.release(handle), Some(index));
/// assert!(!pool.contains(handle));
/// assert_eq!(pool.release(handle), None);
/// ```
pub struct SlotPool<S: Storage> {
    buf: S,
    spec: RecordSpec,
    policy: Policy,
    userflag_bits: u32,
    size: AtomicU32,
    capacity: u32,
    capacity_mask: u32,
    generation_mask: u32,
    userflags_mask: u32,
    in_use_bit: u32,
    /// Head of the free chain. The thread-safe configuration packs an ABA
    /// serial into the bits above the index.
    freelist_dequeue: AtomicU32,
    /// Tail of the free chain; FIFO only.
    freelist_enqueue: u32,
}

impl<S: Storage> SlotPool<S> {
    /// Creates a pool of bare handles, 4 bytes per record, no payload.
    ///
    /// `max_handles` does not have to be a power of two. Under
    /// [`InitFlags::FIFO`] and [`InitFlags::THREAD_SAFE`] one slot is
    /// reserved for bookkeeping and [`capacity`](Self::capacity) reports one
    /// less than `max_handles`.
    pub fn new(storage: S, max_handles: u32, flags: InitFlags) -> Result<Self, InitError> {
        Self::with_config(storage, max_handles, 0, 4, 0, 0, flags)
    }

    /// Creates a pool whose records interleave `userdata_size` payload bytes
    /// after each handle word: `[handle][payload][handle][payload]…`.
    ///
    /// `userflag_bits` of the handle are reserved for caller flags. Payload
    /// alignment above 4 bytes cannot be serviced by this layout and must be
    /// handled by the caller (padding the payload size keeps the handle
    /// words aligned; `userdata_size` must be a multiple of 4).
    pub fn with_userdata(
        storage: S,
        max_handles: u32,
        userflag_bits: u32,
        userdata_size: u32,
        flags: InitFlags,
    ) -> Result<Self, InitError> {
        Self::with_config(storage, max_handles, userflag_bits, 4, 0, userdata_size, flags)
    }

    /// Creates a pool whose handle words live inside the caller's records:
    /// each record is `record_size` bytes and stores its handle word at
    /// `handle_offset`.
    ///
    /// After a successful acquire the record still holds bookkeeping in the
    /// handle word; callers initializing the payload must take care not to
    /// overwrite it.
    ///
    /// # Examples
    /// ```
    /// use handlepool::{InitFlags, SliceStorage, SlotPool};
    /// use core::mem::{offset_of, size_of, MaybeUninit};
    ///
    /// #[repr(C)]
    /// struct Body {
    ///     position: [u32; 3],
    ///     handle: u32,
    /// }
    ///
    /// let mut backing = [MaybeUninit::<u32>::uninit(); 32];
    /// let pool = SlotPool::with_inline_handles(
    ///     SliceStorage::from(&mut backing[..]),
    ///     8,
    ///     0,
    ///     size_of::<Body>() as u32,
    ///     offset_of!(Body, handle) as u32,
    ///     InitFlags::LIFO,
    /// )
    /// .unwrap();
    /// assert_eq!(pool.capacity(), 8);
    /// ```
    pub fn with_inline_handles(
        storage: S,
        max_handles: u32,
        userflag_bits: u32,
        record_size: u32,
        handle_offset: u32,
        flags: InitFlags,
    ) -> Result<Self, InitError> {
        Self::with_config(storage, max_handles, userflag_bits, 0, handle_offset, record_size, flags)
    }

    pub(crate) fn with_config(
        buf: S,
        max_handles: u32,
        userflag_bits: u32,
        handle_size: u32,
        handle_offset: u32,
        userdata_size: u32,
        flags: InitFlags,
    ) -> Result<Self, InitError> {
        debug_assert!(max_handles > 0);

        let mut err = InitError::empty();
        if userdata_size > 0xffff {
            err |= InitError::USERDATA_TOO_BIG;
        }
        if handle_size > 0xff {
            err |= InitError::HANDLE_SIZE_TOO_BIG;
        }
        if handle_offset > 0xff {
            err |= InitError::HANDLE_OFFSET_TOO_BIG;
        }
        if flags.contains(InitFlags::LIFO | InitFlags::FIFO) {
            err |= InitError::INVALID_INPUT_FLAGS;
        }

        let policy = if flags.contains(InitFlags::THREAD_SAFE) {
            if flags.contains(InitFlags::FIFO) {
                err |= InitError::THREAD_SAFE_UNSUPPORTED;
            }
            Policy::ConcurrentLifo
        } else if flags.contains(InitFlags::LIFO) {
            Policy::Lifo
        } else {
            Policy::Fifo
        };

        let rounded = match max_handles.checked_next_power_of_two() {
            Some(n) => n,
            None => {
                err |= InitError::CONFIGURATION_UNSUPPORTED;
                1
            }
        };
        let index_bits = rounded.trailing_zeros();
        if index_bits + userflag_bits >= 32 {
            err |= InitError::CONFIGURATION_UNSUPPORTED;
        }

        if !err.is_empty() {
            return Err(err);
        }

        let capacity_mask = rounded - 1;
        let userflags_raw = if userflag_bits > 0 {
            u32::MAX << (32 - userflag_bits)
        } else {
            0
        };

        let mut generation_mask = !(capacity_mask | userflags_raw);
        let in_use_bit;
        let userflags_mask;
        if flags.contains(InitFlags::IN_USE_BELOW_INDEX) {
            in_use_bit = capacity_mask + 1;
            // mask out the in-use bit, the lowest bit of the run
            generation_mask &= generation_mask << 1;
            userflags_mask = userflags_raw;
        } else {
            in_use_bit = 0x8000_0000;
            // the in-use bit is the MSB; generations start above the index
            generation_mask = (generation_mask >> 1) & !capacity_mask;
            userflags_mask = userflags_raw >> 1;
        }

        let stride = handle_size + userdata_size;
        debug_assert!(
            stride % 4 == 0 && handle_offset % 4 == 0,
            "handle words must stay 4-byte aligned"
        );
        debug_assert_eq!(buf.base_ptr() as usize % 4, 0);
        debug_assert!(buf.size_in_bytes() >= max_handles as usize * stride as usize);

        let mut pool = SlotPool {
            buf,
            spec: RecordSpec::new(stride, handle_offset, handle_size),
            policy,
            userflag_bits,
            size: AtomicU32::new(0),
            capacity: max_handles,
            capacity_mask,
            generation_mask,
            userflags_mask,
            in_use_bit,
            freelist_dequeue: AtomicU32::new(0),
            freelist_enqueue: 0,
        };
        pool.reset();
        Ok(pool)
    }

    #[inline]
    pub(crate) fn record_ptr(&self, index: u32) -> *mut u8 {
        debug_assert!(index < self.capacity);
        unsafe {
            self.buf
                .base_ptr()
                .add((self.spec.stride() * index) as usize)
        }
    }

    #[inline]
    fn word_atomic(&self, index: u32) -> &AtomicU32 {
        let ptr = unsafe { self.record_ptr(index).add(self.spec.handle_offset() as usize) };
        unsafe { &*(ptr as *const AtomicU32) }
    }

    /// All word reads are (relaxed) atomic loads so the `&self` query
    /// surface never races with the lock-free mutation paths.
    #[inline]
    pub(crate) fn word(&self, index: u32) -> u32 {
        self.word_atomic(index).load(Ordering::Relaxed)
    }

    #[inline]
    fn set_word(&mut self, index: u32, word: u32) {
        self.word_atomic(index).store(word, Ordering::Relaxed);
    }

    #[inline]
    fn generation_add(&self) -> u32 {
        if self.in_use_bit == 0x8000_0000 {
            self.capacity_mask + 1
        } else {
            (self.capacity_mask + 1) << 1
        }
    }

    /// Computes the generation of the next handle issued from a slot whose
    /// word currently reads `word`.
    ///
    /// With two or more generation bits, the step from the next-to-last
    /// generation jumps straight back to 1, skipping the all-ones and zero
    /// values. This keeps every issued handle distinct from `0` and
    /// `0xffff_ffff` under the default layout.
    #[inline]
    fn next_generation(&self, word: u32) -> u32 {
        let mask = self.generation_mask;
        let add = self.generation_add();
        let next_to_last = (mask << 1) & mask;
        if next_to_last != 0 && word & mask == next_to_last {
            add
        } else {
            word.wrapping_add(add) & mask
        }
    }

    /// Restores the pool to its freshly constructed state, invalidating all
    /// outstanding handles.
    ///
    /// Every slot word is seeded with the all-ones generation so that the
    /// first acquire of each slot wraps to generation 0. Barring releases, a
    /// serial default-layout pool therefore always hands out the same
    /// handles `in_use | 0`, `in_use | 1`, … regardless of its capacity,
    /// which lets callers define handle constants for resources that are
    /// created at startup.
    pub fn reset(&mut self) {
        let generation_mask = self.generation_mask;
        *self.size.get_mut() = 0;
        *self.freelist_dequeue.get_mut() = 0;
        self.freelist_enqueue = self.capacity - 1;

        for i in 0..self.capacity {
            self.set_word(i, (i + 1) | generation_mask);
        }
        // the last slot links back to 0
        self.set_word(self.capacity - 1, generation_mask);

        if self.policy == Policy::ConcurrentLifo {
            // slot 0 serves as the end-of-list sentinel
            *self.freelist_dequeue.get_mut() = 1;
        }
    }

    /// Returns the number of usable handles.
    ///
    /// One less than the configured maximum for FIFO and thread-safe pools,
    /// which reserve a slot for bookkeeping.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity - matches!(self.policy, Policy::Fifo | Policy::ConcurrentLifo) as u32
    }

    /// Returns the number of handles currently live.
    #[inline]
    pub fn len(&self) -> u32 {
        self.size.load(Ordering::Relaxed)
    }

    /// Returns `true` if no handles are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if every usable handle is live.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Returns the number of storage bytes the pool actually uses, the
    /// inverse of [`memory_size_needed`].
    #[inline]
    pub fn memory_size_allocated(&self) -> usize {
        self.capacity as usize * self.spec.stride() as usize
    }

    /// Acquires a handle with zero userflags.
    ///
    /// Returns the slot index alongside the handle, or [`None`] if every
    /// usable slot is live. The index is stable for the lifetime of the
    /// handle.
    #[inline]
    pub fn acquire(&mut self) -> Option<(u32, Handle)> {
        self.acquire_with_flags(0)
    }

    /// Acquires a handle carrying `userflags` in its flag bit-run.
    ///
    /// `userflags` must already be positioned within the configured mask;
    /// see [`flags_to_handle_bits`](Self::flags_to_handle_bits) for shifting
    /// plain values into place. Passing bits outside the mask is a
    /// programming error, checked in debug builds only.
    pub fn acquire_with_flags(&mut self, userflags: u32) -> Option<(u32, Handle)> {
        match self.policy {
            Policy::ConcurrentLifo => self.acquire_concurrent(userflags),
            policy => {
                debug_assert_eq!(userflags & self.userflags_mask, userflags);
                let usable = self.capacity - (policy == Policy::Fifo) as u32;
                if *self.size.get_mut() == usable {
                    return None;
                }

                let index = *self.freelist_dequeue.get_mut();
                let word = self.word(index);
                let next = word & self.capacity_mask;
                let handle = userflags | self.next_generation(word) | self.in_use_bit | index;
                debug_assert!(
                    self.generation_mask == 0
                        || word & self.generation_mask != handle & self.generation_mask
                );

                self.set_word(index, handle);
                *self.freelist_dequeue.get_mut() = next;
                *self.size.get_mut() += 1;
                Some((index, Handle::from_bits(handle)))
            }
        }
    }

    /// Releases a handle, returning its slot index, or [`None`] if the
    /// handle is stale (already released, recycled, or from another pool).
    /// An invalid handle leaves the pool untouched.
    pub fn release(&mut self, handle: Handle) -> Option<u32> {
        let h = handle.to_bits();
        let index = h & self.capacity_mask;
        if index >= self.capacity || h & self.in_use_bit == 0 || self.word(index) != h {
            return None;
        }

        match self.policy {
            Policy::ConcurrentLifo => self.release_concurrent(handle),
            Policy::Lifo => {
                let head = *self.freelist_dequeue.get_mut();
                // clear the in-use bit and link to the old head
                self.set_word(index, !self.in_use_bit & ((h & !self.capacity_mask) | head));
                *self.freelist_dequeue.get_mut() = index;
                *self.size.get_mut() -= 1;
                Some(index)
            }
            Policy::Fifo => {
                self.set_word(index, h & !self.in_use_bit);

                // splice at the tail, preserving the tail's generation
                let tail = self.freelist_enqueue;
                let tail_word = self.word(tail);
                debug_assert_eq!(tail_word & self.in_use_bit, 0);
                self.set_word(tail, (tail_word & !self.capacity_mask) | index);

                self.freelist_enqueue = index;
                *self.size.get_mut() -= 1;
                Some(index)
            }
        }
    }

    fn acquire_concurrent(&self, userflags: u32) -> Option<(u32, Handle)> {
        debug_assert_eq!(userflags & self.userflags_mask, userflags);
        let capacity_mask = self.capacity_mask;
        let serial_add = capacity_mask + 1;

        loop {
            let old = self.freelist_dequeue.load(Ordering::Acquire);
            let index = old & capacity_mask;
            if index == 0 {
                // sentinel reached: the free chain is exhausted
                return None;
            }

            let word = self.word_atomic(index).load(Ordering::Relaxed);
            let next = word & capacity_mask;
            let new = (old.wrapping_add(serial_add) & !capacity_mask) | next;

            if self
                .freelist_dequeue
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                let handle = userflags | self.next_generation(word) | self.in_use_bit | index;
                self.word_atomic(index).store(handle, Ordering::Release);
                self.size.fetch_add(1, Ordering::Relaxed);
                return Some((index, Handle::from_bits(handle)));
            }
        }
    }

    fn release_concurrent(&self, handle: Handle) -> Option<u32> {
        let h = handle.to_bits();
        let capacity_mask = self.capacity_mask;
        let index = h & capacity_mask;
        if index >= self.capacity || h & self.in_use_bit == 0 {
            return None;
        }

        let slot = self.word_atomic(index);
        if slot.load(Ordering::Relaxed) != h {
            return None;
        }
        debug_assert_ne!(index, 0, "the sentinel slot must never be released");

        // drop out of the live count before the slot becomes acquirable, so
        // len() never over-reports
        self.size.fetch_sub(1, Ordering::Relaxed);

        // keep generation and userflags in the free word
        let free_bits = h & !(capacity_mask | self.in_use_bit);
        let serial_add = capacity_mask + 1;
        loop {
            let old = self.freelist_dequeue.load(Ordering::Acquire);
            slot.store(free_bits | (old & capacity_mask), Ordering::Relaxed);
            let new = (old.wrapping_add(serial_add) & !capacity_mask) | index;
            if self
                .freelist_dequeue
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        Some(index)
    }

    /// Returns `true` if `handle` is live in this pool.
    ///
    /// The check compares the entire stored word against the handle, so a
    /// generation mismatch, userflag mismatch, or freed slot are all caught
    /// by a single load.
    pub fn contains(&self, handle: Handle) -> bool {
        let h = handle.to_bits();
        let index = h & self.capacity_mask;
        index < self.capacity && h & self.in_use_bit != 0 && self.word(index) == h
    }

    /// Returns `true` if the handle's own in-use bit is set.
    ///
    /// This inspects the passed-in bits only, not the stored word; use
    /// [`contains`](Self::contains) to test liveness.
    #[inline]
    pub fn is_in_use(&self, handle: Handle) -> bool {
        handle.to_bits() & self.in_use_bit != 0
    }

    /// Returns the slot index encoded in `handle` (stable for the handle's
    /// lifetime).
    #[inline]
    pub fn index_of(&self, handle: Handle) -> u32 {
        handle.to_bits() & self.capacity_mask
    }

    /// Reads the current userflags of the slot `handle` refers to.
    ///
    /// The result may differ from the bits inside `handle` if the flags were
    /// rewritten through [`set_userflags`](Self::set_userflags). Assumes the
    /// handle is valid; check [`contains`](Self::contains) first if unsure.
    pub fn userflags(&self, handle: Handle) -> u32 {
        self.word(self.index_of(handle)) & self.userflags_mask
    }

    /// Rewrites the userflag bits of a live handle's slot in place and
    /// returns the previous flags.
    ///
    /// The handle stays valid under its new flags (validity ignores the
    /// flag bits of outstanding handle copies only in the sense that the
    /// stored word is the source of truth; copies made before the rewrite
    /// will no longer pass [`contains`](Self::contains)). Passing a stale
    /// handle or flags outside the mask is a programming error, checked in
    /// debug builds.
    pub fn set_userflags(&mut self, handle: Handle, userflags: u32) -> u32 {
        debug_assert_eq!(userflags & self.userflags_mask, userflags);
        debug_assert!(self.valid_ignoring_userflags(handle));

        let index = self.index_of(handle);
        let old = self.word(index);
        self.set_word(index, (old & !self.userflags_mask) | userflags);
        old & self.userflags_mask
    }

    fn valid_ignoring_userflags(&self, handle: Handle) -> bool {
        let h = handle.to_bits();
        let index = h & self.capacity_mask;
        let mask = !self.userflags_mask;
        index < self.capacity && h & self.in_use_bit != 0 && self.word(index) & mask == h & mask
    }

    /// Shifts a plain value (an enum discriminant, say) into the handle's
    /// userflag bit-run, ready for [`acquire_with_flags`](Self::acquire_with_flags).
    #[inline]
    pub fn flags_to_handle_bits(&self, value: u32) -> u32 {
        debug_assert!(self.userflag_bits > 0);
        value << self.userflags_shift()
    }

    /// Extracts the userflag bit-run of `handle` back into a plain value;
    /// the inverse of [`flags_to_handle_bits`](Self::flags_to_handle_bits).
    #[inline]
    pub fn flags_from_handle_bits(&self, handle: Handle) -> u32 {
        debug_assert!(self.userflag_bits > 0);
        (handle.to_bits() & self.userflags_mask) >> self.userflags_shift()
    }

    #[inline]
    fn userflags_shift(&self) -> u32 {
        32 - self.userflag_bits - (self.in_use_bit == 0x8000_0000) as u32
    }

    /// Returns a pointer to the payload bytes of a live handle's record, or
    /// [`None`] if the handle is stale.
    ///
    /// With inline handles the pointer addresses the start of the record
    /// (which contains the handle word at its configured offset).
    pub fn userdata_ptr(&self, handle: Handle) -> Option<*mut u8> {
        if !self.contains(handle) {
            return None;
        }
        Some(self.userdata_ptr_at(self.index_of(handle)))
    }

    /// Returns a pointer to the payload bytes of the record at `index`
    /// without validating liveness.
    pub fn userdata_ptr_at(&self, index: u32) -> *mut u8 {
        unsafe { self.record_ptr(index).add(self.spec.userdata_offset() as usize) }
    }

    /// Returns a view of a thread-safe pool that can be shared across
    /// threads, or [`None`] for serial pools.
    pub fn shared(&self) -> Option<SharedSlotPool<'_, S>> {
        if self.policy == Policy::ConcurrentLifo {
            Some(SharedSlotPool { pool: self })
        } else {
            None
        }
    }

    /// Claims the sentinel slot of a thread-safe pool, turning it into an
    /// ordinary live handle.
    ///
    /// The thread-safe freelist reserves slot 0 as its end-of-list marker.
    /// Before any concurrent use begins the slot can be repurposed for a
    /// resource that lives as long as the pool itself; the exclusive
    /// borrow guarantees no other thread is active. The returned handle
    /// **must never be released**; doing so would corrupt the freelist
    /// (checked in debug builds).
    ///
    /// Returns [`None`] for serial pools or if the sentinel was already
    /// claimed. The handle is deterministic: with the default layout it is
    /// always `0x8000_0000`, independent of capacity.
    pub fn claim_sentinel(&mut self, userflags: u32) -> Option<(u32, Handle)> {
        if self.policy != Policy::ConcurrentLifo {
            return None;
        }
        let word = self.word(0);
        if word & self.in_use_bit != 0 {
            return None;
        }

        debug_assert_eq!(userflags & self.userflags_mask, userflags);
        let handle = userflags | self.next_generation(word) | self.in_use_bit;
        self.set_word(0, handle);
        *self.size.get_mut() += 1;
        Some((0, Handle::from_bits(handle)))
    }

    /// Creates an iterator over all live handles, in slot order.
    pub fn handles(&self) -> Handles<'_, S> {
        Handles {
            pool: self,
            index: 0,
        }
    }
}

impl<S: Storage> Debug for SlotPool<S> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("SlotPool")
            .field("len", &self.len())
            .field("freelist_dequeue", &self.freelist_dequeue.load(Ordering::Relaxed))
            .field("slots", &DebugSlots(self))
            .finish()
    }
}

struct DebugSlots<'a, S: Storage>(&'a SlotPool<S>);

impl<S: Storage> Debug for DebugSlots<'_, S> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        fmt.debug_list()
            .entries((0..self.0.capacity).map(|i| {
                let word = self.0.word(i);
                if word & self.0.in_use_bit != 0 {
                    DebugEntry::Occupied {
                        handle: Handle::from_bits(word),
                    }
                } else {
                    DebugEntry::Vacant {
                        generation: word & self.0.generation_mask,
                        next_free_slot: word & self.0.capacity_mask,
                    }
                }
            }))
            .finish()
    }
}

/// An iterator over the live handles of a [`SlotPool`], in slot order.
///
/// This `struct` is created by [`SlotPool::handles`].
pub struct Handles<'a, S: Storage> {
    pool: &'a SlotPool<S>,
    index: u32,
}

impl<S: Storage> Iterator for Handles<'_, S> {
    type Item = Handle;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.pool.capacity {
            let word = self.pool.word(self.index);
            self.index += 1;
            if word & self.pool.in_use_bit != 0 {
                return Some(Handle::from_bits(word));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some((self.pool.capacity - self.index) as usize))
    }
}

impl<S: Storage> core::iter::FusedIterator for Handles<'_, S> {}

/// A `Copy`-able view of a thread-safe [`SlotPool`] whose operations take
/// `&self`, allowing concurrent acquire and release from any number of
/// threads.
///
/// Created by [`SlotPool::shared`]; only thread-safe pools produce one.
/// All operations are lock-free: the freelist head carries a serial number
/// next to the index, so a compare-and-swap never mistakes an A-B-A head
/// change for an unchanged freelist.
pub struct SharedSlotPool<'a, S: Storage> {
    pool: &'a SlotPool<S>,
}

impl<S: Storage> Clone for SharedSlotPool<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Storage> Copy for SharedSlotPool<'_, S> {}

impl<S: Storage> SharedSlotPool<'_, S> {
    /// Acquires a handle with zero userflags; see [`SlotPool::acquire`].
    #[inline]
    pub fn acquire(&self) -> Option<(u32, Handle)> {
        self.pool.acquire_concurrent(0)
    }

    /// Acquires a handle carrying `userflags`; see
    /// [`SlotPool::acquire_with_flags`].
    #[inline]
    pub fn acquire_with_flags(&self, userflags: u32) -> Option<(u32, Handle)> {
        self.pool.acquire_concurrent(userflags)
    }

    /// Releases a handle, returning its slot index, or [`None`] if the
    /// handle is stale; see [`SlotPool::release`].
    #[inline]
    pub fn release(&self, handle: Handle) -> Option<u32> {
        self.pool.release_concurrent(handle)
    }

    /// Returns `true` if `handle` is live; see [`SlotPool::contains`].
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.pool.contains(handle)
    }

    /// Returns the slot index encoded in `handle`.
    #[inline]
    pub fn index_of(&self, handle: Handle) -> u32 {
        self.pool.index_of(handle)
    }

    /// Returns the number of handles currently live.
    #[inline]
    pub fn len(&self) -> u32 {
        self.pool.len()
    }

    /// Returns `true` if no handles are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Returns the number of usable handles.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.pool.capacity()
    }
}
