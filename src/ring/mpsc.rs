//! Multi-producer single-consumer bounded ring.

use super::RingError;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    seq: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// A bounded lock-free FIFO that admits many producers and one consumer.
///
/// Producers claim a slot with a CAS on the tail counter and then publish it
/// by advancing the slot's sequence stamp; the consumer observes a slot as
/// ready only once the stamp says the write completed, so a claim-then-write
/// race can never surface a half-written item.
pub struct MpscRing<T> {
    mask: usize,
    slots: Box<[Slot<T>]>,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for MpscRing<T> {}
unsafe impl<T: Send> Sync for MpscRing<T> {}

impl<T> MpscRing<T> {
    /// Create a ring with the given capacity.
    ///
    /// # Errors
    /// Returns [`RingError::CapacityNotPowerOfTwo`] unless `capacity` is a
    /// non-zero power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(RingError::CapacityNotPowerOfTwo(capacity));
        }
        let slots = (0..capacity)
            .map(|i| Slot {
                seq: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            mask: capacity - 1,
            slots,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Push an item from any producer thread. On a full ring the item is
    /// handed back so the caller can decide to drop, retry, or shed load.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[tail & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let dif = seq as isize - tail as isize;
            if dif == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            (*slot.value.get()).write(item);
                        }
                        slot.seq.store(tail.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => tail = current,
                }
            } else if dif < 0 {
                return Err(item);
            } else {
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Pop the oldest item, or `None` when the ring is empty.
    ///
    /// Must only be called from the single consumer thread.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.slots[head & self.mask];
        let seq = slot.seq.load(Ordering::Acquire);
        let dif = seq as isize - head.wrapping_add(1) as isize;
        if dif < 0 {
            return None;
        }
        let item = unsafe { (*slot.value.get()).assume_init_read() };
        slot.seq
            .store(head.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Number of items currently buffered. Approximate under concurrent
    /// producers.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.mask + 1)
    }

    /// Whether the ring holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed slot capacity.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<T> Drop for MpscRing<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
