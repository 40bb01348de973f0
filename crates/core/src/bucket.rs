//! Bump-allocated regions backing AST lifetimes.
//!
//! A `Bucket` partitions small, short-lived objects out of a chain of fixed
//! capacity regions and bulk-frees them all at once when dropped. Chunk
//! chaining on exhaustion is delegated to `bumpalo::Bump`, which already
//! prepends a fresh chunk when the current one can't satisfy a request —
//! reimplementing that bookkeeping by hand would just be relitigating what
//! the allocator already does correctly.

use bumpalo::Bump;

/// A bump-allocated region. Objects partitioned from a bucket live until the
/// bucket itself is dropped; they must not outlive it.
pub struct Bucket {
    bump: Bump,
    capacity: usize,
}

impl Bucket {
    /// Allocate a bucket with the given region capacity, in bytes.
    ///
    /// Panics (host-fatal) on a zero-capacity request — there is no
    /// meaningful bucket that can hold nothing.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("ERROR: Cannot allocate a Bucket with zero capacity");
        }
        Bucket {
            bump: Bump::with_capacity(capacity),
            capacity,
        }
    }

    /// Partition `value` out of this bucket, returning a reference whose
    /// lifetime is tied to the bucket.
    ///
    /// Panics (host-fatal) if a single value is larger than the bucket's
    /// configured region capacity — mirrors the original allocator's
    /// "request larger than region" failure mode.
    pub fn alloc<T>(&self, value: T) -> &T {
        let size = std::mem::size_of::<T>();
        if size > self.capacity {
            panic!(
                "ERROR: Failed to partition a Bucket: requested {size} from a bucket of {} capacity",
                self.capacity
            );
        }
        self.bump.alloc(value)
    }

    /// Partition a string's characters out of this bucket.
    pub fn alloc_str(&self, s: &str) -> &str {
        self.bump.alloc_str(s)
    }

    /// Partition a copy-able slice out of this bucket.
    pub fn alloc_slice_copy<T: Copy>(&self, slice: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(slice)
    }

    /// Total bytes partitioned out of this bucket so far.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

// `free` is simply `Drop` — bumpalo releases every chunk in the chain at
// once, matching `Xvr_freeBucket`'s bulk free.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "zero capacity")]
    fn zero_capacity_is_fatal() {
        Bucket::new(0);
    }

    #[test]
    #[should_panic(expected = "Failed to partition")]
    fn oversized_request_is_fatal() {
        let bucket = Bucket::new(4);
        bucket.alloc([0u8; 64]);
    }

    #[test]
    fn partitions_many_small_objects() {
        let bucket = Bucket::new(1024);
        let mut refs = Vec::new();
        for i in 0..200i32 {
            refs.push(bucket.alloc(i));
        }
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i as i32);
        }
    }

    #[test]
    fn chains_new_region_on_exhaustion() {
        let bucket = Bucket::new(64);
        // Request more than a single 64-byte region can hold in total;
        // bumpalo must chain additional chunks rather than failing.
        for _ in 0..1000 {
            bucket.alloc([0u8; 32]);
        }
        assert!(bucket.allocated_bytes() >= 1000 * 32);
    }
}
