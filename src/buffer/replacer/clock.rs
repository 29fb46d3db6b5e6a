//! CLOCK (second-chance) replacement policy.
//!
//! The clock hand sweeps the frame descriptors in circular order. A frame
//! with its reference bit set loses the bit and is passed over once; an
//! unreferenced, unpinned frame is the victim. Empty frames are taken
//! immediately.

use crate::buffer::frame::FrameDescriptor;
use crate::common::FrameId;

/// Clock hand over a fixed number of frames.
///
/// The replacer only chooses; writing back a dirty victim and unmapping it
/// is the buffer pool's job.
#[derive(Debug)]
pub struct ClockReplacer {
    hand: FrameId,
    pool_size: usize,
}

impl ClockReplacer {
    /// Create a clock over `pool_size` frames.
    ///
    /// The hand starts on the last frame so the first sweep begins at
    /// frame 0.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        Self {
            hand: FrameId::new(pool_size - 1),
            pool_size,
        }
    }

    /// Frame the hand currently points at.
    #[inline]
    pub fn hand(&self) -> FrameId {
        self.hand
    }

    #[inline]
    fn advance(&mut self) -> FrameId {
        self.hand = self.hand.next(self.pool_size);
        self.hand
    }

    /// Pick a frame to (re)use.
    ///
    /// Returns either an empty frame or a valid, unpinned frame whose
    /// reference bit was already clear. Reference bits of frames passed over
    /// are cleared along the way.
    ///
    /// A lap is one inspection of every frame. If a lap ends without having
    /// cleared any reference bit, nothing can become evictable and `None` is
    /// returned. Otherwise a further lap runs, so a pool where every frame
    /// was merely referenced still yields a victim.
    pub fn victim(&mut self, frames: &mut [FrameDescriptor]) -> Option<FrameId> {
        debug_assert_eq!(frames.len(), self.pool_size);

        let mut saw_candidate = false;
        let mut inspected = 0;

        loop {
            let frame_id = self.advance();
            let frame = &mut frames[frame_id.0];

            if !frame.is_valid() {
                return Some(frame_id);
            }
            if frame.refbit() {
                frame.clear_refbit();
                saw_candidate = true;
            } else if !frame.is_pinned() {
                return Some(frame_id);
            }

            inspected += 1;
            if inspected == self.pool_size {
                if !saw_candidate {
                    return None;
                }
                saw_candidate = false;
                inspected = 0;
            }
        }
    }
}
