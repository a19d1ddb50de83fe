// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frame slots for frames in flight.

use tessera_core::config::MAX_FRAMES_IN_FLIGHT;
use tessera_core::logging::LogLayer;
use tessera_core::rhi_ensure;

/// One `T` per frame in flight, selected by `frame % N`.
///
/// Typical slots hold a command buffer, a fence and the semaphores of one
/// frame. The CPU records into the current slot while the GPU may still be
/// executing the others.
///
/// ```ignore
/// let mut frames = FrameRing::new(2, |_| FrameResources::new(&device))?;
/// loop {
///     frames.current_mut().fence.wait();
///     // record and submit with the current slot
///     frames.advance();
/// }
/// ```
#[derive(Debug)]
pub struct FrameRing<T> {
    slots: Vec<T>,
    frame: u64,
}

impl<T> FrameRing<T> {
    /// Builds `count` slots, `1..=3`, with `make(slot_index)`.
    ///
    /// # Errors
    ///
    /// The first error returned by `make`.
    pub fn new<E>(count: u32, mut make: impl FnMut(usize) -> Result<T, E>) -> Result<Self, E> {
        rhi_ensure!(
            (1..=MAX_FRAMES_IN_FLIGHT).contains(&count),
            LogLayer::Rhi,
            "{} frames in flight, expected 1..={}",
            count,
            MAX_FRAMES_IN_FLIGHT
        );
        let slots = (0..count as usize)
            .map(&mut make)
            .collect::<Result<Vec<T>, E>>()?;
        Ok(Self { slots, frame: 0 })
    }

    /// Wraps already built slots.
    pub fn from_slots(slots: Vec<T>) -> Self {
        rhi_ensure!(
            (1..=MAX_FRAMES_IN_FLIGHT as usize).contains(&slots.len()),
            LogLayer::Rhi,
            "{} frames in flight, expected 1..={}",
            slots.len(),
            MAX_FRAMES_IN_FLIGHT
        );
        Self { slots, frame: 0 }
    }

    /// The slot of the current frame.
    pub fn current(&self) -> &T {
        &self.slots[self.slot_index()]
    }

    /// The slot of the current frame, mutably.
    pub fn current_mut(&mut self) -> &mut T {
        let index = self.slot_index();
        &mut self.slots[index]
    }

    /// Moves to the next frame.
    pub fn advance(&mut self) {
        self.frame += 1;
    }

    /// Frames advanced since creation.
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Index of the current slot, `frame % N`.
    pub fn slot_index(&self) -> usize {
        (self.frame % self.slots.len() as u64) as usize
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`; a ring has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every slot, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_cycle_with_the_frame_counter() {
        let mut ring = FrameRing::new(3, |i| Ok::<_, ()>(i * 10)).unwrap();
        let seen: Vec<usize> = (0..7)
            .map(|_| {
                let value = *ring.current();
                ring.advance();
                value
            })
            .collect();
        assert_eq!(seen, [0, 10, 20, 0, 10, 20, 0]);
        assert_eq!(ring.frame_index(), 7);
        assert_eq!(ring.slot_index(), 1);
    }

    #[test]
    fn current_mut_edits_only_the_current_slot() {
        let mut ring = FrameRing::from_slots(vec![0u32, 0]);
        ring.advance();
        *ring.current_mut() += 5;
        assert_eq!(ring.iter_mut().map(|v| *v).collect::<Vec<_>>(), [0, 5]);
    }

    #[test]
    fn slot_construction_errors_propagate() {
        let result = FrameRing::new(2, |i| if i == 1 { Err("boom") } else { Ok(i) });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    #[should_panic(expected = "frames in flight")]
    fn more_than_three_frames_abort() {
        let _ = FrameRing::from_slots(vec![0u8; 4]);
    }
}
