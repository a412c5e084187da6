use crate::net::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The slot for `tick` has since been reused by a newer tick.
    #[error("tick {tick} fell out of the {capacity}-tick window ending at {current_tick}")]
    Overrun {
        tick: Tick,
        current_tick: Tick,
        capacity: usize,
    },
    /// `tick` has not been recorded yet.
    #[error("tick {tick} is ahead of current tick {current_tick}")]
    Ahead { tick: Tick, current_tick: Tick },
}

#[derive(Debug, Clone)]
struct Slot<T> {
    tick: Option<Tick>,
    value: T,
}

/// Fixed-capacity per-tick storage addressed by `tick % capacity`.
///
/// Every slot remembers which tick last wrote it, so a read of a tick whose
/// slot has been reused fails instead of returning wrapped data.
#[derive(Debug, Clone)]
pub struct TickBuffer<T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
}

impl<T: Clone + Default> TickBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "tick buffer capacity must be non-zero");
        Self {
            slots: vec![
                Slot {
                    tick: None,
                    value: T::default(),
                };
                capacity
            ],
            capacity,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.tick = None;
            slot.value = T::default();
        }
    }
}

impl<T> TickBuffer<T> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index(&self, tick: Tick) -> usize {
        (tick as usize) % self.capacity
    }

    pub fn insert(&mut self, tick: Tick, value: T) {
        let index = self.index(tick);
        self.slots[index] = Slot {
            tick: Some(tick),
            value,
        };
    }

    /// Checks that `tick` is still addressable when `current_tick` is the next
    /// tick to be recorded.
    pub fn check_window(&self, tick: Tick, current_tick: Tick) -> Result<(), BufferError> {
        if tick > current_tick {
            return Err(BufferError::Ahead { tick, current_tick });
        }
        if (current_tick - tick) as usize >= self.capacity {
            return Err(BufferError::Overrun {
                tick,
                current_tick,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn get(&self, tick: Tick, current_tick: Tick) -> Result<&T, BufferError> {
        self.check_window(tick, current_tick)?;
        let slot = &self.slots[self.index(tick)];
        match slot.tick {
            Some(stored) if stored == tick => Ok(&slot.value),
            Some(stored) if stored > tick => Err(BufferError::Overrun {
                tick,
                current_tick,
                capacity: self.capacity,
            }),
            _ => Err(BufferError::Ahead { tick, current_tick }),
        }
    }

    /// Values for `start..=end` in tick order.
    pub fn range(&self, start: Tick, end: Tick, current_tick: Tick) -> Result<Vec<T>, BufferError>
    where
        T: Clone,
    {
        (start..=end)
            .map(|tick| self.get(tick, current_tick).cloned())
            .collect()
    }
}
