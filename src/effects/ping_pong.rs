//! Two-slot ping-pong helper
//!
//! Exactly one slot is the write target and the other the read source; they
//! alternate with every stage. Stage `i` writes to `A` when `i` is even and to
//! `B` when odd, always reading the other slot.

/// One of the two ping-pong slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Write target of stage `index`.
    pub fn for_stage(index: usize) -> Self {
        if index % 2 == 0 {
            Slot::A
        } else {
            Slot::B
        }
    }

    /// Slot holding the final image after `stage_count` stages.
    ///
    /// With no stages nothing is written and the cleared read source of stage 0 is shown.
    pub fn final_output(stage_count: usize) -> Self {
        match stage_count.checked_sub(1) {
            Some(last) => Slot::for_stage(last),
            None => Slot::B,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// A pair of values used alternately as write target and read source.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: Slot,
}

impl<T> PingPong<T> {
    /// New pair with `a` as the current write target.
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            current: Slot::A,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Slot) -> T) -> Self {
        Self::new(f(Slot::A), f(Slot::B))
    }

    /// Current write target.
    pub fn current(&self) -> &T {
        &self.slots[self.current.index()]
    }

    /// Current read source.
    pub fn other(&self) -> &T {
        &self.slots[self.current.other().index()]
    }

    pub fn current_slot(&self) -> Slot {
        self.current
    }

    pub fn swap(&mut self) {
        self.current = self.current.other();
    }

    pub fn get(&self, slot: Slot) -> &T {
        &self.slots[slot.index()]
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PingPong<U> {
        PingPong {
            slots: [f(&self.slots[0]), f(&self.slots[1])],
            current: self.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_and_other_alternate() {
        let mut pair = PingPong::new("a", "b");
        assert_eq!(*pair.current(), "a");
        assert_eq!(*pair.other(), "b");

        pair.swap();
        assert_eq!(*pair.current(), "b");
        assert_eq!(*pair.other(), "a");
        assert_eq!(pair.current_slot(), Slot::B);

        pair.swap();
        assert_eq!(pair.current_slot(), Slot::A);
    }

    #[test]
    fn test_swapping_matches_stage_parity() {
        let mut pair = PingPong::from_fn(|slot| slot);
        for i in 0..9 {
            assert_eq!(*pair.current(), Slot::for_stage(i));
            assert_eq!(*pair.other(), Slot::for_stage(i).other());
            pair.swap();
        }
    }

    #[test]
    fn test_final_output() {
        assert_eq!(Slot::final_output(0), Slot::B);
        assert_eq!(Slot::final_output(1), Slot::A);
        assert_eq!(Slot::final_output(2), Slot::B);
        assert_eq!(Slot::final_output(7), Slot::A);
    }

    #[test]
    fn test_map_keeps_orientation() {
        let mut pair = PingPong::new(1, 2);
        pair.swap();
        let doubled = pair.map(|v| v * 10);
        assert_eq!(*doubled.current(), 20);
        assert_eq!(*doubled.get(Slot::A), 10);
    }
}
