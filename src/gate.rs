/// Which side a propagated write originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Array resync writing into the mirror list.
    ArrayToList,
    /// Mirror list edit writing into the array.
    ListToArray,
}

impl Direction {
    fn bit(self) -> u8 {
        match self {
            Direction::ArrayToList => 0b01,
            Direction::ListToArray => 0b10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Propagating { directions: u8, release_tick: u64 },
}

/// Reentrancy guard shared by every proxy session of one editing host.
///
/// A suppressed direction stays suppressed for the remainder of the tick that set it; the
/// release happens when the next tick begins, never inside the write that set it.
#[derive(Debug)]
pub struct SuppressionGate {
    state: GateState,
    tick: u64,
}

impl Default for SuppressionGate {
    fn default() -> Self {
        Self { state: GateState::Idle, tick: 0 }
    }
}

impl SuppressionGate {
    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
        if let GateState::Propagating { release_tick, .. } = self.state {
            if tick >= release_tick {
                self.state = GateState::Idle;
            }
        }
    }

    pub fn with_suppressed<R>(&mut self, direction: Direction, action: impl FnOnce() -> R) -> R {
        let release_tick = self.tick + 1;
        let directions = match self.state {
            GateState::Propagating { directions, .. } => directions | direction.bit(),
            GateState::Idle => direction.bit(),
        };
        self.state = GateState::Propagating { directions, release_tick };
        action()
    }

    pub fn is_suppressed(&self, direction: Direction) -> bool {
        match self.state {
            GateState::Propagating { directions, .. } => directions & direction.bit() != 0,
            GateState::Idle => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == GateState::Idle
    }
}
