use std::collections::VecDeque;

/// Endpoint a communicator element talks to once per tick: it transmits the OR of its
/// inputs and outputs whatever it receives.
pub trait Communicator {
    fn transmit(&mut self, level: bool);
    fn receive(&mut self) -> bool;
}

/// Backing state of a screen communicator. The user sets `input`, the circuit sets `output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenCommunicator {
    pub input: bool,
    pub output: bool,
}

impl Communicator for ScreenCommunicator {
    fn transmit(&mut self, level: bool) {
        self.output = level;
    }

    fn receive(&mut self) -> bool {
        self.input
    }
}

/// In-memory stream endpoint. Received levels are consumed one per tick; once the queue is
/// drained the last received level is held.
#[derive(Debug, Clone, Default)]
pub struct QueueCommunicator {
    incoming: VecDeque<bool>,
    held: bool,
    transmitted: Vec<bool>,
}

impl QueueCommunicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(levels: impl IntoIterator<Item = bool>) -> Self {
        Self {
            incoming: levels.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn push_input(&mut self, level: bool) {
        self.incoming.push_back(level);
    }

    pub fn transmitted(&self) -> &[bool] {
        &self.transmitted
    }

    pub fn pending(&self) -> usize {
        self.incoming.len()
    }
}

impl Communicator for QueueCommunicator {
    fn transmit(&mut self, level: bool) {
        self.transmitted.push(level);
    }

    fn receive(&mut self) -> bool {
        if let Some(level) = self.incoming.pop_front() {
            self.held = level;
        }
        self.held
    }
}
