use std::fmt::Display;

use crate::canvas::{Direction, ElementKind};

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// Logic input, read from the previous tick.
    Input,
    /// Relay coil, read from the previous tick.
    Coil,
    /// Relay common contact, read while conduction is being resolved.
    Common,
    Output,
}

impl Display for TerminalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("Input"),
            Self::Coil => f.write_str("Coil"),
            Self::Common => f.write_str("Common"),
            Self::Output => f.write_str("Output"),
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    pub kind: TerminalKind,
    pub side: Direction,
}

const fn terminal(kind: TerminalKind, side: Direction) -> Terminal {
    Terminal { kind, side }
}

pub static DRIVER_TERMINALS: &[Terminal] = &[
    terminal(TerminalKind::Output, Direction::West),
    terminal(TerminalKind::Output, Direction::North),
    terminal(TerminalKind::Output, Direction::East),
    terminal(TerminalKind::Output, Direction::South),
];

// input order matters: first input is West, second is North
pub static GATE_TERMINALS: &[Terminal] = &[
    terminal(TerminalKind::Input, Direction::West),
    terminal(TerminalKind::Input, Direction::North),
    terminal(TerminalKind::Output, Direction::East),
];

pub static RELAY_TERMINALS: &[Terminal] = &[
    terminal(TerminalKind::Common, Direction::West),
    terminal(TerminalKind::Coil, Direction::North),
    terminal(TerminalKind::Output, Direction::East),
    terminal(TerminalKind::Coil, Direction::South),
];

pub static COMMUNICATOR_TERMINALS: &[Terminal] = &[
    terminal(TerminalKind::Input, Direction::West),
    terminal(TerminalKind::Input, Direction::North),
    terminal(TerminalKind::Output, Direction::East),
    terminal(TerminalKind::Input, Direction::South),
];

/// Terminals of an element kind. Wires have none, they are merged into nets instead.
pub fn terminals(kind: ElementKind) -> &'static [Terminal] {
    match kind {
        ElementKind::Wire(_) => &[],
        ElementKind::Signal | ElementKind::Source => DRIVER_TERMINALS,
        ElementKind::Gate(_) => GATE_TERMINALS,
        ElementKind::Relay(_) => RELAY_TERMINALS,
        ElementKind::Communicator(_) => COMMUNICATOR_TERMINALS,
    }
}

/// Whether `kind` has an output terminal on `side`.
pub fn has_output(kind: ElementKind, side: Direction) -> bool {
    terminals(kind)
        .iter()
        .any(|t| t.kind == TerminalKind::Output && t.side == side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{GateKind, RelayKind, WireKind};

    #[test]
    fn gate_inputs_are_ordered() {
        let inputs: Vec<Direction> = terminals(ElementKind::Gate(GateKind::And))
            .iter()
            .filter(|t| t.kind == TerminalKind::Input)
            .map(|t| t.side)
            .collect();
        assert_eq!(inputs, vec![Direction::West, Direction::North]);
    }

    #[test]
    fn outputs_by_side() {
        assert!(has_output(ElementKind::Source, Direction::South));
        assert!(has_output(ElementKind::Relay(RelayKind::Negative), Direction::East));
        assert!(!has_output(ElementKind::Relay(RelayKind::Negative), Direction::West));
        assert!(!has_output(ElementKind::Wire(WireKind::Conductive), Direction::East));
    }
}
