use std::error::Error;

use circuit_sandbox::{CanvasState, Point, StateManager, config::SimulatorConfig};

// NOR latch: reset signal left of the upper gate, set signal above the lower gate.
// `=` carries Q, the `-` loop carries not-Q back into the upper gate.
const LATCH: &str = "
    .------
    so=...-
    ..=.s.-
    ..==o--
";

const SET: Point = Point::new(4, 2);
const RESET: Point = Point::new(0, 1);
const Q: Point = Point::new(2, 2);
const NOT_Q: Point = Point::new(1, 0);

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };

    let latch: CanvasState = LATCH.parse()?;
    let mut state = StateManager::new(config);
    state.edit(|canvas| {
        *canvas = latch;
        Point::ZERO
    });
    print!("{}", state.canvas());

    state.start_simulator()?;
    for (label, signal) in [("set", SET), ("release set", SET), ("reset", RESET), ("release reset", RESET)] {
        state.toggle_signal(signal);
        let status = state.settle();
        println!(
            "{label:>13}: Q={} !Q={} ({status:?})",
            u8::from(state.element_at(Q).logic_level()),
            u8::from(state.element_at(NOT_Q).logic_level()),
        );
    }
    state.stop_simulator();
    Ok(())
}
