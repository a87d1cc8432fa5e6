use std::collections::HashMap;
use std::time::Duration;

use slotmap::SecondaryMap;

use crate::{
    canvas::{CanvasState, CommunicatorKind, ElementKind, Point},
    communicator::{Communicator, ScreenCommunicator},
    compiler::{self, CompiledGraph, ElementId, NetId, Node},
    config::SimulatorConfig,
    error::CompileError,
};

pub const MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationStatus {
    Stable {
        iterations: usize,
    },
    Unstable {
        max_reached: bool,
    },
    #[default]
    Running,
}

/// One generation of levels. Ticks read the previous generation and build a new one.
#[derive(Debug, Clone, Default)]
struct Levels {
    nets: SecondaryMap<NetId, bool>,
    elements: SecondaryMap<ElementId, bool>,
    /// Relays currently passing their common level to the switched output.
    conducting: SecondaryMap<ElementId, bool>,
}

impl Levels {
    fn initial(graph: &CompiledGraph) -> Self {
        let mut levels = Self::default();
        for (id, element) in &graph.elements {
            levels.elements.insert(id, element.initial_level);
        }
        levels.drive_nets(graph);
        levels
    }

    fn element(&self, id: ElementId) -> bool {
        self.elements.get(id).copied().unwrap_or(false)
    }

    fn net(&self, id: NetId) -> bool {
        self.nets.get(id).copied().unwrap_or(false)
    }

    /// What an element presents on its output terminals.
    fn output(&self, graph: &CompiledGraph, id: ElementId) -> bool {
        match graph.elements[id].kind {
            ElementKind::Relay(_) => self.conducting.get(id).copied().unwrap_or(false),
            _ => self.element(id),
        }
    }

    fn read(&self, graph: &CompiledGraph, node: Option<Node>) -> bool {
        match node {
            Some(Node::Net(id)) => self.net(id),
            Some(Node::Element(id)) => self.output(graph, id),
            None => false,
        }
    }

    /// Net levels from the element levels of this generation, then relay conduction.
    fn drive_nets(&mut self, graph: &CompiledGraph) {
        for id in graph.nets.keys() {
            self.nets.insert(id, false);
        }
        for (id, element) in &graph.elements {
            if matches!(element.kind, ElementKind::Relay(_)) {
                self.conducting.insert(id, false);
                continue;
            }
            if self.element(id) {
                for &net in &element.outputs {
                    self.nets.insert(net, true);
                }
            }
        }
        self.conduct(graph);
    }

    /// Closed relays pass a high common to their outputs until nothing changes. Levels only
    /// ever go from low to high here, so this terminates.
    fn conduct(&mut self, graph: &CompiledGraph) {
        loop {
            let mut changed = false;
            for (id, element) in &graph.elements {
                if !matches!(element.kind, ElementKind::Relay(_)) || self.output(graph, id) {
                    continue;
                }
                if self.element(id) && self.read(graph, element.common) {
                    self.conducting.insert(id, true);
                    for &net in &element.outputs {
                        self.nets.insert(net, true);
                    }
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn differs(&self, other: &Self) -> bool {
        self.nets.iter().any(|(k, v)| other.nets.get(k) != Some(v))
            || self.elements.iter().any(|(k, v)| other.elements.get(k) != Some(v))
            || self.conducting.iter().any(|(k, v)| other.conducting.get(k) != Some(v))
    }
}

/// Runs a compiled circuit. Stopped until `start`, single steps happen while stopped.
///
/// Communicator endpoints and screen inputs are keyed by canvas position so they survive
/// the recompilation that happens on every start.
pub struct Simulator {
    graph: Option<CompiledGraph>,
    levels: Levels,
    period: Duration,
    tick_accumulator: Duration,
    /// Most ticks a single `advance` may run to catch up
    catch_up_limit: usize,
    /// Outcome of the last `settle`
    pub status: SimulationStatus,
    /// Ticks run since the last start
    pub ticks: u64,
    endpoints: HashMap<Point, Box<dyn Communicator>>,
    screens: HashMap<Point, ScreenCommunicator>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self {
            graph: None,
            levels: Levels::default(),
            period: Duration::ZERO,
            tick_accumulator: Duration::ZERO,
            catch_up_limit: MAX_ITERATIONS,
            status: SimulationStatus::default(),
            ticks: 0,
            endpoints: HashMap::new(),
            screens: HashMap::new(),
        }
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &SimulatorConfig) -> Self {
        Self {
            period: config.period(),
            catch_up_limit: config.settle_limit,
            ..Self::default()
        }
    }

    pub fn compile(canvas: &CanvasState) -> Result<CompiledGraph, CompileError> {
        compiler::compile(canvas)
    }

    pub fn running(&self) -> bool {
        self.graph.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
        self.tick_accumulator = Duration::ZERO;
    }

    pub fn graph(&self) -> Option<&CompiledGraph> {
        self.graph.as_ref()
    }

    pub fn start(&mut self, canvas: &CanvasState) -> Result<(), CompileError> {
        assert!(!self.running(), "start called on a running simulator");
        self.load(canvas)?;
        self.tick_accumulator = Duration::ZERO;
        self.ticks = 0;
        self.status = SimulationStatus::Running;
        log::info!("simulation started, period {:?}", self.period);
        Ok(())
    }

    /// Freeze the live levels into `canvas` and drop the compiled graph.
    pub fn stop(&mut self, canvas: &mut CanvasState) {
        assert!(self.running(), "stop called on a stopped simulator");
        self.snapshot_into(canvas);
        self.graph = None;
        self.levels = Levels::default();
        log::info!("simulation stopped after {} ticks", self.ticks);
    }

    /// Compile, run one tick and write the levels back. Returns whether the tick changed a
    /// level or any cell on `canvas` was rewritten.
    pub fn step(&mut self, canvas: &mut CanvasState) -> Result<bool, CompileError> {
        assert!(!self.running(), "step called on a running simulator");
        self.load(canvas)?;
        let changed = self.tick();
        let written = self.snapshot_into(canvas);
        self.graph = None;
        self.levels = Levels::default();
        Ok(changed || written)
    }

    fn load(&mut self, canvas: &CanvasState) -> Result<(), CompileError> {
        let graph = compiler::compile(canvas)?;
        self.prune_attachments(&graph);
        self.levels = Levels::initial(&graph);
        self.graph = Some(graph);
        Ok(())
    }

    /// Drop screen state and endpoints whose cell no longer holds a matching communicator.
    fn prune_attachments(&mut self, graph: &CompiledGraph) {
        let kind_at = |pt: Point| graph.element_at(pt).map(|id| graph.elements[id].kind);
        self.screens.retain(|pt, _| {
            let keep = kind_at(*pt) == Some(ElementKind::Communicator(CommunicatorKind::Screen));
            if !keep {
                log::debug!("dropping screen state at {pt}");
            }
            keep
        });
        self.endpoints.retain(|pt, _| {
            let keep = matches!(kind_at(*pt), Some(ElementKind::Communicator(_)));
            if !keep {
                log::warn!("detaching endpoint at {pt}: no communicator there");
            }
            keep
        });
    }

    /// One synchronous tick. Every input reads the previous generation; returns whether any
    /// level changed.
    pub fn tick(&mut self) -> bool {
        let Self {
            graph,
            levels,
            endpoints,
            screens,
            ..
        } = self;
        let Some(graph) = graph.as_ref() else {
            log::warn!("tick requested while the simulator is stopped");
            return false;
        };

        let mut next = Levels::default();
        for (id, element) in &graph.elements {
            let level = match element.kind {
                ElementKind::Source | ElementKind::Signal => levels.element(id),
                ElementKind::Gate(kind) => {
                    kind.evaluate(element.inputs.iter().map(|&node| levels.read(graph, node)))
                }
                ElementKind::Relay(kind) => {
                    kind.closed(element.coils.iter().any(|&node| levels.read(graph, node)))
                }
                ElementKind::Communicator(kind) => {
                    let transmitted = element.inputs.iter().any(|&node| levels.read(graph, node));
                    if let Some(endpoint) = endpoints.get_mut(&element.position) {
                        endpoint.transmit(transmitted);
                        endpoint.receive()
                    } else if kind == CommunicatorKind::Screen {
                        let screen = screens.entry(element.position).or_default();
                        screen.transmit(transmitted);
                        screen.receive()
                    } else {
                        false
                    }
                }
                ElementKind::Wire(_) => false,
            };
            next.elements.insert(id, level);
        }
        next.drive_nets(graph);

        let changed = next.differs(levels);
        *levels = next;
        self.ticks += 1;
        log::debug!("tick {} changed: {changed}", self.ticks);
        changed
    }

    /// Run as many ticks as `elapsed` covers at the configured period, at most the catch-up
    /// limit per call. A zero period runs a single tick per call.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        if !self.running() {
            return 0;
        }
        if self.period.is_zero() {
            self.tick();
            return 1;
        }
        let limit = u32::try_from(self.catch_up_limit).unwrap_or(u32::MAX);
        let backlog = self.period.saturating_mul(limit);
        self.tick_accumulator = self.tick_accumulator.saturating_add(elapsed).min(backlog);
        let mut ticks = 0;
        while self.tick_accumulator >= self.period {
            self.tick_accumulator -= self.period;
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Tick until a tick changes nothing or `max_ticks` is reached.
    pub fn settle(&mut self, max_ticks: usize) -> SimulationStatus {
        self.status = SimulationStatus::Running;
        for iteration in 1..=max_ticks {
            if !self.tick() {
                self.status = SimulationStatus::Stable {
                    iterations: iteration,
                };
                log::debug!("simulation stabilized after {iteration} ticks");
                return self.status;
            }
        }
        self.status = SimulationStatus::Unstable { max_reached: true };
        log::warn!("simulation did not stabilize within {max_ticks} ticks");
        self.status
    }

    /// Write live levels into `canvas` and report whether any cell was rewritten. Cells
    /// already at the right level are left untouched so shared snapshots are not copied
    /// needlessly.
    pub fn snapshot_into(&self, canvas: &mut CanvasState) -> bool {
        let Some(graph) = &self.graph else {
            return false;
        };
        let mut written = false;
        let mut write = |pt: Point, level: bool| {
            if canvas.at(pt).element().is_some_and(|e| e.logic_level != level) {
                if let Some(element) = canvas.cell_mut(pt).and_then(|c| c.element_mut()) {
                    element.logic_level = level;
                    written = true;
                }
            }
        };
        for (id, element) in &graph.elements {
            write(element.position, self.levels.element(id));
        }
        for (id, net) in &graph.nets {
            let level = self.levels.net(id);
            for &pt in &net.cells {
                write(pt, level);
            }
        }
        written
    }

    pub fn level_at(&self, pt: Point) -> Option<bool> {
        let graph = self.graph.as_ref()?;
        match graph.node_at(pt)? {
            Node::Net(id) => Some(self.levels.net(id)),
            Node::Element(id) => Some(self.levels.element(id)),
        }
    }

    /// Set a Signal element's level. Nets see it on the next tick.
    pub fn set_signal(&mut self, pt: Point, level: bool) -> bool {
        let signal = self
            .graph
            .as_ref()
            .and_then(|graph| graph.element_at(pt).map(|id| (id, graph.elements[id].kind)));
        match signal {
            Some((id, ElementKind::Signal)) => {
                self.levels.elements.insert(id, level);
                true
            }
            _ => {
                log::warn!("no running signal at {pt}");
                false
            }
        }
    }

    pub fn attach_communicator(&mut self, pt: Point, endpoint: Box<dyn Communicator>) {
        self.endpoints.insert(pt, endpoint);
    }

    pub fn detach_communicator(&mut self, pt: Point) -> Option<Box<dyn Communicator>> {
        self.endpoints.remove(&pt)
    }

    pub fn send_screen_input(&mut self, pt: Point, level: bool) {
        self.screens.entry(pt).or_default().input = level;
    }

    /// What the screen communicator at `pt` transmitted on its last tick.
    pub fn transmit_state(&self, pt: Point) -> bool {
        self.screens.get(&pt).is_some_and(|screen| screen.output)
    }
}
