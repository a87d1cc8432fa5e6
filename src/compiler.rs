use std::collections::VecDeque;

use slotmap::SlotMap;

use crate::canvas::{CanvasState, Cell, Direction, ElementKind, Point, WireKind};
use crate::error::CompileError;
use crate::terminals::{self, TerminalKind};

slotmap::new_key_type! {
    pub struct NetId;
    pub struct ElementId;
}

/// Something a terminal can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Net(NetId),
    /// Direct element to element edge: the neighbor's output faces this terminal.
    Element(ElementId),
}

#[derive(Debug, Clone)]
pub struct Net {
    pub kind: WireKind,
    pub cells: Vec<Point>,
}

#[derive(Debug, Clone)]
pub struct CompiledElement {
    pub kind: ElementKind,
    pub position: Point,
    /// Level stored in the cell at compile time. For relays this is the contact state.
    pub initial_level: bool,
    /// Input terminals in terminal table order, `None` when unconnected.
    pub inputs: Vec<Option<Node>>,
    pub coils: Vec<Option<Node>>,
    pub common: Option<Node>,
    /// Nets this element drives through its output terminals.
    pub outputs: Vec<NetId>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledGraph {
    pub width: i32,
    pub height: i32,
    pub nets: SlotMap<NetId, Net>,
    pub elements: SlotMap<ElementId, CompiledElement>,
    cell_nodes: Vec<Option<Node>>,
}

impl CompiledGraph {
    pub fn node_at(&self, pt: Point) -> Option<Node> {
        if pt.x < 0 || pt.y < 0 || pt.x >= self.width || pt.y >= self.height {
            return None;
        }
        self.cell_nodes
            .get(pt.y as usize * self.width as usize + pt.x as usize)
            .copied()
            .flatten()
    }

    pub fn net_at(&self, pt: Point) -> Option<NetId> {
        match self.node_at(pt)? {
            Node::Net(id) => Some(id),
            Node::Element(_) => None,
        }
    }

    pub fn element_at(&self, pt: Point) -> Option<ElementId> {
        match self.node_at(pt)? {
            Node::Element(id) => Some(id),
            Node::Net(_) => None,
        }
    }
}

/// Label wire nets with a flood fill, then resolve every element terminal against its
/// neighbors.
pub fn compile(canvas: &CanvasState) -> Result<CompiledGraph, CompileError> {
    if canvas.area() == 0 {
        return Err(CompileError::Unbounded);
    }

    let mut graph = CompiledGraph {
        width: canvas.width(),
        height: canvas.height(),
        cell_nodes: vec![None; canvas.area()],
        ..Default::default()
    };

    for (pt, cell) in canvas {
        let Cell::Element(element) = cell else {
            continue;
        };
        if graph.node_at(pt).is_some() {
            continue;
        }
        match element.kind.wire_kind() {
            Some(kind) => flood_fill(canvas, &mut graph, pt, kind),
            None => {
                let id = graph.elements.insert(CompiledElement {
                    kind: element.kind,
                    position: pt,
                    initial_level: element.logic_level,
                    inputs: Vec::new(),
                    coils: Vec::new(),
                    common: None,
                    outputs: Vec::new(),
                });
                graph.set_node(pt, Node::Element(id));
            }
        }
    }

    let ids: Vec<ElementId> = graph.elements.keys().collect();
    for id in ids {
        connect_terminals(&mut graph, id);
    }

    log::debug!(
        "compiled {}x{} canvas into {} nets and {} elements",
        graph.width,
        graph.height,
        graph.nets.len(),
        graph.elements.len()
    );
    Ok(graph)
}

impl CompiledGraph {
    fn set_node(&mut self, pt: Point, node: Node) {
        let index = pt.y as usize * self.width as usize + pt.x as usize;
        if let Some(slot) = self.cell_nodes.get_mut(index) {
            *slot = Some(node);
        }
    }
}

fn flood_fill(canvas: &CanvasState, graph: &mut CompiledGraph, start: Point, kind: WireKind) {
    let id = graph.nets.insert(Net {
        kind,
        cells: Vec::new(),
    });
    let mut queue = VecDeque::from([start]);
    graph.set_node(start, Node::Net(id));

    while let Some(pt) = queue.pop_front() {
        graph.nets[id].cells.push(pt);
        for dir in Direction::ALL {
            let next = pt.neighbor(dir);
            if canvas.at(next).wire_kind() == Some(kind) && graph.node_at(next).is_none() {
                graph.set_node(next, Node::Net(id));
                queue.push_back(next);
            }
        }
    }
}

fn connect_terminals(graph: &mut CompiledGraph, id: ElementId) {
    let element = &graph.elements[id];
    let position = element.position;

    let mut inputs = Vec::new();
    let mut coils = Vec::new();
    let mut common = None;
    let mut outputs = Vec::new();

    for terminal in terminals::terminals(element.kind) {
        let neighbor = graph.node_at(position.neighbor(terminal.side));
        match terminal.kind {
            TerminalKind::Output => {
                if let Some(Node::Net(net)) = neighbor {
                    outputs.push(net);
                }
            }
            TerminalKind::Input => inputs.push(resolve_read(graph, neighbor, terminal.side)),
            TerminalKind::Coil => coils.push(resolve_read(graph, neighbor, terminal.side)),
            TerminalKind::Common => common = resolve_read(graph, neighbor, terminal.side),
        }
    }

    let element = &mut graph.elements[id];
    element.inputs = inputs;
    element.coils = coils;
    element.common = common;
    element.outputs = outputs;
}

/// An input reads a wire net, or a neighbor element whose output points back at it.
fn resolve_read(graph: &CompiledGraph, neighbor: Option<Node>, side: Direction) -> Option<Node> {
    match neighbor? {
        Node::Net(net) => Some(Node::Net(net)),
        Node::Element(other) => {
            terminals::has_output(graph.elements[other].kind, side.opposite()).then_some(Node::Element(other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{GateKind, RelayKind};

    fn canvas_from(rows: &[&[Option<ElementKind>]]) -> CanvasState {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |r| r.len()) as i32;
        let mut canvas = CanvasState::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, kind) in row.iter().enumerate() {
                if let Some(kind) = kind {
                    canvas.set(x as i32, y as i32, (*kind).into());
                }
            }
        }
        canvas
    }

    const W: Option<ElementKind> = Some(ElementKind::CONDUCTIVE_WIRE);
    const I: Option<ElementKind> = Some(ElementKind::INSULATED_WIRE);

    #[test]
    fn zero_area_is_unbounded() {
        assert_eq!(compile(&CanvasState::default()).unwrap_err(), CompileError::Unbounded);
    }

    #[test]
    fn wires_of_different_kinds_do_not_merge() {
        let canvas = canvas_from(&[&[W, W, I, I], &[None, None, None, W]]);
        let graph = compile(&canvas).unwrap();
        assert_eq!(graph.nets.len(), 3);
        assert_eq!(graph.net_at(Point::new(0, 0)), graph.net_at(Point::new(1, 0)));
        assert_ne!(graph.net_at(Point::new(1, 0)), graph.net_at(Point::new(2, 0)));
        assert_ne!(graph.net_at(Point::new(3, 0)), graph.net_at(Point::new(3, 1)));
    }

    #[test]
    fn gate_terminals_resolve() {
        let and = Some(ElementKind::Gate(GateKind::And));
        let canvas = canvas_from(&[
            &[None, None, Some(ElementKind::Source), None],
            &[Some(ElementKind::Source), W, and, W],
        ]);
        let graph = compile(&canvas).unwrap();
        let gate = &graph.elements[graph.element_at(Point::new(2, 1)).unwrap()];
        let wire_in = graph.net_at(Point::new(1, 1)).unwrap();
        let source_above = graph.element_at(Point::new(2, 0)).unwrap();
        assert_eq!(gate.inputs, vec![Some(Node::Net(wire_in)), Some(Node::Element(source_above))]);
        assert_eq!(gate.outputs, vec![graph.net_at(Point::new(3, 1)).unwrap()]);
    }

    #[test]
    fn non_facing_neighbors_are_unconnected() {
        let and = Some(ElementKind::Gate(GateKind::And));
        // right gate's west input faces the left gate's output
        let canvas = canvas_from(&[&[and, and]]);
        let graph = compile(&canvas).unwrap();
        let left = graph.element_at(Point::new(0, 0)).unwrap();
        let right = &graph.elements[graph.element_at(Point::new(1, 0)).unwrap()];
        assert_eq!(right.inputs, vec![Some(Node::Element(left)), None]);
        assert_eq!(graph.elements[left].inputs, vec![None, None]);
    }

    #[test]
    fn relay_terminals_resolve() {
        let relay = Some(ElementKind::Relay(RelayKind::Positive));
        let canvas = canvas_from(&[
            &[None, Some(ElementKind::Source), None],
            &[W, relay, W],
            &[None, W, None],
        ]);
        let graph = compile(&canvas).unwrap();
        let relay = &graph.elements[graph.element_at(Point::new(1, 1)).unwrap()];
        assert_eq!(relay.common, graph.net_at(Point::new(0, 1)).map(Node::Net));
        assert_eq!(relay.coils.len(), 2);
        assert!(matches!(relay.coils[0], Some(Node::Element(_))));
        assert!(matches!(relay.coils[1], Some(Node::Net(_))));
        assert_eq!(relay.outputs, vec![graph.net_at(Point::new(2, 1)).unwrap()]);
    }
}
