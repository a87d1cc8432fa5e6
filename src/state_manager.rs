use std::time::Duration;

use crate::{
    canvas::{CanvasState, Cell, ElementKind, Point, Rect},
    clipboard::ClipboardManager,
    config::SimulatorConfig,
    error::{CompileError, ReadError},
    history::HistoryManager,
    save_load,
    simulator::{SimulationStatus, Simulator},
};

/// Owns the canvas and everything operating on it. Every edit goes through here so the
/// simulator is paused around it and history sees it.
pub struct StateManager {
    canvas: CanvasState,
    simulator: Simulator,
    history: HistoryManager,
    clipboard: ClipboardManager,
    /// Viewport translation accumulated since the last history save
    delta_trans: Point,
    config: SimulatorConfig,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl StateManager {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            canvas: CanvasState::default(),
            simulator: Simulator::with_config(&config),
            history: HistoryManager::new_with_capacity(config.history_capacity),
            clipboard: ClipboardManager::new(),
            delta_trans: Point::ZERO,
            config,
        }
    }

    pub fn canvas(&self) -> &CanvasState {
        &self.canvas
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn clipboard(&self) -> &ClipboardManager {
        &self.clipboard
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    /// For communicator plumbing and period changes.
    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    /// Cell at `pt` carrying its live level while the simulator runs.
    pub fn element_at(&self, pt: Point) -> Cell {
        let mut cell = self.canvas.at(pt);
        if let (Some(level), Some(element)) = (self.simulator.level_at(pt), cell.element_mut()) {
            element.logic_level = level;
        }
        cell
    }

    // Editing

    /// Run an edit on the canvas. `f` returns the viewport translation its change applied.
    /// A running simulator is stopped around the edit and restarted on the new layout.
    /// Returns whether history recorded a change.
    pub fn edit(&mut self, f: impl FnOnce(&mut CanvasState) -> Point) -> bool {
        let was_running = self.pause();
        self.delta_trans += f(&mut self.canvas);
        let changed = self.save_to_history();
        self.resume(was_running);
        changed
    }

    /// Pencil with `Some(kind)`, eraser with `None`.
    pub fn draw(&mut self, pt: Point, kind: Option<ElementKind>) -> bool {
        let cell = kind.map_or(Cell::Empty, Cell::from);
        self.edit(|canvas| canvas.change_cell(pt, cell).1)
    }

    pub fn save_to_history(&mut self) -> bool {
        let changed = self.history.save_to_history(&self.canvas, self.delta_trans);
        self.delta_trans = Point::ZERO;
        changed
    }

    /// Returns the viewport translation to apply, `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Point> {
        let was_running = self.pause();
        let delta = self.history.undo().map(|(canvas, delta)| {
            self.canvas = canvas;
            delta
        });
        self.resume(was_running);
        delta
    }

    pub fn redo(&mut self) -> Option<Point> {
        let was_running = self.pause();
        let delta = self.history.redo().map(|(canvas, delta)| {
            self.canvas = canvas;
            delta
        });
        self.resume(was_running);
        delta
    }

    fn pause(&mut self) -> bool {
        let was_running = self.simulator.running();
        if was_running {
            self.simulator.stop(&mut self.canvas);
        }
        was_running
    }

    fn resume(&mut self, was_running: bool) {
        if !was_running {
            return;
        }
        if let Err(err) = self.simulator.start(&self.canvas) {
            log::warn!("simulation not restarted after edit: {err}");
        }
    }

    // Simulation

    pub fn start_simulator(&mut self) -> Result<(), CompileError> {
        self.simulator.start(&self.canvas)
    }

    pub fn stop_simulator(&mut self) {
        self.simulator.stop(&mut self.canvas);
    }

    pub fn step_simulator(&mut self) -> Result<bool, CompileError> {
        self.simulator.step(&mut self.canvas)
    }

    pub fn start_or_stop_simulator(&mut self) -> Result<(), CompileError> {
        if self.simulator.running() {
            self.stop_simulator();
            Ok(())
        } else {
            self.start_simulator()
        }
    }

    pub fn simulator_running(&self) -> bool {
        self.simulator.running()
    }

    /// Return every element to its default level, keeping the simulator's run state.
    pub fn reset_simulator(&mut self) {
        let was_running = self.pause();
        self.canvas.reset_logic_levels();
        self.resume(was_running);
    }

    pub fn tick(&mut self) -> bool {
        self.simulator.tick()
    }

    pub fn advance(&mut self, elapsed: Duration) -> usize {
        self.simulator.advance(elapsed)
    }

    pub fn settle(&mut self) -> SimulationStatus {
        self.simulator.settle(self.config.settle_limit)
    }

    /// Copy the live levels into the canvas without stopping.
    pub fn update_default_state(&mut self) {
        self.simulator.snapshot_into(&mut self.canvas);
    }

    /// Flip a Signal. While running this goes to the simulator; while stopped it edits both
    /// the level and the default level on the canvas.
    pub fn toggle_signal(&mut self, pt: Point) -> bool {
        if self.canvas.at(pt).kind() != Some(ElementKind::Signal) {
            log::warn!("no signal to toggle at {pt}");
            return false;
        }
        if self.simulator.running() {
            let level = self.simulator.level_at(pt).unwrap_or(false);
            return self.simulator.set_signal(pt, !level);
        }
        self.edit(|canvas| {
            if let Some(element) = canvas.cell_mut(pt).and_then(Cell::element_mut) {
                element.logic_level = !element.logic_level;
                element.default_logic_level = element.logic_level;
            }
            Point::ZERO
        });
        true
    }

    // Clipboard

    pub fn copy(&mut self, rect: Rect, slot: usize) {
        let block = self.canvas.copy_rect(rect);
        self.clipboard.write(&block, slot);
    }

    pub fn cut(&mut self, rect: Rect, slot: usize) -> bool {
        let mut block = CanvasState::default();
        let changed = self.edit(|canvas| {
            block = canvas.splice(rect);
            canvas.shrink_to_fit()
        });
        self.clipboard.write(&block, slot);
        changed
    }

    /// Overlay a clipboard slot with its top-left corner at `at`.
    pub fn paste(&mut self, slot: usize, at: Point) -> bool {
        let block = self.clipboard.read(slot);
        if block.is_empty() {
            return false;
        }
        self.edit(|canvas| {
            let (merged, translation) = CanvasState::merge(std::mem::take(canvas), Point::ZERO, &block, at);
            *canvas = merged;
            translation
        })
    }

    // Persistence

    /// Replace the canvas with a save file. History is cleared and the loaded state counts
    /// as saved.
    pub fn load_save(&mut self, bytes: &[u8]) -> Result<(), ReadError> {
        let canvas = save_load::load_save(bytes)?;
        if self.simulator.running() {
            self.simulator.stop(&mut self.canvas);
        }
        self.canvas = canvas;
        self.delta_trans = Point::ZERO;
        self.history.clear();
        self.history.imbue(&self.canvas);
        self.history.set_saved();
        Ok(())
    }

    pub fn write_save(&self) -> Vec<u8> {
        save_load::write_save(&self.canvas)
    }

    pub fn set_saved(&mut self) {
        self.history.set_saved();
    }

    pub fn changed_since_last_save(&self) -> bool {
        self.history.changed_since_last_save()
    }

    // Rendering

    /// Fill `buffer` row-major with `encode(cell, level)` for every point of `rect`, rows
    /// `pitch` entries apart. The default view shows canvas levels, otherwise live levels
    /// are used while running.
    pub fn fill_surface<T>(
        &self,
        use_default_view: bool,
        rect: Rect,
        buffer: &mut [T],
        pitch: usize,
        encode: impl Fn(Cell, bool) -> T,
    ) {
        for pt in rect.points() {
            let local = pt - rect.origin;
            let index = local.y as usize * pitch + local.x as usize;
            let Some(slot) = buffer.get_mut(index) else {
                continue;
            };
            let cell = if use_default_view {
                self.canvas.at(pt)
            } else {
                self.element_at(pt)
            };
            *slot = encode(cell, cell.logic_level());
        }
    }
}
