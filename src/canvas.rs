use std::fmt::Display;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ReadError;

// Geometry

#[derive(
    serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn neighbor(self, dir: Direction) -> Self {
        self + dir.offset()
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Rect {
    pub origin: Point,
    pub size: Point,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Point::new(width, height),
        }
    }

    /// Points of the rectangle, row by row.
    pub fn points(self) -> impl Iterator<Item = Point> {
        (0..self.size.y.max(0))
            .flat_map(move |y| (0..self.size.x.max(0)).map(move |x| self.origin + Point::new(x, y)))
    }
}

/// Orthogonal neighbor directions. Grid y grows downwards, so North is `y - 1`.
#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    pub fn offset(self) -> Point {
        match self {
            Self::North => Point::new(0, -1),
            Self::East => Point::new(1, 0),
            Self::South => Point::new(0, 1),
            Self::West => Point::new(-1, 0),
        }
    }
}

/// Corner that stays fixed when a canvas is resized.
#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Eq, PartialEq, Default)]
pub enum Anchor {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

// Element kinds

#[derive(serde::Deserialize, serde::Serialize, PartialEq, Eq, Copy, Debug, Clone, Hash)]
pub enum WireKind {
    Conductive,
    Insulated,
}

#[derive(serde::Deserialize, serde::Serialize, PartialEq, Eq, Copy, Debug, Clone, Hash)]
pub enum GateKind {
    And,
    Or,
    Nand,
    Nor,
}

impl GateKind {
    /// Truth table over every input terminal. Unconnected inputs are passed in as low.
    pub fn evaluate(self, inputs: impl IntoIterator<Item = bool>) -> bool {
        let mut all = true;
        let mut any = false;
        for input in inputs {
            all &= input;
            any |= input;
        }
        match self {
            Self::And => all,
            Self::Or => any,
            Self::Nand => !all,
            Self::Nor => !any,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, PartialEq, Eq, Copy, Debug, Clone, Hash)]
pub enum RelayKind {
    Positive,
    Negative,
}

impl RelayKind {
    /// Whether the contact is closed for the given coil level.
    pub fn closed(self, coil: bool) -> bool {
        match self {
            Self::Positive => coil,
            Self::Negative => !coil,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, PartialEq, Eq, Copy, Debug, Clone, Hash)]
pub enum CommunicatorKind {
    Screen,
    FileInput,
    FileOutput,
}

#[derive(serde::Deserialize, serde::Serialize, PartialEq, Eq, Copy, Debug, Clone, Hash)]
pub enum ElementKind {
    Wire(WireKind),
    Signal,
    Source,
    Relay(RelayKind),
    Gate(GateKind),
    Communicator(CommunicatorKind),
}

impl ElementKind {
    /// Every kind, in save format order. The save format index is the position plus one,
    /// index zero being an empty cell.
    pub const ALL: [Self; 13] = [
        Self::Wire(WireKind::Conductive),
        Self::Wire(WireKind::Insulated),
        Self::Signal,
        Self::Source,
        Self::Relay(RelayKind::Positive),
        Self::Relay(RelayKind::Negative),
        Self::Gate(GateKind::And),
        Self::Gate(GateKind::Or),
        Self::Gate(GateKind::Nand),
        Self::Gate(GateKind::Nor),
        Self::Communicator(CommunicatorKind::Screen),
        Self::Communicator(CommunicatorKind::FileInput),
        Self::Communicator(CommunicatorKind::FileOutput),
    ];

    pub const CONDUCTIVE_WIRE: Self = Self::Wire(WireKind::Conductive);
    pub const INSULATED_WIRE: Self = Self::Wire(WireKind::Insulated);

    pub fn index(self) -> u8 {
        match self {
            Self::Wire(WireKind::Conductive) => 1,
            Self::Wire(WireKind::Insulated) => 2,
            Self::Signal => 3,
            Self::Source => 4,
            Self::Relay(RelayKind::Positive) => 5,
            Self::Relay(RelayKind::Negative) => 6,
            Self::Gate(GateKind::And) => 7,
            Self::Gate(GateKind::Or) => 8,
            Self::Gate(GateKind::Nand) => 9,
            Self::Gate(GateKind::Nor) => 10,
            Self::Communicator(CommunicatorKind::Screen) => 11,
            Self::Communicator(CommunicatorKind::FileInput) => 12,
            Self::Communicator(CommunicatorKind::FileOutput) => 13,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        let position = usize::from(index).checked_sub(1)?;
        Self::ALL.get(position).copied()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Wire(WireKind::Conductive) => "Conductive Wire",
            Self::Wire(WireKind::Insulated) => "Insulated Wire",
            Self::Signal => "Signal",
            Self::Source => "Source",
            Self::Relay(RelayKind::Positive) => "Positive Relay",
            Self::Relay(RelayKind::Negative) => "Negative Relay",
            Self::Gate(GateKind::And) => "AND Gate",
            Self::Gate(GateKind::Or) => "OR Gate",
            Self::Gate(GateKind::Nand) => "NAND Gate",
            Self::Gate(GateKind::Nor) => "NOR Gate",
            Self::Communicator(CommunicatorKind::Screen) => "Screen I/O",
            Self::Communicator(CommunicatorKind::FileInput) => "File Input",
            Self::Communicator(CommunicatorKind::FileOutput) => "File Output",
        }
    }

    /// Level a freshly drawn element starts (and resets) at.
    pub fn default_logic_level(self) -> bool {
        matches!(self, Self::Source)
    }

    pub fn wire_kind(self) -> Option<WireKind> {
        match self {
            Self::Wire(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Wire(WireKind::Conductive) => '-',
            Self::Wire(WireKind::Insulated) => '=',
            Self::Signal => 's',
            Self::Source => 'S',
            Self::Relay(RelayKind::Positive) => 'P',
            Self::Relay(RelayKind::Negative) => 'N',
            Self::Gate(GateKind::And) => '&',
            Self::Gate(GateKind::Or) => '|',
            Self::Gate(GateKind::Nand) => 'a',
            Self::Gate(GateKind::Nor) => 'o',
            Self::Communicator(CommunicatorKind::Screen) => 'D',
            Self::Communicator(CommunicatorKind::FileInput) => 'I',
            Self::Communicator(CommunicatorKind::FileOutput) => 'O',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.glyph() == glyph)
    }
}

// Cells

#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    pub kind: ElementKind,
    pub logic_level: bool,
    pub default_logic_level: bool,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        let level = kind.default_logic_level();
        Self {
            kind,
            logic_level: level,
            default_logic_level: level,
        }
    }

    pub fn reset_logic_level(&mut self) {
        self.logic_level = self.default_logic_level;
    }
}

#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    Element(Element),
}

impl Cell {
    pub fn element(&self) -> Option<&Element> {
        match self {
            Self::Empty => None,
            Self::Element(e) => Some(e),
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Empty => None,
            Self::Element(e) => Some(e),
        }
    }

    pub fn kind(&self) -> Option<ElementKind> {
        self.element().map(|e| e.kind)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn logic_level(&self) -> bool {
        self.element().is_some_and(|e| e.logic_level)
    }

    pub fn wire_kind(&self) -> Option<WireKind> {
        self.kind().and_then(ElementKind::wire_kind)
    }

    /// Kind and default level, ignoring the live level.
    fn layout_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Element(a), Self::Element(b)) => {
                a.kind == b.kind && a.default_logic_level == b.default_logic_level
            }
            _ => false,
        }
    }
}

impl From<Element> for Cell {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

impl From<ElementKind> for Cell {
    fn from(value: ElementKind) -> Self {
        Self::Element(Element::new(value))
    }
}

// Canvas

/// Row-major matrix of cells.
///
/// The cell buffer is shared between clones: history entries, clipboard slots and the live
/// canvas may all point at the same storage. Any write goes through `Arc::make_mut`, so a
/// shared buffer is copied before it is touched and snapshots never change under a reader.
#[derive(Debug, Clone, Default)]
pub struct CanvasState {
    width: i32,
    height: i32,
    cells: Arc<Vec<Cell>>,
}

impl CanvasState {
    /// Negative dimensions are clamped to zero.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let area = width as usize * height as usize;
        Self {
            width,
            height,
            cells: Arc::new(vec![Cell::Empty; area]),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> Point {
        Point::new(self.width, self.height)
    }

    pub fn area(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= 0 && pt.y >= 0 && pt.x < self.width && pt.y < self.height
    }

    fn index(&self, pt: Point) -> Option<usize> {
        if self.contains(pt) {
            Some(pt.y as usize * self.width as usize + pt.x as usize)
        } else {
            None
        }
    }

    /// Empty outside of the bounds.
    pub fn get(&self, x: i32, y: i32) -> Cell {
        self.at(Point::new(x, y))
    }

    pub fn at(&self, pt: Point) -> Cell {
        self.index(pt).map(|i| self.cells[i]).unwrap_or_default()
    }

    /// Returns false (and does nothing) when the point is outside of the bounds.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        self.set_at(Point::new(x, y), cell)
    }

    pub fn set_at(&mut self, pt: Point, cell: Cell) -> bool {
        match self.cell_mut(pt) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn cell_mut(&mut self, pt: Point) -> Option<&mut Cell> {
        let i = self.index(pt)?;
        Arc::make_mut(&mut self.cells).get_mut(i)
    }

    /// True for a zero-area canvas or a canvas holding only empty cells.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    pub fn iter(&self) -> Cells<'_> {
        Cells {
            canvas: self,
            index: 0,
        }
    }

    /// Whether both canvases point at the same cell storage.
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cells, &other.cells)
    }

    /// Same dimensions, kinds and default levels. Live logic levels are ignored since the
    /// simulator rewrites them constantly.
    pub fn same_layout(&self, other: &Self) -> bool {
        if self.shares_storage(other) {
            return true;
        }
        self.size() == other.size()
            && self
                .cells
                .iter()
                .zip(other.cells.iter())
                .all(|(a, b)| a.layout_eq(b))
    }

    pub fn reset_logic_levels(&mut self) {
        for cell in Arc::make_mut(&mut self.cells).iter_mut() {
            if let Some(e) = cell.element_mut() {
                e.reset_logic_level();
            }
        }
    }

    /// Resize keeping `anchor` fixed. Returns the translation applied to existing cells.
    pub fn resize(&mut self, new_width: i32, new_height: i32, anchor: Anchor) -> Point {
        let new_width = new_width.max(0);
        let new_height = new_height.max(0);
        let dx = new_width - self.width;
        let dy = new_height - self.height;
        let translation = match anchor {
            Anchor::TopLeft => Point::ZERO,
            Anchor::TopRight => Point::new(dx, 0),
            Anchor::BottomLeft => Point::new(0, dy),
            Anchor::BottomRight => Point::new(dx, dy),
        };
        let mut resized = Self::new(new_width, new_height);
        copy_range(self, &mut resized, Point::ZERO, translation, self.size());
        *self = resized;
        translation
    }

    /// Pencil and eraser. Drawing outside the bounds grows the canvas, erasing on the border
    /// shrinks it to the bounding box of the remaining elements.
    ///
    /// Returns whether the canvas changed and the translation the viewport has to apply so
    /// that the canvas stays put on screen.
    pub fn change_cell(&mut self, pt: Point, cell: Cell) -> (bool, Point) {
        let Some(kind) = cell.kind() else {
            if self.contains(pt) && !self.at(pt).is_empty() {
                self.set_at(pt, Cell::Empty);
                return (true, self.shrink_around(pt));
            }
            return (false, Point::ZERO);
        };

        let translation = self.prepare_for_addition(pt);
        let pt = pt + translation;
        if self.at(pt).kind() == Some(kind) {
            // nothing was drawn, so the canvas was not grown either
            return (false, Point::ZERO);
        }
        self.set_at(pt, cell);
        (true, translation)
    }

    fn prepare_for_addition(&mut self, pt: Point) -> Point {
        if self.area() == 0 {
            *self = Self::new(1, 1);
            return -pt;
        }
        if self.contains(pt) {
            return Point::ZERO;
        }
        let min_pt = pt.min(Point::ZERO);
        let max_pt = (pt + Point::new(1, 1)).max(self.size());
        let translation = -min_pt;
        let new_size = max_pt + translation;

        let mut grown = Self::new(new_size.x, new_size.y);
        copy_range(self, &mut grown, Point::ZERO, translation, self.size());
        *self = grown;
        translation
    }

    fn shrink_around(&mut self, pt: Point) -> Point {
        let inner = pt.x > 0 && pt.x + 1 < self.width && pt.y > 0 && pt.y + 1 < self.height;
        if inner {
            return Point::ZERO;
        }
        self.shrink_to_fit()
    }

    /// Crop to the bounding box of non-empty cells. An all-empty canvas becomes 0x0.
    /// Returns the translation applied to the remaining cells.
    pub fn shrink_to_fit(&mut self) -> Point {
        let mut min_pt = Point::new(i32::MAX, i32::MAX);
        let mut max_pt = Point::new(i32::MIN, i32::MIN);
        for (pt, cell) in self.iter() {
            if !cell.is_empty() {
                min_pt = min_pt.min(pt);
                max_pt = max_pt.max(pt);
            }
        }

        if min_pt.x > max_pt.x {
            *self = Self::default();
            return Point::ZERO;
        }
        if min_pt == Point::ZERO && max_pt + Point::new(1, 1) == self.size() {
            return Point::ZERO;
        }

        let new_size = max_pt + Point::new(1, 1) - min_pt;
        let mut cropped = Self::new(new_size.x, new_size.y);
        copy_range(self, &mut cropped, min_pt, Point::ZERO, new_size);
        *self = cropped;
        -min_pt
    }

    /// Grow to cover `[top_left, bottom_right)`. Returns the translation applied to the
    /// existing cells.
    pub fn extend(&mut self, top_left: Point, bottom_right: Point) -> Point {
        let (new_top_left, new_bottom_right) = if self.area() == 0 {
            (top_left, bottom_right)
        } else {
            (top_left.min(Point::ZERO), bottom_right.max(self.size()))
        };
        if new_top_left == Point::ZERO && new_bottom_right == self.size() {
            return Point::ZERO;
        }
        let new_size = new_bottom_right - new_top_left;
        let mut grown = Self::new(new_size.x, new_size.y);
        copy_range(self, &mut grown, Point::ZERO, -new_top_left, self.size());
        *self = grown;
        -new_top_left
    }

    /// Copy of the cells under `rect`, leaving `self` and its storage untouched.
    pub fn copy_rect(&self, rect: Rect) -> Self {
        let mut copied = Self::new(rect.size.x, rect.size.y);
        for pt in rect.points().filter(|&pt| self.contains(pt)) {
            copied.set_at(pt - rect.origin, self.at(pt));
        }
        copied
    }

    /// Move a rectangle of cells out into a new canvas of exactly that size, leaving empty
    /// cells behind.
    pub fn splice(&mut self, rect: Rect) -> Self {
        let mut taken = Self::new(rect.size.x, rect.size.y);
        for pt in rect.points() {
            if let Some(cell) = self.cell_mut(pt) {
                let cell = std::mem::take(cell);
                taken.set_at(pt - rect.origin, cell);
            }
        }
        taken
    }

    /// Overlay the non-empty cells of `second` onto `first`. Translations give each canvas'
    /// origin in a common coordinate space. Returns the merged canvas and the translation
    /// from that space into the merged canvas.
    pub fn merge(first: Self, first_trans: Point, second: &Self, second_trans: Point) -> (Self, Point) {
        if first.area() == 0 {
            return (second.clone(), -second_trans);
        }
        if second.area() == 0 {
            return (first, -first_trans);
        }

        let new_min = first_trans.min(second_trans);
        let new_max = (first_trans + first.size()).max(second_trans + second.size());

        let mut merged = if first_trans == new_min && first_trans + first.size() == new_max {
            first
        } else {
            let size = new_max - new_min;
            let mut merged = Self::new(size.x, size.y);
            copy_range(&first, &mut merged, Point::ZERO, first_trans - new_min, first.size());
            merged
        };

        for (pt, cell) in second.iter() {
            if !cell.is_empty() {
                merged.set_at(pt + second_trans - new_min, cell);
            }
        }
        (merged, -new_min)
    }

    pub fn flip_horizontal(&mut self) {
        let width = self.width as usize;
        if width == 0 {
            return;
        }
        for row in Arc::make_mut(&mut self.cells).chunks_mut(width) {
            row.reverse();
        }
    }

    pub fn flip_vertical(&mut self) {
        let width = self.width as usize;
        let height = self.height as usize;
        let cells = Arc::make_mut(&mut self.cells);
        for y in 0..height / 2 {
            for x in 0..width {
                cells.swap(y * width + x, (height - 1 - y) * width + x);
            }
        }
    }

    pub fn rotate_clockwise(&mut self) {
        let mut rotated = Self::new(self.height, self.width);
        for (pt, cell) in self.iter() {
            rotated.set_at(Point::new(self.height - pt.y - 1, pt.x), cell);
        }
        *self = rotated;
    }

    pub fn rotate_counter_clockwise(&mut self) {
        let mut rotated = Self::new(self.height, self.width);
        for (pt, cell) in self.iter() {
            rotated.set_at(Point::new(pt.y, self.width - pt.x - 1), cell);
        }
        *self = rotated;
    }
}

/// Copy a `size` rectangle from `src` at `src_origin` into `dst` at `dst_origin`.
/// Parts falling outside of either canvas are skipped.
fn copy_range(src: &CanvasState, dst: &mut CanvasState, src_origin: Point, dst_origin: Point, size: Point) {
    for y in 0..size.y {
        for x in 0..size.x {
            let offset = Point::new(x, y);
            let from = src_origin + offset;
            if src.contains(from) {
                dst.set_at(dst_origin + offset, src.at(from));
            }
        }
    }
}

impl PartialEq for CanvasState {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && (self.shares_storage(other) || self.cells == other.cells)
    }
}

impl Eq for CanvasState {}

impl Display for CanvasState {
    /// One glyph per cell, `.` for empty, one row per line.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let glyph = self.get(x, y).kind().map_or('.', ElementKind::glyph);
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FromStr for CanvasState {
    type Err = ReadError;

    /// Inverse of `Display`. Rows are trimmed lines; blank lines are skipped and short rows
    /// are padded with empty cells.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut canvas = Self::new(width as i32, rows.len() as i32);
        for (y, row) in rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                if glyph == '.' {
                    continue;
                }
                let kind = ElementKind::from_glyph(glyph).ok_or(ReadError::Corrupted("unknown glyph"))?;
                canvas.set(x as i32, y as i32, kind.into());
            }
        }
        Ok(canvas)
    }
}

/// Lazy row-major iterator over `(Point, Cell)`. Restart by calling `CanvasState::iter` again.
pub struct Cells<'a> {
    canvas: &'a CanvasState,
    index: usize,
}

impl Iterator for Cells<'_> {
    type Item = (Point, Cell);

    fn next(&mut self) -> Option<Self::Item> {
        let cell = *self.canvas.cells.get(self.index)?;
        let width = self.canvas.width as usize;
        let pt = Point::new((self.index % width) as i32, (self.index / width) as i32);
        self.index += 1;
        Some((pt, cell))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.canvas.cells.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a CanvasState {
    type Item = (Point, Cell);
    type IntoIter = Cells<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire() -> Cell {
        ElementKind::CONDUCTIVE_WIRE.into()
    }

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let mut canvas = CanvasState::new(2, 2);
        canvas.set(1, 1, wire());
        assert_eq!(canvas.get(1, 1), wire());
        assert_eq!(canvas.get(-1, 0), Cell::Empty);
        assert_eq!(canvas.get(2, 0), Cell::Empty);
        assert!(!canvas.set(5, 5, wire()), "out of bounds write must be rejected");
    }

    #[test]
    fn negative_dimensions_clamp_to_zero() {
        let canvas = CanvasState::new(-3, 4);
        assert_eq!(canvas.size(), Point::new(0, 4));
        assert!(canvas.is_empty());
    }

    #[test]
    fn empty_means_zero_area_or_all_empty() {
        assert!(CanvasState::default().is_empty());
        let mut canvas = CanvasState::new(3, 3);
        assert!(canvas.is_empty());
        canvas.set(0, 2, wire());
        assert!(!canvas.is_empty());
    }

    #[test]
    fn iteration_is_row_major_and_restartable() {
        let mut canvas = CanvasState::new(2, 2);
        canvas.set(1, 0, wire());
        let points: Vec<Point> = canvas.iter().map(|(pt, _)| pt).collect();
        assert_eq!(
            points,
            vec![Point::new(0, 0), Point::new(1, 0), Point::new(0, 1), Point::new(1, 1)]
        );
        assert_eq!(canvas.iter().filter(|(_, c)| !c.is_empty()).count(), 1);
        assert_eq!((&canvas).into_iter().count(), 4);
    }

    #[test]
    fn clones_share_until_written() {
        let mut canvas = CanvasState::new(2, 1);
        let snapshot = canvas.clone();
        assert!(canvas.shares_storage(&snapshot));

        canvas.set(0, 0, wire());
        assert!(!canvas.shares_storage(&snapshot));
        assert_eq!(snapshot.get(0, 0), Cell::Empty, "snapshot must not see the write");
    }

    #[test]
    fn resize_keeps_cells_relative_to_anchor() {
        let mut canvas = CanvasState::new(2, 2);
        canvas.set(0, 0, wire());

        let mut top_left = canvas.clone();
        assert_eq!(top_left.resize(3, 3, Anchor::TopLeft), Point::ZERO);
        assert_eq!(top_left.get(0, 0), wire());

        let mut bottom_right = canvas.clone();
        assert_eq!(bottom_right.resize(3, 4, Anchor::BottomRight), Point::new(1, 2));
        assert_eq!(bottom_right.get(1, 2), wire());
        assert_eq!(bottom_right.get(0, 0), Cell::Empty);

        let mut shrunk = canvas;
        shrunk.resize(1, 1, Anchor::BottomRight);
        assert!(shrunk.is_empty(), "the wire was cropped away");
    }

    #[test]
    fn drawing_outside_grows_with_translation() {
        let mut canvas = CanvasState::default();
        let (changed, trans) = canvas.change_cell(Point::new(5, 5), wire());
        assert!(changed);
        assert_eq!(trans, Point::new(-5, -5));
        assert_eq!(canvas.size(), Point::new(1, 1));

        // canvas coordinates are now relative to the first drawn cell
        let (changed, trans) = canvas.change_cell(Point::new(-2, 0), wire());
        assert!(changed);
        assert_eq!(trans, Point::new(2, 0));
        assert_eq!(canvas.size(), Point::new(3, 1));
        assert_eq!(canvas.get(0, 0), wire());
        assert_eq!(canvas.get(2, 0), wire());

        let (changed, trans) = canvas.change_cell(Point::new(0, 0), wire());
        assert!(!changed, "same kind is a no-op");
        assert_eq!(trans, Point::ZERO);
    }

    #[test]
    fn erasing_border_shrinks() {
        let mut canvas = CanvasState::new(3, 1);
        canvas.set(0, 0, wire());
        canvas.set(2, 0, wire());

        let (changed, trans) = canvas.change_cell(Point::new(0, 0), Cell::Empty);
        assert!(changed);
        assert_eq!(trans, Point::new(-2, 0));
        assert_eq!(canvas.size(), Point::new(1, 1));

        let (changed, _) = canvas.change_cell(Point::new(0, 0), Cell::Empty);
        assert!(changed);
        assert_eq!(canvas.area(), 0);
    }

    #[test]
    fn splice_and_merge_move_a_block() {
        let mut canvas = CanvasState::new(4, 1);
        canvas.set(0, 0, ElementKind::Source.into());
        canvas.set(1, 0, wire());

        let block = canvas.splice(Rect::new(0, 0, 2, 1));
        assert_eq!(block.get(0, 0).kind(), Some(ElementKind::Source));
        assert_eq!(canvas.get(0, 0), Cell::Empty);

        let (merged, trans) = CanvasState::merge(canvas, Point::ZERO, &block, Point::new(2, 0));
        assert_eq!(trans, Point::ZERO);
        assert_eq!(merged.get(2, 0).kind(), Some(ElementKind::Source));
        assert_eq!(merged.get(3, 0), wire());
    }

    #[test]
    fn copy_rect_reads_without_copying_storage() {
        let mut canvas = CanvasState::new(3, 2);
        canvas.set(1, 0, ElementKind::Source.into());
        canvas.set(2, 1, wire());
        let snapshot = canvas.clone();

        let block = canvas.copy_rect(Rect::new(1, 0, 3, 2));
        assert_eq!(block.size(), Point::new(3, 2));
        assert_eq!(block.get(0, 0).kind(), Some(ElementKind::Source));
        assert_eq!(block.get(1, 1), wire());
        assert_eq!(block.get(2, 0), Cell::Empty, "outside the canvas");
        assert!(canvas.shares_storage(&snapshot));
    }

    #[test]
    fn rotate_and_flip() {
        let mut canvas = CanvasState::new(2, 1);
        canvas.set(0, 0, ElementKind::Source.into());

        canvas.rotate_clockwise();
        assert_eq!(canvas.size(), Point::new(1, 2));
        assert_eq!(canvas.get(0, 0).kind(), Some(ElementKind::Source));

        canvas.flip_vertical();
        assert_eq!(canvas.get(0, 1).kind(), Some(ElementKind::Source));

        canvas.rotate_counter_clockwise();
        assert_eq!(canvas.size(), Point::new(2, 1));
        assert_eq!(canvas.get(1, 0).kind(), Some(ElementKind::Source));

        canvas.flip_horizontal();
        assert_eq!(canvas.get(0, 0).kind(), Some(ElementKind::Source));
    }

    #[test]
    fn layout_ignores_live_levels() {
        let mut a = CanvasState::new(1, 1);
        a.set(0, 0, wire());
        let mut b = CanvasState::new(1, 1);
        let mut live = Element::new(ElementKind::CONDUCTIVE_WIRE);
        live.logic_level = true;
        b.set(0, 0, live.into());
        assert!(a.same_layout(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn gate_truth_tables() {
        assert!(GateKind::And.evaluate([true, true]));
        assert!(!GateKind::And.evaluate([true, false]));
        assert!(GateKind::Or.evaluate([false, true]));
        assert!(!GateKind::Nand.evaluate([true, true]));
        assert!(GateKind::Nor.evaluate([false, false]));
        assert!(RelayKind::Positive.closed(true));
        assert!(RelayKind::Negative.closed(false));
    }

    #[test]
    fn text_layout_parses_and_prints() {
        let canvas: CanvasState = "S-&\n.=.".parse().unwrap();
        assert_eq!(canvas.size(), Point::new(3, 2));
        assert_eq!(canvas.get(0, 0).kind(), Some(ElementKind::Source));
        assert!(canvas.get(0, 0).logic_level(), "sources start high");
        assert_eq!(canvas.get(2, 0).kind(), Some(ElementKind::Gate(GateKind::And)));
        assert_eq!(canvas.get(1, 1).kind(), Some(ElementKind::INSULATED_WIRE));
        assert_eq!(canvas.to_string(), "S-&\n.=.\n");
        assert!("S?".parse::<CanvasState>().is_err());
    }

    #[test]
    fn element_index_round_trips() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(ElementKind::from_index(0), None);
        assert_eq!(ElementKind::from_index(14), None);
    }
}
