use crate::{
    canvas::{CanvasState, Cell, Element, ElementKind},
    error::ReadError,
};

pub const MAGIC: &[u8; 4] = b"CCPG";
pub const VERSION: i32 = 0;

/// Binary save format: magic, version, width, height (little endian `i32`), then one byte
/// per cell in row-major order laid out as `index << 2 | level << 1 | default_level`.
pub fn write_save(canvas: &CanvasState) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16 + canvas.area());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&canvas.width().to_le_bytes());
    bytes.extend_from_slice(&canvas.height().to_le_bytes());
    bytes.extend(canvas.iter().map(|(_, cell)| encode_cell(cell)));
    bytes
}

pub fn load_save(mut bytes: &[u8]) -> Result<CanvasState, ReadError> {
    let (magic, rest) = bytes
        .split_first_chunk::<4>()
        .ok_or(ReadError::Corrupted("missing header"))?;
    if magic != MAGIC {
        return Err(ReadError::Corrupted("bad magic"));
    }
    bytes = rest;

    let version = read_i32(&mut bytes)?;
    if version != VERSION {
        return Err(ReadError::Outdated(format!("version {version}")));
    }

    let width = read_i32(&mut bytes)?;
    let height = read_i32(&mut bytes)?;
    if width < 0 || height < 0 {
        return Err(ReadError::Corrupted("negative dimensions"));
    }
    let area = (width as usize)
        .checked_mul(height as usize)
        .ok_or(ReadError::Corrupted("dimensions overflow"))?;
    let cells = bytes.get(..area).ok_or(ReadError::Corrupted("truncated cell data"))?;

    let mut canvas = CanvasState::new(width, height);
    for (i, &byte) in cells.iter().enumerate() {
        let cell = decode_cell(byte)?;
        if !cell.is_empty() {
            let x = (i % width as usize) as i32;
            let y = (i / width as usize) as i32;
            canvas.set(x, y, cell);
        }
    }
    log::info!("loaded {width}x{height} canvas");
    Ok(canvas)
}

fn read_i32(bytes: &mut &[u8]) -> Result<i32, ReadError> {
    let (value, rest) = bytes
        .split_first_chunk::<4>()
        .ok_or(ReadError::Corrupted("truncated header"))?;
    *bytes = rest;
    Ok(i32::from_le_bytes(*value))
}

fn encode_cell(cell: Cell) -> u8 {
    match cell {
        Cell::Empty => 0,
        Cell::Element(e) => (e.kind.index() << 2) | (u8::from(e.logic_level) << 1) | u8::from(e.default_logic_level),
    }
}

fn decode_cell(byte: u8) -> Result<Cell, ReadError> {
    let index = byte >> 2;
    if index == 0 {
        return Ok(Cell::Empty);
    }
    let kind = ElementKind::from_index(index).ok_or_else(|| ReadError::Outdated(format!("element index {index}")))?;
    Ok(Cell::Element(Element {
        kind,
        logic_level: byte & 0b10 != 0,
        default_logic_level: byte & 0b01 != 0,
    }))
}

// Serde form of a canvas: dimensions plus the row-major cell list
#[derive(serde::Serialize, serde::Deserialize)]
struct SerializableCanvas {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl serde::Serialize for CanvasState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        SerializableCanvas {
            width: self.width(),
            height: self.height(),
            cells: self.iter().map(|(_, cell)| cell).collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for CanvasState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let serializable = SerializableCanvas::deserialize(deserializer)?;
        let area = (serializable.width.max(0) as usize).checked_mul(serializable.height.max(0) as usize);
        if area != Some(serializable.cells.len()) {
            return Err(serde::de::Error::invalid_length(
                serializable.cells.len(),
                &"width * height cells",
            ));
        }
        let mut canvas = Self::new(serializable.width, serializable.height);
        for (i, cell) in serializable.cells.into_iter().enumerate() {
            let width = serializable.width as usize;
            canvas.set((i % width) as i32, (i / width) as i32, cell);
        }
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{GateKind, Point};

    fn sample() -> CanvasState {
        let mut canvas: CanvasState = "S-&\n.=s".parse().unwrap();
        if let Some(e) = canvas.cell_mut(Point::new(1, 0)).and_then(|c| c.element_mut()) {
            e.logic_level = true;
        }
        canvas
    }

    #[test]
    fn round_trip_keeps_every_cell() {
        let canvas = sample();
        let loaded = load_save(&write_save(&canvas)).unwrap();
        assert_eq!(loaded, canvas);
        assert!(loaded.get(1, 0).logic_level());
        assert!(loaded.get(0, 0).element().is_some_and(|e| e.default_logic_level));
    }

    #[test]
    fn header_layout() {
        let bytes = write_save(&sample());
        assert_eq!(&bytes[..4], b"CCPG");
        assert_eq!(&bytes[4..8], &0i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &2i32.to_le_bytes());
        assert_eq!(bytes.len(), 16 + 6);
        // source: index 4, high, default high
        assert_eq!(bytes[16], (4 << 2) | 0b11);
        assert_eq!(bytes[18], ElementKind::Gate(GateKind::And).index() << 2);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = write_save(&sample());
        bytes[0] = b'X';
        assert_eq!(load_save(&bytes), Err(ReadError::Corrupted("bad magic")));
    }

    #[test]
    fn rejects_truncated_data() {
        let bytes = write_save(&sample());
        assert!(matches!(load_save(&bytes[..bytes.len() - 1]), Err(ReadError::Corrupted(_))));
        assert!(matches!(load_save(&bytes[..10]), Err(ReadError::Corrupted(_))));
        assert!(matches!(load_save(b"CC"), Err(ReadError::Corrupted(_))));
    }

    #[test]
    fn rejects_unknown_version_and_element() {
        let mut bytes = write_save(&sample());
        bytes[4] = 7;
        assert!(matches!(load_save(&bytes), Err(ReadError::Outdated(_))));

        let mut bytes = write_save(&sample());
        bytes[16] = 31 << 2;
        assert!(matches!(load_save(&bytes), Err(ReadError::Outdated(_))));
    }

    #[test]
    fn rejects_negative_dimensions() {
        let mut bytes = write_save(&sample());
        bytes[8..12].copy_from_slice(&(-1i32).to_le_bytes());
        assert_eq!(load_save(&bytes), Err(ReadError::Corrupted("negative dimensions")));
    }

    #[test]
    fn json_round_trip() {
        let canvas = sample();
        let json = serde_json::to_string(&canvas).unwrap();
        let loaded: CanvasState = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, canvas);
        assert!(serde_json::from_str::<CanvasState>(r#"{"width":2,"height":2,"cells":[]}"#).is_err());
    }

    #[test]
    fn json_with_huge_dimensions_is_rejected_before_allocating() {
        let json = r#"{"width":2000000000,"height":2000000000,"cells":[]}"#;
        assert!(serde_json::from_str::<CanvasState>(json).is_err());

        let overflowing = format!(r#"{{"width":{},"height":{},"cells":[]}}"#, i32::MAX, i32::MAX);
        assert!(serde_json::from_str::<CanvasState>(&overflowing).is_err());
    }
}
