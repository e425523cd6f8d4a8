use crate::error::{DeltaError, Result};
use crate::format::{FrameHeader, CELL_PREFIX_SIZE, FRAME_HEADER_SIZE, MAX_BLOCKS, MAX_VECTORS};

/// Assembles a frame in memory.
///
/// # Write contract
/// Call [`write_cell`] exactly `num_blocks * num_vectors` times, block-major:
/// every vector of block 0, then every vector of block 1, and so on. Call
/// [`finish`] to get the frame bytes.
///
/// # Format layout written
/// ```text
/// [HEADER: 8 bytes]
/// [len:i32][cell b0 v0] [len:i32][cell b0 v1] ... [len:i32][cell bN vM]
/// ```
///
/// [`write_cell`]: FrameWriter::write_cell
/// [`finish`]: FrameWriter::finish
pub struct FrameWriter {
    buf: Vec<u8>,
    expected_cells: usize,
    written_cells: usize,
}

impl FrameWriter {
    pub fn new(magic: i32, num_blocks: usize, num_vectors: usize) -> Result<Self> {
        if !(1..=MAX_BLOCKS).contains(&num_blocks) {
            return Err(DeltaError::InvalidArgument(format!(
                "frame block count {} is outside 1..={}",
                num_blocks, MAX_BLOCKS
            )));
        }
        if !(1..=MAX_VECTORS).contains(&num_vectors) {
            return Err(DeltaError::InvalidArgument(format!(
                "frame vector count {} is outside 1..={}",
                num_vectors, MAX_VECTORS
            )));
        }
        let header = FrameHeader {
            magic,
            num_blocks: num_blocks as u8,
            num_vectors: num_vectors as u8,
            flags: 0,
        };
        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE);
        buf.extend_from_slice(&header.to_bytes());
        Ok(Self {
            buf,
            expected_cells: num_blocks * num_vectors,
            written_cells: 0,
        })
    }

    /// Append one serialized block with its length prefix.
    pub fn write_cell(&mut self, cell: &[u8]) -> Result<()> {
        if self.written_cells == self.expected_cells {
            return Err(DeltaError::InvalidArgument(format!(
                "frame already holds all {} cells",
                self.expected_cells
            )));
        }
        let len = i32::try_from(cell.len()).map_err(|_| {
            DeltaError::InvalidArgument(format!("cell of {} bytes exceeds i32 length", cell.len()))
        })?;
        self.buf.reserve(CELL_PREFIX_SIZE + cell.len());
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(cell);
        self.written_cells += 1;
        Ok(())
    }

    /// Seal the frame. Fails if fewer cells were written than the header announces.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.written_cells != self.expected_cells {
            return Err(DeltaError::InvalidArgument(format!(
                "frame announces {} cells but {} were written",
                self.expected_cells, self.written_cells
            )));
        }
        Ok(self.buf)
    }
}
