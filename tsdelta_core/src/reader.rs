use serde::Serialize;

use crate::error::{DeltaError, Result};
use crate::flags::BlockFlags;
use crate::format::{FrameHeader, CELL_PREFIX_SIZE, FRAME_HEADER_SIZE};
use crate::pack::ByteReader;
use crate::types::DataType;

/// Parsed view over an encoded frame.
///
/// # Open sequence
/// 1. Read the 8-byte header and check the magic against the decoding codec.
/// 2. Walk the `num_blocks * num_vectors` length-prefixed cells, block-major.
/// 3. Reject a frame with bytes left over after the last cell.
///
/// Cells borrow from the input; nothing is decoded until a caller asks for it.
pub struct FrameReader<'a> {
    pub header: FrameHeader,
    cells: Vec<&'a [u8]>,
    encoded_size: usize,
}

impl<'a> FrameReader<'a> {
    pub fn parse(buf: &'a [u8], expected_magic: i32) -> Result<Self> {
        let mut reader = ByteReader::new(buf);

        // ── Header ─────────────────────────────────────────────────────────
        let header_buf = reader.array::<FRAME_HEADER_SIZE>("frame header")?;
        let header = FrameHeader::from_bytes(&header_buf, expected_magic)?;
        if header.num_blocks == 0 || header.num_vectors == 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "frame declares {} blocks of {} vectors",
                header.num_blocks, header.num_vectors
            )));
        }

        // ── Cells ──────────────────────────────────────────────────────────
        let count = header.num_blocks as usize * header.num_vectors as usize;
        let mut cells = Vec::with_capacity(count);
        for _ in 0..count {
            let len = reader.i32("cell length")?;
            let len = usize::try_from(len).map_err(|_| {
                DeltaError::InvalidFormat(format!("negative cell length {}", len))
            })?;
            cells.push(reader.take(len, "cell")?);
        }
        reader.expect_end("frame")?;

        Ok(Self {
            header,
            cells,
            encoded_size: buf.len(),
        })
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.header.num_blocks as usize
    }

    #[inline]
    pub fn num_vectors(&self) -> usize {
        self.header.num_vectors as usize
    }

    /// Fail unless the frame holds exactly `expected` vectors.
    pub fn expect_vectors(&self, expected: usize) -> Result<()> {
        if self.num_vectors() != expected {
            return Err(DeltaError::VectorCountMismatch {
                expected,
                found: self.num_vectors(),
            });
        }
        Ok(())
    }

    /// Serialized block for vector `vector` of block `block`.
    pub fn cell(&self, block: usize, vector: usize) -> Result<&'a [u8]> {
        if block >= self.num_blocks() || vector >= self.num_vectors() {
            return Err(DeltaError::InvalidArgument(format!(
                "cell ({}, {}) is outside a frame of {} blocks by {} vectors",
                block,
                vector,
                self.num_blocks(),
                self.num_vectors()
            )));
        }
        Ok(self.cells[block * self.num_vectors() + vector])
    }

    /// Read the fixed part of every cell without decoding any payload.
    pub fn inspect(&self) -> Result<FrameInfo> {
        let mut cells = Vec::with_capacity(self.cells.len());
        for block in 0..self.num_blocks() {
            for vector in 0..self.num_vectors() {
                cells.push(CellInfo::parse(block, vector, self.cell(block, vector)?)?);
            }
        }
        Ok(FrameInfo {
            magic: self.header.magic,
            num_blocks: self.num_blocks(),
            num_vectors: self.num_vectors(),
            encoded_size: self.encoded_size,
            cells,
        })
    }
}

// ── Inspection ─────────────────────────────────────────────────────────────

/// Summary of one cell: its block descriptor and sizes.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub block: usize,
    pub vector: usize,
    pub data_type: DataType,
    #[serde(skip)]
    pub flags: BlockFlags,
    pub list_count: usize,
    /// Payload bytes as stored (after the finisher, if any).
    pub payload_size: usize,
    /// Whole cell, excluding its length prefix.
    pub cell_size: usize,
}

impl CellInfo {
    fn parse(block: usize, vector: usize, cell: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(cell);
        let flags = BlockFlags::unpack(reader.u16("block flags")?)?;
        let list_count = reader.i32("block list count")?;
        let list_count = usize::try_from(list_count).map_err(|_| {
            DeltaError::InvalidFormat(format!("negative block list count {}", list_count))
        })?;
        reader.take(flags.data_type.width(), "block anchor")?;
        reader.take(flags.data_type.factor_width(), "block factor")?;
        let byte_count = reader.i32("block byte count")?;
        let payload_size = usize::try_from(byte_count).map_err(|_| {
            DeltaError::InvalidFormat(format!("negative block byte count {}", byte_count))
        })?;
        reader.take(payload_size, "block payload")?;
        reader.expect_end("block")?;
        Ok(Self {
            block,
            vector,
            data_type: flags.data_type,
            flags,
            list_count,
            payload_size,
            cell_size: cell.len(),
        })
    }

    /// Bytes the values of this cell occupy in their fixed-width form.
    pub fn raw_size(&self) -> usize {
        self.list_count * self.flags.data_type.width()
    }
}

/// Summary of a whole frame, as returned by `DeltaCodec::inspect`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub magic: i32,
    pub num_blocks: usize,
    pub num_vectors: usize,
    pub encoded_size: usize,
    pub cells: Vec<CellInfo>,
}

impl FrameInfo {
    /// Number of values held by vector `vector` across all blocks.
    pub fn value_count(&self, vector: usize) -> usize {
        self.cells
            .iter()
            .filter(|c| c.vector == vector)
            .map(|c| c.list_count)
            .sum()
    }

    /// Total fixed-width size of every value in the frame.
    pub fn raw_size(&self) -> usize {
        self.cells.iter().map(CellInfo::raw_size).sum()
    }

    /// Bytes spent on framing: header, cell prefixes and block envelopes.
    pub fn overhead(&self) -> usize {
        FRAME_HEADER_SIZE
            + self
                .cells
                .iter()
                .map(|c| CELL_PREFIX_SIZE + c.cell_size - c.payload_size)
                .sum::<usize>()
    }

    /// Compression ratio (raw / encoded).
    pub fn ratio(&self) -> f64 {
        if self.encoded_size == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / self.encoded_size as f64
    }
}
