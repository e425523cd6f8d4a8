use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use rayon::prelude::*;

use crate::block::BlockState;
use crate::config::{CodecConfig, ColumnOptions};
use crate::delta::DeltaValue;
use crate::error::Result;
use crate::finisher::Finisher;
use crate::flags::CompressionLevel;
use crate::format::magic_number;
use crate::range::Range;
use crate::reader::{FrameInfo, FrameReader};
use crate::struple::Struple;
use crate::writer::FrameWriter;

/// Splits columns into blocks, delta-encodes and finishes every block in
/// parallel, and assembles the results into one frame.
///
/// A codec is bound to one [`Finisher`]. Its magic number is derived from the
/// finisher's name, so a frame is only accepted by a codec built around the
/// same finisher.
///
/// # Pipeline per block
/// ```text
/// encode: values ─► delta transform ─► finisher (unless NoCompression) ─► block bytes
/// decode: block bytes ─► finisher (unless NoCompression) ─► delta inverse ─► values
/// ```
///
/// Every operation takes `&self`; one codec can serve many threads at once.
pub struct DeltaCodec {
    finisher: Arc<dyn Finisher>,
    config: CodecConfig,
    pool: Option<rayon::ThreadPool>,
    magic: i32,
}

impl fmt::Debug for DeltaCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaCodec")
            .field("finisher", &self.finisher.name())
            .field("config", &self.config)
            .field("magic", &format_args!("{:#010x}", self.magic))
            .finish()
    }
}

impl DeltaCodec {
    /// Codec over `finisher` running on the global rayon pool.
    pub fn new(finisher: Arc<dyn Finisher>) -> Self {
        let magic = magic_number(finisher.name());
        Self {
            finisher,
            config: CodecConfig::default(),
            pool: None,
            magic,
        }
    }

    /// Codec over `finisher` with explicit settings. Builds a dedicated
    /// worker pool when `config.num_threads` is set.
    pub fn with_config(finisher: Arc<dyn Finisher>, config: CodecConfig) -> Result<Self> {
        let pool = match config.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("tsdelta-{}", i))
                    .build()?,
            ),
            None => None,
        };
        let magic = magic_number(finisher.name());
        debug!(
            "codec over {} finisher: magic {:#010x}, max parallel {}, threads {:?}",
            finisher.name(),
            magic,
            config.max_parallel(),
            config.num_threads
        );
        Ok(Self {
            finisher,
            config,
            pool,
            magic,
        })
    }

    pub fn finisher(&self) -> &dyn Finisher {
        self.finisher.as_ref()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Identity hash written at the start of every frame.
    #[inline]
    pub fn magic_number(&self) -> i32 {
        self.magic
    }

    /// Largest block count this codec will write.
    pub fn max_parallel(&self) -> usize {
        self.config.max_parallel()
    }

    /// Clamp a requested block count into `1..=max_parallel()`. An empty
    /// input always gets a single empty block.
    fn clamp_blocks(&self, requested: usize, count: usize) -> usize {
        let max = self.max_parallel();
        let num_blocks = if count == 0 { 1 } else { requested.clamp(1, max) };
        if num_blocks != requested {
            debug!(
                "requested {} blocks, using {} (allowed 1..={})",
                requested, num_blocks, max
            );
        }
        num_blocks
    }

    /// Run `op` on this codec's worker pool.
    fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    // ── Single block ───────────────────────────────────────────────────────

    /// Encode `values` as one serialized block.
    pub fn encode_block<T: DeltaValue>(
        &self,
        values: &[T],
        options: &ColumnOptions<T>,
    ) -> Result<Vec<u8>> {
        let mut state = BlockState::new(values.to_vec(), options.level, options.monotonicity);
        state.encode(options.granularity)?;
        let delta_len = state.bytes.len();
        if options.level != CompressionLevel::NoCompression {
            state.bytes = self.finisher.encode(&state.bytes, options.level)?;
        }
        trace!(
            "{} block: {} values, payload {} -> {} bytes",
            T::DATA_TYPE.name(),
            state.list_count,
            delta_len,
            state.bytes.len()
        );
        state.serialize()
    }

    /// Decode one serialized block.
    pub fn decode_block<T: DeltaValue>(&self, cell: &[u8]) -> Result<Vec<T>> {
        let mut state = BlockState::<T>::deserialize(cell)?;
        if state.flags.level != CompressionLevel::NoCompression {
            state.bytes = self.finisher.decode(&state.bytes)?;
        }
        state.decode()?;
        Ok(state.list)
    }

    // ── Single vector ──────────────────────────────────────────────────────

    /// Encode one column into a frame of `num_blocks` blocks.
    ///
    /// `num_blocks` is clamped into `1..=max_parallel()`. The frame decodes to
    /// the same values whatever block count is used.
    pub fn encode<T: DeltaValue>(
        &self,
        values: &[T],
        num_blocks: usize,
        options: &ColumnOptions<T>,
    ) -> Result<Vec<u8>> {
        let num_blocks = self.clamp_blocks(num_blocks, values.len());
        let ranges = Range::partition(0, values.len(), num_blocks)?;
        let cells = self.install(|| {
            ranges
                .par_iter()
                .map(|range| self.encode_block(&values[range.as_range()], options))
                .collect::<Result<Vec<_>>>()
        })?;
        self.assemble(num_blocks, 1, &cells)
    }

    /// Decode a frame written by [`encode`](Self::encode).
    pub fn decode<T: DeltaValue>(&self, bytes: &[u8]) -> Result<Vec<T>> {
        let frame = FrameReader::parse(bytes, self.magic)?;
        frame.expect_vectors(1)?;
        let blocks = self.install(|| {
            (0..frame.num_blocks())
                .into_par_iter()
                .map(|block| self.decode_block::<T>(frame.cell(block, 0)?))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(blocks.concat())
    }

    // ── Struples ───────────────────────────────────────────────────────────

    /// Encode rows of a tuple, one vector per field.
    pub fn encode_struples<S: Struple>(
        &self,
        rows: &[S],
        num_blocks: usize,
        options: &S::Options,
    ) -> Result<Vec<u8>> {
        let columns = self.install(|| S::split(rows));
        self.encode_columns::<S>(&columns, num_blocks, options)
    }

    /// Encode parallel columns that together form rows of `S`. Every column
    /// must have the same length.
    pub fn encode_columns<S: Struple>(
        &self,
        columns: &S::Columns,
        num_blocks: usize,
        options: &S::Options,
    ) -> Result<Vec<u8>> {
        let rows = S::row_count(columns)?;
        let num_blocks = self.clamp_blocks(num_blocks, rows);
        let ranges = Range::partition(0, rows, num_blocks)?;
        let cells = self.install(|| S::encode_cells(self, columns, options, &ranges))?;
        self.assemble(num_blocks, S::ARITY, &cells)
    }

    /// Decode a frame written by [`encode_struples`](Self::encode_struples).
    pub fn decode_struples<S: Struple>(&self, bytes: &[u8]) -> Result<Vec<S>> {
        S::zip(self.decode_columns::<S>(bytes)?)
    }

    /// Decode a struple frame into its columns without building rows.
    pub fn decode_columns<S: Struple>(&self, bytes: &[u8]) -> Result<S::Columns> {
        let frame = FrameReader::parse(bytes, self.magic)?;
        frame.expect_vectors(S::ARITY)?;
        self.install(|| S::decode_cells(self, &frame))
    }

    // ── Inspection ─────────────────────────────────────────────────────────

    /// Describe a frame's blocks without decoding any payload.
    pub fn inspect(&self, bytes: &[u8]) -> Result<FrameInfo> {
        FrameReader::parse(bytes, self.magic)?.inspect()
    }

    fn assemble(&self, num_blocks: usize, num_vectors: usize, cells: &[Vec<u8>]) -> Result<Vec<u8>> {
        let mut writer = FrameWriter::new(self.magic, num_blocks, num_vectors)?;
        for cell in cells {
            writer.write_cell(cell)?;
        }
        let frame = writer.finish()?;
        debug!(
            "encoded frame: {} blocks x {} vectors, {} bytes",
            num_blocks,
            num_vectors,
            frame.len()
        );
        Ok(frame)
    }
}
