//! Tuples of delta-encodable values ("struples").
//!
//! A struple of arity N is stored as N vectors in one frame. Rows are split
//! into columns, every (block, vector) cell is encoded as its own task, and
//! decoding zips the columns back into rows.

use rayon::prelude::*;

use crate::codec::DeltaCodec;
use crate::config::ColumnOptions;
use crate::delta::DeltaValue;
use crate::error::{DeltaError, Result};
use crate::range::Range;
use crate::reader::FrameReader;

/// A tuple whose every field is a [`DeltaValue`].
///
/// Implemented for tuples of arity 1 through 17. `Columns` is the matching
/// tuple of `Vec`s and `Options` the matching tuple of [`ColumnOptions`].
pub trait Struple: Copy + Send + Sync + Sized {
    /// Number of fields, which is also the number of vectors in a frame.
    const ARITY: usize;

    type Columns: Send + Sync;
    type Options: Send + Sync;

    /// Default options for every field.
    fn default_options() -> Self::Options;

    /// Split rows into one column per field.
    fn split(rows: &[Self]) -> Self::Columns;

    /// Rebuild rows from columns of equal length.
    fn zip(columns: Self::Columns) -> Result<Vec<Self>>;

    /// Length shared by every column; an error if they differ.
    fn row_count(columns: &Self::Columns) -> Result<usize>;

    /// Encode every (block, vector) cell. Returns cells block-major.
    #[doc(hidden)]
    fn encode_cells(
        codec: &DeltaCodec,
        columns: &Self::Columns,
        options: &Self::Options,
        ranges: &[Range],
    ) -> Result<Vec<Vec<u8>>>;

    /// Decode every cell of `frame` and concatenate each vector's blocks.
    #[doc(hidden)]
    fn decode_cells(codec: &DeltaCodec, frame: &FrameReader<'_>) -> Result<Self::Columns>;
}

fn empty_slots<T>(n: usize) -> Vec<Result<Vec<T>>> {
    (0..n).map(|_| Ok(Vec::new())).collect()
}

/// Concatenate decoded blocks in order, surfacing the first failure.
fn concat_blocks<T>(blocks: Vec<Result<Vec<T>>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for block in blocks {
        out.extend(block?);
    }
    Ok(out)
}

macro_rules! impl_struple {
    ($arity:expr; $($T:ident $idx:tt),+) => {
        impl<$($T: DeltaValue),+> Struple for ($($T,)+) {
            const ARITY: usize = $arity;

            type Columns = ($(Vec<$T>,)+);
            type Options = ($(ColumnOptions<$T>,)+);

            fn default_options() -> Self::Options {
                ($(ColumnOptions::<$T>::default(),)+)
            }

            fn split(rows: &[Self]) -> Self::Columns {
                ($(rows.par_iter().map(|row| row.$idx).collect::<Vec<$T>>(),)+)
            }

            fn zip(columns: Self::Columns) -> Result<Vec<Self>> {
                let n = Self::row_count(&columns)?;
                Ok((0..n).map(|i| ($(columns.$idx[i],)+)).collect())
            }

            fn row_count(columns: &Self::Columns) -> Result<usize> {
                let lens = [$(columns.$idx.len()),+];
                let n = lens[0];
                if lens.iter().any(|&len| len != n) {
                    return Err(DeltaError::InvalidArgument(format!(
                        "struple columns have unequal lengths {:?}",
                        lens
                    )));
                }
                Ok(n)
            }

            fn encode_cells(
                codec: &DeltaCodec,
                columns: &Self::Columns,
                options: &Self::Options,
                ranges: &[Range],
            ) -> Result<Vec<Vec<u8>>> {
                let mut cells = empty_slots::<u8>(ranges.len() * $arity);
                rayon::scope(|s| {
                    for (range, row) in ranges.iter().zip(cells.chunks_mut($arity)) {
                        let mut slots = row.iter_mut();
                        $(
                            if let Some(slot) = slots.next() {
                                let values = &columns.$idx[range.as_range()];
                                let opts = &options.$idx;
                                s.spawn(move |_| *slot = codec.encode_block(values, opts));
                            }
                        )+
                    }
                });
                cells.into_iter().collect()
            }

            fn decode_cells(codec: &DeltaCodec, frame: &FrameReader<'_>) -> Result<Self::Columns> {
                let num_blocks = frame.num_blocks();
                let mut slots = ($(empty_slots::<$T>(num_blocks),)+);
                rayon::scope(|s| -> Result<()> {
                    $(
                        for (block, slot) in slots.$idx.iter_mut().enumerate() {
                            let cell = frame.cell(block, $idx)?;
                            s.spawn(move |_| *slot = codec.decode_block::<$T>(cell));
                        }
                    )+
                    Ok(())
                })?;
                Ok(($(concat_blocks(slots.$idx)?,)+))
            }
        }
    };
}

impl_struple!(1; A 0);
impl_struple!(2; A 0, B 1);
impl_struple!(3; A 0, B 1, C 2);
impl_struple!(4; A 0, B 1, C 2, D 3);
impl_struple!(5; A 0, B 1, C 2, D 3, E 4);
impl_struple!(6; A 0, B 1, C 2, D 3, E 4, F 5);
impl_struple!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_struple!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
impl_struple!(9; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
impl_struple!(10; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);
impl_struple!(11; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10);
impl_struple!(12; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11);
impl_struple!(13; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11, M 12);
impl_struple!(14; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11, M 12, N 13);
impl_struple!(15; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11, M 12, N 13, O 14);
impl_struple!(16; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11, M 12, N 13, O 14, P 15);
impl_struple!(17; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11, M 12, N 13, O 14, P 15, Q 16);
