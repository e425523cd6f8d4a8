//! Bundled finishers for `tsdelta_core`.

mod deflate_finisher;
mod lz4_finisher;
mod passthrough;
mod zstd_finisher;

pub use deflate_finisher::DeflateFinisher;
pub use lz4_finisher::Lz4Finisher;
pub use passthrough::PassThroughFinisher;
pub use zstd_finisher::ZstdFinisher;

use std::sync::Arc;

use log::debug;
use tsdelta_core::{CodecConfig, DeltaCodec, Finisher};

pub const FINISHER_PASSTHROUGH: u16 = 0;
pub const FINISHER_DEFLATE: u16 = 1;
pub const FINISHER_LZ4: u16 = 2;
pub const FINISHER_ZSTD: u16 = 3;

/// Resolve a finisher from its numeric id.
pub fn finisher_by_id(id: u16) -> anyhow::Result<Arc<dyn Finisher>> {
    match id {
        FINISHER_PASSTHROUGH => Ok(Arc::new(PassThroughFinisher)),
        FINISHER_DEFLATE => Ok(Arc::new(DeflateFinisher)),
        FINISHER_LZ4 => Ok(Arc::new(Lz4Finisher)),
        FINISHER_ZSTD => Ok(Arc::new(ZstdFinisher::default())),
        _ => anyhow::bail!(
            "unknown finisher id {}; supported: 0 (passthrough), 1 (deflate), 2 (lz4), 3 (zstd)",
            id
        ),
    }
}

/// Resolve a finisher from its name, as returned by [`Finisher::name`].
pub fn finisher_by_name(name: &str) -> anyhow::Result<Arc<dyn Finisher>> {
    let id = match name {
        "passthrough" => FINISHER_PASSTHROUGH,
        "deflate" => FINISHER_DEFLATE,
        "lz4" => FINISHER_LZ4,
        "zstd" => FINISHER_ZSTD,
        _ => anyhow::bail!("unknown finisher {:?}", name),
    };
    finisher_by_id(id)
}

/// Codec over the deflate finisher on the global worker pool.
pub fn default_codec() -> DeltaCodec {
    DeltaCodec::new(Arc::new(DeflateFinisher))
}

/// Codec over the finisher with id `id`, using `config`.
pub fn codec_by_id(id: u16, config: CodecConfig) -> anyhow::Result<DeltaCodec> {
    let finisher = finisher_by_id(id)?;
    debug!("building codec over finisher {} ({})", id, finisher.name());
    Ok(DeltaCodec::with_config(finisher, config)?)
}
