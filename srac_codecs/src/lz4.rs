use lz4_flex::block;

use srac_core::codec::BlockCodec;
use srac_core::error::{Error, Result};

/// LZ4 block codec.
///
/// Payloads carry no length prefix; the container index stores every unit's
/// raw length, so decompression is always given its exact output size. The
/// dictionary, when present, is fed to the `_with_dict` entry points as an
/// external prefix.
pub struct Lz4Codec;

impl BlockCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, raw: &[u8], dict: Option<&[u8]>) -> Result<Vec<u8>> {
        Ok(match dict {
            Some(dict) => block::compress_with_dict(raw, dict),
            None => block::compress(raw),
        })
    }

    fn decompress(
        &self,
        compressed: &[u8],
        raw_len: usize,
        dict: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        match dict {
            Some(dict) => block::decompress_with_dict(compressed, raw_len, dict),
            None => block::decompress(compressed, raw_len),
        }
        .map_err(|e| Error::Codec(format!("lz4: {e}")))
    }
}
