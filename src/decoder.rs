//! Decoder trait for frame payloads

use crate::error::DecodeError;

/// Turns one frame payload into a typed record
///
/// The payload handed to [`decode`](FrameDecoder::decode) is exactly one frame
/// with boundaries removed and `FF FF` stuffing already collapsed. It lives in
/// the synchronizer's frame buffer and is overwritten by the next frame, so
/// implementations must copy whatever they need out of it.
///
/// Decoders are selected by name through a
/// [`DecoderRegistry`](crate::decoders::DecoderRegistry); each firmware
/// variant is one implementation.
pub trait FrameDecoder: Send + 'static {
    /// Record type produced by this decoder.
    type Record: Clone + Default + Send + Sync + 'static;

    /// Decode a payload
    ///
    /// Returns:
    /// - `Ok(record)` - payload matches the variant's layout
    /// - `Err(e)` - payload rejected; the frame is dropped by the caller
    fn decode(&self, payload: &[u8]) -> Result<Self::Record, DecodeError>;

    /// Variant name used for logs.
    fn name(&self) -> &str;
}

/// Type-erased decoder as produced by registry factories.
pub type BoxedDecoder<R> = Box<dyn FrameDecoder<Record = R>>;

impl<R> FrameDecoder for BoxedDecoder<R>
where
    R: Clone + Default + Send + Sync + 'static,
{
    type Record = R;

    fn decode(&self, payload: &[u8]) -> Result<R, DecodeError> {
        (**self).decode(payload)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
