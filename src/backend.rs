//! Codec backend abstraction (uniform open/send/receive/flush/close contract).
//!
//! [`crate::codec::CodecContext`] is the concrete FFmpeg-backed realization of
//! this contract. The trait exists so the pipeline layer (`VideoEncoder` &
//! co.) is written against the capability set the spec describes rather than
//! against FFmpeg directly, even though there is presently one backend.

use crate::codec::{CodecResult, Frame, Packet};

/// A transient "would block" / "need more input" signal, distinct from a hard
/// error. Mirrors FFmpeg's `EAGAIN` semantics at the `send_*`/`receive_*`
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Again {
  /// The backend needs another input before it can produce output.
  NeedsInput,
  /// The backend has no more output until flushed further / closed.
  Eof,
}

/// Capability set every codec family implements: open, send, receive, flush,
/// reset, close. Implemented by [`crate::codec::CodecContext`] for both its
/// encoder and decoder configurations.
pub trait EncodeBackend {
  /// Submit a raw frame for encoding. Returns the packets emitted as a direct
  /// consequence (FFmpeg's encode APIs are synchronous-enough in practice
  /// that `send`+`receive` collapse into one call at this layer).
  fn send_frame(&mut self, frame: Option<&Frame>) -> CodecResult<Vec<Packet>>;

  /// Declare end-of-input and drain all buffered output.
  fn flush(&mut self) -> CodecResult<Vec<Packet>>;

  /// Codec-specific initialization bytes (avcC/hvcC/vpcC/av1C), once known.
  fn extradata(&self) -> Option<&[u8]>;
}

pub trait DecodeBackend {
  /// Submit an encoded packet for decoding, returning any frames produced.
  fn send_packet(&mut self, packet: &Packet) -> CodecResult<Vec<Frame>>;

  /// Declare end-of-input and drain all buffered output.
  fn flush(&mut self) -> CodecResult<Vec<Frame>>;
}

impl EncodeBackend for crate::codec::CodecContext {
  fn send_frame(&mut self, frame: Option<&Frame>) -> CodecResult<Vec<Packet>> {
    self.encode(frame)
  }

  fn flush(&mut self) -> CodecResult<Vec<Packet>> {
    self.flush_encoder()
  }

  fn extradata(&self) -> Option<&[u8]> {
    crate::codec::CodecContext::extradata(self)
  }
}

impl DecodeBackend for crate::codec::CodecContext {
  fn send_packet(&mut self, packet: &Packet) -> CodecResult<Vec<Frame>> {
    self.decode(Some(packet))
  }

  fn flush(&mut self) -> CodecResult<Vec<Frame>> {
    self.flush_decoder()
  }
}
