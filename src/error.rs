//! Stable, host-binding-agnostic error kinds for the WebCodecs surface.
//!
//! A host binding (e.g. a NAPI addon, a WASM shim) turns a [`WebCodecsError`]
//! into whatever native exception type its runtime expects; this crate only
//! commits to the *kind* identifier, not the representation. The kinds mirror
//! the stable DOMException-style names the W3C WebCodecs spec uses for
//! interoperable error reporting.

use std::fmt;

/// Error kind, stable across versions: host bindings match on this, not on
/// the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Structurally invalid argument (missing field, wrong value domain).
  TypeError,
  /// Valid request, not supported by any available backend.
  NotSupported,
  /// Operation called in the wrong lifecycle state.
  InvalidState,
  /// Backend failure while encoding a specific frame.
  EncodingError,
  /// Backend failure while decoding a specific chunk.
  DecodingError,
  /// Malformed container or bitstream.
  DataError,
  /// Queue high-water mark reached.
  QuotaExceeded,
  /// Catch-all for backend/system errors.
  OperationError,
}

impl ErrorKind {
  /// The stable identifier a host binding surfaces to callers (e.g. as a
  /// `DOMException.name`).
  pub fn name(&self) -> &'static str {
    match self {
      ErrorKind::TypeError => "TypeError",
      ErrorKind::NotSupported => "NotSupportedError",
      ErrorKind::InvalidState => "InvalidStateError",
      ErrorKind::EncodingError => "EncodingError",
      ErrorKind::DecodingError => "DecodingError",
      ErrorKind::DataError => "DataError",
      ErrorKind::QuotaExceeded => "QuotaExceededError",
      ErrorKind::OperationError => "OperationError",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// The single error type returned by every public operation in this crate.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct WebCodecsError {
  pub kind: ErrorKind,
  pub message: String,
}

impl WebCodecsError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }

  pub fn type_error(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::TypeError, message)
  }

  pub fn not_supported(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::NotSupported, message)
  }

  pub fn invalid_state(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::InvalidState, message)
  }

  pub fn encoding(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::EncodingError, message)
  }

  pub fn decoding(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::DecodingError, message)
  }

  pub fn data(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::DataError, message)
  }

  pub fn quota_exceeded(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::QuotaExceeded, message)
  }

  pub fn operation(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::OperationError, message)
  }

  pub fn name(&self) -> &'static str {
    self.kind.name()
  }
}

impl From<crate::codec::CodecError> for WebCodecsError {
  fn from(e: crate::codec::CodecError) -> Self {
    WebCodecsError::operation(e.to_string())
  }
}

pub type WebCodecsResult<T> = Result<T, WebCodecsError>;
