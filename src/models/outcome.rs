use super::Decoded;
use crate::error::DecodeError;

/// Why a located symbol could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFault {
    /// Error correction could not repair the codewords
    Checksum,
    /// Version, grid or data segments were malformed
    Format,
}

/// Result of one decode attempt
///
/// `NotFound` and `RecoverableFormatError` are ordinary control flow: the
/// file decoder retries on them and the stream decoder skips the frame.
/// Only `FatalError` is ever surfaced as a failure.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A symbol was located and read
    Decoded(Decoded),
    /// No symbol was located
    NotFound,
    /// A symbol was located but is unreadable at this resolution
    RecoverableFormatError(FormatFault),
    /// Failure unrelated to image content
    FatalError(DecodeError),
}

impl DecodeOutcome {
    /// Whether the outcome should drive a retry (file) or a skip (stream)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeOutcome::NotFound | DecodeOutcome::RecoverableFormatError(_)
        )
    }

    /// The decoded symbol, if any
    pub fn decoded(&self) -> Option<&Decoded> {
        match self {
            DecodeOutcome::Decoded(d) => Some(d),
            _ => None,
        }
    }

    /// Consume the outcome, keeping only a decoded symbol
    pub fn into_decoded(self) -> Option<Decoded> {
        match self {
            DecodeOutcome::Decoded(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(DecodeOutcome::NotFound.is_recoverable());
        assert!(DecodeOutcome::RecoverableFormatError(FormatFault::Checksum).is_recoverable());
        assert!(!DecodeOutcome::FatalError(DecodeError::Codec("boom".into())).is_recoverable());
        assert!(DecodeOutcome::NotFound.decoded().is_none());
    }
}
