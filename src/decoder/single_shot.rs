use super::reader::{ReaderError, SymbolReader};
use crate::config::DecodeHints;
use crate::error::DecodeError;
use crate::luminance::BinaryBitmap;
use crate::models::{DecodeOutcome, FormatFault};

/// Resets the wrapped reader when dropped, whatever path the attempt took
struct ResetOnDrop<'a, R: SymbolReader>(&'a mut R);

impl<R: SymbolReader> Drop for ResetOnDrop<'_, R> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// One decode attempt per call, classified into a [`DecodeOutcome`]
///
/// The reader is reset before `decode` returns, so consecutive attempts
/// never observe each other's state. Concurrent attempts need separate
/// instances.
#[derive(Debug)]
pub struct SingleShotDecoder<R> {
    reader: R,
    hints: DecodeHints,
}

impl<R: SymbolReader> SingleShotDecoder<R> {
    /// Wrap a reader; `hints` are passed on every attempt
    pub fn new(reader: R, hints: DecodeHints) -> Self {
        Self { reader, hints }
    }

    /// Attempt to decode one bitmap
    pub fn decode(&mut self, bitmap: &BinaryBitmap) -> DecodeOutcome {
        let hints = self.hints;
        let guard = ResetOnDrop(&mut self.reader);
        match guard.0.decode(bitmap, &hints) {
            Ok(decoded) => DecodeOutcome::Decoded(decoded),
            Err(ReaderError::NotFound) => DecodeOutcome::NotFound,
            Err(ReaderError::Checksum) => DecodeOutcome::RecoverableFormatError(FormatFault::Checksum),
            Err(ReaderError::Format) => DecodeOutcome::RecoverableFormatError(FormatFault::Format),
            Err(ReaderError::Internal(msg)) => DecodeOutcome::FatalError(DecodeError::Codec(msg)),
        }
    }

    /// Hints used for every attempt
    pub fn hints(&self) -> DecodeHints {
        self.hints
    }

    /// Borrow the wrapped reader
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::reader::QrReader;
    use crate::encoder::{render_modules, symbol_modules};
    use crate::models::BitMatrix;
    use std::collections::VecDeque;

    /// Replays scripted reader results and counts resets
    #[derive(Default)]
    struct Scripted {
        script: VecDeque<Result<crate::models::Decoded, ReaderError>>,
        dirty: bool,
        resets: usize,
        saw_try_harder: bool,
    }

    impl SymbolReader for Scripted {
        fn decode(
            &mut self,
            _bitmap: &BinaryBitmap,
            hints: &DecodeHints,
        ) -> Result<crate::models::Decoded, ReaderError> {
            assert!(!self.dirty, "reader was not reset after the previous attempt");
            self.dirty = true;
            self.saw_try_harder = hints.try_harder;
            self.script.pop_front().unwrap_or(Err(ReaderError::NotFound))
        }

        fn reset(&mut self) {
            self.dirty = false;
            self.resets += 1;
        }
    }

    fn blank() -> BinaryBitmap {
        BinaryBitmap::from_matrix(BitMatrix::new(8, 8))
    }

    #[test]
    fn test_outcome_classification_and_reset_on_every_path() {
        let reader = Scripted {
            script: VecDeque::from([
                Err(ReaderError::NotFound),
                Err(ReaderError::Checksum),
                Err(ReaderError::Format),
                Err(ReaderError::Internal("decoder blew up".into())),
            ]),
            ..Default::default()
        };
        let mut decoder = SingleShotDecoder::new(reader, DecodeHints::default());

        assert!(matches!(decoder.decode(&blank()), DecodeOutcome::NotFound));
        assert!(matches!(
            decoder.decode(&blank()),
            DecodeOutcome::RecoverableFormatError(FormatFault::Checksum)
        ));
        assert!(matches!(
            decoder.decode(&blank()),
            DecodeOutcome::RecoverableFormatError(FormatFault::Format)
        ));
        match decoder.decode(&blank()) {
            DecodeOutcome::FatalError(DecodeError::Codec(msg)) => assert_eq!(msg, "decoder blew up"),
            other => panic!("expected fatal outcome, got {other:?}"),
        }

        assert_eq!(decoder.reader().resets, 4);
        assert!(decoder.reader().saw_try_harder);
    }

    #[test]
    fn test_back_to_back_symbols_with_shared_decoder() {
        let mut decoder = SingleShotDecoder::new(QrReader::new(), DecodeHints::default());
        let first = BinaryBitmap::from_matrix(render_modules(&symbol_modules("first symbol").unwrap(), 4, 4));
        let second = BinaryBitmap::from_matrix(render_modules(&symbol_modules("second").unwrap(), 4, 4));

        let a = decoder.decode(&first).into_decoded().unwrap();
        let b = decoder.decode(&second).into_decoded().unwrap();

        assert_eq!(a.text, "first symbol");
        assert_eq!(b.text, "second");
    }
}
