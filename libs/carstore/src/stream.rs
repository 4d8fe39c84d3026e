//! Forward-only decoding of a CAR archive off any [Read] source.
//!
//! The [StreamDecoder] never seeks: it reads the header frame, then one block frame each time
//! the caller asks for the next block. At most one frame is held in memory at a time.

use std::io::Read;

use tracing::trace;

use crate::error::{CarError, Result};
use crate::wire::frame;
use crate::wire::{Block, CarHeader};

/// Decoding progress of a [StreamDecoder]
#[derive(Debug)]
enum DecoderState {
    /// Nothing read yet
    Start,
    /// Header read and cached, blocks may follow
    HeaderRead(CarHeader),
    /// Source exhausted (or failed) after the header
    Done(CarHeader),
    /// Header could not be read, the archive is unusable
    Failed,
}

/// Sequential, single-pass CAR decoder
#[derive(Debug)]
pub struct StreamDecoder<R> {
    source: R,
    state: DecoderState,
}

impl<R: Read> StreamDecoder<R> {
    /// Creates a decoder over `source`, nothing is read until the header or a block is requested.
    pub fn new(source: R) -> Self {
        StreamDecoder {
            source,
            state: DecoderState::Start,
        }
    }

    /// Reads the header frame on first call, then returns the cached header.
    pub fn header(&mut self) -> Result<&CarHeader> {
        if let DecoderState::Start = self.state {
            self.state = DecoderState::Failed;
            let body = frame::read_frame(&mut self.source)?.ok_or(CarError::UnexpectedEof)?;
            let header = CarHeader::from_bytes(&body)?;
            trace!(roots = header.roots().len(), "CAR header decoded");
            self.state = DecoderState::HeaderRead(header);
        }
        match &self.state {
            DecoderState::HeaderRead(header) | DecoderState::Done(header) => Ok(header),
            DecoderState::Start | DecoderState::Failed => Err(CarError::InvalidFrame(
                "header could not be decoded".to_owned(),
            )),
        }
    }

    /// Lazy sequence of the blocks left in the source.
    ///
    /// The header is read first if it was not already. Each call to `next` reads exactly one
    /// frame; the sequence ends on a clean end of stream and is fused after the first error.
    /// Calling `blocks` again continues from the current position, it never restarts.
    pub fn blocks(&mut self) -> Blocks<'_, R> {
        Blocks { decoder: self }
    }

    /// Reads the next block, `Ok(None)` once the source is exhausted.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        self.header()?;
        if !matches!(self.state, DecoderState::HeaderRead(_)) {
            return Ok(None);
        }
        let result = frame::read_frame(&mut self.source).and_then(|body| match body {
            Some(body) => Block::from_frame_body(body).map(Some),
            None => Ok(None),
        });
        match result {
            Ok(Some(block)) => {
                trace!(cid = %block.cid(), length = block.data().len(), "block decoded");
                Ok(Some(block))
            }
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(e) => {
                self.finish();
                Err(e)
            }
        }
    }

    /// Gives the source back
    pub fn into_inner(self) -> R {
        self.source
    }

    fn finish(&mut self) {
        let state = std::mem::replace(&mut self.state, DecoderState::Failed);
        self.state = match state {
            DecoderState::HeaderRead(header) => DecoderState::Done(header),
            other => other,
        };
    }
}

/// Iterator over the blocks of a [StreamDecoder], see [StreamDecoder::blocks]
#[derive(Debug)]
pub struct Blocks<'a, R> {
    decoder: &'a mut StreamDecoder<R>,
}

impl<R: Read> Iterator for Blocks<'_, R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_block().transpose()
    }
}

impl<R: Read> std::iter::FusedIterator for Blocks<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RawCid;

    const CAR_V1: &[u8] = include_bytes!("res/carv1-basic.car");

    #[test]
    fn test_stream_decoder_header_is_cached() {
        let mut decoder = StreamDecoder::new(CAR_V1);
        assert_eq!(decoder.header().unwrap().roots().len(), 2);
        // A second call must not consume another frame
        assert_eq!(decoder.header().unwrap().roots().len(), 2);
        let first = decoder.next_block().unwrap().unwrap();
        assert_eq!(
            first.cid(),
            &RawCid::from_hex(
                "01711220f88bc853804cf294fe417e4fa83028689fcdb1b1592c5102e1474dbc200fab8b"
            )
            .unwrap()
        );
    }

    #[test]
    fn test_stream_decoder_count_blocks() {
        let mut decoder = StreamDecoder::new(CAR_V1);
        let blocks = decoder.blocks().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(blocks.len(), 8);
        assert_eq!(blocks.iter().map(|b| b.data().len()).sum::<usize>(), 323);
        // Exhausted and not restartable
        assert!(decoder.blocks().next().is_none());
        assert_eq!(decoder.header().unwrap().roots().len(), 2);
    }

    #[test]
    fn test_stream_decoder_blocks_reads_header_implicitly() {
        let mut decoder = StreamDecoder::new(CAR_V1);
        let mut blocks = decoder.blocks();
        assert!(blocks.next().unwrap().is_ok());
        drop(blocks);
        assert_eq!(decoder.header().unwrap().version(), 1);
    }

    #[test]
    fn test_stream_decoder_partial_consumption() {
        let mut decoder = StreamDecoder::new(CAR_V1);
        assert_eq!(decoder.blocks().take(3).count(), 3);
        assert_eq!(decoder.blocks().count(), 5);
    }

    #[test]
    fn test_stream_decoder_truncated_stream() {
        let mut decoder = StreamDecoder::new(&CAR_V1[..CAR_V1.len() - 5]);
        let results: Vec<_> = decoder.blocks().collect();
        assert_eq!(results.len(), 8);
        assert!(results[..7].iter().all(|r| r.is_ok()));
        assert!(results[7].as_ref().unwrap_err().is_truncation());
    }

    #[test]
    fn test_stream_decoder_empty_source() {
        let mut decoder = StreamDecoder::new(&[0u8; 0][..]);
        assert!(decoder.header().unwrap_err().is_truncation());
        assert!(decoder.header().is_err());
        assert!(decoder.next_block().is_err());
    }
}
