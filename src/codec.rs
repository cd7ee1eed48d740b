//! A tokio codec implementation for the HL7 MLLP network protocol.
//!
//! MLLP is a simple, single-byte-text based protocol for framing HL7
//! messages over a TCP (or similar) transport: `0x0B` + payload + `0x1C
//! 0x0D`, with no length prefix. This codec encodes outbound payloads into
//! frames and extracts complete payloads from the receive buffer, tolerating
//! both a frame split across multiple reads (nothing is consumed until the
//! footer arrives) and multiple complete frames in a single read (the framed
//! transport keeps calling [`Decoder::decode`] until it returns `None`,
//! draining every buffered frame before requesting more bytes).

use bytes::buf::{Buf, BufMut};
use bytes::BytesMut;
use log::{debug, trace};
use tokio_util::codec::{Decoder, Encoder};

/// See the [crate] documentation for usage within a
/// [`Framed`](tokio_util::codec::Framed) transport.
#[derive(Debug, Default)]
pub struct MllpCodec {}

impl MllpCodec {
    const BLOCK_HEADER: u8 = 0x0B; //Vertical-Tab char, the marker for the start of a message
    const BLOCK_FOOTER: [u8; 2] = [0x1C, 0x0D]; //File-Separator char + CR, the marker for the end of a message

    /// Creates a new codec instance, generally for use within a framed
    /// transport but usable standalone for testing.
    pub fn new() -> Self {
        MllpCodec {}
    }

    // Both footer bytes must be present before a frame is complete: a frame
    // split between them stays buffered until the CR arrives.
    fn footer_position(src: &[u8]) -> Option<usize> {
        src.windows(2).position(|pair| pair == MllpCodec::BLOCK_FOOTER)
    }
}

// Encodes both primary HL7 messages sent from a publisher and ACK messages
// sent back from a listener.
impl Encoder<BytesMut> for MllpCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 3); //an extra 3 bytes of space on top of the message proper
        dst.put_u8(MllpCodec::BLOCK_HEADER); //header

        dst.put_slice(&item); //data

        dst.put_slice(&MllpCodec::BLOCK_FOOTER); //footer

        debug!("MLLP: encoded {} payload bytes for send", item.len());
        Ok(())
    }
}

impl Decoder for MllpCodec {
    type Item = BytesMut; // raw payload bytes; message interpretation is the caller's concern
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Bytes ahead of the BLOCK_HEADER are noise per the spec and get
        // dropped along with the header below.
        let start = match src.iter().position(|b| *b == MllpCodec::BLOCK_HEADER) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        // The footer has to trail the header; searching from just past the
        // header also keeps a stray footer in leading noise from matching.
        let footer = match MllpCodec::footer_position(&src[start + 1..]) {
            Some(offset) => start + 1 + offset,
            None => return Ok(None), // incomplete frame, wait for more bytes
        };

        trace!("MLLP: frame between {} and {}", start, footer);

        let mut frame = src.split_to(footer + 2); // consume through the footer
        frame.truncate(footer); // lose the footer bytes
        frame.advance(start + 1); // lose noise and the header byte
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A partially buffered, unterminated frame at stream end is
                // discarded without error.
                if !src.is_empty() {
                    debug!(
                        "MLLP: discarding {} unterminated bytes at stream end",
                        src.len()
                    );
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}
