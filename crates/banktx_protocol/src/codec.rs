//! Frame codec.
//!
//! A frame is a 4-byte big-endian body length followed by the CBOR encoding
//! of an [`Envelope`].

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::{Envelope, Message};
use std::io::{self, Read, Write};

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Encodes a message into a frame body.
pub fn encode(message: &Message) -> ProtocolResult<Vec<u8>> {
    let mut body = Vec::new();
    ciborium::into_writer(&Envelope::from(message), &mut body)
        .map_err(|e| ProtocolError::encoding(e.to_string()))?;
    Ok(body)
}

/// Decodes a frame body into a message.
pub fn decode(body: &[u8]) -> ProtocolResult<Message> {
    let envelope: Envelope =
        ciborium::from_reader(body).map_err(|e| ProtocolError::decoding(e.to_string()))?;
    Message::try_from(envelope)
}

/// Writes one framed message and flushes the stream.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> ProtocolResult<()> {
    let body = encode(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge {
        len: body.len(),
        max: MAX_FRAME_LEN,
    })?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message.
///
/// Returns `Ok(None)` if the stream ends cleanly before a frame starts. A
/// stream that ends inside a frame is an I/O error.
pub fn read_message<R: Read>(reader: &mut R) -> ProtocolResult<Option<Message>> {
    let mut header = [0u8; 4];
    if !read_header(reader, &mut header)? {
        return Ok(None);
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    decode(&body).map(Some)
}

/// Fills `header`, returning false on EOF before the first byte.
fn read_header<R: Read>(reader: &mut R, header: &mut [u8; 4]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use banktx_core::{AccountId, TransactionId};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::OpenTransaction,
            Message::TransactionOpened {
                txn: TransactionId::new(7),
            },
            Message::ReadRequest {
                account: AccountId::new(1),
            },
            Message::ReadRequestResponse { balance: -3 },
            Message::WriteRequest {
                account: AccountId::new(2),
                balance: 15,
            },
            Message::WriteRequestResponse,
            Message::AccountNotFound {
                account: AccountId::new(99),
            },
            Message::CloseTransaction,
            Message::TransactionCommitted {
                txn: TransactionId::new(7),
            },
            Message::TransactionAborted {
                txn: TransactionId::new(8),
            },
            Message::Shutdown,
        ]
    }

    #[test]
    fn stream_of_frames_reads_back_in_order() {
        let messages = sample_messages();
        let mut buf = Vec::new();
        for message in &messages {
            write_message(&mut buf, message).unwrap();
        }

        let mut reader = Cursor::new(buf);
        let mut decoded = Vec::new();
        while let Some(message) = read_message(&mut reader).unwrap() {
            decoded.push(message);
        }
        assert_eq!(decoded, messages);
    }

    #[test]
    fn clean_eof_is_none() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut reader = Cursor::new(vec![0u8, 0]);
        let err = read_message(&mut reader).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut buf = Vec::new();
        write_message(&mut buf, &Message::Shutdown).unwrap();
        buf.pop();
        let err = read_message(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn oversized_frame_is_rejected_before_reading_body() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        let err = read_message(&mut Cursor::new(len.to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn garbage_body_fails_to_decode() {
        let mut buf = 3u32.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0xff, 0x00, 0x13]);
        let err = read_message(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ProtocolError::DecodingFailed { .. }));
    }

    proptest! {
        #[test]
        fn decode_never_panics(body in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode(&body);
        }
    }
}
