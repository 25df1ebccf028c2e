use embedded_can::StandardId;
use heapless::Vec;

use crate::{
    codec::{byte_to_hex_pair, hex_digit_to_u8},
    LINE_WIDTH, MAX_PAYLOAD_BYTES,
};

/* Column layout of one fixed-width log line */

const ID_OFFSET: usize = 8;
const SIZE_OFFSET: usize = 15;
const DATA_OFFSET: usize = 19;
// Two hex characters per payload byte plus one separator column
const DATA_STRIDE: usize = 3;

/// A single frame as it appears in the sensor log: a 3-character message id
/// and up to 8 payload bytes, each still encoded as a 2-character hex pair.
///
/// The payload stays textual because its interpretation depends on the
/// opcode (the self-test opcode reads its byte as decimal, everything else
/// as big-endian hex). Handlers decode the pairs they use and report a
/// [`DecodeError`](crate::DecodeError) on bad digits without touching any
/// accumulated state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogFrame {
    id: [u8; 3],
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    payload: Vec<[u8; 2], MAX_PAYLOAD_BYTES>,
}

/// Various errors which can arise while splitting a log line into a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameParseError {
    #[error("Received a line of ({1:?}) characters but at least ({0:?}) are required")]
    LineTooShort(usize, usize),
    #[error("Tried to decode the payload size but it was not a decimal digit ({0:?})")]
    IllegalSizeDigit(u8),
    #[error("Received a payload size ({0:?}) that was out of the valid range (0..=8)")]
    PayloadSizeOutOfRange(u8),
}

impl LogFrame {
    /// Creates a new frame, hex-encoding the payload bytes as they would
    /// appear in the log. `data` must have a length in the range 0..=8 or
    /// else `None` will be returned instead.
    pub fn new(id: [u8; 3], data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD_BYTES {
            return None;
        }

        let mut payload = Vec::new();

        for byte in data {
            payload.push(byte_to_hex_pair(*byte)).unwrap();
        }

        Some(Self { id, payload })
    }

    pub fn from_line(line: &[u8]) -> Result<Self, FrameParseError> {
        if line.len() <= SIZE_OFFSET {
            return Err(FrameParseError::LineTooShort(SIZE_OFFSET + 1, line.len()));
        }

        let size = match line[SIZE_OFFSET] {
            digit @ b'0'..=b'9' => (digit - b'0') as usize,
            other => return Err(FrameParseError::IllegalSizeDigit(other)),
        };

        if size > MAX_PAYLOAD_BYTES {
            return Err(FrameParseError::PayloadSizeOutOfRange(size as u8));
        }

        // The last pair ends one column short of a full stride
        let required = match size {
            0 => SIZE_OFFSET + 1,
            _ => DATA_OFFSET + size * DATA_STRIDE - 1,
        };

        if line.len() < required {
            return Err(FrameParseError::LineTooShort(required, line.len()));
        }

        let id = line[ID_OFFSET..ID_OFFSET + 3].try_into().unwrap();

        let mut payload = Vec::new();

        for i in 0..size {
            let start = DATA_OFFSET + i * DATA_STRIDE;
            payload.push([line[start], line[start + 1]]).unwrap();
        }

        Ok(Self { id, payload })
    }

    /// Encodes the frame back into a full-width log line, space padded
    /// everywhere outside the id, size, and payload columns.
    pub fn to_line(&self) -> [u8; LINE_WIDTH] {
        let mut line = [b' '; LINE_WIDTH];

        line[ID_OFFSET..ID_OFFSET + 3].copy_from_slice(&self.id);
        line[SIZE_OFFSET] = b'0' + self.payload.len() as u8;

        for (i, pair) in self.payload.iter().enumerate() {
            let start = DATA_OFFSET + i * DATA_STRIDE;
            line[start..start + 2].copy_from_slice(pair);
        }

        line
    }

    /// Gets the 3-character message id exactly as it appeared in the log
    pub fn id(&self) -> &[u8; 3] {
        &self.id
    }

    /// Gets the opcode character (the last character of the id field)
    pub fn opcode(&self) -> u8 {
        self.id[2]
    }

    /// Gets the payload as hex pairs, in wire order
    pub fn payload(&self) -> &[[u8; 2]] {
        &self.payload
    }

    /// Gets the number of payload bytes (the log's size digit)
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// Interprets the id field as an 11-bit CAN arbitration id. Will return
    /// `None` if the field is not hex or is over the standard id range.
    pub fn can_id(&self) -> Option<StandardId> {
        let mut value = 0u16;

        for nibble in self.id {
            value <<= 4;
            value |= hex_digit_to_u8(nibble).ok()? as u16;
        }

        StandardId::new(value)
    }
}

#[cfg(test)]
mod tests {
    use embedded_can::StandardId;

    use crate::{FrameParseError, LogFrame};

    const COUNTS_LINE: &[u8] = b"        7F7    8   00 00 03 E8 00 00 01 F4";

    #[test]
    fn parse_response_lines() {
        let frame = LogFrame::from_line(COUNTS_LINE).unwrap();

        assert_eq!(frame.id(), b"7F7");
        assert_eq!(frame.opcode(), b'7');
        assert_eq!(frame.payload_size(), 8);
        assert_eq!(
            frame.payload(),
            [*b"00", *b"00", *b"03", *b"E8", *b"00", *b"00", *b"01", *b"F4"]
        );

        /* Single byte payloads end right after their pair */

        let frame = LogFrame::from_line(b"        7F6    1   00").unwrap();

        assert_eq!(frame.id(), b"7F6");
        assert_eq!(frame.payload(), [*b"00"]);

        /* Size 0 lines stop at the size column */

        let frame = LogFrame::from_line(b"        7F2    0").unwrap();

        assert_eq!(frame.payload_size(), 0);
        assert!(frame.payload().is_empty());

        /* Characters past the last payload column are ignored */

        let frame = LogFrame::from_line(b"        7F6    1   07   trailing notes").unwrap();

        assert_eq!(frame.payload(), [*b"07"]);
    }

    #[test]
    fn frame_parse_errors() {
        /* Line length staging */

        assert_eq!(LogFrame::from_line(b""), Err(FrameParseError::LineTooShort(16, 0)));

        assert_eq!(
            LogFrame::from_line(b"        7F7    "),
            Err(FrameParseError::LineTooShort(16, 15))
        );

        assert_eq!(
            LogFrame::from_line(&COUNTS_LINE[..41]),
            Err(FrameParseError::LineTooShort(42, 41))
        );

        assert_eq!(
            LogFrame::from_line(b"        7F8    2   02 0"),
            Err(FrameParseError::LineTooShort(24, 23))
        );

        /* Size digit parsing */

        assert_eq!(
            LogFrame::from_line(b"        7F7    A   00"),
            Err(FrameParseError::IllegalSizeDigit(b'A'))
        );

        assert_eq!(
            LogFrame::from_line(b"        7F7        00"),
            Err(FrameParseError::IllegalSizeDigit(b' '))
        );

        assert_eq!(
            LogFrame::from_line(b"        7F7    9   00 00 00 00 00 00 00 00 00"),
            Err(FrameParseError::PayloadSizeOutOfRange(9))
        );
    }

    #[test]
    fn lines_round_trip() {
        let frame = LogFrame::from_line(COUNTS_LINE).unwrap();
        let line = frame.to_line();

        assert_eq!(&line[..COUNTS_LINE.len()], COUNTS_LINE);
        assert_eq!(line[COUNTS_LINE.len()], b' ');

        for size in 0..=8 {
            let data = [0xA5u8; 8];
            let frame = LogFrame::new(*b"7F0", &data[..size]).unwrap();

            assert_eq!(frame.payload_size(), size);
            assert_eq!(LogFrame::from_line(&frame.to_line()), Ok(frame));
        }

        assert_eq!(LogFrame::new(*b"7F0", &[0u8; 9]), None);
    }

    #[test]
    fn arbitration_ids() {
        let frame = LogFrame::from_line(COUNTS_LINE).unwrap();

        assert_eq!(frame.can_id(), StandardId::new(0x7F7));

        // Over the 11-bit range
        assert_eq!(LogFrame::new(*b"FFF", &[]).unwrap().can_id(), None);

        // Not hex at all
        assert_eq!(LogFrame::new(*b"7G0", &[]).unwrap().can_id(), None);
    }
}
