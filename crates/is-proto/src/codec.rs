//! Frame encoding and decoding.

use is_core::StackError;

use crate::error::{ProtoError, Result};

/// First byte of every request frame.
pub const MAGIC: u8 = b'S';
/// Request header: magic, opcode, u32 payload length.
pub const HEADER_SIZE: usize = 6;
/// Response header: status, u32 payload length.
pub const RESPONSE_HEADER_SIZE: usize = 5;
/// Largest payload either side will accept.
pub const PAYLOAD_SIZE_MAX: usize = 64;
/// Size of one stack element on the wire.
pub const VALUE_SIZE: usize = 4;
/// Control command that resizes the stack, `_IOW('s', 1, int)`.
pub const CMD_SET_SIZE: u32 = 0x4004_7301;

const OP_READ: u8 = 1;
pub(crate) const OP_WRITE: u8 = 2;
const OP_CONTROL: u8 = 3;
const STATUS_OK: u8 = 0;

/// A caller's request on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Pop into a buffer of `len` bytes.
    Read { len: u32 },
    /// Push the bytes in `payload`.
    Write { payload: Vec<u8> },
    /// Narrow control call; `cmd` selects the operation.
    Control { cmd: u32, arg: Vec<u8> },
}

/// The channel's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success, with the bytes produced (a popped value, or nothing).
    Ok(Vec<u8>),
    Failed(StackError),
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

fn check_len(len: usize) -> Result<()> {
    if len > PAYLOAD_SIZE_MAX {
        return Err(ProtoError::PayloadTooLarge {
            len,
            max: PAYLOAD_SIZE_MAX,
        });
    }
    Ok(())
}

/// Decode a little-endian `i32` from exactly [`VALUE_SIZE`] bytes.
#[must_use]
pub fn decode_value(bytes: &[u8]) -> Option<i32> {
    let word: [u8; VALUE_SIZE] = bytes.try_into().ok()?;
    Some(i32::from_le_bytes(word))
}

impl Request {
    /// Pop one value.
    #[must_use]
    pub fn pop() -> Self {
        Self::Read {
            len: VALUE_SIZE as u32,
        }
    }

    /// Push one value.
    #[must_use]
    pub fn push(value: i32) -> Self {
        Self::Write {
            payload: value.to_le_bytes().to_vec(),
        }
    }

    /// Resize to `capacity`.
    #[must_use]
    pub fn set_size(capacity: i32) -> Self {
        Self::Control {
            cmd: CMD_SET_SIZE,
            arg: capacity.to_le_bytes().to_vec(),
        }
    }

    fn opcode(&self) -> u8 {
        match self {
            Self::Read { .. } => OP_READ,
            Self::Write { .. } => OP_WRITE,
            Self::Control { .. } => OP_CONTROL,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Self::Read { len } => len.to_le_bytes().to_vec(),
            Self::Write { payload } => payload.clone(),
            Self::Control { cmd, arg } => {
                let mut bytes = cmd.to_le_bytes().to_vec();
                bytes.extend_from_slice(arg);
                bytes
            }
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.push(MAGIC);
        frame.push(self.opcode());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    /// Validate a header, returning `(opcode, payload_len)`.
    pub fn parse_header(header: &[u8; HEADER_SIZE]) -> Result<(u8, usize)> {
        if header[0] != MAGIC {
            return Err(ProtoError::BadMagic(header[0]));
        }
        let opcode = header[1];
        if !matches!(opcode, OP_READ | OP_WRITE | OP_CONTROL) {
            return Err(ProtoError::UnknownOpcode(opcode));
        }
        let len = read_u32(&header[2..]) as usize;
        check_len(len)?;
        Ok((opcode, len))
    }

    /// Build a request from a validated opcode and its payload.
    pub fn from_parts(opcode: u8, payload: Vec<u8>) -> Result<Self> {
        match opcode {
            OP_READ | OP_CONTROL if payload.len() < 4 => Err(ProtoError::Truncated {
                needed: 4,
                available: payload.len(),
            }),
            OP_READ => Ok(Self::Read {
                len: read_u32(&payload),
            }),
            OP_WRITE => Ok(Self::Write { payload }),
            OP_CONTROL => Ok(Self::Control {
                cmd: read_u32(&payload),
                arg: payload[4..].to_vec(),
            }),
            other => Err(ProtoError::UnknownOpcode(other)),
        }
    }

    /// Decode one frame from the front of `bytes`, returning the request
    /// and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let header: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or(ProtoError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            })?;
        let (opcode, len) = Self::parse_header(header)?;
        let end = HEADER_SIZE + len;
        let payload = bytes.get(HEADER_SIZE..end).ok_or(ProtoError::Truncated {
            needed: end,
            available: bytes.len(),
        })?;
        Ok((Self::from_parts(opcode, payload.to_vec())?, end))
    }
}

impl Response {
    /// Successful pop of `value`.
    #[must_use]
    pub fn value(value: i32) -> Self {
        Self::Ok(value.to_le_bytes().to_vec())
    }

    /// Success with nothing to return (push, resize, pop on empty).
    #[must_use]
    pub fn empty() -> Self {
        Self::Ok(Vec::new())
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let (status, payload): (u8, &[u8]) = match self {
            Self::Ok(payload) => (STATUS_OK, payload.as_slice()),
            // errno values of StackError all fit in a byte
            Self::Failed(err) => (err.errno() as u8, &[][..]),
        };
        let mut frame = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
        frame.push(status);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Validate a header, returning `(status, payload_len)`.
    pub fn parse_header(header: &[u8; RESPONSE_HEADER_SIZE]) -> Result<(u8, usize)> {
        let len = read_u32(&header[1..]) as usize;
        check_len(len)?;
        Ok((header[0], len))
    }

    pub fn from_parts(status: u8, payload: Vec<u8>) -> Result<Self> {
        if status == STATUS_OK {
            return Ok(Self::Ok(payload));
        }
        StackError::from_errno(i32::from(status))
            .map(Self::Failed)
            .ok_or(ProtoError::UnknownStatus(status))
    }

    /// Interpret a pop response: `Ok(None)` when the stack was empty.
    pub fn into_value(self) -> std::result::Result<Option<i32>, StackError> {
        match self {
            Self::Ok(payload) if payload.is_empty() => Ok(None),
            Self::Ok(payload) => decode_value(&payload)
                .map(Some)
                .ok_or(StackError::InvalidArgument),
            Self::Failed(err) => Err(err),
        }
    }

    /// Interpret a push or resize response.
    pub fn into_unit(self) -> std::result::Result<(), StackError> {
        match self {
            Self::Ok(_) => Ok(()),
            Self::Failed(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let frame = Request::push(-2).encode();
        assert_eq!(frame, vec![b'S', 2, 4, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]);

        let frame = Request::set_size(3).encode();
        assert_eq!(&frame[..6], &[b'S', 3, 8, 0, 0, 0]);
        assert_eq!(&frame[6..10], &CMD_SET_SIZE.to_le_bytes());
        assert_eq!(&frame[10..], &3i32.to_le_bytes());
    }

    #[test]
    fn test_decode_consumes_one_frame() {
        let mut bytes = Request::pop().encode();
        bytes.extend(Request::push(9).encode());

        let (first, used) = Request::decode(&bytes).unwrap();
        assert_eq!(first, Request::Read { len: 4 });
        let (second, _) = Request::decode(&bytes[used..]).unwrap();
        assert_eq!(second, Request::push(9));
    }

    #[test]
    fn test_write_keeps_odd_payloads() {
        // Length checks belong to the device, not the codec.
        let frame = Request::Write { payload: vec![1, 2] }.encode();
        let (req, _) = Request::decode(&frame).unwrap();
        assert_eq!(req, Request::Write { payload: vec![1, 2] });
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert!(matches!(
            Request::decode(&[b'X', 1, 0, 0, 0, 0]),
            Err(ProtoError::BadMagic(b'X'))
        ));
        assert!(matches!(
            Request::decode(&[b'S', 9, 0, 0, 0, 0]),
            Err(ProtoError::UnknownOpcode(9))
        ));
        assert!(matches!(
            Request::decode(&[b'S', 2, 0xff, 0, 0, 0]),
            Err(ProtoError::PayloadTooLarge { len: 255, .. })
        ));
        assert!(matches!(
            Request::decode(&[b'S', 2, 4, 0]),
            Err(ProtoError::Truncated { needed: 6, available: 4 })
        ));
        assert!(matches!(
            Request::decode(&[b'S', 1, 2, 0, 0, 0, 4, 0]),
            Err(ProtoError::Truncated { needed: 4, available: 2 })
        ));
    }

    #[test]
    fn test_response_values() {
        let frame = Response::value(42).encode();
        let header: [u8; RESPONSE_HEADER_SIZE] = frame[..5].try_into().unwrap();
        let (status, len) = Response::parse_header(&header).unwrap();
        let response = Response::from_parts(status, frame[5..5 + len].to_vec()).unwrap();
        assert_eq!(response.into_value(), Ok(Some(42)));

        assert_eq!(Response::empty().into_value(), Ok(None));
        assert_eq!(
            Response::Failed(StackError::Full).into_unit(),
            Err(StackError::Full)
        );
    }

    #[test]
    fn test_failed_response_carries_errno() {
        let frame = Response::Failed(StackError::Full).encode();
        assert_eq!(frame, vec![34, 0, 0, 0, 0]);
        assert_eq!(
            Response::from_parts(34, vec![]).unwrap(),
            Response::Failed(StackError::Full)
        );
        assert!(matches!(
            Response::from_parts(99, vec![]),
            Err(ProtoError::UnknownStatus(99))
        ));
    }
}
