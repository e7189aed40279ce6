//! Wire framing for the i3 IPC protocol
//!
//! Every message in both directions is one frame:
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────┐
//! │ Magic    │ Length   │ Type     │ Payload         │
//! │ 6 bytes  │ 4 bytes  │ 4 bytes  │ `Length` bytes  │
//! │ "i3-ipc" │ u32 NE   │ u32 NE   │ UTF-8, usually  │
//! │          │          │          │ JSON            │
//! └──────────┴──────────┴──────────┴─────────────────┘
//! ```
//!
//! Integers use the host's native byte order, matching what i3 and sway do.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::IpcError;

/// Marker at the start of every frame
pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Header size in bytes (magic + length + type)
pub const HEADER_SIZE: usize = 14;

/// Default cap on a single reply payload (64 MiB)
///
/// `i3ipc_config::DEFAULT_MAX_PAYLOAD_SIZE` mirrors this value.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Bit set on the type code of event frames
pub const EVENT_MASK: u32 = 0x8000_0000;

/// Request kinds understood by this client
///
/// The numeric codes are fixed by the i3 IPC documentation. A reply frame
/// carries the same code as the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Run the payload as an i3 command
    RunCommand,
    /// List workspaces
    GetWorkspaces,
    /// List outputs
    GetOutputs,
    /// Fetch the layout tree
    GetTree,
    /// List all marks
    GetMarks,
    /// Daemon version
    GetVersion,
    /// List binding modes
    GetBindingModes,
    /// Last loaded config file contents
    GetConfig,
    /// Broadcast a tick event to subscribers
    SendTick,
}

impl MessageType {
    /// Wire code for this message type
    pub fn code(self) -> u32 {
        match self {
            MessageType::RunCommand => 0,
            MessageType::GetWorkspaces => 1,
            MessageType::GetOutputs => 3,
            MessageType::GetTree => 4,
            MessageType::GetMarks => 5,
            MessageType::GetVersion => 7,
            MessageType::GetBindingModes => 8,
            MessageType::GetConfig => 9,
            MessageType::SendTick => 10,
        }
    }

    /// Map a wire code back to a message type
    ///
    /// Returns `None` for codes this client does not speak, including events.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(MessageType::RunCommand),
            1 => Some(MessageType::GetWorkspaces),
            3 => Some(MessageType::GetOutputs),
            4 => Some(MessageType::GetTree),
            5 => Some(MessageType::GetMarks),
            7 => Some(MessageType::GetVersion),
            8 => Some(MessageType::GetBindingModes),
            9 => Some(MessageType::GetConfig),
            10 => Some(MessageType::SendTick),
            _ => None,
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload length in bytes
    pub payload_length: u32,
    /// Message or reply type code
    pub message_type: u32,
}

impl Header {
    pub fn new(message_type: u32, payload_length: u32) -> Self {
        Self {
            payload_length,
            message_type,
        }
    }

    /// Encode header to bytes
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..6].copy_from_slice(MAGIC);
        buf[6..10].copy_from_slice(&self.payload_length.to_ne_bytes());
        buf[10..14].copy_from_slice(&self.message_type.to_ne_bytes());
        buf
    }

    /// Decode and check the magic marker
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self, IpcError> {
        if &buf[0..6] != MAGIC {
            let mut found = [0u8; 6];
            found.copy_from_slice(&buf[0..6]);
            return Err(IpcError::BadMagic { found });
        }
        Ok(Self {
            payload_length: u32::from_ne_bytes([buf[6], buf[7], buf[8], buf[9]]),
            message_type: u32::from_ne_bytes([buf[10], buf[11], buf[12], buf[13]]),
        })
    }

    /// Reject payloads above `max_payload_size`
    pub fn validate(&self, max_payload_size: u32) -> Result<(), IpcError> {
        if self.payload_length > max_payload_size {
            return Err(IpcError::PayloadTooLarge {
                length: self.payload_length.into(),
                max: max_payload_size,
            });
        }
        Ok(())
    }

    /// Whether this header belongs to an event rather than a reply
    #[inline]
    pub fn is_event(&self) -> bool {
        self.message_type & EVENT_MASK != 0
    }
}

/// One complete frame read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: u32,
    pub payload: Vec<u8>,
}

/// Encode a request into a single contiguous frame
///
/// # Errors
///
/// Returns `IpcError::PayloadTooLarge` if the payload length does not fit in
/// the header's u32 length field.
pub fn encode_frame(message_type: u32, payload: &[u8]) -> Result<Vec<u8>, IpcError> {
    let header = Header::new(message_type, payload_length(payload.len())?);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    Ok(buf)
}

fn payload_length(len: usize) -> Result<u32, IpcError> {
    u32::try_from(len).map_err(|_| IpcError::PayloadTooLarge {
        length: len as u64,
        max: u32::MAX,
    })
}

/// Write one frame and flush
pub async fn write_frame<W>(writer: &mut W, message_type: u32, payload: &[u8]) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message_type, payload)?;
    write_encoded_frame(writer, &frame).await
}

/// Write a frame produced by [`encode_frame`] and flush
pub async fn write_encoded_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await.map_err(IpcError::SendFailed)?;
    writer.flush().await.map_err(IpcError::SendFailed)?;
    Ok(())
}

/// Read exactly one frame
///
/// Reads the fixed-size header, validates it, then reads exactly
/// `payload_length` bytes. Nothing past the end of the frame is consumed.
///
/// # Errors
///
/// Returns `IpcError::ConnectionClosed` if the stream ends before the first
/// header byte, `IpcError::TruncatedFrame` if it ends inside the frame,
/// `IpcError::BadMagic` / `IpcError::PayloadTooLarge` for invalid headers and
/// `IpcError::ReceiveFailed` on I/O errors.
pub async fn read_frame<R>(reader: &mut R, max_payload_size: u32) -> Result<Frame, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_SIZE];
    let received = read_full(reader, &mut header_buf).await?;
    if received == 0 {
        return Err(IpcError::ConnectionClosed);
    }
    if received < HEADER_SIZE {
        return Err(IpcError::TruncatedFrame {
            expected: HEADER_SIZE,
            received,
        });
    }

    let header = Header::decode(&header_buf)?;
    header.validate(max_payload_size)?;

    let expected = header.payload_length as usize;
    let mut payload = vec![0u8; expected];
    let received = read_full(reader, &mut payload).await?;
    if received < expected {
        return Err(IpcError::TruncatedFrame { expected, received });
    }

    Ok(Frame {
        message_type: header.message_type,
        payload,
    })
}

/// Fill `buf` from `reader`, stopping early only at end of stream
///
/// Returns how many bytes were read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(IpcError::ReceiveFailed)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = Header::new(4, 0x0102_0304).encode();

        assert_eq!(&bytes[0..6], b"i3-ipc");
        assert_eq!(&bytes[6..10], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(&bytes[10..14], &4u32.to_ne_bytes());
    }

    #[test]
    fn test_header_decode_rejects_bad_magic() {
        let mut bytes = Header::new(0, 0).encode();
        bytes[0] = b'x';

        match Header::decode(&bytes) {
            Err(IpcError::BadMagic { found }) => assert_eq!(&found, b"x3-ipc"),
            other => panic!("Expected BadMagic, got: {:?}", other),
        }
    }

    #[test]
    fn test_header_validate_payload_cap() {
        assert!(Header::new(4, 100).validate(100).is_ok());
        assert!(matches!(
            Header::new(4, 101).validate(100),
            Err(IpcError::PayloadTooLarge { length: 101, max: 100 })
        ));
    }

    #[test]
    fn test_payload_length_must_fit_header() {
        assert_eq!(payload_length(0).unwrap(), 0);
        assert_eq!(payload_length(u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_payload_length_over_u32_is_rejected() {
        let len = u32::MAX as usize + 1;
        match payload_length(len) {
            Err(IpcError::PayloadTooLarge { length, max }) => {
                assert_eq!(length, 1u64 << 32);
                assert_eq!(max, u32::MAX);
            }
            other => panic!("Expected PayloadTooLarge, got: {:?}", other),
        }
    }

    #[test]
    fn test_event_bit() {
        assert!(Header::new(0x8000_0003, 0).is_event());
        assert!(!Header::new(3, 0).is_event());
    }

    #[test]
    fn test_message_type_codes() {
        assert_eq!(MessageType::RunCommand.code(), 0);
        assert_eq!(MessageType::GetWorkspaces.code(), 1);
        assert_eq!(MessageType::GetTree.code(), 4);
        assert_eq!(MessageType::from_code(4), Some(MessageType::GetTree));
        // SUBSCRIBE is deliberately unsupported
        assert_eq!(MessageType::from_code(2), None);
        assert_eq!(MessageType::from_code(0x8000_0000), None);
    }

    #[tokio::test]
    async fn test_frame_roundtrip_various_sizes() {
        for len in [0usize, 1, 13, 14, 4096, 1 << 20] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let bytes = encode_frame(MessageType::RunCommand.code(), &payload).unwrap();
            assert_eq!(bytes.len(), HEADER_SIZE + len);

            let mut reader = bytes.as_slice();
            let frame = read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE)
                .await
                .unwrap();

            assert_eq!(frame.message_type, 0);
            assert_eq!(frame.payload, payload);
            assert!(reader.is_empty());
        }
    }

    #[tokio::test]
    async fn test_read_frame_stops_at_declared_length() {
        let mut bytes = encode_frame(4, b"{}").unwrap();
        bytes.extend_from_slice(b"trailing");

        let mut reader = bytes.as_slice();
        let frame = read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE)
            .await
            .unwrap();

        assert_eq!(frame.payload, b"{}");
        assert_eq!(reader, b"trailing");
    }

    #[tokio::test]
    async fn test_back_to_back_frames() {
        let mut bytes = encode_frame(1, b"[]").unwrap();
        bytes.extend_from_slice(&encode_frame(4, b"{\"id\":1}").unwrap());

        let mut reader = bytes.as_slice();
        let first = read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE).await.unwrap();
        let second = read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE).await.unwrap();

        assert_eq!(first.message_type, 1);
        assert_eq!(second.message_type, 4);
        assert_eq!(second.payload, b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_read_frame_empty_stream_is_connection_closed() {
        let mut reader: &[u8] = &[];
        let result = read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE).await;
        assert!(matches!(result, Err(IpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_frame_truncated_header() {
        let bytes = encode_frame(4, b"{}").unwrap();
        let mut reader = &bytes[..5];

        match read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE).await {
            Err(IpcError::TruncatedFrame { expected, received }) => {
                assert_eq!(expected, HEADER_SIZE);
                assert_eq!(received, 5);
            }
            other => panic!("Expected TruncatedFrame, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_frame_truncated_payload() {
        let bytes = encode_frame(4, b"{\"nodes\":[]}").unwrap();
        let mut reader = &bytes[..HEADER_SIZE + 4];

        match read_frame(&mut reader, DEFAULT_MAX_PAYLOAD_SIZE).await {
            Err(IpcError::TruncatedFrame { expected, received }) => {
                assert_eq!(expected, 12);
                assert_eq!(received, 4);
            }
            other => panic!("Expected TruncatedFrame, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_payload_before_reading() {
        let bytes = Header::new(4, 1_000_000).encode();
        let mut reader = bytes.as_slice();

        let result = read_frame(&mut reader, 1024).await;
        assert!(matches!(result, Err(IpcError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_write_frame_matches_encode() {
        let mut out = Vec::new();
        write_frame(&mut out, 0, b"exec true").await.unwrap();
        assert_eq!(out, encode_frame(0, b"exec true").unwrap());
    }
}
