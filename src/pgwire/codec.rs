//! PostgreSQL wire protocol codec
//!
//! Regular messages are a type byte followed by a length-prefixed body:
//! ```text
//! <tag:u8> <len:i32, includes itself> <body>
//! ```
//! Startup-phase messages (StartupMessage, CancelRequest, SSLRequest) have
//! no type byte; the body starts with a request code instead.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

use super::types::*;

/// Upper bound on a single frame. The server caps messages at 1 GiB too.
const MAX_MESSAGE_SIZE: usize = 1 << 30;

const READ_CHUNK: usize = 4096;

/// Reads whole frames from a byte stream
///
/// Bytes read so far are held on the reader, not on the future, so a read
/// dropped by a deadline loses nothing and the next read picks up the same
/// frame.
pub struct FrameReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Read one typed message frame, returning its tag and body
    ///
    /// A stream that ends before the first byte of the frame reports
    /// `Error::ConnectionClosed`; one that ends inside the frame reports an
    /// `UnexpectedEof` IO error.
    pub async fn read_message(&mut self) -> Result<(u8, Vec<u8>)> {
        loop {
            if self.buf.len() >= 5 {
                let total = 1 + frame_len(&self.buf[1..5])?;
                if self.buf.len() >= total {
                    let tag = self.buf[0];
                    let body = self.buf[5..total].to_vec();
                    self.buf.drain(..total);
                    return Ok((tag, body));
                }
            }
            self.fill().await?;
        }
    }

    /// Read one untyped startup-phase frame, returning its body
    pub async fn read_startup_message(&mut self) -> Result<Vec<u8>> {
        loop {
            if self.buf.len() >= 4 {
                let total = frame_len(&self.buf[..4])?;
                if self.buf.len() >= total {
                    let body = self.buf[4..total].to_vec();
                    self.buf.drain(..total);
                    return Ok(body);
                }
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk).await?;
        if n == 0 {
            if self.buf.is_empty() {
                return Err(Error::ConnectionClosed);
            }
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

/// Validate a length prefix (which counts itself) and return it
fn frame_len(prefix: &[u8]) -> Result<usize> {
    let len = i32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    if len < 4 {
        return Err(Error::protocol(format!("Invalid message length: {}", len)));
    }
    let len = len as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::protocol(format!("Message too large: {} bytes", len)));
    }
    Ok(len)
}

/// Write out `pending`, removing only the bytes the transport accepted
///
/// If the future is dropped part way, whatever was not written stays in
/// `pending` for the next call.
pub async fn write_pending<W: AsyncWrite + Unpin>(
    writer: &mut W,
    pending: &mut Vec<u8>,
) -> Result<()> {
    while !pending.is_empty() {
        let n = writer.write(pending).await?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
        }
        pending.drain(..n);
    }
    writer.flush().await?;
    Ok(())
}

// === Encoding ===

/// Appends one framed message to an output buffer
struct MessageBuffer<'a> {
    buf: &'a mut Vec<u8>,
    len_at: usize,
}

impl<'a> MessageBuffer<'a> {
    /// Start a typed message
    fn typed(buf: &'a mut Vec<u8>, tag: u8) -> Self {
        buf.push(tag);
        Self::untyped(buf)
    }

    /// Start a startup-phase message
    fn untyped(buf: &'a mut Vec<u8>) -> Self {
        let len_at = buf.len();
        buf.extend_from_slice(&[0; 4]);
        Self { buf, len_at }
    }

    fn write_byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn write_cstring(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Element count; the protocol caps these at `i16::MAX`
    fn write_count(&mut self, n: usize) {
        debug_assert!(
            n <= i16::MAX as usize,
            "count {} does not fit in an i16",
            n
        );
        self.write_i16(n as i16);
    }

    /// Length-prefixed value, -1 for NULL
    fn write_value(&mut self, value: &Option<Vec<u8>>) {
        match value {
            Some(data) => {
                debug_assert!(
                    data.len() <= MAX_MESSAGE_SIZE,
                    "value of {} bytes does not fit in a frame",
                    data.len()
                );
                self.write_i32(data.len() as i32);
                self.buf.extend_from_slice(data);
            }
            None => self.write_i32(-1),
        }
    }

    /// Patch the length prefix
    fn finish(self) {
        let len = self.buf.len() - self.len_at;
        debug_assert!(len <= MAX_MESSAGE_SIZE, "frame of {} bytes", len);
        let len = len as i32;
        self.buf[self.len_at..self.len_at + 4].copy_from_slice(&len.to_be_bytes());
    }
}

impl FrontendMessage {
    /// Append the wire encoding of this message to `buf`
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let m = match self {
            Self::StartupMessage {
                protocol_version,
                parameters,
            } => {
                let mut m = MessageBuffer::untyped(buf);
                m.write_u32(*protocol_version);
                for (name, value) in parameters {
                    m.write_cstring(name);
                    m.write_cstring(value);
                }
                m.write_byte(0);
                m
            }
            Self::CancelRequest {
                process_id,
                secret_key,
            } => {
                let mut m = MessageBuffer::untyped(buf);
                m.write_u32(CANCEL_REQUEST_CODE);
                m.write_u32(*process_id);
                m.write_u32(*secret_key);
                m
            }
            Self::SslRequest => {
                let mut m = MessageBuffer::untyped(buf);
                m.write_u32(SSL_REQUEST_CODE);
                m
            }
            Self::PasswordMessage { password } => {
                let mut m = MessageBuffer::typed(buf, b'p');
                m.write_cstring(password);
                m
            }
            Self::Query { sql } => {
                let mut m = MessageBuffer::typed(buf, b'Q');
                m.write_cstring(sql);
                m
            }
            Self::Parse {
                name,
                query,
                parameter_oids,
            } => {
                let mut m = MessageBuffer::typed(buf, b'P');
                m.write_cstring(name);
                m.write_cstring(query);
                m.write_count(parameter_oids.len());
                for oid in parameter_oids {
                    m.write_u32(*oid);
                }
                m
            }
            Self::Bind {
                portal,
                statement,
                parameter_formats,
                parameters,
                result_formats,
            } => {
                let mut m = MessageBuffer::typed(buf, b'B');
                m.write_cstring(portal);
                m.write_cstring(statement);
                m.write_count(parameter_formats.len());
                for format in parameter_formats {
                    m.write_i16(*format);
                }
                m.write_count(parameters.len());
                for value in parameters {
                    m.write_value(value);
                }
                m.write_count(result_formats.len());
                for format in result_formats {
                    m.write_i16(*format);
                }
                m
            }
            Self::Describe { object_type, name } => {
                let mut m = MessageBuffer::typed(buf, b'D');
                m.write_byte(object_type.as_byte());
                m.write_cstring(name);
                m
            }
            Self::Execute { portal, max_rows } => {
                let mut m = MessageBuffer::typed(buf, b'E');
                m.write_cstring(portal);
                m.write_u32(*max_rows);
                m
            }
            Self::Close { object_type, name } => {
                let mut m = MessageBuffer::typed(buf, b'C');
                m.write_byte(object_type.as_byte());
                m.write_cstring(name);
                m
            }
            Self::Sync => MessageBuffer::typed(buf, b'S'),
            Self::Flush => MessageBuffer::typed(buf, b'H'),
            Self::Terminate => MessageBuffer::typed(buf, b'X'),
        };
        m.finish();
    }

    /// Decode a typed frontend message from its tag and body
    pub fn decode(tag: u8, body: &[u8]) -> Result<Self> {
        let mut r = MessageReader::new(body);
        let msg = match tag {
            b'p' => Self::PasswordMessage {
                password: r.read_cstring()?,
            },
            b'Q' => Self::Query {
                sql: r.read_cstring()?,
            },
            b'P' => {
                let name = r.read_cstring()?;
                let query = r.read_cstring()?;
                let count = r.read_count()?;
                let parameter_oids = (0..count)
                    .map(|_| r.read_u32())
                    .collect::<Result<Vec<_>>>()?;
                Self::Parse {
                    name,
                    query,
                    parameter_oids,
                }
            }
            b'B' => {
                let portal = r.read_cstring()?;
                let statement = r.read_cstring()?;
                let count = r.read_count()?;
                let parameter_formats = (0..count)
                    .map(|_| r.read_i16())
                    .collect::<Result<Vec<_>>>()?;
                let count = r.read_count()?;
                let parameters = (0..count)
                    .map(|_| r.read_value())
                    .collect::<Result<Vec<_>>>()?;
                let count = r.read_count()?;
                let result_formats = (0..count)
                    .map(|_| r.read_i16())
                    .collect::<Result<Vec<_>>>()?;
                Self::Bind {
                    portal,
                    statement,
                    parameter_formats,
                    parameters,
                    result_formats,
                }
            }
            b'D' => Self::Describe {
                object_type: r.read_object_type()?,
                name: r.read_cstring()?,
            },
            b'E' => Self::Execute {
                portal: r.read_cstring()?,
                max_rows: r.read_u32()?,
            },
            b'C' => Self::Close {
                object_type: r.read_object_type()?,
                name: r.read_cstring()?,
            },
            b'S' => Self::Sync,
            b'H' => Self::Flush,
            b'X' => Self::Terminate,
            other => {
                return Err(Error::protocol(format!(
                    "Unknown frontend message type '{}'",
                    other as char
                )))
            }
        };
        r.finish(msg.name())?;
        Ok(msg)
    }

    /// Decode a startup-phase message body (everything after the length)
    pub fn decode_startup(body: &[u8]) -> Result<Self> {
        let mut r = MessageReader::new(body);
        let code = r.read_u32()?;
        let msg = match code {
            CANCEL_REQUEST_CODE => Self::CancelRequest {
                process_id: r.read_u32()?,
                secret_key: r.read_u32()?,
            },
            SSL_REQUEST_CODE => Self::SslRequest,
            protocol_version => {
                let mut parameters = std::collections::BTreeMap::new();
                loop {
                    let name = r.read_cstring()?;
                    if name.is_empty() {
                        break;
                    }
                    let value = r.read_cstring()?;
                    parameters.insert(name, value);
                }
                Self::StartupMessage {
                    protocol_version,
                    parameters,
                }
            }
        };
        r.finish(msg.name())?;
        Ok(msg)
    }
}

impl BackendMessage {
    /// Append the wire encoding of this message to `buf`
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Self::AuthenticationOk => {
                let mut m = MessageBuffer::typed(buf, b'R');
                m.write_i32(0);
                m.finish();
            }
            Self::AuthenticationCleartextPassword => {
                let mut m = MessageBuffer::typed(buf, b'R');
                m.write_i32(3);
                m.finish();
            }
            Self::AuthenticationMd5Password { salt } => {
                let mut m = MessageBuffer::typed(buf, b'R');
                m.write_i32(5);
                for b in salt {
                    m.write_byte(*b);
                }
                m.finish();
            }
            Self::BackendKeyData {
                process_id,
                secret_key,
            } => {
                let mut m = MessageBuffer::typed(buf, b'K');
                m.write_u32(*process_id);
                m.write_u32(*secret_key);
                m.finish();
            }
            Self::ParameterStatus { name, value } => {
                let mut m = MessageBuffer::typed(buf, b'S');
                m.write_cstring(name);
                m.write_cstring(value);
                m.finish();
            }
            Self::ReadyForQuery { tx_status } => {
                let mut m = MessageBuffer::typed(buf, b'Z');
                m.write_byte(tx_status.as_byte());
                m.finish();
            }
            Self::ErrorResponse(fields) => encode_fields(buf, b'E', fields),
            Self::NoticeResponse(fields) => encode_fields(buf, b'N', fields),
            Self::CommandComplete { tag } => {
                let mut m = MessageBuffer::typed(buf, b'C');
                m.write_cstring(tag);
                m.finish();
            }
            Self::RowDescription { fields } => {
                let mut m = MessageBuffer::typed(buf, b'T');
                m.write_count(fields.len());
                for field in fields {
                    m.write_cstring(&field.name);
                    m.write_u32(field.table_oid);
                    m.write_i16(field.column_attr);
                    m.write_u32(field.type_oid);
                    m.write_i16(field.type_size);
                    m.write_i32(field.type_modifier);
                    m.write_i16(field.format);
                }
                m.finish();
            }
            Self::DataRow { values } => {
                let mut m = MessageBuffer::typed(buf, b'D');
                m.write_count(values.len());
                for value in values {
                    m.write_value(value);
                }
                m.finish();
            }
            Self::EmptyQueryResponse => MessageBuffer::typed(buf, b'I').finish(),
            Self::ParseComplete => MessageBuffer::typed(buf, b'1').finish(),
            Self::BindComplete => MessageBuffer::typed(buf, b'2').finish(),
            Self::CloseComplete => MessageBuffer::typed(buf, b'3').finish(),
            Self::NoData => MessageBuffer::typed(buf, b'n').finish(),
            Self::PortalSuspended => MessageBuffer::typed(buf, b's').finish(),
            Self::ParameterDescription { type_oids } => {
                let mut m = MessageBuffer::typed(buf, b't');
                m.write_count(type_oids.len());
                for oid in type_oids {
                    m.write_u32(*oid);
                }
                m.finish();
            }
            Self::Unknown { tag, body } => {
                let mut m = MessageBuffer::typed(buf, *tag);
                m.write_bytes(body);
                m.finish();
            }
        }
    }

    /// Decode a backend message from its tag and body
    pub fn decode(tag: u8, body: &[u8]) -> Result<Self> {
        let mut r = MessageReader::new(body);
        let msg = match tag {
            b'R' => match r.read_i32()? {
                0 => Self::AuthenticationOk,
                3 => Self::AuthenticationCleartextPassword,
                5 => {
                    let mut salt = [0u8; 4];
                    salt.copy_from_slice(r.read_bytes(4)?);
                    Self::AuthenticationMd5Password { salt }
                }
                _ => Self::Unknown {
                    tag,
                    body: body.to_vec(),
                },
            },
            b'K' => Self::BackendKeyData {
                process_id: r.read_u32()?,
                secret_key: r.read_u32()?,
            },
            b'S' => Self::ParameterStatus {
                name: r.read_cstring()?,
                value: r.read_cstring()?,
            },
            b'Z' => {
                let b = r.read_byte()?;
                let tx_status = TxStatus::from_byte(b).ok_or_else(|| {
                    Error::protocol(format!("Invalid transaction status '{}'", b as char))
                })?;
                Self::ReadyForQuery { tx_status }
            }
            b'E' => Self::ErrorResponse(r.read_fields()?),
            b'N' => Self::NoticeResponse(r.read_fields()?),
            b'C' => Self::CommandComplete {
                tag: r.read_cstring()?,
            },
            b'T' => {
                let count = r.read_count()?;
                let fields = (0..count)
                    .map(|_| -> Result<FieldDescription> {
                        Ok(FieldDescription {
                            name: r.read_cstring()?,
                            table_oid: r.read_u32()?,
                            column_attr: r.read_i16()?,
                            type_oid: r.read_u32()?,
                            type_size: r.read_i16()?,
                            type_modifier: r.read_i32()?,
                            format: r.read_i16()?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::RowDescription { fields }
            }
            b'D' => {
                let count = r.read_count()?;
                let values = (0..count)
                    .map(|_| r.read_value())
                    .collect::<Result<Vec<_>>>()?;
                Self::DataRow { values }
            }
            b'I' => Self::EmptyQueryResponse,
            b'1' => Self::ParseComplete,
            b'2' => Self::BindComplete,
            b'3' => Self::CloseComplete,
            b'n' => Self::NoData,
            b's' => Self::PortalSuspended,
            b't' => {
                let count = r.read_count()?;
                let type_oids = (0..count)
                    .map(|_| r.read_u32())
                    .collect::<Result<Vec<_>>>()?;
                Self::ParameterDescription { type_oids }
            }
            _ => Self::Unknown {
                tag,
                body: body.to_vec(),
            },
        };
        // Unknown bodies are kept whole, nothing is left to check
        if let Self::Unknown { .. } = msg {
            return Ok(msg);
        }
        r.finish(msg.name())?;
        Ok(msg)
    }
}

fn encode_fields(buf: &mut Vec<u8>, tag: u8, fields: &ErrorFields) {
    let mut m = MessageBuffer::typed(buf, tag);
    for (code, value) in fields.named() {
        if !value.is_empty() {
            m.write_byte(code);
            m.write_cstring(value);
        }
    }
    for (&code, value) in &fields.unknown {
        if let Ok(code) = u8::try_from(code) {
            m.write_byte(code);
            m.write_cstring(value);
        }
    }
    m.write_byte(0);
    m.finish();
}

// === Decoding ===

/// Cursor over a message body
struct MessageReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MessageReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::protocol(format!(
                "Message body truncated: wanted {} bytes, {} left",
                len,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_i16(&mut self) -> Result<i16> {
        let b = self.read_bytes(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_count(&mut self) -> Result<usize> {
        let n = self.read_i16()?;
        usize::try_from(n).map_err(|_| Error::protocol(format!("Negative count {}", n)))
    }

    fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::protocol("Unterminated string"))?;
        let s = std::str::from_utf8(&rest[..end])
            .map_err(|e| Error::protocol(format!("Invalid UTF-8: {}", e)))?;
        self.pos += end + 1;
        Ok(s.to_string())
    }

    fn read_value(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.read_bytes(len as usize)?.to_vec()))
    }

    fn read_object_type(&mut self) -> Result<ObjectType> {
        let b = self.read_byte()?;
        ObjectType::from_byte(b)
            .ok_or_else(|| Error::protocol(format!("Invalid object type '{}'", b as char)))
    }

    fn read_fields(&mut self) -> Result<ErrorFields> {
        let mut fields = ErrorFields::default();
        loop {
            let code = self.read_byte()?;
            if code == 0 {
                return Ok(fields);
            }
            let value = self.read_cstring()?;
            fields.set(code, value);
        }
    }

    fn finish(&self, name: &str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::protocol(format!(
                "{} has {} trailing bytes",
                name,
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_cancel_request_encoding() {
        let mut buf = Vec::new();
        FrontendMessage::CancelRequest {
            process_id: 7,
            secret_key: 9,
        }
        .encode(&mut buf);
        assert_eq!(
            buf,
            [0, 0, 0, 16, 4, 210, 22, 46, 0, 0, 0, 7, 0, 0, 0, 9]
        );
    }

    #[test]
    fn test_ready_for_query_encoding() {
        let mut buf = Vec::new();
        BackendMessage::ReadyForQuery {
            tx_status: TxStatus::Idle,
        }
        .encode(&mut buf);
        assert_eq!(buf, b"Z\x00\x00\x00\x05I");
    }

    #[test]
    fn test_error_response_skips_empty_fields() {
        let mut buf = Vec::new();
        BackendMessage::ErrorResponse(ErrorFields {
            severity: "FATAL".to_string(),
            message: "some error".to_string(),
            ..Default::default()
        })
        .encode(&mut buf);
        assert_eq!(&buf[..1], b"E");
        assert_eq!(&buf[5..], b"SFATAL\0Msome error\0\0");
    }

    #[tokio::test]
    async fn test_read_backend_messages() {
        let mut buf = Vec::new();
        BackendMessage::AuthenticationOk.encode(&mut buf);
        BackendMessage::DataRow {
            values: vec![Some(b"42".to_vec()), None],
        }
        .encode(&mut buf);
        let mut reader = FrameReader::new(Cursor::new(buf));

        let (tag, body) = reader.read_message().await.unwrap();
        assert_eq!(
            BackendMessage::decode(tag, &body).unwrap(),
            BackendMessage::AuthenticationOk
        );
        let (tag, body) = reader.read_message().await.unwrap();
        assert_eq!(
            BackendMessage::decode(tag, &body).unwrap(),
            BackendMessage::DataRow {
                values: vec![Some(b"42".to_vec()), None],
            }
        );
        assert!(matches!(
            reader.read_message().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_io_error() {
        let mut reader = FrameReader::new(Cursor::new(b"Z\x00\x00\x00\x05".to_vec()));
        match reader.read_message().await {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_length_rejected() {
        let mut reader = FrameReader::new(Cursor::new(b"Z\x00\x00\x00\x02".to_vec()));
        assert!(matches!(
            reader.read_message().await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_read_startup_message() {
        let msg = FrontendMessage::startup([("user", "test_user"), ("database", "test_db")]);
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let mut reader = FrameReader::new(Cursor::new(buf));

        let body = reader.read_startup_message().await.unwrap();
        assert_eq!(FrontendMessage::decode_startup(&body).unwrap(), msg);
    }

    #[test]
    fn test_unknown_tag_kept_raw() {
        // NotificationResponse: pid, channel, payload
        let body = b"\x00\x00\x00\x07chan\x00hi\x00";
        let msg = BackendMessage::decode(b'A', body).unwrap();
        assert_eq!(
            msg,
            BackendMessage::Unknown {
                tag: b'A',
                body: body.to_vec(),
            }
        );

        let mut buf = Vec::new();
        msg.encode(&mut buf);
        assert_eq!(buf[0], b'A');
        assert_eq!(&buf[5..], body);
    }

    #[test]
    fn test_sasl_request_is_unknown_authentication() {
        let body = b"\x00\x00\x00\x0aSCRAM-SHA-256\x00\x00";
        match BackendMessage::decode(b'R', body).unwrap() {
            BackendMessage::Unknown { tag, body: kept } => {
                assert_eq!(tag, b'R');
                assert_eq!(kept, body);
            }
            other => panic!("expected unknown message, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_tx_status_rejected() {
        assert!(matches!(
            BackendMessage::decode(b'Z', b"X"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert!(matches!(
            BackendMessage::decode(b'3', b"\x00"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_notice_keeps_every_field() {
        let body = b"SWARNING\0P12\0Mheads up\0Z?\0\0";
        let mut unknown = std::collections::BTreeMap::new();
        unknown.insert('Z', "?".to_string());
        assert_eq!(
            BackendMessage::decode(b'N', body).unwrap(),
            BackendMessage::NoticeResponse(ErrorFields {
                severity: "WARNING".to_string(),
                message: "heads up".to_string(),
                position: "12".to_string(),
                unknown,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_error_responses_differing_in_any_field_are_unequal() {
        let full = b"SERROR\0VERROR\0C42P01\0Mno table\0P15\0Fparse.c\0L100\0Rfoo\0\0";
        let short = b"SERROR\0C42P01\0Mno table\0P99\0\0";
        let full = BackendMessage::decode(b'E', full).unwrap();
        let short = BackendMessage::decode(b'E', short).unwrap();
        assert_ne!(full, short);

        match &full {
            BackendMessage::ErrorResponse(fields) => {
                assert_eq!(fields.severity_unlocalized, "ERROR");
                assert_eq!(fields.position, "15");
                assert_eq!(fields.file, "parse.c");
                assert_eq!(fields.line, "100");
                assert_eq!(fields.routine, "foo");
            }
            other => panic!("expected error response, got {:?}", other),
        }

        let mut buf = Vec::new();
        full.encode(&mut buf);
        assert_eq!(BackendMessage::decode(buf[0], &buf[5..]).unwrap(), full);
    }

    #[tokio::test]
    async fn test_frame_survives_cancelled_read() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(client);

        server.write_all(b"Z\x00\x00").await.unwrap();
        let cut_short = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            reader.read_message(),
        )
        .await;
        assert!(cut_short.is_err());

        server.write_all(b"\x00\x05I").await.unwrap();
        let (tag, body) = reader.read_message().await.unwrap();
        assert_eq!((tag, body.as_slice()), (b'Z', &b"I"[..]));
    }

    #[tokio::test]
    async fn test_frames_split_across_reads() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(client);
        tokio::spawn(async move {
            for byte in b"3\x00\x00\x00\x04n\x00\x00\x00\x04" {
                server.write_all(&[*byte]).await.unwrap();
            }
        });

        assert_eq!(reader.read_message().await.unwrap(), (b'3', Vec::new()));
        assert_eq!(reader.read_message().await.unwrap(), (b'n', Vec::new()));
        assert!(matches!(
            reader.read_message().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "does not fit in an i16")]
    fn test_oversized_count_is_caught() {
        let msg = FrontendMessage::Parse {
            name: String::new(),
            query: "SELECT 1".to_string(),
            parameter_oids: vec![0; i16::MAX as usize + 1],
        };
        msg.encode(&mut Vec::new());
    }

    #[test]
    fn test_bind_decodes_as_encoded() {
        let msg = FrontendMessage::Bind {
            portal: String::new(),
            statement: "s1".to_string(),
            parameter_formats: vec![1],
            parameters: vec![Some(vec![0, 0, 0, 1]), None],
            result_formats: vec![],
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        assert_eq!(buf[0], b'B');
        assert_eq!(FrontendMessage::decode(buf[0], &buf[5..]).unwrap(), msg);
    }
}
