//! PostgreSQL protocol message types
//!
//! These types cover the subset of the frontend/backend protocol (version
//! 3.0) that mock scripts exchange.
//! See: https://www.postgresql.org/docs/current/protocol-message-formats.html

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protocol version 3.0 as sent in the startup message
pub const PROTOCOL_VERSION_NUMBER: u32 = 196608;

/// Request code identifying a cancel request
pub const CANCEL_REQUEST_CODE: u32 = 80877102;

/// Request code identifying an SSL request
pub const SSL_REQUEST_CODE: u32 = 80877103;

// === Backend Messages ===

/// Messages sent by the server, received by the mock frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendMessage {
    AuthenticationOk,
    AuthenticationCleartextPassword,
    AuthenticationMd5Password {
        salt: [u8; 4],
    },
    BackendKeyData {
        process_id: u32,
        secret_key: u32,
    },
    ParameterStatus {
        name: String,
        value: String,
    },
    ReadyForQuery {
        tx_status: TxStatus,
    },
    ErrorResponse(ErrorFields),
    NoticeResponse(ErrorFields),
    CommandComplete {
        tag: String,
    },
    RowDescription {
        fields: Vec<FieldDescription>,
    },
    DataRow {
        values: Vec<Option<Vec<u8>>>,
    },
    EmptyQueryResponse,
    ParseComplete,
    BindComplete,
    CloseComplete,
    NoData,
    PortalSuspended,
    ParameterDescription {
        type_oids: Vec<u32>,
    },
    /// Any message this codec has no variant for, kept as raw bytes
    ///
    /// Authentication requests other than ok, cleartext and MD5 land here
    /// with tag `R`.
    Unknown {
        tag: u8,
        body: Vec<u8>,
    },
}

impl BackendMessage {
    /// Short name of the message variant, for logs and outlines
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationOk => "AuthenticationOk",
            Self::AuthenticationCleartextPassword => "AuthenticationCleartextPassword",
            Self::AuthenticationMd5Password { .. } => "AuthenticationMD5Password",
            Self::BackendKeyData { .. } => "BackendKeyData",
            Self::ParameterStatus { .. } => "ParameterStatus",
            Self::ReadyForQuery { .. } => "ReadyForQuery",
            Self::ErrorResponse(_) => "ErrorResponse",
            Self::NoticeResponse(_) => "NoticeResponse",
            Self::CommandComplete { .. } => "CommandComplete",
            Self::RowDescription { .. } => "RowDescription",
            Self::DataRow { .. } => "DataRow",
            Self::EmptyQueryResponse => "EmptyQueryResponse",
            Self::ParseComplete => "ParseComplete",
            Self::BindComplete => "BindComplete",
            Self::CloseComplete => "CloseComplete",
            Self::NoData => "NoData",
            Self::PortalSuspended => "PortalSuspended",
            Self::ParameterDescription { .. } => "ParameterDescription",
            Self::Unknown { .. } => "Unknown",
        }
    }

    /// Whether both messages are the same variant, ignoring field values
    ///
    /// Unknown messages are the same kind only when their tags match.
    pub fn same_kind(&self, other: &BackendMessage) -> bool {
        match (self, other) {
            (Self::Unknown { tag: a, .. }, Self::Unknown { tag: b, .. }) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// Transaction status reported by ReadyForQuery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Not in a transaction block ('I')
    Idle,
    /// In a transaction block ('T')
    InTransaction,
    /// In a failed transaction block ('E')
    Failed,
}

impl TxStatus {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Idle => b'I',
            Self::InTransaction => b'T',
            Self::Failed => b'E',
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'I' => Some(Self::Idle),
            b'T' => Some(Self::InTransaction),
            b'E' => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Fields carried by ErrorResponse and NoticeResponse
///
/// Empty strings stand for absent fields. Values are kept as the server
/// sent them, so `position` and `line` stay text. Codes without a named
/// field are kept in `unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorFields {
    pub severity: String,
    pub severity_unlocalized: String,
    pub code: String,
    pub message: String,
    pub detail: String,
    pub hint: String,
    pub position: String,
    pub internal_position: String,
    pub internal_query: String,
    #[serde(rename = "where")]
    pub where_: String,
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type_name: String,
    pub constraint_name: String,
    pub file: String,
    pub line: String,
    pub routine: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub unknown: BTreeMap<char, String>,
}

impl ErrorFields {
    /// Named fields with their wire codes, in encoding order
    pub(crate) fn named(&self) -> [(u8, &str); 18] {
        [
            (b'S', self.severity.as_str()),
            (b'V', self.severity_unlocalized.as_str()),
            (b'C', self.code.as_str()),
            (b'M', self.message.as_str()),
            (b'D', self.detail.as_str()),
            (b'H', self.hint.as_str()),
            (b'P', self.position.as_str()),
            (b'p', self.internal_position.as_str()),
            (b'q', self.internal_query.as_str()),
            (b'W', self.where_.as_str()),
            (b's', self.schema_name.as_str()),
            (b't', self.table_name.as_str()),
            (b'c', self.column_name.as_str()),
            (b'd', self.data_type_name.as_str()),
            (b'n', self.constraint_name.as_str()),
            (b'F', self.file.as_str()),
            (b'L', self.line.as_str()),
            (b'R', self.routine.as_str()),
        ]
    }

    /// Store `value` under wire code `code`
    pub(crate) fn set(&mut self, code: u8, value: String) {
        let slot = match code {
            b'S' => &mut self.severity,
            b'V' => &mut self.severity_unlocalized,
            b'C' => &mut self.code,
            b'M' => &mut self.message,
            b'D' => &mut self.detail,
            b'H' => &mut self.hint,
            b'P' => &mut self.position,
            b'p' => &mut self.internal_position,
            b'q' => &mut self.internal_query,
            b'W' => &mut self.where_,
            b's' => &mut self.schema_name,
            b't' => &mut self.table_name,
            b'c' => &mut self.column_name,
            b'd' => &mut self.data_type_name,
            b'n' => &mut self.constraint_name,
            b'F' => &mut self.file,
            b'L' => &mut self.line,
            b'R' => &mut self.routine,
            other => {
                self.unknown.insert(char::from(other), value);
                return;
            }
        };
        *slot = value;
    }
}

/// Column description inside RowDescription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDescription {
    pub name: String,
    pub table_oid: u32,
    pub column_attr: i16,
    pub type_oid: u32,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: i16,
}

// === Frontend Messages ===

/// Messages sent by the mock frontend to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontendMessage {
    StartupMessage {
        #[serde(default = "default_protocol_version")]
        protocol_version: u32,
        #[serde(default)]
        parameters: BTreeMap<String, String>,
    },
    CancelRequest {
        process_id: u32,
        secret_key: u32,
    },
    SslRequest,
    PasswordMessage {
        password: String,
    },
    Query {
        sql: String,
    },
    Parse {
        #[serde(default)]
        name: String,
        query: String,
        #[serde(default)]
        parameter_oids: Vec<u32>,
    },
    Bind {
        #[serde(default)]
        portal: String,
        #[serde(default)]
        statement: String,
        #[serde(default)]
        parameter_formats: Vec<i16>,
        #[serde(default)]
        parameters: Vec<Option<Vec<u8>>>,
        #[serde(default)]
        result_formats: Vec<i16>,
    },
    Describe {
        object_type: ObjectType,
        #[serde(default)]
        name: String,
    },
    Execute {
        #[serde(default)]
        portal: String,
        #[serde(default)]
        max_rows: u32,
    },
    Close {
        object_type: ObjectType,
        #[serde(default)]
        name: String,
    },
    Sync,
    Flush,
    Terminate,
}

fn default_protocol_version() -> u32 {
    PROTOCOL_VERSION_NUMBER
}

impl FrontendMessage {
    /// Build a protocol 3.0 startup message from key/value parameters
    pub fn startup<K, V>(parameters: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::StartupMessage {
            protocol_version: PROTOCOL_VERSION_NUMBER,
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Short name of the message variant, for logs and outlines
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartupMessage { .. } => "StartupMessage",
            Self::CancelRequest { .. } => "CancelRequest",
            Self::SslRequest => "SSLRequest",
            Self::PasswordMessage { .. } => "PasswordMessage",
            Self::Query { .. } => "Query",
            Self::Parse { .. } => "Parse",
            Self::Bind { .. } => "Bind",
            Self::Describe { .. } => "Describe",
            Self::Execute { .. } => "Execute",
            Self::Close { .. } => "Close",
            Self::Sync => "Sync",
            Self::Flush => "Flush",
            Self::Terminate => "Terminate",
        }
    }

    /// Startup-phase messages are framed without a leading type byte
    pub fn is_startup_phase(&self) -> bool {
        matches!(
            self,
            Self::StartupMessage { .. } | Self::CancelRequest { .. } | Self::SslRequest
        )
    }
}

/// Target of Describe and Close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Statement,
    Portal,
}

impl ObjectType {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Statement => b'S',
            Self::Portal => b'P',
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'S' => Some(Self::Statement),
            b'P' => Some(Self::Portal),
            _ => None,
        }
    }
}
