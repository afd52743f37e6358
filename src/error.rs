use std::num::{ParseFloatError, ParseIntError};
use std::result;
use std::string::FromUtf8Error;

use base64::DecodeError;
use quick_xml::Error as XmlError;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Reserved fault codes produced by the library itself rather than by application handlers.
pub mod codes {
    /// Unexpected failure inside a method handler.
    pub const INTERNAL: i32 = -500;
    /// No method registered under the requested name.
    pub const NO_SUCH_METHOD: i32 = -501;
    /// The request XML could not be parsed.
    pub const PARSE: i32 = -502;
    /// Parameter count or types did not match a registered signature.
    pub const TYPE: i32 = -503;
    /// A transport-level failure was surfaced as a fault.
    pub const TRANSPORT: i32 = -504;
}

/// Errors that can occur when trying to perform an XML-RPC request.
///
/// This can be a lower-level error (for example, the HTTP request failed), a problem with the
/// server (maybe it's not implementing XML-RPC correctly), or just a failure to execute the
/// operation.
#[derive(ThisError, Debug)]
pub enum Error {
    /// The response could not be parsed. This can happen when the server doesn't correctly
    /// implement the XML-RPC spec.
    #[error("parse error: {0}")]
    ParseError(#[from] ParseError),

    /// The response could not be encoded.
    #[error("encoding error: {0}")]
    EncodingError(#[from] EncodingError),

    /// The server returned a `<fault>` response, indicating that the execution of the call
    /// encountered a problem (for example, an invalid (number of) arguments was passed).
    #[error("server fault: {0}")]
    Fault(#[from] Fault),

    /// Misuse of a `Value` handle: wrong tag, uninitialized placeholder, or bad index.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Misuse of a `ParamList`.
    #[error("parameter error: {0}")]
    Param(#[from] ParamError),

    /// Misuse of a `Registry`.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Misuse of an `RpcHandle`.
    #[error("handle error: {0}")]
    Handle(#[from] HandleError),

    #[error("serde decoding error: {0}")]
    DecodeError(String),

    #[error("serde encoding error: {0}")]
    EncodeError(String),
}

impl serde::de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Error::DecodeError(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Error::EncodeError(msg.to_string())
    }
}

/// Error while parsing XML.
#[derive(ThisError, Debug)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    XmlError(#[from] XmlError),

    #[error("malformed XML: {0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("malformed XML: {0}")]
    ParseFloatError(#[from] ParseFloatError),

    #[error("malformed XML: {0}")]
    Base64DecodeError(#[from] DecodeError),

    #[error("malformed XML: invalid dateTime.iso8601 value: {0}")]
    DateTimeDecodeError(String),

    #[error("malformed XML: invalid boolean value: {0}")]
    BooleanDecodeError(String),

    #[error("malformed XML: invalid double value (NaN/Infinity are not allowed on the wire): {0}")]
    DoubleDecodeError(String),

    #[error("malformed UTF-8: {0}")]
    Utf8Error(#[from] FromUtf8Error),

    #[error("unexpected tag: found {0}, expected {1}")]
    UnexpectedTag(String, String),

    #[error("unexpected error: {0}, expected tag {1}")]
    UnexpectedError(anyhow::Error, String),

    #[error("unexpected event: expected tag {0}")]
    UnexpectedEvent(String),

    #[error("unexpected EOF: expected tag {0}")]
    UnexpectedEOF(String),

    #[error("tag not found: {0}")]
    TagNotFound(String),

    #[error("key must be convertable to a string")]
    KeyMustBeString,

    #[error("fault: {0}")]
    ParseFaultError(String),

    /// Well-formed XML, but not a well-formed `methodCall`/`methodResponse` document
    /// (e.g. stray non-whitespace text between elements, or neither `<params>` nor
    /// `<fault>` present in a response).
    #[error("malformed request/response structure: {0}")]
    MalformedRpc(String),
}

/// Error while encoding XML.
#[derive(ThisError, Debug)]
pub enum EncodingError {
    #[error("malformed UTF-8: {0}")]
    Utf8Error(#[from] FromUtf8Error),

    #[error("XML error: {0}")]
    XmlError(#[from] XmlError),

    #[error("struct/map keys must serialize to a string, not {0}")]
    InvalidKeyType(String),

    #[error("integer {0} does not fit in a 32-bit XML-RPC int")]
    IntegerOutOfRange(i64),

    #[error("double {0} is not finite (NaN/Infinity are not allowed on the wire)")]
    NonFiniteDouble(f64),

    #[error("{0} cannot be represented as an XML-RPC value")]
    UnsupportedType(&'static str),
}

/// Misuse of a `Value` handle.
#[derive(ThisError, Debug)]
pub enum ValueError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value is uninitialized")]
    Uninitialized,

    #[error("array index {index} out of range (length {len})")]
    ArrayIndex { index: usize, len: usize },

    #[error("struct has no member named `{0}`")]
    NoSuchMember(String),
}

/// Misuse of a `ParamList`.
#[derive(ThisError, Debug)]
pub enum ParamError {
    #[error("parameter {index} has wrong type: expected {expected}, found {found}")]
    Type {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter index {index} out of range (length {len})")]
    Index { index: usize, len: usize },

    #[error("expected {expected} parameters, found {found}")]
    Count { expected: usize, found: usize },
}

/// Misuse of a `Registry`.
#[derive(ThisError, Debug)]
pub enum RegistryError {
    #[error("method `{0}` is already registered")]
    DuplicateMethod(String),
}

/// A transport-level failure.
#[derive(ThisError, Debug)]
pub enum TransportError {
    #[error("server returned HTTP status {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("carriage parameter type mismatch for this transport")]
    CarriageType,

    #[error("timed out waiting for outstanding calls")]
    Timeout,
}

/// Misuse of an `RpcHandle`.
#[derive(ThisError, Debug)]
pub enum HandleError {
    #[error("RPC handle has already been started")]
    AlreadyRun,

    #[error("RPC handle has not finished yet")]
    NotFinished,

    #[error("RPC handle did not succeed")]
    NotSuccessful,

    #[error("RPC handle succeeded, it has no fault")]
    NoFault,
}

pub type Result<T> = result::Result<T, Error>;

/// A `<fault>` response, indicating that a request failed.
///
/// The XML-RPC specification requires that a `<faultCode>` and `<faultString>` is returned in the
/// `<fault>` case, further describing the error.
#[derive(ThisError, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[error("{description} ({code})")]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    /// An application-specific error code.
    #[serde(rename = "faultCode")]
    pub code: i32,
    /// Human-readable error description.
    #[serde(rename = "faultString")]
    pub description: String,
}

impl Fault {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Fault {
            code,
            description: description.into(),
        }
    }
}
