//! Minimal Java Object Serialization codec for Javelin.
//!
//! This is not a general-purpose serializer. It covers exactly the subset of
//! the Java serialization grammar that RMI registry and JMX connector traffic
//! uses: the stream header, UTF strings, null references, block data, typed
//! arrays, and plain objects with class descriptors (including the
//! write-method annotation data where `UnicastRef` endpoints live). Dynamic
//! proxies, codebase annotations, and custom primitive-array handling are
//! intentionally out of scope and surface as [`SerialError::Unsupported`].

mod builder;
mod decode;
mod encode;
mod model;

use thiserror::Error;

pub use builder::Builder;
pub use decode::decode_stream;
pub use encode::encode_stream;
pub use model::{ArrayValue, ClassData, ClassDesc, Content, FieldDesc, FieldValue, ObjectValue, Stream};

pub type Result<T> = std::result::Result<T, SerialError>;

pub const STREAM_MAGIC: u16 = 0xACED;
pub const STREAM_VERSION: u16 = 5;

pub const TC_NULL: u8 = 0x70;
pub const TC_REFERENCE: u8 = 0x71;
pub const TC_CLASSDESC: u8 = 0x72;
pub const TC_OBJECT: u8 = 0x73;
pub const TC_STRING: u8 = 0x74;
pub const TC_ARRAY: u8 = 0x75;
pub const TC_CLASS: u8 = 0x76;
pub const TC_BLOCKDATA: u8 = 0x77;
pub const TC_ENDBLOCKDATA: u8 = 0x78;
pub const TC_BLOCKDATALONG: u8 = 0x7A;
pub const TC_PROXYCLASSDESC: u8 = 0x7D;

pub const SC_WRITE_METHOD: u8 = 0x01;
pub const SC_SERIALIZABLE: u8 = 0x02;
pub const SC_EXTERNALIZABLE: u8 = 0x04;
pub const SC_BLOCK_DATA: u8 = 0x08;

/// First handle value assigned to back-referenceable stream elements.
pub const BASE_WIRE_HANDLE: u32 = 0x7E0000;

#[derive(Debug, Error)]
pub enum SerialError {
    /// The buffer ended before a complete element was decoded. Callers that
    /// read from a socket use this to distinguish "need more bytes" from a
    /// malformed stream.
    #[error("truncated serialization stream")]
    Truncated,
    #[error("invalid stream magic: 0x{0:04x}")]
    InvalidMagic(u16),
    #[error("unsupported stream version: {0}")]
    InvalidVersion(u16),
    #[error("unknown content tag: 0x{0:02x}")]
    UnknownTag(u8),
    #[error("unresolvable back reference: 0x{0:08x}")]
    BadReference(u32),
    #[error("string contents were not valid UTF-8")]
    InvalidUtf8,
    #[error("unsupported serialization feature: {0}")]
    Unsupported(&'static str),
}
