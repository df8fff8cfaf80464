//! Java RMI call/return protocol engine.
//!
//! Javelin simulates just enough of an RMI client to invoke a handful of
//! well-known remote methods — registry `lookup`/`list` and the JMX
//! `RMIServer.newClient` — against a live endpoint, without a JVM and without
//! the target's interface class files. The wire protocol admits calls by a
//! 64-bit interface hash rather than class metadata, so the engine consists
//! of the hash computation ([`hash`]), call construction ([`message`],
//! [`registry`], [`jmx`]), a synchronous call/return exchange ([`transport`]),
//! and reply parsers ([`parse`]).
//!
//! Payload encoding is delegated to `javelin-serial`; connection setup, TLS,
//! and timeouts belong to the caller, which hands the engine an open stream.

pub mod constants;
pub mod hash;
pub mod jmx;
pub mod message;
pub mod parse;
pub mod registry;
pub mod transport;

use std::io;

use thiserror::Error;

pub use javelin_serial::{Builder, Content, SerialError};
pub use message::{CallMessage, ObjId, ReturnMessage, Uid};

// The mock RMI endpoint is only needed for tests and downstream integration
// suites. Compile it for javelin-rmi's own unit tests unconditionally, and
// behind the `wire-test-support` feature for downstream crates.
#[cfg(any(test, feature = "wire-test-support"))]
pub mod mock;

pub type Result<T> = std::result::Result<T, RmiError>;

#[derive(Debug, Error)]
pub enum RmiError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serial(#[from] SerialError),
    #[error("RMI protocol error: {0}")]
    Protocol(String),
}

/// The four ways a remote call can resolve, explicit at the call site.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// The peer returned a usable value.
    Ok(T),
    /// The peer answered normally but there is no result (e.g. lookup of an
    /// unbound name).
    NotFound,
    /// The peer returned an exception; carries the exception's fully
    /// qualified class name (e.g. `java.rmi.NotBoundException`).
    RemoteFailure(String),
    /// The stream closed, or the peer did not speak RMI, before a complete
    /// return message arrived. Distinct from a remote failure.
    NoResponse,
}

impl<T> CallOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            CallOutcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// The remote exception class name, if the peer returned one.
    pub fn remote_class(&self) -> Option<&str> {
        match self {
            CallOutcome::RemoteFailure(class_name) => Some(class_name),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            CallOutcome::Ok(value) => CallOutcome::Ok(f(value)),
            CallOutcome::NotFound => CallOutcome::NotFound,
            CallOutcome::RemoteFailure(class_name) => CallOutcome::RemoteFailure(class_name),
            CallOutcome::NoResponse => CallOutcome::NoResponse,
        }
    }
}

/// Host and port a remote object is reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// A remote object as reported by the peer: its class, where it lives, and
/// the identity triple future calls must echo verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObjectDescriptor {
    pub class_name: String,
    pub endpoint: Endpoint,
    pub obj_id: ObjId,
}
