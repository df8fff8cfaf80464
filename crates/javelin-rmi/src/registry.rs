//! Registry `lookup`/`list` over an open stream.

use tokio::io::{AsyncRead, AsyncWrite};

use javelin_serial::Builder;

use crate::constants::OPERATION_DISPATCH_BY_HASH;
use crate::hash::registry_interface_hash;
use crate::message::{CallMessage, ObjId};
use crate::parse::{parse_remote_object_return, parse_string_array_return};
use crate::transport::exchange;
use crate::{CallOutcome, RemoteObjectDescriptor, Result};

/// Build a registry `lookup(name)` call.
pub fn build_lookup_call(obj_id: ObjId, name: &str) -> CallMessage {
    CallMessage::new(
        obj_id,
        OPERATION_DISPATCH_BY_HASH,
        registry_interface_hash(),
        vec![Builder::utf(name)],
    )
}

/// Build a registry `list()` call.
pub fn build_list_call(obj_id: ObjId) -> CallMessage {
    CallMessage::new(
        obj_id,
        OPERATION_DISPATCH_BY_HASH,
        registry_interface_hash(),
        vec![],
    )
}

/// A client for one registry endpoint. Owns the stream the caller opened;
/// each method is a single synchronous call/return exchange.
pub struct RegistryClient<S> {
    stream: S,
    obj_id: ObjId,
}

impl<S> RegistryClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Address the well-known registry singleton (all-zero object id).
    pub fn new(stream: S) -> Self {
        Self::with_obj_id(stream, ObjId::default())
    }

    /// Address a specific remote object, e.g. one resolved by an earlier
    /// lookup.
    pub fn with_obj_id(stream: S, obj_id: ObjId) -> Self {
        Self { stream, obj_id }
    }

    /// Resolve a bound name to a remote object descriptor.
    pub async fn lookup(&mut self, name: &str) -> Result<CallOutcome<RemoteObjectDescriptor>> {
        let call = build_lookup_call(self.obj_id, name);
        match exchange(&mut self.stream, &call).await? {
            Some(ret) => parse_remote_object_return(&ret),
            None => Ok(CallOutcome::NoResponse),
        }
    }

    /// Enumerate the names bound in the registry, in registry order.
    pub async fn list(&mut self) -> Result<CallOutcome<Vec<String>>> {
        let call = build_list_call(self.obj_id);
        match exchange(&mut self.stream, &call).await? {
            Some(ret) => parse_string_array_return(&ret),
            None => Ok(CallOutcome::NoResponse),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
