//! A tiny RMI endpoint used for unit/integration testing.
//!
//! It intentionally supports a *small* subset of the protocol — enough to
//! answer registry `lookup`/`list` and JMX `newClient` calls dispatched by
//! hash — so the engine can be exercised without a JVM on the system.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use javelin_serial::{ClassData, ClassDesc, Content, ObjectValue, SC_SERIALIZABLE, SC_WRITE_METHOD};

use crate::constants::{
    JMX_NEWCLIENT_METHOD_HASH, RETURN_EXCEPTION, RETURN_NORMAL, STRING_ARRAY_CLASS,
    STRING_ARRAY_SERIAL_VERSION_UID, STRING_ELEMENT_TYPE,
};
use crate::hash::registry_interface_hash;
use crate::message::{CallMessage, ObjId, ReturnMessage, Uid};
use crate::{Builder, RemoteObjectDescriptor, RmiError, SerialError};

#[derive(Debug, Clone, Default)]
pub struct MockRmiServerConfig {
    /// Names the registry reports from `list`, in order.
    pub bound_names: Vec<String>,
    /// Objects the registry resolves from `lookup`. Missing names answer
    /// with `java.rmi.NotBoundException`.
    pub bindings: HashMap<String, RemoteObjectDescriptor>,
    /// The connection descriptor `newClient` vends on success.
    pub jmx_connection: Option<RemoteObjectDescriptor>,
    /// When set, `newClient` requires exactly these credentials; otherwise
    /// only a null (unauthenticated) argument is accepted.
    pub required_credentials: Option<(String, String)>,
    /// Close the connection after reading a call, without replying.
    pub close_without_reply: bool,
}

pub struct MockRmiServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MockRmiServer {
    pub async fn spawn(config: MockRmiServerConfig) -> std::io::Result<MockRmiServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let config = Arc::new(config);

        let accept_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    _ = accept_shutdown.cancelled() => break,
                    res = listener.accept() => res,
                };
                let Ok((stream, _)) = accepted else { break };
                let config = config.clone();
                let conn_shutdown = accept_shutdown.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = conn_shutdown.cancelled() => {}
                        _ = handle_connection(stream, config) => {}
                    }
                });
            }
        });

        Ok(MockRmiServer { addr, shutdown })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for MockRmiServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_connection(mut stream: TcpStream, config: Arc<MockRmiServerConfig>) {
    loop {
        let call = match read_call(&mut stream).await {
            Some(call) => call,
            None => return,
        };
        if config.close_without_reply {
            return;
        }
        let reply = dispatch(&call, &config);
        if stream.write_all(&reply.encode()).await.is_err() {
            return;
        }
        let _ = stream.flush().await;
    }
}

async fn read_call(stream: &mut TcpStream) -> Option<CallMessage> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        match CallMessage::decode(&buf) {
            Ok(call) => return Some(call),
            Err(RmiError::Serial(SerialError::Truncated)) => continue,
            Err(err) => {
                tracing::debug!(%err, "mock endpoint dropping malformed call");
                return None;
            }
        }
    }
}

fn dispatch(call: &CallMessage, config: &MockRmiServerConfig) -> ReturnMessage {
    if call.hash == JMX_NEWCLIENT_METHOD_HASH {
        return new_client_reply(call, config);
    }
    if call.hash == registry_interface_hash() {
        return match call.arguments.first() {
            None => list_reply(config),
            Some(Content::Utf(name)) => lookup_reply(name, config),
            Some(_) => exception_return("java.rmi.MarshalException"),
        };
    }
    exception_return("java.rmi.UnmarshalException")
}

fn list_reply(config: &MockRmiServerConfig) -> ReturnMessage {
    let names = config
        .bound_names
        .iter()
        .map(|name| Builder::utf(name))
        .collect();
    normal_return(vec![Builder::new_array(
        STRING_ARRAY_CLASS,
        STRING_ARRAY_SERIAL_VERSION_UID,
        STRING_ELEMENT_TYPE,
        names,
    )])
}

fn lookup_reply(name: &str, config: &MockRmiServerConfig) -> ReturnMessage {
    match config.bindings.get(name) {
        Some(descriptor) => normal_return(vec![remote_object_content(
            &descriptor.class_name,
            &descriptor.endpoint.host,
            descriptor.endpoint.port,
            descriptor.obj_id,
        )]),
        None => exception_return("java.rmi.NotBoundException"),
    }
}

fn new_client_reply(call: &CallMessage, config: &MockRmiServerConfig) -> ReturnMessage {
    let authenticated = match (call.arguments.first(), &config.required_credentials) {
        (Some(Content::Null), None) => true,
        (Some(Content::Array(arr)), Some((username, password))) => matches!(
            arr.elements.as_slice(),
            [Content::Utf(u), Content::Utf(p)] if u == username && p == password
        ),
        _ => false,
    };
    if !authenticated {
        return exception_return("java.lang.SecurityException");
    }
    let descriptor = config.jmx_connection.clone().unwrap_or_else(|| {
        RemoteObjectDescriptor {
            class_name: "javax.management.remote.rmi.RMIConnectionImpl_Stub".to_string(),
            endpoint: crate::Endpoint {
                host: "127.0.0.1".to_string(),
                port: 1099,
            },
            obj_id: ObjId::new(2, 0x1234, 0x5678, 1),
        }
    });
    normal_return(vec![remote_object_content(
        &descriptor.class_name,
        &descriptor.endpoint.host,
        descriptor.endpoint.port,
        descriptor.obj_id,
    )])
}

fn normal_return(value: Vec<Content>) -> ReturnMessage {
    ReturnMessage {
        code: RETURN_NORMAL,
        uid: reply_uid(),
        value,
    }
}

fn exception_return(class_name: &str) -> ReturnMessage {
    ReturnMessage {
        code: RETURN_EXCEPTION,
        uid: reply_uid(),
        value: vec![exception_content(class_name)],
    }
}

// A fixed, nonzero UID so tests can observe that the engine round-trips it
// without interpreting it.
fn reply_uid() -> Uid {
    Uid {
        number: 0x0BAD,
        time: 0x1122334455,
        count: 9,
    }
}

/// The block-data payload `RemoteObject.writeObject` produces for a plain
/// `UnicastRef`: ref type UTF, host UTF, port, ObjID, local-ref boolean.
pub fn unicast_ref_block(host: &str, port: u16, obj_id: ObjId) -> Vec<u8> {
    let mut block = Vec::new();
    let utf = |out: &mut Vec<u8>, s: &str| {
        out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        out.extend_from_slice(s.as_bytes());
    };
    utf(&mut block, "UnicastRef");
    utf(&mut block, host);
    block.extend_from_slice(&u32::from(port).to_be_bytes());
    obj_id.write(&mut block);
    block.push(0x00);
    block
}

/// A serialized remote object the way a registry reply carries one: an
/// instance whose write-method annotation holds the `UnicastRef` endpoint.
pub fn remote_object_content(class_name: &str, host: &str, port: u16, obj_id: ObjId) -> Content {
    Content::Object(ObjectValue {
        class: ClassDesc {
            class_name: class_name.to_string(),
            serial_version_uid: -3215090123894869218,
            flags: SC_SERIALIZABLE | SC_WRITE_METHOD,
            fields: vec![],
            super_class: None,
        },
        class_data: vec![ClassData {
            class_name: class_name.to_string(),
            fields: vec![],
            annotation: vec![Content::BlockData(unicast_ref_block(host, port, obj_id))],
        }],
    })
}

/// A minimal serialized throwable: just the class descriptor, which is all
/// the parsers read.
pub fn exception_content(class_name: &str) -> Content {
    Content::Object(ObjectValue {
        class: ClassDesc {
            class_name: class_name.to_string(),
            serial_version_uid: 0,
            flags: SC_SERIALIZABLE,
            fields: vec![],
            super_class: None,
        },
        class_data: vec![ClassData {
            class_name: class_name.to_string(),
            fields: vec![],
            annotation: vec![],
        }],
    })
}
