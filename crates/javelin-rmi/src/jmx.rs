//! JMX `RMIServer.newClient` over an open stream.
//!
//! `newClient` establishes a management session: the server vends an
//! `RMIConnection` remote object the caller can then address directly. The
//! target `RMIServer` object id comes from a registry lookup (conventionally
//! the `jmxrmi` binding).

use tokio::io::{AsyncRead, AsyncWrite};

use javelin_serial::{Builder, Content};

use crate::constants::{
    JMX_NEWCLIENT_METHOD_HASH, OPERATION_DISPATCH_BY_HASH, STRING_ARRAY_CLASS,
    STRING_ARRAY_SERIAL_VERSION_UID, STRING_ELEMENT_TYPE,
};
use crate::message::{CallMessage, ObjId};
use crate::parse::parse_remote_object_return;
use crate::transport::exchange;
use crate::{CallOutcome, RemoteObjectDescriptor, Result};

/// A JMX role and password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Build the `newClient` argument list: a `String[2]` of username and
/// password, or a single null reference for an unauthenticated
/// `newClient(null)`.
pub fn build_new_client_args(credentials: Option<&Credentials>) -> Vec<Content> {
    match credentials {
        Some(credentials) => vec![Builder::new_array(
            STRING_ARRAY_CLASS,
            STRING_ARRAY_SERIAL_VERSION_UID,
            STRING_ELEMENT_TYPE,
            vec![
                Builder::utf(&credentials.username),
                Builder::utf(&credentials.password),
            ],
        )],
        None => vec![Builder::null()],
    }
}

/// Build an `RMIServer.newClient` call against the given remote object.
pub fn build_new_client_call(obj_id: ObjId, credentials: Option<&Credentials>) -> CallMessage {
    CallMessage::new(
        obj_id,
        OPERATION_DISPATCH_BY_HASH,
        JMX_NEWCLIENT_METHOD_HASH,
        build_new_client_args(credentials),
    )
}

/// A client for one `RMIServer` remote object.
pub struct JmxServerClient<S> {
    stream: S,
    obj_id: ObjId,
}

impl<S> JmxServerClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `obj_id` is the identity of the `RMIServer` object, echoed verbatim
    /// from the registry lookup that resolved it.
    pub fn new(stream: S, obj_id: ObjId) -> Self {
        Self { stream, obj_id }
    }

    /// Establish a management session, returning the vended `RMIConnection`
    /// descriptor on success.
    pub async fn new_client(
        &mut self,
        credentials: Option<&Credentials>,
    ) -> Result<CallOutcome<RemoteObjectDescriptor>> {
        let call = build_new_client_call(self.obj_id, credentials);
        match exchange(&mut self.stream, &call).await? {
            Some(ret) => parse_remote_object_return(&ret),
            None => Ok(CallOutcome::NoResponse),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRmiServer, MockRmiServerConfig};
    use pretty_assertions::assert_eq;
    use tokio::net::TcpStream;

    fn credentials() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn credential_args_are_one_tagged_string_array() {
        let args = build_new_client_args(Some(&credentials()));
        let [Content::Array(arr)] = args.as_slice() else {
            panic!("expected exactly one array argument, got {args:?}");
        };
        assert_eq!(arr.class.class_name, STRING_ARRAY_CLASS);
        assert_eq!(arr.class.serial_version_uid, STRING_ARRAY_SERIAL_VERSION_UID);
        assert_eq!(
            arr.elements,
            vec![Builder::utf("alice"), Builder::utf("secret")]
        );
    }

    #[test]
    fn missing_credentials_are_one_null_argument() {
        assert_eq!(build_new_client_args(None), vec![Content::Null]);
    }

    #[test]
    fn new_client_call_uses_the_fixed_method_hash() {
        let call = build_new_client_call(ObjId::default(), None);
        assert_eq!(call.operation, OPERATION_DISPATCH_BY_HASH);
        assert_eq!(call.hash, JMX_NEWCLIENT_METHOD_HASH);
    }

    #[tokio::test]
    async fn new_client_with_valid_credentials_vends_a_connection() {
        let server = MockRmiServer::spawn(MockRmiServerConfig {
            required_credentials: Some(("alice".to_string(), "secret".to_string())),
            ..Default::default()
        })
        .await
        .unwrap();
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut client = JmxServerClient::new(stream, ObjId::new(1, 2, 3, 4));
        let outcome = client.new_client(Some(&credentials())).await.unwrap();
        let descriptor = outcome.ok().expect("expected a connection descriptor");
        assert_eq!(
            descriptor.class_name,
            "javax.management.remote.rmi.RMIConnectionImpl_Stub"
        );
    }

    #[tokio::test]
    async fn new_client_with_bad_credentials_is_a_security_exception() {
        let server = MockRmiServer::spawn(MockRmiServerConfig {
            required_credentials: Some(("alice".to_string(), "secret".to_string())),
            ..Default::default()
        })
        .await
        .unwrap();
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut client = JmxServerClient::new(stream, ObjId::default());
        let outcome = client.new_client(None).await.unwrap();
        assert_eq!(outcome.remote_class(), Some("java.lang.SecurityException"));
    }

    #[tokio::test]
    async fn lookup_then_new_client_round_trip() {
        use crate::registry::RegistryClient;
        use crate::{Endpoint, RemoteObjectDescriptor};

        let binding = RemoteObjectDescriptor {
            class_name: "javax.management.remote.rmi.RMIServerImpl_Stub".to_string(),
            endpoint: Endpoint {
                host: "127.0.0.1".to_string(),
                port: 9010,
            },
            obj_id: ObjId::new(3, -7, 0x11223344, 2),
        };
        let server = MockRmiServer::spawn(MockRmiServerConfig {
            bindings: [("jmxrmi".to_string(), binding.clone())].into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut registry = RegistryClient::new(stream);
        let resolved = registry.lookup("jmxrmi").await.unwrap().ok().unwrap();
        // The identity triple is carried forward verbatim.
        assert_eq!(resolved.obj_id, binding.obj_id);

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut jmx = JmxServerClient::new(stream, resolved.obj_id);
        assert!(jmx.new_client(None).await.unwrap().ok().is_some());
    }

    #[tokio::test]
    async fn unauthenticated_new_client_works_when_allowed() {
        let server = MockRmiServer::spawn(MockRmiServerConfig::default())
            .await
            .unwrap();
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut client = JmxServerClient::new(stream, ObjId::default());
        let outcome = client.new_client(None).await.unwrap();
        assert!(outcome.ok().is_some());
    }
}
