//! Return-message parsers: remote-object descriptors and bound-name sets.

use javelin_serial::{Content, FieldValue};

use crate::message::{ObjId, ReturnMessage};
use crate::{CallOutcome, Endpoint, RemoteObjectDescriptor, Result, RmiError};

/// Interpret a reply that should carry a remote object (registry `lookup`,
/// JMX `newClient`).
///
/// Exception replies surface as [`CallOutcome::RemoteFailure`] with the
/// exception's class name, so callers can match well-known names such as
/// `java.rmi.NotBoundException` without the payload decoded. A normal reply
/// without a resolvable class name or endpoint is [`CallOutcome::NotFound`].
pub fn parse_remote_object_return(
    ret: &ReturnMessage,
) -> Result<CallOutcome<RemoteObjectDescriptor>> {
    if ret.is_exception() {
        return exception_outcome(ret);
    }

    let Some(class_name) = ret.class_name() else {
        return Ok(CallOutcome::NotFound);
    };
    let class_name = class_name.to_string();

    let mut blocks = Vec::new();
    collect_block_data(&ret.value, &mut blocks);
    for block in blocks {
        if let Some((endpoint, obj_id)) = parse_unicast_ref(block)? {
            return Ok(CallOutcome::Ok(RemoteObjectDescriptor {
                class_name,
                endpoint,
                obj_id,
            }));
        }
    }
    tracing::debug!(%class_name, "remote object reply carried no endpoint");
    Ok(CallOutcome::NotFound)
}

/// Interpret a reply that should carry a `String[]` (registry `list`),
/// preserving element order. A zero-length array is an empty set, not an
/// error.
pub fn parse_string_array_return(ret: &ReturnMessage) -> Result<CallOutcome<Vec<String>>> {
    if ret.is_exception() {
        return exception_outcome(ret);
    }

    let Some(arr) = ret.value.iter().find_map(|content| match content {
        Content::Array(arr) => Some(arr),
        _ => None,
    }) else {
        return Ok(CallOutcome::NotFound);
    };

    let mut names = Vec::with_capacity(arr.elements.len());
    for element in &arr.elements {
        match element {
            Content::Utf(s) => names.push(s.clone()),
            other => {
                return Err(RmiError::Protocol(format!(
                    "non-string element in name list: {other:?}"
                )))
            }
        }
    }
    Ok(CallOutcome::Ok(names))
}

fn exception_outcome<T>(ret: &ReturnMessage) -> Result<CallOutcome<T>> {
    match ret.class_name() {
        Some(class_name) => Ok(CallOutcome::RemoteFailure(class_name.to_string())),
        None => Err(RmiError::Protocol(
            "exception return without a class name".to_string(),
        )),
    }
}

/// Gather every block-data segment in the reply, including those nested in
/// object annotations and field values. `UnicastRef` endpoints live in the
/// write-method annotation of `java.rmi.server.RemoteObject`.
fn collect_block_data<'a>(contents: &'a [Content], out: &mut Vec<&'a [u8]>) {
    for content in contents {
        match content {
            Content::BlockData(bytes) => out.push(bytes),
            Content::Array(arr) => collect_block_data(&arr.elements, out),
            Content::Object(obj) => {
                for data in &obj.class_data {
                    for (_, value) in &data.fields {
                        if let FieldValue::Object(content) = value {
                            collect_block_data(std::slice::from_ref(content.as_ref()), out);
                        }
                    }
                    collect_block_data(&data.annotation, out);
                }
            }
            Content::Null | Content::Utf(_) => {}
        }
    }
}

/// Extract a `UnicastRef`/`UnicastRef2` endpoint from a block-data segment.
///
/// Layout (as written by `RemoteObject.writeObject`): ref type UTF, then for
/// `UnicastRef2` a format byte, then host UTF, port, the 22-byte ObjID, and
/// a trailing boolean. Returns `Ok(None)` when the block is not a unicast
/// ref at all.
fn parse_unicast_ref(bytes: &[u8]) -> Result<Option<(Endpoint, ObjId)>> {
    let mut cur = Cursor { bytes, pos: 0 };
    let Some(ref_type) = cur.read_utf() else {
        return Ok(None);
    };
    match ref_type.as_str() {
        "UnicastRef" => {}
        "UnicastRef2" => {
            let form = cur
                .read_u8()
                .ok_or_else(|| truncated_ref("missing format byte"))?;
            if form != 0x00 {
                return Err(RmiError::Protocol(format!(
                    "UnicastRef2 with custom socket factory (format 0x{form:02x}) is not supported"
                )));
            }
        }
        _ => return Ok(None),
    }

    let host = cur.read_utf().ok_or_else(|| truncated_ref("host"))?;
    let port = cur.read_u32().ok_or_else(|| truncated_ref("port"))?;
    let port = u16::try_from(port)
        .map_err(|_| RmiError::Protocol(format!("endpoint port out of range: {port}")))?;
    let obj_id = cur
        .take(ObjId::LEN)
        .and_then(ObjId::from_bytes)
        .ok_or_else(|| truncated_ref("object id"))?;
    // Trailing "local ref" boolean is present but carries no information.

    Ok(Some((Endpoint { host, port }, obj_id)))
}

fn truncated_ref(what: &str) -> RmiError {
    RmiError::Protocol(format!("truncated unicast ref: {what}"))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.bytes.len() {
            return None;
        }
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Some(out)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_utf(&mut self) -> Option<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        RETURN_EXCEPTION, RETURN_NORMAL, STRING_ARRAY_CLASS, STRING_ARRAY_SERIAL_VERSION_UID,
        STRING_ELEMENT_TYPE,
    };
    use crate::message::Uid;
    use crate::mock::{exception_content, remote_object_content};
    use javelin_serial::Builder;
    use pretty_assertions::assert_eq;

    fn normal(value: Vec<Content>) -> ReturnMessage {
        ReturnMessage {
            code: RETURN_NORMAL,
            uid: Uid::default(),
            value,
        }
    }

    fn exception(class_name: &str) -> ReturnMessage {
        ReturnMessage {
            code: RETURN_EXCEPTION,
            uid: Uid::default(),
            value: vec![exception_content(class_name)],
        }
    }

    #[test]
    fn lookup_reply_with_endpoint_is_found() {
        let obj_id = ObjId::new(1, 2, 3, 4);
        let ret = normal(vec![remote_object_content(
            "java.rmi.server.RemoteObject",
            "10.0.0.5",
            4444,
            obj_id,
        )]);
        let outcome = parse_remote_object_return(&ret).unwrap();
        assert_eq!(
            outcome,
            CallOutcome::Ok(RemoteObjectDescriptor {
                class_name: "java.rmi.server.RemoteObject".to_string(),
                endpoint: Endpoint {
                    host: "10.0.0.5".to_string(),
                    port: 4444,
                },
                obj_id,
            })
        );
    }

    #[test]
    fn not_bound_exception_carries_the_class_name() {
        let ret = exception("java.rmi.NotBoundException");
        let outcome = parse_remote_object_return(&ret).unwrap();
        assert_eq!(outcome.remote_class(), Some("java.rmi.NotBoundException"));
    }

    #[test]
    fn reply_without_class_name_is_not_found() {
        let ret = normal(vec![Content::Null]);
        assert_eq!(
            parse_remote_object_return(&ret).unwrap(),
            CallOutcome::NotFound
        );
    }

    #[test]
    fn empty_name_list_is_an_empty_set() {
        let ret = normal(vec![Builder::new_array(
            STRING_ARRAY_CLASS,
            STRING_ARRAY_SERIAL_VERSION_UID,
            STRING_ELEMENT_TYPE,
            vec![],
        )]);
        assert_eq!(
            parse_string_array_return(&ret).unwrap(),
            CallOutcome::Ok(vec![])
        );
    }

    #[test]
    fn populated_name_list_preserves_order() {
        let ret = normal(vec![Builder::new_array(
            STRING_ARRAY_CLASS,
            STRING_ARRAY_SERIAL_VERSION_UID,
            STRING_ELEMENT_TYPE,
            vec![Builder::utf("jmxrmi"), Builder::utf("rmi-registry")],
        )]);
        assert_eq!(
            parse_string_array_return(&ret).unwrap(),
            CallOutcome::Ok(vec!["jmxrmi".to_string(), "rmi-registry".to_string()])
        );
    }

    #[test]
    fn list_exception_is_a_remote_failure() {
        let ret = exception("java.rmi.AccessException");
        assert_eq!(
            parse_string_array_return(&ret).unwrap(),
            CallOutcome::RemoteFailure("java.rmi.AccessException".to_string())
        );
    }

    #[test]
    fn unicast_ref2_without_socket_factory_parses() {
        let mut block = Vec::new();
        let utf = |out: &mut Vec<u8>, s: &str| {
            out.extend_from_slice(&(s.len() as u16).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        };
        utf(&mut block, "UnicastRef2");
        block.push(0x00);
        utf(&mut block, "192.168.1.9");
        block.extend_from_slice(&9999u32.to_be_bytes());
        ObjId::new(5, 6, 7, 8).write(&mut block);
        block.push(0x00);

        let (endpoint, obj_id) = parse_unicast_ref(&block).unwrap().unwrap();
        assert_eq!(endpoint.host, "192.168.1.9");
        assert_eq!(endpoint.port, 9999);
        assert_eq!(obj_id, ObjId::new(5, 6, 7, 8));
    }

    #[test]
    fn non_ref_block_data_is_skipped() {
        assert_eq!(parse_unicast_ref(&[0x00, 0x02, 0xFF, 0xFE]).unwrap(), None);
        assert_eq!(parse_unicast_ref(&[]).unwrap(), None);
    }
}
