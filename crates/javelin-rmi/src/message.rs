//! Call and return message framing.
//!
//! A call frame is the JRMP message byte `0x50` followed by a serialization
//! stream whose first element is a 34-byte block carrying the remote object
//! identity, the operation selector, and the method hash; the arguments
//! follow as ordinary stream contents. A return frame is `0x51` followed by
//! a stream whose first element is a 15-byte block carrying the
//! normal/exception discrimination code and the peer's UID echo, then the
//! returned value.

use javelin_serial::{decode_stream, encode_stream, Content, SerialError};

use crate::constants::{CALL_MESSAGE, RETURN_DATA, RETURN_EXCEPTION, RETURN_NORMAL};
use crate::{Result, RmiError};

/// The (number, time, count) unique identifier RMI stamps on remote object
/// instances and sessions. Opaque: once received it is echoed verbatim,
/// never interpreted or recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uid {
    pub number: i32,
    pub time: i64,
    pub count: i16,
}

impl Uid {
    pub const LEN: usize = 14;

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.number.to_be_bytes());
        out.extend_from_slice(&self.time.to_be_bytes());
        out.extend_from_slice(&self.count.to_be_bytes());
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Uid> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Uid {
            number: i32::from_be_bytes(bytes[0..4].try_into().ok()?),
            time: i64::from_be_bytes(bytes[4..12].try_into().ok()?),
            count: i16::from_be_bytes(bytes[12..14].try_into().ok()?),
        })
    }
}

/// A remote object identity: object number plus UID triple.
///
/// The all-zero default addresses well-known singletons such as the
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjId {
    pub object_number: i64,
    pub uid: Uid,
}

impl ObjId {
    pub const LEN: usize = 8 + Uid::LEN;

    pub fn new(object_number: i64, number: i32, time: i64, count: i16) -> Self {
        Self {
            object_number,
            uid: Uid {
                number,
                time,
                count,
            },
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.object_number.to_be_bytes());
        self.uid.write(out);
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<ObjId> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(ObjId {
            object_number: i64::from_be_bytes(bytes[0..8].try_into().ok()?),
            uid: Uid::from_bytes(&bytes[8..])?,
        })
    }
}

/// An outbound RMI call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMessage {
    pub obj_id: ObjId,
    pub operation: i32,
    pub hash: i64,
    pub arguments: Vec<Content>,
}

impl CallMessage {
    pub fn new(obj_id: ObjId, operation: i32, hash: i64, arguments: Vec<Content>) -> Self {
        Self {
            obj_id,
            operation,
            hash,
            arguments,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(ObjId::LEN + 12);
        self.obj_id.write(&mut header);
        header.extend_from_slice(&self.operation.to_be_bytes());
        header.extend_from_slice(&self.hash.to_be_bytes());

        let mut contents = Vec::with_capacity(1 + self.arguments.len());
        contents.push(Content::BlockData(header));
        contents.extend(self.arguments.iter().cloned());

        let mut out = vec![CALL_MESSAGE];
        out.extend(encode_stream(&contents));
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<CallMessage> {
        let (&first, rest) = bytes.split_first().ok_or(SerialError::Truncated)?;
        if first != CALL_MESSAGE {
            return Err(RmiError::Protocol(format!(
                "expected call message (0x{CALL_MESSAGE:02x}), got 0x{first:02x}"
            )));
        }
        let stream = decode_stream(rest)?;
        let mut contents = stream.contents.into_iter();
        let Some(Content::BlockData(header)) = contents.next() else {
            return Err(RmiError::Protocol(
                "call stream does not start with a header block".to_string(),
            ));
        };
        let too_short =
            || RmiError::Protocol(format!("call header block too short: {} bytes", header.len()));
        let obj_id = ObjId::from_bytes(&header).ok_or_else(too_short)?;
        let operation = header
            .get(ObjId::LEN..ObjId::LEN + 4)
            .and_then(|b| b.try_into().ok())
            .map(i32::from_be_bytes)
            .ok_or_else(too_short)?;
        let hash = header
            .get(ObjId::LEN + 4..ObjId::LEN + 12)
            .and_then(|b| b.try_into().ok())
            .map(i64::from_be_bytes)
            .ok_or_else(too_short)?;
        Ok(CallMessage {
            obj_id,
            operation,
            hash,
            arguments: contents.collect(),
        })
    }
}

/// A decoded RMI return.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMessage {
    /// `RETURN_NORMAL` or `RETURN_EXCEPTION`.
    pub code: u8,
    /// UID the peer stamped on the reply; opaque.
    pub uid: Uid,
    /// The returned value (or serialized exception) contents.
    pub value: Vec<Content>,
}

impl ReturnMessage {
    pub fn is_exception(&self) -> bool {
        self.code == RETURN_EXCEPTION
    }

    /// The declared class name of the returned value, if it has one.
    pub fn class_name(&self) -> Option<&str> {
        self.value.iter().find_map(Content::class_name)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(1 + Uid::LEN);
        header.push(self.code);
        self.uid.write(&mut header);

        let mut contents = Vec::with_capacity(1 + self.value.len());
        contents.push(Content::BlockData(header));
        contents.extend(self.value.iter().cloned());

        let mut out = vec![RETURN_DATA];
        out.extend(encode_stream(&contents));
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<ReturnMessage> {
        let (&first, rest) = bytes.split_first().ok_or(SerialError::Truncated)?;
        if first != RETURN_DATA {
            return Err(RmiError::Protocol(format!(
                "expected return data (0x{RETURN_DATA:02x}), got 0x{first:02x}"
            )));
        }
        let stream = decode_stream(rest)?;
        let mut contents = stream.contents.into_iter();
        let Some(Content::BlockData(header)) = contents.next() else {
            return Err(RmiError::Protocol(
                "return stream does not start with a header block".to_string(),
            ));
        };
        let (&code, uid_bytes) = header.split_first().ok_or_else(|| {
            RmiError::Protocol("empty return header block".to_string())
        })?;
        if code != RETURN_NORMAL && code != RETURN_EXCEPTION {
            return Err(RmiError::Protocol(format!(
                "unknown return code: 0x{code:02x}"
            )));
        }
        let uid = Uid::from_bytes(uid_bytes).ok_or_else(|| {
            RmiError::Protocol("return header block too short for a UID".to_string())
        })?;
        Ok(ReturnMessage {
            code,
            uid,
            value: contents.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::OPERATION_DISPATCH_BY_HASH;
    use crate::hash::registry_interface_hash;
    use javelin_serial::Builder;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_call_matches_golden_bytes() {
        let call = CallMessage::new(
            ObjId::default(),
            OPERATION_DISPATCH_BY_HASH,
            registry_interface_hash(),
            vec![Builder::utf("jmxrmi")],
        );
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            0x50,                                           // call
            0xAC, 0xED, 0x00, 0x05,                         // stream header
            0x77, 0x22,                                     // 34-byte block
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // object number
            0x00, 0x00, 0x00, 0x00,                         // uid number
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // uid time
            0x00, 0x00,                                     // uid count
            0xFF, 0xFF, 0xFF, 0xFF,                         // operation -1
            0x44, 0x15, 0x4D, 0xC9, 0xD4, 0xE6, 0x3B, 0xDF, // registry hash
            0x74, 0x00, 0x06, b'j', b'm', b'x', b'r', b'm', b'i',
        ];
        assert_eq!(call.encode(), expected);
    }

    #[test]
    fn call_decode_inverts_encode() {
        let call = CallMessage::new(
            ObjId::new(7, 1, 2, 3),
            OPERATION_DISPATCH_BY_HASH,
            -42,
            vec![Builder::utf("name"), Builder::null()],
        );
        assert_eq!(CallMessage::decode(&call.encode()).unwrap(), call);
    }

    #[test]
    fn return_decode_discriminates_codes() {
        let normal = ReturnMessage {
            code: RETURN_NORMAL,
            uid: Uid {
                number: 5,
                time: 6,
                count: 7,
            },
            value: vec![Builder::utf("ok")],
        };
        let decoded = ReturnMessage::decode(&normal.encode()).unwrap();
        assert!(!decoded.is_exception());
        assert_eq!(decoded, normal);

        let exception = ReturnMessage {
            code: RETURN_EXCEPTION,
            uid: Uid::default(),
            value: vec![],
        };
        assert!(ReturnMessage::decode(&exception.encode()).unwrap().is_exception());
    }

    #[test]
    fn return_decode_rejects_unknown_codes_and_frames() {
        let mut bad_frame = ReturnMessage {
            code: RETURN_NORMAL,
            uid: Uid::default(),
            value: vec![],
        }
        .encode();
        bad_frame[0] = 0x52;
        assert!(matches!(
            ReturnMessage::decode(&bad_frame),
            Err(RmiError::Protocol(_))
        ));

        let mut bad_code = ReturnMessage {
            code: RETURN_NORMAL,
            uid: Uid::default(),
            value: vec![],
        }
        .encode();
        // The code byte sits right after the frame byte, stream header, and
        // block tag/length.
        bad_code[7] = 0x09;
        assert!(matches!(
            ReturnMessage::decode(&bad_code),
            Err(RmiError::Protocol(_))
        ));
    }

    #[test]
    fn uid_round_trips_verbatim() {
        let uid = Uid {
            number: -1,
            time: i64::MAX,
            count: -2,
        };
        let mut buf = Vec::new();
        uid.write(&mut buf);
        assert_eq!(Uid::from_bytes(&buf), Some(uid));
    }
}
