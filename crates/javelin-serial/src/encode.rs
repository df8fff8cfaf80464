use crate::model::{ArrayValue, ClassDesc, Content, FieldValue, ObjectValue};
use crate::{
    SC_BLOCK_DATA, SC_EXTERNALIZABLE, SC_WRITE_METHOD, STREAM_MAGIC, STREAM_VERSION, TC_ARRAY,
    TC_BLOCKDATA, TC_BLOCKDATALONG, TC_CLASSDESC, TC_ENDBLOCKDATA, TC_NULL, TC_OBJECT, TC_STRING,
};

/// Encode a stream header followed by the given contents.
///
/// The encoder always writes full class descriptors; it never emits
/// `TC_REFERENCE` back references. The messages Javelin produces mention each
/// class at most once, so the output stays conformant without a handle table.
pub fn encode_stream(contents: &[Content]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_u16(STREAM_MAGIC);
    w.write_u16(STREAM_VERSION);
    for content in contents {
        w.write_content(content);
    }
    w.into_vec()
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    // Java `writeUTF`: u16 byte length then the bytes. The identifiers and
    // names RMI traffic carries are ASCII, where modified UTF-8 and standard
    // UTF-8 agree.
    fn write_utf(&mut self, s: &str) {
        self.write_u16(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_content(&mut self, content: &Content) {
        match content {
            Content::Null => self.write_u8(TC_NULL),
            Content::Utf(s) => {
                self.write_u8(TC_STRING);
                self.write_utf(s);
            }
            Content::BlockData(bytes) => {
                if bytes.len() < 256 {
                    self.write_u8(TC_BLOCKDATA);
                    self.write_u8(bytes.len() as u8);
                } else {
                    self.write_u8(TC_BLOCKDATALONG);
                    self.write_u32(bytes.len() as u32);
                }
                self.write_bytes(bytes);
            }
            Content::Array(arr) => self.write_array(arr),
            Content::Object(obj) => self.write_object(obj),
        }
    }

    fn write_array(&mut self, arr: &ArrayValue) {
        self.write_u8(TC_ARRAY);
        self.write_class_desc(Some(&arr.class));
        self.write_u32(arr.elements.len() as u32);
        for element in &arr.elements {
            self.write_content(element);
        }
    }

    fn write_object(&mut self, obj: &ObjectValue) {
        self.write_u8(TC_OBJECT);
        self.write_class_desc(Some(&obj.class));
        for (desc, data) in obj.class.chain().into_iter().zip(&obj.class_data) {
            for (_, value) in &data.fields {
                self.write_field_value(value);
            }
            let has_annotation = desc.flags & SC_WRITE_METHOD != 0
                || (desc.flags & SC_EXTERNALIZABLE != 0 && desc.flags & SC_BLOCK_DATA != 0);
            if has_annotation {
                for content in &data.annotation {
                    self.write_content(content);
                }
                self.write_u8(TC_ENDBLOCKDATA);
            }
        }
    }

    fn write_field_value(&mut self, value: &FieldValue) {
        match value {
            FieldValue::Byte(v) => self.write_u8(*v as u8),
            FieldValue::Char(v) => self.write_u16(*v),
            FieldValue::Double(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Float(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Int(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::Long(v) => self.write_i64(*v),
            FieldValue::Short(v) => self.write_u16(*v as u16),
            FieldValue::Boolean(v) => self.write_u8(u8::from(*v)),
            FieldValue::Object(content) => self.write_content(content),
        }
    }

    fn write_class_desc(&mut self, desc: Option<&ClassDesc>) {
        let Some(desc) = desc else {
            self.write_u8(TC_NULL);
            return;
        };
        self.write_u8(TC_CLASSDESC);
        self.write_utf(&desc.class_name);
        self.write_i64(desc.serial_version_uid);
        self.write_u8(desc.flags);
        self.write_u16(desc.fields.len() as u16);
        for field in &desc.fields {
            self.write_u8(field.type_code);
            self.write_utf(&field.name);
            if let Some(field_type) = &field.field_type {
                self.write_u8(TC_STRING);
                self.write_utf(field_type);
            }
        }
        // Empty class annotation.
        self.write_u8(TC_ENDBLOCKDATA);
        self.write_class_desc(desc.super_class.as_deref());
    }
}
