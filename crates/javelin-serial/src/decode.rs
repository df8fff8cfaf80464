use crate::model::{ArrayValue, ClassData, ClassDesc, Content, FieldDesc, FieldValue, ObjectValue, Stream};
use crate::{
    Result, SerialError, BASE_WIRE_HANDLE, SC_BLOCK_DATA, SC_EXTERNALIZABLE, SC_SERIALIZABLE,
    SC_WRITE_METHOD, STREAM_MAGIC, STREAM_VERSION, TC_ARRAY, TC_BLOCKDATA, TC_BLOCKDATALONG,
    TC_CLASS, TC_CLASSDESC, TC_ENDBLOCKDATA, TC_NULL, TC_OBJECT, TC_PROXYCLASSDESC, TC_REFERENCE,
    TC_STRING,
};

/// Decode a full serialization stream (header plus contents).
///
/// A buffer that ends mid-element fails with [`SerialError::Truncated`],
/// which transports use as the "read more bytes" signal.
pub fn decode_stream(bytes: &[u8]) -> Result<Stream> {
    let mut d = Decoder::new(bytes);
    let magic = d.read_u16()?;
    if magic != STREAM_MAGIC {
        return Err(SerialError::InvalidMagic(magic));
    }
    let version = d.read_u16()?;
    if version != STREAM_VERSION {
        return Err(SerialError::InvalidVersion(version));
    }

    let mut contents = Vec::new();
    while d.remaining() > 0 {
        contents.push(d.read_content()?);
    }
    Ok(Stream { contents })
}

/// Previously decoded elements that `TC_REFERENCE` may point back at.
#[derive(Debug, Clone)]
enum Handle {
    Class(ClassDesc),
    String(String),
    // Objects and arrays get a handle slot too, but nothing in RMI registry
    // or JMX traffic back-references them, so the slot is only reserved.
    Opaque,
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    handles: Vec<Handle>,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            handles: Vec::new(),
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn require(&self, n: usize) -> Result<()> {
        let end = self.pos.checked_add(n).ok_or(SerialError::Truncated)?;
        if end > self.buf.len() {
            return Err(SerialError::Truncated);
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array::<2>()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array::<8>()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.require(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.require(len)?;
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_utf(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerialError::InvalidUtf8)
    }

    fn read_content(&mut self) -> Result<Content> {
        match self.read_annotation_content()? {
            Some(content) => Ok(content),
            None => Err(SerialError::UnknownTag(TC_ENDBLOCKDATA)),
        }
    }

    /// Read one content element, returning `None` on `TC_ENDBLOCKDATA`.
    fn read_annotation_content(&mut self) -> Result<Option<Content>> {
        let tag = self.read_u8()?;
        let content = match tag {
            TC_ENDBLOCKDATA => return Ok(None),
            TC_NULL => Content::Null,
            TC_STRING => {
                let s = self.read_utf()?;
                self.handles.push(Handle::String(s.clone()));
                Content::Utf(s)
            }
            TC_REFERENCE => {
                let handle = self.read_u32()?;
                let index = handle
                    .checked_sub(BASE_WIRE_HANDLE)
                    .map(|i| i as usize)
                    .filter(|i| *i < self.handles.len())
                    .ok_or(SerialError::BadReference(handle))?;
                match &self.handles[index] {
                    Handle::String(s) => Content::Utf(s.clone()),
                    Handle::Class(_) | Handle::Opaque => {
                        return Err(SerialError::Unsupported(
                            "back reference to a non-string element",
                        ))
                    }
                }
            }
            TC_BLOCKDATA => {
                let len = self.read_u8()? as usize;
                Content::BlockData(self.read_bytes(len)?.to_vec())
            }
            TC_BLOCKDATALONG => {
                let len = self.read_u32()? as usize;
                Content::BlockData(self.read_bytes(len)?.to_vec())
            }
            TC_ARRAY => Content::Array(self.read_array_value()?),
            TC_OBJECT => Content::Object(self.read_object()?),
            TC_CLASS => return Err(SerialError::Unsupported("class literal")),
            TC_CLASSDESC | TC_PROXYCLASSDESC => {
                return Err(SerialError::Unsupported(
                    "class descriptor in content position",
                ))
            }
            other => return Err(SerialError::UnknownTag(other)),
        };
        Ok(Some(content))
    }

    fn read_array_value(&mut self) -> Result<ArrayValue> {
        let class = self
            .read_class_desc()?
            .ok_or(SerialError::Unsupported("array without class descriptor"))?;
        self.handles.push(Handle::Opaque);

        let element_type = element_type_of(&class.class_name)?;
        let len = self.read_u32()? as usize;
        let mut elements = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            elements.push(self.read_content()?);
        }
        Ok(ArrayValue {
            class,
            element_type,
            elements,
        })
    }

    fn read_object(&mut self) -> Result<ObjectValue> {
        let class = self
            .read_class_desc()?
            .ok_or(SerialError::Unsupported("object without class descriptor"))?;
        self.handles.push(Handle::Opaque);

        // Instance data is written superclass-first.
        let chain: Vec<ClassDesc> = class.chain().into_iter().cloned().collect();
        let mut class_data = Vec::with_capacity(chain.len());
        for desc in &chain {
            class_data.push(self.read_class_data(desc)?);
        }
        Ok(ObjectValue { class, class_data })
    }

    fn read_class_data(&mut self, desc: &ClassDesc) -> Result<ClassData> {
        let mut fields = Vec::new();
        let mut annotation = Vec::new();

        if desc.flags & SC_EXTERNALIZABLE != 0 {
            if desc.flags & SC_BLOCK_DATA == 0 {
                // Pre-1.2 external contents have no framing at all.
                return Err(SerialError::Unsupported(
                    "externalizable without block data",
                ));
            }
            while let Some(content) = self.read_annotation_content()? {
                annotation.push(content);
            }
        } else if desc.flags & SC_SERIALIZABLE != 0 {
            for field in &desc.fields {
                fields.push((field.name.clone(), self.read_field_value(field)?));
            }
            if desc.flags & SC_WRITE_METHOD != 0 {
                while let Some(content) = self.read_annotation_content()? {
                    annotation.push(content);
                }
            }
        }

        Ok(ClassData {
            class_name: desc.class_name.clone(),
            fields,
            annotation,
        })
    }

    fn read_field_value(&mut self, field: &FieldDesc) -> Result<FieldValue> {
        let value = match field.type_code {
            b'B' => FieldValue::Byte(self.read_u8()? as i8),
            b'C' => FieldValue::Char(self.read_u16()?),
            b'D' => FieldValue::Double(f64::from_bits(u64::from_be_bytes(self.read_array()?))),
            b'F' => FieldValue::Float(f32::from_bits(u32::from_be_bytes(self.read_array()?))),
            b'I' => FieldValue::Int(self.read_u32()? as i32),
            b'J' => FieldValue::Long(self.read_i64()?),
            b'S' => FieldValue::Short(self.read_u16()? as i16),
            b'Z' => FieldValue::Boolean(self.read_u8()? != 0),
            b'L' | b'[' => FieldValue::Object(Box::new(self.read_content()?)),
            other => return Err(SerialError::UnknownTag(other)),
        };
        Ok(value)
    }

    fn read_class_desc(&mut self) -> Result<Option<ClassDesc>> {
        let tag = self.read_u8()?;
        match tag {
            TC_NULL => Ok(None),
            TC_REFERENCE => {
                let handle = self.read_u32()?;
                let index = handle
                    .checked_sub(BASE_WIRE_HANDLE)
                    .map(|i| i as usize)
                    .filter(|i| *i < self.handles.len())
                    .ok_or(SerialError::BadReference(handle))?;
                match &self.handles[index] {
                    Handle::Class(desc) => Ok(Some(desc.clone())),
                    _ => Err(SerialError::BadReference(handle)),
                }
            }
            TC_PROXYCLASSDESC => Err(SerialError::Unsupported("dynamic proxy class descriptor")),
            TC_CLASSDESC => {
                let class_name = self.read_utf()?;
                let serial_version_uid = self.read_i64()?;
                // The handle is assigned before the rest of the descriptor is
                // read; reserve the slot and patch it once complete.
                let slot = self.handles.len();
                self.handles.push(Handle::Opaque);

                let flags = self.read_u8()?;
                let field_count = self.read_u16()? as usize;
                let mut fields = Vec::with_capacity(field_count);
                for _ in 0..field_count {
                    let type_code = self.read_u8()?;
                    let name = self.read_utf()?;
                    let field_type = if matches!(type_code, b'L' | b'[') {
                        match self.read_content()? {
                            Content::Utf(s) => Some(s),
                            _ => {
                                return Err(SerialError::Unsupported(
                                    "non-string field type signature",
                                ))
                            }
                        }
                    } else {
                        None
                    };
                    fields.push(FieldDesc {
                        type_code,
                        name,
                        field_type,
                    });
                }

                // Class annotation (codebase URLs etc.) is consumed and dropped.
                while self.read_annotation_content()?.is_some() {}

                let super_class = self.read_class_desc()?.map(Box::new);
                let desc = ClassDesc {
                    class_name,
                    serial_version_uid,
                    flags,
                    fields,
                    super_class,
                };
                self.handles[slot] = Handle::Class(desc.clone());
                Ok(Some(desc))
            }
            other => Err(SerialError::UnknownTag(other)),
        }
    }
}

fn element_type_of(array_class: &str) -> Result<String> {
    let Some(signature) = array_class.strip_prefix('[') else {
        return Err(SerialError::Unsupported("array class without [ prefix"));
    };
    match signature.as_bytes().first() {
        Some(b'L') => Ok(signature[1..].trim_end_matches(';').to_string()),
        Some(b'[') => Ok(signature.to_string()),
        // Primitive arrays never appear in the replies Javelin parses.
        _ => Err(SerialError::Unsupported("primitive array contents")),
    }
}
