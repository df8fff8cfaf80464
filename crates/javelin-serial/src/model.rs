/// A decoded serialization stream: the header plus its top-level contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stream {
    pub contents: Vec<Content>,
}

/// One content element of a serialization stream.
///
/// This mirrors the grammar's `content` production, restricted to the
/// alternatives RMI traffic actually produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// `TC_NULL`.
    Null,
    /// `TC_STRING`: a UTF string object.
    Utf(String),
    /// `TC_BLOCKDATA` / `TC_BLOCKDATALONG`: raw bytes written through the
    /// stream's data output (this is where RMI puts call headers and
    /// `UnicastRef` endpoint data).
    BlockData(Vec<u8>),
    /// `TC_ARRAY`: an array of object elements.
    Array(ArrayValue),
    /// `TC_OBJECT`.
    Object(ObjectValue),
}

impl Content {
    /// The Java class name this element declares, if it declares one.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Content::Object(obj) => Some(&obj.class.class_name),
            Content::Array(arr) => Some(&arr.class.class_name),
            _ => None,
        }
    }
}

/// `TC_CLASSDESC`: the metadata a stream carries in place of a class file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDesc {
    pub class_name: String,
    pub serial_version_uid: i64,
    pub flags: u8,
    pub fields: Vec<FieldDesc>,
    pub super_class: Option<Box<ClassDesc>>,
}

impl ClassDesc {
    /// The descriptor chain ordered superclass-first, the order in which
    /// instance data appears on the wire.
    pub fn chain(&self) -> Vec<&ClassDesc> {
        let mut chain = Vec::new();
        let mut cur = Some(self);
        while let Some(desc) = cur {
            chain.push(desc);
            cur = desc.super_class.as_deref();
        }
        chain.reverse();
        chain
    }
}

/// One serializable field declared by a class descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    /// JVM type code (`B C D F I J S Z` for primitives, `L` object, `[` array).
    pub type_code: u8,
    pub name: String,
    /// Field type signature, present for object and array fields.
    pub field_type: Option<String>,
}

impl FieldDesc {
    pub fn is_primitive(&self) -> bool {
        !matches!(self.type_code, b'L' | b'[')
    }
}

/// `TC_OBJECT`: an instance plus its per-class wire data.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub class: ClassDesc,
    /// Instance data ordered superclass-first, matching [`ClassDesc::chain`].
    pub class_data: Vec<ClassData>,
}

/// The wire data one class in the descriptor chain contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassData {
    pub class_name: String,
    pub fields: Vec<(String, FieldValue)>,
    /// Object annotation written by a custom `writeObject` (classes flagged
    /// `SC_WRITE_METHOD`) or an externalizable `writeExternal`.
    pub annotation: Vec<Content>,
}

/// A field value: either a raw primitive or a nested content element.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    Object(Box<Content>),
}

/// `TC_ARRAY` with object elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub class: ClassDesc,
    /// Element type name, e.g. `java.lang.String` for `[Ljava.lang.String;`.
    pub element_type: String,
    pub elements: Vec<Content>,
}
