use crate::model::{ArrayValue, ClassDesc, Content};
use crate::SC_SERIALIZABLE;

/// Convenience constructors for the handful of value shapes RMI calls carry.
pub struct Builder;

impl Builder {
    /// A null reference leaf.
    pub fn null() -> Content {
        Content::Null
    }

    /// A UTF string leaf.
    pub fn utf(s: &str) -> Content {
        Content::Utf(s.to_string())
    }

    /// A typed object array, e.g. `[Ljava.lang.String;` tagged with the
    /// class's serialVersionUID.
    pub fn new_array(
        name: &str,
        serial_version_uid: i64,
        element_type: &str,
        elements: Vec<Content>,
    ) -> Content {
        Content::Array(ArrayValue {
            class: ClassDesc {
                class_name: name.to_string(),
                serial_version_uid,
                flags: SC_SERIALIZABLE,
                fields: vec![],
                super_class: None,
            },
            element_type: element_type.to_string(),
            elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_carries_uid_and_element_type() {
        let content = Builder::new_array(
            "[Ljava.lang.String;",
            -5921575005990323385,
            "java.lang.String",
            vec![Builder::utf("alice"), Builder::utf("secret")],
        );
        let Content::Array(arr) = content else {
            panic!("expected an array");
        };
        assert_eq!(arr.class.class_name, "[Ljava.lang.String;");
        assert_eq!(arr.class.serial_version_uid, -5921575005990323385);
        assert_eq!(arr.element_type, "java.lang.String");
        assert_eq!(arr.elements.len(), 2);
    }
}
