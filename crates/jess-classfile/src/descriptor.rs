//! JVM descriptor parsing and translation to source-level type names.
//!
//! A descriptor like `(I[Ljava/lang/String;)V` becomes the parameter list
//! `int, java.lang.String[]` the pre-slicer matches keep patterns against.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JvmPrimitive {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl JvmPrimitive {
    pub fn source_name(self) -> &'static str {
        match self {
            JvmPrimitive::Byte => "byte",
            JvmPrimitive::Char => "char",
            JvmPrimitive::Double => "double",
            JvmPrimitive::Float => "float",
            JvmPrimitive::Int => "int",
            JvmPrimitive::Long => "long",
            JvmPrimitive::Short => "short",
            JvmPrimitive::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmType {
    Primitive(JvmPrimitive),
    /// Internal binary name (`java/lang/String`).
    Object(String),
    Array(Box<JvmType>),
}

impl JvmType {
    /// The source-level spelling: dotted FQN, `[]` per array dimension.
    pub fn source_name(&self) -> String {
        match self {
            JvmType::Primitive(primitive) => primitive.source_name().to_string(),
            JvmType::Object(internal) => internal.replace('/', "."),
            JvmType::Array(component) => format!("{}[]", component.source_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<JvmType>,
    /// `None` encodes `void`.
    pub return_type: Option<JvmType>,
}

impl MethodDescriptor {
    /// Source-level parameter spellings, in order.
    pub fn param_source_names(&self) -> Vec<String> {
        self.params.iter().map(JvmType::source_name).collect()
    }
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let rest = desc
        .strip_prefix('(')
        .ok_or_else(|| Error::InvalidDescriptor(desc.to_string()))?;

    let mut cursor = rest;
    let mut params = Vec::new();
    loop {
        if let Some(after) = cursor.strip_prefix(')') {
            cursor = after;
            break;
        }
        if cursor.is_empty() {
            return Err(Error::InvalidDescriptor(desc.to_string()));
        }
        let (param, after) = parse_type(cursor, desc)?;
        params.push(param);
        cursor = after;
    }

    let (return_type, rest) = if let Some(after) = cursor.strip_prefix('V') {
        (None, after)
    } else {
        let (ty, after) = parse_type(cursor, desc)?;
        (Some(ty), after)
    };
    if !rest.is_empty() {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    }

    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

fn parse_type<'a>(input: &'a str, whole: &str) -> Result<(JvmType, &'a str)> {
    let first = input
        .bytes()
        .next()
        .ok_or_else(|| Error::InvalidDescriptor(whole.to_string()))?;
    let primitive = match first {
        b'B' => Some(JvmPrimitive::Byte),
        b'C' => Some(JvmPrimitive::Char),
        b'D' => Some(JvmPrimitive::Double),
        b'F' => Some(JvmPrimitive::Float),
        b'I' => Some(JvmPrimitive::Int),
        b'J' => Some(JvmPrimitive::Long),
        b'S' => Some(JvmPrimitive::Short),
        b'Z' => Some(JvmPrimitive::Boolean),
        _ => None,
    };
    if let Some(primitive) = primitive {
        return Ok((JvmType::Primitive(primitive), &input[1..]));
    }
    match first {
        b'L' => {
            let end = input
                .find(';')
                .ok_or_else(|| Error::InvalidDescriptor(whole.to_string()))?;
            let name = &input[1..end];
            if name.is_empty() {
                return Err(Error::InvalidDescriptor(whole.to_string()));
            }
            Ok((JvmType::Object(name.to_string()), &input[end + 1..]))
        }
        b'[' => {
            let (component, rest) = parse_type(&input[1..], whole)?;
            Ok((JvmType::Array(Box::new(component)), rest))
        }
        _ => Err(Error::InvalidDescriptor(whole.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_void() {
        let desc = parse_method_descriptor("()V").unwrap();
        assert!(desc.params.is_empty());
        assert!(desc.return_type.is_none());
    }

    #[test]
    fn object_and_array_params() {
        let desc = parse_method_descriptor("(Ljava/lang/String;[B)I").unwrap();
        assert_eq!(
            desc.param_source_names(),
            vec!["java.lang.String".to_string(), "byte[]".to_string()]
        );
        assert_eq!(
            desc.return_type,
            Some(JvmType::Primitive(JvmPrimitive::Int))
        );
    }

    #[test]
    fn nested_arrays() {
        let desc = parse_method_descriptor("(I[J)[[Ljava/util/Map;").unwrap();
        assert_eq!(
            desc.param_source_names(),
            vec!["int".to_string(), "long[]".to_string()]
        );
        assert_eq!(
            desc.return_type.unwrap().source_name(),
            "java.util.Map[][]"
        );
    }

    #[test]
    fn all_primitives() {
        let desc = parse_method_descriptor("(BCDFIJSZ)V").unwrap();
        assert_eq!(
            desc.param_source_names(),
            vec!["byte", "char", "double", "float", "int", "long", "short", "boolean"]
        );
    }

    #[test]
    fn malformed_descriptors() {
        for bad in ["", "()", "(V", "(Q)V", "(Ljava/lang/String)V", "()VX"] {
            assert!(parse_method_descriptor(bad).is_err(), "accepted {bad}");
        }
    }
}
