#![forbid(unsafe_code)]

//! JVM binary-format support for Jess: method-descriptor parsing (used to
//! translate target descriptors into source-level keep patterns) and a
//! minimal classfile reader (used to verify that the target method was
//! emitted with code).

mod classfile;
mod constant_pool;
mod descriptor;
mod error;
mod reader;

pub use crate::classfile::{ClassFile, MethodInfo};
pub use crate::descriptor::{
    parse_method_descriptor, JvmPrimitive, JvmType, MethodDescriptor,
};
pub use crate::error::{Error, Result};
