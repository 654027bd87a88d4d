//! A minimal constant-pool reader: only `Utf8` and `Class` entries are
//! materialised; everything else is skipped with its correct width.

use crate::error::{Error, Result};
use crate::reader::ByteCursor;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

enum Entry {
    Utf8(String),
    Class { name_index: u16 },
    Unused,
}

pub struct ConstantPool {
    entries: Vec<Entry>,
}

impl ConstantPool {
    pub fn parse(reader: &mut ByteCursor<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        // Index 0 is unused by the format.
        entries.push(Entry::Unused);
        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                TAG_UTF8 => {
                    let len = reader.read_u2()? as usize;
                    let bytes = reader.take(len)?;
                    // Modified UTF-8 differs from UTF-8 only for embedded
                    // NULs and supplementary characters, neither of which
                    // occurs in the names Jess inspects; fall back lossily.
                    Entry::Utf8(String::from_utf8_lossy(bytes).into_owned())
                }
                TAG_CLASS => Entry::Class {
                    name_index: reader.read_u2()?,
                },
                TAG_INTEGER | TAG_FLOAT => {
                    reader.skip(4)?;
                    Entry::Unused
                }
                TAG_LONG | TAG_DOUBLE => {
                    reader.skip(8)?;
                    entries.push(Entry::Unused);
                    index += 1;
                    Entry::Unused
                }
                TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    reader.skip(2)?;
                    Entry::Unused
                }
                TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF | TAG_NAME_AND_TYPE
                | TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    reader.skip(4)?;
                    Entry::Unused
                }
                TAG_METHOD_HANDLE => {
                    reader.skip(3)?;
                    Entry::Unused
                }
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };
            entries.push(entry);
            index += 1;
        }
        Ok(Self { entries })
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.entries.get(index as usize) {
            Some(Entry::Utf8(text)) => Ok(text),
            _ => Err(Error::InvalidConstantPoolIndex(index)),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.entries.get(index as usize) {
            Some(Entry::Class { name_index }) => self.utf8(*name_index),
            _ => Err(Error::InvalidConstantPoolIndex(index)),
        }
    }
}
