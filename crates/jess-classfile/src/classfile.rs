use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::ByteCursor;

/// The slice of a classfile Jess needs for target verification: the class's
/// binary name and its methods with a has-code flag.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub this_class: String,
    pub methods: Vec<MethodInfo>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    /// Whether the method carries a `Code` attribute with non-empty
    /// bytecode.
    pub has_code: bool,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteCursor::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFEBABE {
            return Err(Error::InvalidMagic(magic));
        }
        // minor/major version.
        reader.skip(4)?;
        let cp = ConstantPool::parse(&mut reader)?;

        // access_flags.
        reader.skip(2)?;
        let this_class = cp.class_name(reader.read_u2()?)?.to_string();
        // super_class.
        reader.skip(2)?;

        let interfaces_count = reader.read_u2()? as usize;
        reader.skip(interfaces_count * 2)?;

        let fields_count = reader.read_u2()? as usize;
        for _ in 0..fields_count {
            skip_member(&mut reader)?;
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_method(&mut reader, &cp)?);
        }

        // Class attributes are irrelevant here; trailing bytes are not
        // validated.
        Ok(Self {
            this_class,
            methods,
        })
    }

    /// Finds a method by name and raw descriptor string.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }
}

fn skip_member(reader: &mut ByteCursor<'_>) -> Result<()> {
    // access_flags, name_index, descriptor_index.
    reader.skip(6)?;
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        reader.skip(2)?;
        let len = reader.read_u4()? as usize;
        reader.skip(len)?;
    }
    Ok(())
}

fn parse_method(reader: &mut ByteCursor<'_>, cp: &ConstantPool) -> Result<MethodInfo> {
    let access_flags = reader.read_u2()?;
    let name = cp.utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.utf8(reader.read_u2()?)?.to_string();

    let mut has_code = false;
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let attr_name = cp.utf8(reader.read_u2()?)?;
        let len = reader.read_u4()? as usize;
        if attr_name == "Code" {
            let mut code = ByteCursor::new(reader.take(len)?);
            // max_stack, max_locals.
            code.skip(4)?;
            let code_length = code.read_u4()?;
            has_code = code_length > 0;
        } else {
            reader.skip(len)?;
        }
    }

    Ok(MethodInfo {
        access_flags,
        name,
        descriptor,
        has_code,
    })
}
