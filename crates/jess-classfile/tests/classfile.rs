use jess_classfile::ClassFile;

/// Hand-assembles a classfile with one method, optionally carrying a `Code`
/// attribute with a single `return` instruction.
fn synth_class(with_code: bool) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // minor
    out.extend_from_slice(&52u16.to_be_bytes()); // major

    // Constant pool: 1=Utf8 "p/Foo", 2=Class(1), 3=Utf8 "bar",
    // 4=Utf8 "()V", 5=Utf8 "Code".
    out.extend_from_slice(&6u16.to_be_bytes());
    for text in ["p/Foo"] {
        out.push(1);
        out.extend_from_slice(&(text.len() as u16).to_be_bytes());
        out.extend_from_slice(text.as_bytes());
    }
    out.push(7);
    out.extend_from_slice(&1u16.to_be_bytes());
    for text in ["bar", "()V", "Code"] {
        out.push(1);
        out.extend_from_slice(&(text.len() as u16).to_be_bytes());
        out.extend_from_slice(text.as_bytes());
    }

    out.extend_from_slice(&0x0021u16.to_be_bytes()); // access_flags
    out.extend_from_slice(&2u16.to_be_bytes()); // this_class
    out.extend_from_slice(&0u16.to_be_bytes()); // super_class
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    out.extend_from_slice(&0u16.to_be_bytes()); // fields

    out.extend_from_slice(&1u16.to_be_bytes()); // methods_count
    out.extend_from_slice(&0x0001u16.to_be_bytes()); // access_flags
    out.extend_from_slice(&3u16.to_be_bytes()); // name
    out.extend_from_slice(&4u16.to_be_bytes()); // descriptor
    if with_code {
        out.extend_from_slice(&1u16.to_be_bytes()); // attributes_count
        out.extend_from_slice(&5u16.to_be_bytes()); // "Code"
        let body: Vec<u8> = {
            let mut body = Vec::new();
            body.extend_from_slice(&1u16.to_be_bytes()); // max_stack
            body.extend_from_slice(&1u16.to_be_bytes()); // max_locals
            body.extend_from_slice(&1u32.to_be_bytes()); // code_length
            body.push(0xB1); // return
            body.extend_from_slice(&0u16.to_be_bytes()); // exception_table
            body.extend_from_slice(&0u16.to_be_bytes()); // attributes
            body
        };
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
    } else {
        out.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
    }

    out.extend_from_slice(&0u16.to_be_bytes()); // class attributes
    out
}

#[test]
fn reads_method_with_code() {
    let class = ClassFile::parse(&synth_class(true)).unwrap();
    assert_eq!(class.this_class, "p/Foo");
    let method = class.find_method("bar", "()V").expect("bar");
    assert!(method.has_code);
}

#[test]
fn abstract_method_has_no_code() {
    let class = ClassFile::parse(&synth_class(false)).unwrap();
    let method = class.find_method("bar", "()V").expect("bar");
    assert!(!method.has_code);
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = synth_class(true);
    bytes[0] = 0;
    assert!(ClassFile::parse(&bytes).is_err());
}
