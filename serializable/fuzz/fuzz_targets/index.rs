#![no_main]

use arbitrary::Arbitrary;
use kiln_codec::Buffer;
use kiln_serializable::{Config, Index, Registry};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Value {
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    entries: Vec<(u32, Value)>,
}

fn fuzz(input: FuzzInput) {
    let registry = Registry::with_builtins(Config::default());
    let mut index = Index::new();
    let mut added = 0;
    for (key, value) in input.entries {
        let value: Box<dyn kiln_serializable::Serializable> = match value {
            Value::Text(text) => Box::new(text),
            Value::Bytes(bytes) => Box::new(Buffer::from(bytes)),
        };
        if index.add(key, value).is_ok() {
            added += 1;
        }
    }
    assert_eq!(index.len(), added);

    let mut out = Buffer::new();
    registry.serialize(&index, &mut out).unwrap();
    let decoded: Index = registry.deserialize_as(&mut out).unwrap();
    assert!(out.is_eof());
    assert_eq!(decoded.len(), index.len());
    for (key, value) in index.iter() {
        let other = decoded.get(key).unwrap();
        assert_eq!(other.tag(), value.tag());
        assert_eq!(other.display().to_string(), value.display().to_string());
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
