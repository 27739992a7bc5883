#![no_main]

use arbitrary::Arbitrary;
use kiln_codec::{Buffer, Kind, TypedBuffer};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Value {
    U32(u32),
    U64(u64),
    Str(Option<String>),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    values: Vec<Value>,
    garbage: Vec<u8>,
}

fn fuzz(input: FuzzInput) {
    let mut typed = TypedBuffer::new();
    for value in &input.values {
        match value {
            Value::U32(v) => typed.write_u32(*v),
            Value::U64(v) => typed.write_u64(*v),
            Value::Str(v) => typed.write_str(v.as_deref()),
        }
    }

    for value in &input.values {
        match value {
            Value::U32(v) => {
                assert_eq!(typed.peek_kind().unwrap(), Kind::U32);
                assert_eq!(typed.read_u32().unwrap(), *v);
            }
            Value::U64(v) => {
                assert_eq!(typed.peek_kind().unwrap(), Kind::U64);
                assert_eq!(typed.read_u64().unwrap(), *v);
            }
            Value::Str(v) => {
                assert_eq!(typed.peek_kind().unwrap(), Kind::Str);
                let expected = v.as_deref().filter(|s| !s.is_empty());
                assert_eq!(typed.read_str().unwrap().as_deref(), expected);
            }
        }
    }
    assert!(typed.buffer().is_eof());

    // Reading garbage must fail cleanly and never move past a value it could not decode.
    let mut typed = TypedBuffer::wrap(Buffer::from_slice(&input.garbage));
    loop {
        let before = typed.buffer().position();
        let result = match typed.peek_kind() {
            Ok(Kind::U32) => typed.read_u32().map(|_| ()),
            Ok(Kind::U64) => typed.read_u64().map(|_| ()),
            Ok(Kind::Str) => typed.read_str().map(|_| ()),
            Err(_) => break,
        };
        if result.is_err() {
            assert_eq!(typed.buffer().position(), before);
            break;
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
