#![no_main]

use kiln_codec::Buffer;
use kiln_serializable::{Config, Registry};
use libfuzzer_sys::fuzz_target;

fn fuzz(data: &[u8]) {
    let registry = Registry::with_builtins(Config {
        max_payload: 1 << 16,
        max_depth: 16,
    });
    let mut buf = Buffer::from_slice(data);

    // Scan the whole stream. Each attempt either consumes an envelope or fails without moving.
    while !buf.is_eof() {
        let before = buf.position();
        match registry.deserialize(&mut buf) {
            Ok(object) => {
                // Anything that was read back must survive another round trip.
                let mut out = Buffer::new();
                registry.serialize(&*object, &mut out).unwrap();
                let len = out.len();
                let again = registry.deserialize(&mut out).unwrap();
                assert_eq!(again.tag(), object.tag());

                // Entry order may differ, but the size may not.
                let mut out = Buffer::new();
                registry.serialize(&*again, &mut out).unwrap();
                assert_eq!(out.len(), len);
            }
            Err(_) if buf.position() == before => break,
            Err(_) => {}
        }
    }
}

fuzz_target!(|data: &[u8]| {
    fuzz(data);
});
