#![no_main]

use arbitrary::Arbitrary;
use kiln_codec::{base64, Buffer};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum FuzzInput {
    RoundTrip(Vec<u8>),
    Streaming { data: Vec<u8>, splits: Vec<u8> },
    Decode { text: Vec<u8>, ignore_invalid: bool },
}

fn fuzz(input: FuzzInput) {
    match input {
        FuzzInput::RoundTrip(data) => {
            let mut encoded = Buffer::new();
            base64::encode(&data, &mut encoded);
            assert_eq!(encoded.len(), base64::encoded_len(data.len()));

            let mut decoded = Buffer::new();
            base64::decode(&mut encoded, &mut decoded, false)
                .expect("Failed to decode a successfully encoded input!");
            assert_eq!(decoded.as_slice(), &data[..]);
        }
        FuzzInput::Streaming { data, splits } => {
            let mut out = Buffer::new();
            let mut encoder = base64::Encoder::new();
            let mut rest = &data[..];
            for split in splits {
                let take = (split as usize).min(rest.len());
                encoder.update(&rest[..take], &mut out);
                rest = &rest[take..];
            }
            encoder.update(rest, &mut out);
            encoder.finish(&mut out);
            assert_eq!(out.as_slice(), base64::encode_to_string(&data).as_bytes());
        }
        FuzzInput::Decode {
            text,
            ignore_invalid,
        } => {
            // Arbitrary input must never panic, and a successful decode must re-encode to
            // something that decodes to the same bytes.
            if let Ok(decoded) = base64::decode_slice(&text, ignore_invalid) {
                let encoded = base64::encode_to_string(&decoded);
                let again = base64::decode_slice(encoded.as_bytes(), false)
                    .expect("Failed to decode a successfully encoded input!");
                assert_eq!(decoded, again);
            }
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
