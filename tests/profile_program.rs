//! Integration tests for the profile pipeline.
//!
//! Document → compile → encode → upload frame, with a decoder that reads the
//! program back the way the firmware walks it.

use macropad::profile::{compile, ProfileDocument};
use macropad_device::{encode, MacroProgram, MemoryTransport, BoxedTransport, DeviceSession};
use macropad_transport::protocol::{FULL_MACRO_SIZE, KEYCOUNT, MACRO_END, MAX_MACRO_SIZE};
use std::sync::Arc;

/// One key's slots as stored: (up, down), each indexed by slot number
type DecodedKey = ([u8; MAX_MACRO_SIZE], [u8; MAX_MACRO_SIZE]);

/// Read a program back into per-key slot arrays, key 0 first
fn decode(program: &MacroProgram) -> Vec<DecodedKey> {
    let mut keys = vec![([0; MAX_MACRO_SIZE], [0; MAX_MACRO_SIZE]); KEYCOUNT];
    for group in 0..KEYCOUNT {
        let key = KEYCOUNT - 1 - group;
        let base = group * FULL_MACRO_SIZE;
        for pos in 0..MAX_MACRO_SIZE {
            let slot = MAX_MACRO_SIZE - 1 - pos;
            keys[key].0[slot] = program[base + pos];
            keys[key].1[slot] = program[base + MAX_MACRO_SIZE + pos];
        }
    }
    keys
}

fn used(slots: &[u8; MAX_MACRO_SIZE]) -> Vec<u8> {
    slots.iter().copied().take_while(|&c| c != MACRO_END).collect()
}

// ── Compile then decode ──

#[test]
fn partial_profile_pads_with_macro_end() {
    let doc = ProfileDocument::from_json(
        r#"{"type":"symmetric","profile":[["CTRL","SHIFT","t"],["x"]]}"#,
    )
    .unwrap();
    let compiled = compile(&doc).unwrap();
    let keys = decode(&encode(&compiled.profile));

    // Key 0: ↓CTRL ↓SHIFT ↓t, released in reverse
    assert_eq!(used(&keys[0].1), vec![128, 129, b't']);
    assert_eq!(used(&keys[0].0), vec![b't', 129, 128]);
    assert_eq!(keys[0].1[3], MACRO_END);

    // Key 1: single tap
    assert_eq!(keys[1].1, [b'x', MACRO_END, MACRO_END, MACRO_END]);
    assert_eq!(keys[1].0, [b'x', MACRO_END, MACRO_END, MACRO_END]);

    // Keys 2-4 missing entirely
    for key in &keys[2..] {
        assert_eq!(key.0, [MACRO_END; MAX_MACRO_SIZE]);
        assert_eq!(key.1, [MACRO_END; MAX_MACRO_SIZE]);
    }
}

#[test]
fn complete_ctrl_a_occupies_tail_of_key_zero_group() {
    let doc = ProfileDocument::from_json(
        r#"{"type":"complete","profile":[{"down":["CTRL","a"],"up":["a","CTRL"]}]}"#,
    )
    .unwrap();
    let program = encode(&compile(&doc).unwrap().profile);

    // Last group belongs to key 0: up slots 3..0, then down slots 3..0
    assert_eq!(
        &program[32..],
        &[MACRO_END, MACRO_END, 128, b'a', MACRO_END, MACRO_END, b'a', 128]
    );
    assert!(program[..32].iter().all(|&b| b == MACRO_END));
}

#[test]
fn simple_profile_round_trips() {
    let doc =
        ProfileDocument::from_json(r#"{"type":"simple","profile":["1","2","3","4","5"]}"#).unwrap();
    let compiled = compile(&doc).unwrap();
    assert!(compiled.warnings.is_empty());

    let keys = decode(&encode(&compiled.profile));
    for (index, (up, down)) in keys.iter().enumerate() {
        let code = b'1' + index as u8;
        assert_eq!(used(down), vec![code]);
        assert_eq!(used(up), vec![code]);
    }
}

#[test]
fn rejected_profile_never_reaches_encoder() {
    let doc =
        ProfileDocument::from_json(r#"{"type":"symetric","profile":[["a","b","c","d","e"]]}"#)
            .unwrap();
    let err = compile(&doc).unwrap_err();
    assert!(err.to_string().contains("too long"));
}

// ── Upload ──

#[test]
fn upload_sends_prefixed_program() {
    let doc =
        ProfileDocument::from_json(r#"{"type":"simple","profile":["a","b"]}"#).unwrap();
    let compiled = compile(&doc).unwrap();

    let transport = Arc::new(MemoryTransport::new("mem0"));
    let session = DeviceSession::start(Arc::clone(&transport) as BoxedTransport, None);
    session.upload_program(&compiled.profile).unwrap();

    let written = transport.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0][0], b'p');
    assert_eq!(&written[0][1..], &encode(&compiled.profile)[..]);
}
