//! Property tests for the wire layer
//!
//! Run with: `cargo test -p protocol --test wire_properties`

use protocol::codec::{END, ESC};
use protocol::params::{PARAMETER_COUNT, UNKNOWN_VALUE};
use protocol::{FunctionalParameters, MAX_PAYLOAD_SIZE, decode_frame, encode_frame, envelope};
use proptest::prelude::*;

/// Payloads biased towards the bytes that need escaping
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    let byte = prop_oneof![
        2 => any::<u8>(),
        1 => Just(END),
        1 => Just(ESC),
    ];
    proptest::collection::vec(byte, 0..=MAX_PAYLOAD_SIZE)
}

/// Slot values mixing normal, unknown and out-of-range values
fn slot_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        3 => 0u16..=0xC800,
        1 => Just(UNKNOWN_VALUE),
        1 => 0xC801u16..=0xFFFF,
    ]
}

fn block_strategy() -> impl Strategy<Value = Option<FunctionalParameters>> {
    proptest::option::of(
        proptest::array::uniform4(slot_strategy()).prop_map(FunctionalParameters::from_values),
    )
}

proptest! {
    /// Any payload survives byte stuffing unchanged
    #[test]
    fn prop_frame_roundtrip(payload in payload_strategy()) {
        let framed = encode_frame(&payload);
        prop_assert_eq!(decode_frame(&framed).unwrap(), payload);
    }

    /// A stuffed frame never carries a delimiter inside its content
    #[test]
    fn prop_frame_content_has_no_delimiter(payload in payload_strategy()) {
        let framed = encode_frame(&payload);
        prop_assert!(!framed[1..framed.len() - 1].contains(&END));
    }

    /// The envelope keeps command and payload intact
    #[test]
    fn prop_envelope_roundtrip(command in any::<u16>(), payload in payload_strategy()) {
        let bytes = envelope::wrap(command, &payload).unwrap();
        let unwrapped = envelope::unwrap(&bytes).unwrap();
        prop_assert_eq!(unwrapped.command, command);
        prop_assert_eq!(unwrapped.payload, payload);
    }

    /// Merging with nothing leaves a block unchanged, from either side
    #[test]
    fn prop_merge_identity(block in block_strategy()) {
        prop_assert_eq!(FunctionalParameters::merge(block, None), block);
        prop_assert_eq!(FunctionalParameters::merge(None, block), block);
    }

    /// A merged slot is never unknown when either input knew it
    #[test]
    fn prop_merge_keeps_known_slots(
        base in block_strategy(),
        update in block_strategy(),
    ) {
        let Some(merged) = FunctionalParameters::merge(base, update) else {
            prop_assert!(base.is_none() && update.is_none());
            return Ok(());
        };
        for slot in 0..PARAMETER_COUNT {
            let expected = update
                .and_then(|b| b.get(slot))
                .or_else(|| base.and_then(|b| b.get(slot)));
            prop_assert_eq!(merged.get(slot), expected);
        }
    }

    /// Writing then reading back recovers exactly the normal slots
    #[test]
    fn prop_positional_roundtrip(values in proptest::array::uniform4(slot_strategy())) {
        let block = FunctionalParameters::from_values(values);
        let mut buffer = [0xF7, 0xFF, 0xF7, 0xFF, 0xF7, 0xFF, 0xF7, 0xFF];
        let mask = block.write_positional(&mut buffer, 0);
        prop_assert_eq!(mask.count_ones() as usize, block.normal_count());

        let read = FunctionalParameters::read_positional(&buffer, 0);
        if block.normal_count() == 0 {
            prop_assert_eq!(read, None);
        } else {
            prop_assert_eq!(read, Some(block));
        }
    }
}
