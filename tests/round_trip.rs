use pagelink::anchor::{generate_anchor, parse_anchors, strip_anchors};
use pagelink::layout::{BlockId, Coordinates};
use pagelink::persist::{
    RoundTripError, anchor_identities, load_buffer, save_buffer, verify_round_trip,
};
use proptest::prelude::*;

fn anchored_buffer(entries: &[(u64, Coordinates, String)]) -> String {
    let mut text = String::from("Front matter\n\n");
    for (ordinal, coords, body) in entries {
        text.push_str(&generate_anchor(&BlockId::conventional(*ordinal), *coords));
        text.push('\n');
        text.push_str(body);
        text.push_str("\n\n");
    }
    text
}

#[test]
fn test_saved_buffer_reloads_with_same_anchors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.md");
    let text = anchored_buffer(&[
        (1, Coordinates::new(100, 50, 400, 30), "# Title".to_string()),
        (2, Coordinates::new(100, 100, 400, 200), "Body ünïcode text".to_string()),
        (3, Coordinates::new(0, 0, 1, 1), "| a | b |".to_string()),
    ]);

    save_buffer(&path, &text).unwrap();
    let reloaded = load_buffer(&path).unwrap();

    assert_eq!(reloaded, text);
    assert_eq!(verify_round_trip(&text, &reloaded), Ok(3));
    assert_eq!(parse_anchors(&reloaded), parse_anchors(&text));
}

#[test]
fn test_overwriting_with_stripped_text_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.md");
    let text = anchored_buffer(&[(1, Coordinates::new(1, 2, 3, 4), "Body".to_string())]);

    save_buffer(&path, &strip_anchors(&text)).unwrap();
    let reloaded = load_buffer(&path).unwrap();

    assert_eq!(
        verify_round_trip(&text, &reloaded),
        Err(RoundTripError::CountMismatch {
            before: 1,
            after: 0
        })
    );
}

fn coords() -> impl Strategy<Value = Coordinates> {
    (0..5000u32, 0..5000u32, 0..2000u32, 0..2000u32)
        .prop_map(|(x, y, w, h)| Coordinates::new(x, y, w, h))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn save_reload_preserves_anchor_identity(
        entries in prop::collection::vec((0..0xfffu64, coords(), "[a-zA-Z #|ä-]{0,40}"), 0..12)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        let text = anchored_buffer(&entries);

        save_buffer(&path, &text).unwrap();
        let reloaded = load_buffer(&path).unwrap();

        prop_assert_eq!(anchor_identities(&reloaded), anchor_identities(&text));
        prop_assert_eq!(verify_round_trip(&text, &reloaded), Ok(entries.len()));
    }
}
