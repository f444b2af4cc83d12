use chainboard_gateway::{Address, GatewayResult, RawMessage};
use serde_json::Value;

/// Display record for one on-chain message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Position in the full message sequence.
    pub index: u64,
    /// Parsed sender, `None` when the tuple carried no valid address.
    pub sender: Option<Address>,
    /// Compact sender label for list rows.
    pub sender_label: String,
    /// Sender exactly as the gateway returned it, empty when missing.
    pub full_address: String,
    pub content: String,
    pub timestamp: u64,
    pub is_own: bool,
}

/// Projects raw reads for a window starting at `start` into display records.
///
/// Failed reads and tuples of the wrong shape degrade to empty fields rather
/// than failing the whole feed.
pub fn map_messages(
    start: u64,
    reads: &[GatewayResult<RawMessage>],
    viewer: Option<&Address>,
) -> Vec<FeedEntry> {
    reads
        .iter()
        .zip(start..)
        .map(|(read, index)| match read {
            Ok(raw) => decode_entry(index, raw, viewer),
            Err(error) => {
                tracing::debug!(index, error = %error, "message read failed; rendering empty row");
                degraded_entry(index)
            }
        })
        .collect()
}

fn decode_entry(index: u64, raw: &RawMessage, viewer: Option<&Address>) -> FeedEntry {
    let field = |position: usize| raw.as_array().and_then(|tuple| tuple.get(position));

    let full_address = field(0)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let content = field(1)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let timestamp = field(2).and_then(decode_timestamp).unwrap_or_default();

    if !raw.is_array() {
        tracing::debug!(index, raw = %raw, "message tuple is not an array; rendering empty row");
    }

    let sender = Address::parse(&full_address).ok();
    let is_own = match (viewer, &sender) {
        (Some(viewer), Some(sender)) => viewer == sender,
        _ => false,
    };

    FeedEntry {
        index,
        sender,
        sender_label: sender_label(&full_address),
        full_address,
        content,
        timestamp,
        is_own,
    }
}

fn degraded_entry(index: u64) -> FeedEntry {
    FeedEntry {
        index,
        sender: None,
        sender_label: String::new(),
        full_address: String::new(),
        content: String::new(),
        timestamp: 0,
        is_own: false,
    }
}

// Timestamps arrive as JSON numbers or, for uint256 decoders, decimal strings.
fn decode_timestamp(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Shortens `0x`-prefixed strings to `0x1234…abcd`; anything else is kept.
pub fn sender_label(raw: &str) -> String {
    if !raw.starts_with("0x") {
        return raw.to_string();
    }
    let chars = raw.chars().collect::<Vec<_>>();
    if chars.len() <= 10 {
        return raw.to_string();
    }
    let head = chars[..6].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use chainboard_gateway::GatewayError;
    use serde_json::json;

    use super::*;

    const ALICE: &str = "0xA1A1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1A1a1";

    #[test]
    fn well_formed_tuples_map_in_order() {
        let reads = vec![
            Ok(json!([ALICE, "first", 1_700_000_012u64])),
            Ok(json!([ALICE, "second", "1700000024"])),
        ];
        let entries = map_messages(7, &reads, None);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 7);
        assert_eq!(entries[0].content, "first");
        assert_eq!(entries[0].timestamp, 1_700_000_012);
        assert_eq!(entries[0].sender_label, "0xA1A1…A1a1");
        assert_eq!(entries[0].full_address, ALICE);
        assert_eq!(entries[1].index, 8);
        assert_eq!(entries[1].timestamp, 1_700_000_024);
    }

    #[test]
    fn ownership_ignores_address_case() {
        let viewer = Address::parse(&ALICE.to_lowercase()).unwrap();
        let reads = vec![
            Ok(json!([ALICE, "mine", 1])),
            Ok(json!(["0x00000000000000000000000000000000000000b0", "theirs", 2])),
        ];
        let entries = map_messages(0, &reads, Some(&viewer));

        assert!(entries[0].is_own);
        assert!(!entries[1].is_own);
        assert!(!map_messages(0, &reads, None)[0].is_own);
    }

    #[test]
    fn malformed_tuples_degrade_to_empty_fields() {
        let reads = vec![
            Ok(json!(null)),
            Ok(json!({ "sender": ALICE })),
            Ok(json!([42, ["nested"], "soon"])),
            Ok(json!([ALICE])),
            Err(GatewayError::Transport {
                stage: "test",
                message: "boom".to_string(),
            }),
        ];
        let entries = map_messages(0, &reads, None);

        assert_eq!(entries.len(), 5);
        for entry in &entries[..3] {
            assert_eq!(entry.full_address, "");
            assert_eq!(entry.content, "");
            assert_eq!(entry.timestamp, 0);
            assert_eq!(entry.sender, None);
        }
        assert_eq!(entries[3].full_address, ALICE);
        assert_eq!(entries[3].content, "");
        assert_eq!(entries[4], degraded_entry(4));
    }

    #[test]
    fn sender_label_keeps_non_hex_strings() {
        assert_eq!(sender_label(""), "");
        assert_eq!(sender_label("vitalik.eth"), "vitalik.eth");
        assert_eq!(sender_label("0x1234"), "0x1234");
    }
}
