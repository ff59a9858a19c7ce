//! Lenient extraction of a JSON object from free-form model text.
//!
//! Models occasionally wrap their answer in prose or markdown fences even
//! when told not to. The contract: take the greedy span from the first `{`
//! to the last `}` and try to decode it; anything else is a parse failure.

use serde_json::Value;

pub fn extract_json_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}
