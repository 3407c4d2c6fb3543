//! The persisted form of a ledger.

use crate::{
    error::{LedgerError, Result},
    Block,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Counterparties keyed by party name, each list free of duplicates and in
/// first-seen order.
pub type PartyIndex = BTreeMap<String, Vec<String>>;

/// Snapshot of a ledger as written to and read from JSON.
///
/// Every top-level key is required. A block without `difficulty` takes the
/// entry at its position in `difficultyList`; other missing block fields
/// default to an empty string or zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(rename = "difficultyList")]
    pub difficulty_list: Vec<u32>,
    pub sender_map: PartyIndex,
    pub receiver_map: PartyIndex,
    #[serde(rename = "chainhash")]
    pub chain_hash: String,
    #[serde(rename = "blockchain")]
    pub blocks: Vec<Block>,
}

impl LedgerDocument {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| LedgerError::Load(e.to_string()))?;
        Self::from_json_value(value)
    }

    /// serde would happily read a struct out of a JSON array, so the object
    /// shape is checked first.
    pub fn from_json_value(mut value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(LedgerError::Load(
                "top-level value is not a JSON object".into(),
            ));
        }
        fill_block_difficulties(&mut value);
        serde_json::from_value(value).map_err(|e| LedgerError::Load(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn fill_block_difficulties(value: &mut Value) {
    let Some(Value::Array(listed)) = value.get("difficultyList").cloned() else {
        return;
    };
    let Some(Value::Array(blocks)) = value.get_mut("blockchain") else {
        return;
    };
    for (block, difficulty) in blocks.iter_mut().zip(listed) {
        if let Value::Object(fields) = block {
            fields.entry("difficulty").or_insert(difficulty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "difficultyList": [2, 1],
            "sender_map": { "alice": ["bob"] },
            "receiver_map": { "bob": ["alice"] },
            "chainhash": "ac8197d94ecf1afa88e4c22fe6127a92e798dbf90181fd2ca92206ca8fc4eea7",
            "blockchain": [
                { "previoushash": "", "sender": "", "recipient": "",
                  "data": "Leeroy Jenkins", "nonce": 0, "difficulty": 2 },
                { "previoushash": "ac81", "sender": "alice", "recipient": "bob",
                  "data": "hello", "nonce": 19, "difficulty": 1 }
            ]
        })
    }

    #[test]
    fn reads_persisted_layout() {
        let doc = LedgerDocument::from_json_value(sample()).unwrap();
        assert_eq!(doc.difficulty_list, vec![2, 1]);
        assert_eq!(doc.sender_map["alice"], vec!["bob".to_string()]);
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[1].previous_hash, "ac81");
        assert_eq!(doc.blocks[1].nonce, 19);
    }

    #[test]
    fn writes_persisted_key_names() {
        let doc = LedgerDocument::from_json_value(sample()).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        for key in ["difficultyList", "sender_map", "receiver_map", "chainhash", "blockchain"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["blockchain"][1]["previoushash"], "ac81");
        assert_eq!(value["blockchain"][1]["nonce"], 19);
    }

    #[test]
    fn each_top_level_key_is_required() {
        for key in ["difficultyList", "sender_map", "receiver_map", "chainhash", "blockchain"] {
            let mut value = sample();
            value.as_object_mut().unwrap().remove(key);
            let err = LedgerDocument::from_json_value(value).unwrap_err();
            assert!(matches!(err, LedgerError::Load(_)), "accepted without {key}");
        }
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(
            LedgerDocument::from_json_str("[[2], {}, {}, \"\", []]"),
            Err(LedgerError::Load(_))
        ));
        assert!(matches!(
            LedgerDocument::from_json_str("not json"),
            Err(LedgerError::Load(_))
        ));
    }

    #[test]
    fn missing_block_fields_default() {
        let mut value = sample();
        value["blockchain"][1] = json!({ "data": "bare" });
        let doc = LedgerDocument::from_json_value(value).unwrap();
        let block = &doc.blocks[1];
        assert_eq!(block.data, "bare");
        assert_eq!(block.previous_hash, "");
        assert_eq!(block.nonce, 0);
        assert_eq!(block.difficulty, 1);
    }

    #[test]
    fn block_difficulty_falls_back_to_list_entry() {
        let mut value = sample();
        value["blockchain"][0].as_object_mut().unwrap().remove("difficulty");
        value["blockchain"][1].as_object_mut().unwrap().remove("difficulty");
        value["blockchain"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "data": "unlisted" }));
        let doc = LedgerDocument::from_json_value(value).unwrap();
        let difficulties: Vec<u32> = doc.blocks.iter().map(|b| b.difficulty).collect();
        assert_eq!(difficulties, vec![2, 1, 0]);
    }

    #[test]
    fn block_difficulty_wins_over_list_entry() {
        let mut value = sample();
        value["blockchain"][1]["difficulty"] = json!(3);
        let doc = LedgerDocument::from_json_value(value).unwrap();
        assert_eq!(doc.blocks[1].difficulty, 3);
        assert_eq!(doc.difficulty_list, vec![2, 1]);
    }

    #[test]
    fn negative_nonce_is_rejected() {
        let mut value = sample();
        value["blockchain"][1]["nonce"] = json!(-1);
        assert!(LedgerDocument::from_json_value(value).is_err());
    }
}
