//! Identifier codec
//!
//! The protocol boundary carries identifiers as 24-character hex strings; the
//! engine works with [`ObjectId`]. All conversions between the two live here.

use crate::common::{Error, Result};
use crate::engine::ObjectId;
use serde_json::Value;

/// Length of the hex rendering of a native identifier.
pub const ENCODED_LEN: usize = ObjectId::LEN * 2;

/// Parse a boundary identifier. Accepts upper- and lower-case hex.
pub fn decode(id: &str) -> Result<ObjectId> {
    if id.len() != ENCODED_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "{:?} is {} characters long, expected {}",
            id,
            id.len(),
            ENCODED_LEN
        )));
    }

    let mut bytes = [0u8; ObjectId::LEN];
    hex::decode_to_slice(id, &mut bytes)
        .map_err(|e| Error::InvalidIdentifier(format!("{:?}: {}", id, e)))?;
    Ok(ObjectId::from_bytes(bytes))
}

/// Canonical lower-case rendering.
pub fn encode(id: &ObjectId) -> String {
    hex::encode(id.bytes())
}

/// Interpret the `inserted_id` reported by the engine after an insert.
pub fn from_inserted_id(value: &Value) -> Result<ObjectId> {
    serde_json::from_value::<ObjectId>(value.clone())
        .map_err(|e| Error::UnexpectedIdentifier(format!("{}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_is_lower_case() {
        let id = ObjectId::from_bytes([0xAB, 0xCD, 0xEF, 0, 1, 2, 3, 4, 5, 6, 7, 0xFF]);
        assert_eq!(encode(&id), "abcdef0001020304050607ff");
    }

    #[test]
    fn test_decode_case_insensitive() {
        let lower = decode("abcdef0001020304050607ff").unwrap();
        let upper = decode("ABCDEF0001020304050607FF").unwrap();
        let mixed = decode("AbCdEf0001020304050607fF").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
        assert_eq!(encode(&upper), "abcdef0001020304050607ff");
    }

    #[test]
    fn test_decode_generated() {
        let id = ObjectId::new();
        assert_eq!(decode(&encode(&id)).unwrap(), id);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let bad = [
            "",
            "abc",
            "abcdef0001020304050607f",   // 23
            "abcdef0001020304050607ff0", // 25
            "abcdef0001020304050607fg",  // non-hex
            "abcdef00010203040506 7ff",
            "éabcdef0001020304050607",   // multi-byte char
        ];
        for id in bad {
            assert!(
                matches!(decode(id), Err(Error::InvalidIdentifier(_))),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_from_inserted_id() {
        let id = ObjectId::from_bytes([1; 12]);
        let value = serde_json::to_value(id).unwrap();
        assert_eq!(from_inserted_id(&value).unwrap(), id);

        for unexpected in [json!("010101010101010101010101"), json!(42), json!({ "$oid": "01" }), json!(null)] {
            assert!(matches!(
                from_inserted_id(&unexpected),
                Err(Error::UnexpectedIdentifier(_))
            ));
        }
    }
}
