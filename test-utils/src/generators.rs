//! Proptest generators for credential envelopes.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Every discriminant the client knows how to decode.
pub const KNOWN_TYPES: [&str; 7] = ["value", "password", "json", "user", "ssh", "rsa", "certificate"];

/// Generate one of [`KNOWN_TYPES`].
pub fn credential_type_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KNOWN_TYPES.to_vec())
}

/// Generate hierarchical credential names.
pub fn credential_name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9-]{1,12}", 1..5)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Generate RFC 3339 timestamps between 2015 and 2030.
pub fn timestamp_strategy() -> impl Strategy<Value = String> {
    (1_420_070_400_i64..1_893_456_000).prop_map(|secs| {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    })
}

/// Generate secret material that never collides with field names.
pub fn secret_value_strategy() -> impl Strategy<Value = String> {
    "[A-Z0-9!@#%^&*]{12,48}"
}

fn json_document_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(any::<i32>(), 0..5).prop_map(|v| json!(v)),
        ("[a-z]{1,8}", "[a-z0-9 ]{0,16}").prop_map(|(k, v)| json!({ k: v })),
        any::<bool>().prop_map(|b| json!({"enabled": b, "replicas": 3})),
    ]
}

/// Generate a well-formed value for the given discriminant.
pub fn value_for(kind: &'static str) -> BoxedStrategy<Value> {
    match kind {
        "value" | "password" => secret_value_strategy().prop_map(Value::String).boxed(),
        "json" => json_document_strategy().boxed(),
        "user" => ("[a-z]{3,10}", secret_value_strategy())
            .prop_map(|(username, password)| {
                json!({"username": username, "password": password, "password_hash": "$6$salt$hash"})
            })
            .boxed(),
        "ssh" => secret_value_strategy()
            .prop_map(|key| {
                json!({
                    "public_key": "ssh-rsa AAAAB3NzaC1yc2E",
                    "private_key": key,
                    "public_key_fingerprint": "EvI0/GIUgDjcoCzUQM0EJVZyyaH9Y2Ur2iQX6yPvKe8"
                })
            })
            .boxed(),
        "rsa" => secret_value_strategy()
            .prop_map(|key| json!({"public_key": "-----BEGIN PUBLIC KEY-----", "private_key": key}))
            .boxed(),
        "certificate" => secret_value_strategy()
            .prop_map(|key| {
                json!({
                    "ca": null,
                    "certificate": "-----BEGIN CERTIFICATE-----",
                    "private_key": key
                })
            })
            .boxed(),
        other => Just(Value::String(other.to_string())).boxed(),
    }
}

/// Generate a complete wire envelope with a value matching its discriminant.
pub fn envelope_strategy() -> impl Strategy<Value = Value> {
    credential_type_strategy().prop_flat_map(|kind| {
        (
            "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
            credential_name_strategy(),
            value_for(kind),
            timestamp_strategy(),
        )
            .prop_map(move |(id, name, value, created)| {
                json!({
                    "id": id,
                    "name": name,
                    "type": kind,
                    "value": value,
                    "version_created_at": created
                })
            })
    })
}
