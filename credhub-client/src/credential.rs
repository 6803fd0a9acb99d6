//! Credential envelopes as returned by the CredHub data API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type discriminant carried by every credential.
///
/// Serialised as the lowercase string CredHub uses; discriminants this
/// client does not know are kept verbatim in [`CredentialType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredentialType {
    /// Arbitrary string
    Value,
    /// Generated or set password string
    Password,
    /// Arbitrary JSON document
    Json,
    /// Username, password and password hash
    User,
    /// SSH key pair with fingerprint
    Ssh,
    /// RSA key pair
    Rsa,
    /// Certificate, private key and optional CA
    Certificate,
    /// Any other discriminant
    Other(String),
}

impl CredentialType {
    /// Discriminant string as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value => "value",
            Self::Password => "password",
            Self::Json => "json",
            Self::User => "user",
            Self::Ssh => "ssh",
            Self::Rsa => "rsa",
            Self::Certificate => "certificate",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for CredentialType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "value" => Self::Value,
            "password" => Self::Password,
            "json" => Self::Json,
            "user" => Self::User,
            "ssh" => Self::Ssh,
            "rsa" => Self::Rsa,
            "certificate" => Self::Certificate,
            _ => Self::Other(value),
        }
    }
}

impl From<CredentialType> for String {
    fn from(value: CredentialType) -> Self {
        match value {
            CredentialType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version of a credential.
///
/// `value` is left untyped; see [`crate::value`] for typed access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Identifier of this version
    pub id: String,
    /// Path-like name shared by all versions
    pub name: String,
    /// Type discriminant
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// Raw value, shape depends on `credential_type`
    pub value: serde_json::Value,
    /// When this version was created
    pub version_created_at: DateTime<Utc>,
}

/// Name-only entry returned by a path search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    /// Credential name
    pub name: String,
    /// Creation time of the newest version
    pub version_created_at: DateTime<Utc>,
}

/// `{"data": [...]}` wrapper used by name queries.
#[derive(Debug, Deserialize)]
pub(crate) struct DataResponse {
    #[serde(default)]
    pub data: Vec<Credential>,
}

/// `{"credentials": [...]}` wrapper used by path searches.
#[derive(Debug, Deserialize)]
pub(crate) struct FindResponse {
    #[serde(default)]
    pub credentials: Vec<CredentialSummary>,
}

/// `{"paths": [{"path": ...}]}` wrapper used by the path listing.
#[derive(Debug, Deserialize)]
pub(crate) struct PathsResponse {
    #[serde(default)]
    pub paths: Vec<PathEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PathEntry {
    pub path: String,
}

/// Order versions newest first. Stable, so equal timestamps keep server order.
pub(crate) fn sort_newest_first(credentials: &mut [Credential]) {
    credentials.sort_by(|a, b| b.version_created_at.cmp(&a.version_created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credential_type_round_trips_through_strings() {
        for name in ["value", "password", "json", "user", "ssh", "rsa", "certificate"] {
            let kind = CredentialType::from(name.to_string());
            assert!(!matches!(kind, CredentialType::Other(_)), "{name} should be known");
            assert_eq!(kind.as_str(), name);
        }

        let kind = CredentialType::from("opaque".to_string());
        assert_eq!(kind, CredentialType::Other("opaque".to_string()));
        assert_eq!(String::from(kind), "opaque");
    }

    #[test]
    fn test_deserialize_envelope() {
        let credential: Credential = serde_json::from_value(json!({
            "id": "2993f622-cb1e-4e00-a267-4b23c273bf3d",
            "name": "/concourse/common/sample-value",
            "type": "value",
            "value": "sample2",
            "version_created_at": "2017-01-05T01:01:01Z"
        }))
        .unwrap();

        assert_eq!(credential.credential_type, CredentialType::Value);
        assert_eq!(credential.value, json!("sample2"));
        assert_eq!(credential.version_created_at.to_rfc3339(), "2017-01-05T01:01:01+00:00");

        let back = serde_json::to_value(&credential).unwrap();
        assert_eq!(back["type"], "value");
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let make = |id: &str, at: &str| Credential {
            id: id.to_string(),
            name: "/a/b".to_string(),
            credential_type: CredentialType::Value,
            value: json!(id),
            version_created_at: at.parse().unwrap(),
        };

        let mut creds = vec![
            make("0", "2017-01-01T00:00:00Z"),
            make("2", "2017-01-03T00:00:00Z"),
            make("1a", "2017-01-02T00:00:00Z"),
            make("1b", "2017-01-02T00:00:00Z"),
        ];
        sort_newest_first(&mut creds);

        let ids: Vec<_> = creds.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["2", "1a", "1b", "0"]);
    }

    #[test]
    fn test_empty_wrappers_default() {
        let data: DataResponse = serde_json::from_str("{}").unwrap();
        assert!(data.data.is_empty());

        let found: FindResponse = serde_json::from_str(r#"{"credentials":[]}"#).unwrap();
        assert!(found.credentials.is_empty());
    }

    mod properties {
        use super::*;
        use chrono::DateTime;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_sorted_newest_first_and_truncation_is_a_prefix(
                stamps in prop::collection::vec(0_i64..4, 1..12),
                limit in 1_usize..12,
            ) {
                let mut creds: Vec<Credential> = stamps
                    .iter()
                    .enumerate()
                    .map(|(i, day)| Credential {
                        id: i.to_string(),
                        name: "/prop/versions".to_string(),
                        credential_type: CredentialType::Value,
                        value: json!(i),
                        version_created_at: DateTime::<Utc>::from_timestamp(day * 86_400, 0)
                            .unwrap_or_default(),
                    })
                    .collect();
                sort_newest_first(&mut creds);

                prop_assert!(creds.windows(2).all(|w| w[0].version_created_at >= w[1].version_created_at));
                for w in creds.windows(2) {
                    if w[0].version_created_at == w[1].version_created_at {
                        let (a, b): (usize, usize) = (w[0].id.parse().unwrap(), w[1].id.parse().unwrap());
                        prop_assert!(a < b, "equal timestamps reordered");
                    }
                }

                let all = creds.clone();
                creds.truncate(limit);
                prop_assert_eq!(creds.len(), limit.min(all.len()));
                prop_assert_eq!(&creds[..], &all[..creds.len()]);
            }
        }
    }
}
