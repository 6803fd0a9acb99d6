//! Typed decoding of credential values.
//!
//! A [`Credential`] carries its value as untyped JSON together with a
//! [`CredentialType`] discriminant. Decoding checks the discriminant first
//! and only then deserializes the value, so asking for the wrong shape is
//! always a [`DecodeError::TypeMismatch`] and never a half-filled struct.
//! Decoding is pure; nothing here touches the network.

use crate::credential::{Credential, CredentialType};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Why a typed decode failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeReason {
    /// The discriminant does not match the requested shape
    TypeMismatch,
    /// The discriminant matches but the value does not have the shape
    MalformedValue,
    /// The discriminant is not one this client can decode
    UnsupportedType,
}

/// Typed decoding errors.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Requested shape and discriminant disagree
    #[error("Credential {name} has type {actual}, expected {expected}")]
    TypeMismatch {
        /// Credential name
        name: String,
        /// Discriminant the accessor decodes
        expected: CredentialType,
        /// Discriminant carried by the credential
        actual: CredentialType,
    },

    /// Value is missing fields or has the wrong JSON type
    #[error("Credential {name} has a malformed {credential_type} value: {source}")]
    MalformedValue {
        /// Credential name
        name: String,
        /// Discriminant carried by the credential
        credential_type: CredentialType,
        /// Underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// Discriminant unknown to this client
    #[error("Credential {name} has unsupported type {credential_type}")]
    UnsupportedType {
        /// Credential name
        name: String,
        /// Discriminant carried by the credential
        credential_type: CredentialType,
    },
}

impl DecodeError {
    /// Failure category.
    #[must_use]
    pub const fn reason(&self) -> DecodeReason {
        match self {
            Self::TypeMismatch { .. } => DecodeReason::TypeMismatch,
            Self::MalformedValue { .. } => DecodeReason::MalformedValue,
            Self::UnsupportedType { .. } => DecodeReason::UnsupportedType,
        }
    }

    fn mismatch(credential: &Credential, expected: CredentialType) -> Self {
        Self::TypeMismatch {
            name: credential.name.clone(),
            expected,
            actual: credential.credential_type.clone(),
        }
    }

    fn malformed(credential: &Credential, source: serde_json::Error) -> Self {
        Self::MalformedValue {
            name: credential.name.clone(),
            credential_type: credential.credential_type.clone(),
            source,
        }
    }
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Value of a `user` credential.
#[derive(Debug, Deserialize)]
pub struct UserValue {
    /// User name, absent when only a password was generated
    #[serde(default)]
    pub username: Option<String>,
    /// Password
    #[serde(deserialize_with = "secret_string")]
    pub password: SecretString,
    /// SHA-512 crypt hash of the password
    pub password_hash: String,
}

/// Value of an `ssh` credential.
#[derive(Debug, Deserialize)]
pub struct SshValue {
    /// OpenSSH public key
    pub public_key: String,
    /// PEM private key
    #[serde(deserialize_with = "secret_string")]
    pub private_key: SecretString,
    /// SHA-256 fingerprint of the public key
    pub public_key_fingerprint: String,
}

/// Value of an `rsa` credential.
#[derive(Debug, Deserialize)]
pub struct RsaValue {
    /// PEM public key
    pub public_key: String,
    /// PEM private key
    #[serde(deserialize_with = "secret_string")]
    pub private_key: SecretString,
}

/// Value of a `certificate` credential.
#[derive(Debug, Deserialize)]
pub struct CertificateValue {
    /// Issuing CA, possibly several concatenated PEM certificates
    #[serde(default)]
    pub ca: Option<String>,
    /// Name of the CA credential that signed this certificate
    #[serde(default)]
    pub ca_name: Option<String>,
    /// PEM certificate
    pub certificate: String,
    /// PEM private key
    #[serde(deserialize_with = "secret_string")]
    pub private_key: SecretString,
}

impl CertificateValue {
    /// Individual PEM certificates of the CA field, leaf-most first.
    #[must_use]
    pub fn ca_chain(&self) -> Vec<&str> {
        const END: &str = "-----END CERTIFICATE-----";

        let Some(mut rest) = self.ca.as_deref() else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        while let Some(idx) = rest.find(END) {
            let (block, tail) = rest.split_at(idx + END.len());
            let block = block.trim();
            if !block.is_empty() {
                chain.push(block);
            }
            rest = tail;
        }
        chain
    }
}

/// Decoded value, one variant per discriminant.
#[derive(Debug)]
pub enum CredentialValue {
    /// `value`
    Value(String),
    /// `password`
    Password(SecretString),
    /// `json`; numbers decode as JSON numbers, read them with `as_f64`
    Json(serde_json::Value),
    /// `user`
    User(UserValue),
    /// `ssh`
    Ssh(SshValue),
    /// `rsa`
    Rsa(RsaValue),
    /// `certificate`
    Certificate(CertificateValue),
}

impl CredentialValue {
    /// Discriminant of this value.
    #[must_use]
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Value(_) => CredentialType::Value,
            Self::Password(_) => CredentialType::Password,
            Self::Json(_) => CredentialType::Json,
            Self::User(_) => CredentialType::User,
            Self::Ssh(_) => CredentialType::Ssh,
            Self::Rsa(_) => CredentialType::Rsa,
            Self::Certificate(_) => CredentialType::Certificate,
        }
    }
}

/// A value shape tied to exactly one discriminant.
pub trait TypedValue: DeserializeOwned {
    /// Discriminant a credential must carry to decode as `Self`.
    const CREDENTIAL_TYPE: CredentialType;
}

impl TypedValue for UserValue {
    const CREDENTIAL_TYPE: CredentialType = CredentialType::User;
}

impl TypedValue for SshValue {
    const CREDENTIAL_TYPE: CredentialType = CredentialType::Ssh;
}

impl TypedValue for RsaValue {
    const CREDENTIAL_TYPE: CredentialType = CredentialType::Rsa;
}

impl TypedValue for CertificateValue {
    const CREDENTIAL_TYPE: CredentialType = CredentialType::Certificate;
}

impl TypedValue for serde_json::Value {
    const CREDENTIAL_TYPE: CredentialType = CredentialType::Json;
}

/// Decode a credential's value as `T`.
///
/// # Errors
///
/// [`DecodeError::TypeMismatch`] when the discriminant is not
/// `T::CREDENTIAL_TYPE`, [`DecodeError::MalformedValue`] when the value
/// lacks required fields.
pub fn decode_as<T: TypedValue>(credential: &Credential) -> Result<T, DecodeError> {
    expect_type(credential, T::CREDENTIAL_TYPE)?;
    T::deserialize(&credential.value).map_err(|e| DecodeError::malformed(credential, e))
}

fn expect_type(credential: &Credential, expected: CredentialType) -> Result<(), DecodeError> {
    if credential.credential_type == expected {
        Ok(())
    } else {
        Err(DecodeError::mismatch(credential, expected))
    }
}

fn decode_string(credential: &Credential) -> Result<String, DecodeError> {
    String::deserialize(&credential.value).map_err(|e| DecodeError::malformed(credential, e))
}

/// Decode a `user` credential.
///
/// # Errors
///
/// See [`decode_as`].
pub fn user_value(credential: &Credential) -> Result<UserValue, DecodeError> {
    decode_as(credential)
}

/// Decode an `ssh` credential.
///
/// # Errors
///
/// See [`decode_as`].
pub fn ssh_value(credential: &Credential) -> Result<SshValue, DecodeError> {
    decode_as(credential)
}

/// Decode an `rsa` credential.
///
/// # Errors
///
/// See [`decode_as`].
pub fn rsa_value(credential: &Credential) -> Result<RsaValue, DecodeError> {
    decode_as(credential)
}

/// Decode a `certificate` credential.
///
/// # Errors
///
/// See [`decode_as`].
pub fn certificate_value(credential: &Credential) -> Result<CertificateValue, DecodeError> {
    decode_as(credential)
}

/// Decode a `json` credential into a generic JSON tree.
///
/// # Errors
///
/// [`DecodeError::TypeMismatch`] for any other discriminant.
pub fn json_value(credential: &Credential) -> Result<serde_json::Value, DecodeError> {
    decode_as(credential)
}

/// Decode a `value` credential.
///
/// # Errors
///
/// [`DecodeError::TypeMismatch`] for any other discriminant,
/// [`DecodeError::MalformedValue`] when the value is not a JSON string.
pub fn string_value(credential: &Credential) -> Result<String, DecodeError> {
    expect_type(credential, CredentialType::Value)?;
    decode_string(credential)
}

/// Decode a `password` credential.
///
/// # Errors
///
/// [`DecodeError::TypeMismatch`] for any other discriminant,
/// [`DecodeError::MalformedValue`] when the value is not a JSON string.
pub fn password_value(credential: &Credential) -> Result<SecretString, DecodeError> {
    expect_type(credential, CredentialType::Password)?;
    decode_string(credential).map(SecretString::from)
}

impl Credential {
    /// Decode the value into the variant selected by the discriminant.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedValue`] when the value does not fit its
    /// discriminant, [`DecodeError::UnsupportedType`] for
    /// [`CredentialType::Other`].
    pub fn decode(&self) -> Result<CredentialValue, DecodeError> {
        match &self.credential_type {
            CredentialType::Value => decode_string(self).map(CredentialValue::Value),
            CredentialType::Password => {
                decode_string(self).map(|s| CredentialValue::Password(SecretString::from(s)))
            }
            CredentialType::Json => Ok(CredentialValue::Json(self.value.clone())),
            CredentialType::User => decode_as(self).map(CredentialValue::User),
            CredentialType::Ssh => decode_as(self).map(CredentialValue::Ssh),
            CredentialType::Rsa => decode_as(self).map(CredentialValue::Rsa),
            CredentialType::Certificate => decode_as(self).map(CredentialValue::Certificate),
            CredentialType::Other(_) => Err(DecodeError::UnsupportedType {
                name: self.name.clone(),
                credential_type: self.credential_type.clone(),
            }),
        }
    }
}
