// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Every identifier that ends up inside a store key is validated at creation
//! time, so key construction never has to escape or reject anything.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HardValidationError;

/// Maximum length of a table name, record id or principal.
const MAX_IDENT_LEN: usize = 128;

fn validate_ident(
    field: &'static str,
    value: &str,
    allowed: impl Fn(char) -> bool,
    allowed_desc: &str,
) -> Result<(), HardValidationError> {
    if value.is_empty() {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: format!("{} cannot be empty", field),
        });
    }

    if value.len() > MAX_IDENT_LEN {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: format!(
                "{} too long: {} chars (max {})",
                field,
                value.len(),
                MAX_IDENT_LEN
            ),
        });
    }

    if !value.chars().all(allowed) {
        return Err(HardValidationError::InvalidFieldValue {
            field,
            value: value.to_string(),
            reason: format!("{} must contain only {}", field, allowed_desc),
        });
    }

    Ok(())
}

/// Unique proposal identifier (UUID v4), also the proposal's store key suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalId(Uuid);

impl ProposalId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier supplied by a caller.
    pub fn parse(value: &str) -> Result<Self, HardValidationError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|e| HardValidationError::InvalidFieldValue {
                field: "proposal_id",
                value: value.to_string(),
                reason: format!("not a valid UUID: {}", e),
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProposalId {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProposalId> for String {
    fn from(id: ProposalId) -> Self {
        id.0.to_string()
    }
}

/// Logical name of a table in the remote record API.
/// ASCII alphanumeric and underscores, max 128 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();
        validate_ident(
            "table",
            &name,
            |c| c.is_ascii_alphanumeric() || c == '_',
            "ASCII letters, digits and underscores",
        )?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

/// Identifier of a single record, typically a GUID without braces.
/// ASCII alphanumeric, hyphens and underscores, max 128 chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self, HardValidationError> {
        let id = id.into();
        validate_ident(
            "record_id",
            &id,
            |c| c.is_ascii_alphanumeric() || c == '-' || c == '_',
            "ASCII letters, digits, hyphens and underscores (no braces)",
        )?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Signed-in principal (e.g. a directory object id) used to key identity lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Result<Self, HardValidationError> {
        let id = id.into();
        validate_ident(
            "principal",
            &id,
            |c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'),
            "ASCII letters, digits and '-', '_', '.', '@'",
        )?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Principal {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_valid() {
        assert!(TableName::new("contact").is_ok());
        assert!(TableName::new("new_custom_entity").is_ok());
        assert!(TableName::new("Account2").is_ok());
    }

    #[test]
    fn test_table_name_invalid() {
        assert!(TableName::new("").is_err());
        assert!(TableName::new("a".repeat(129)).is_err());
        assert!(TableName::new("contact:1").is_err());
        assert!(TableName::new("con tact").is_err());
        assert!(TableName::new("contact*").is_err());
    }

    #[test]
    fn test_record_id_valid() {
        assert!(RecordId::new("abc-123").is_ok());
        assert!(RecordId::new("a1b2c3d4-e5f6-7890-abcd-ef1234567890").is_ok());
    }

    #[test]
    fn test_record_id_rejects_braces() {
        assert!(RecordId::new("{a1b2c3d4-e5f6-7890-abcd-ef1234567890}").is_err());
        assert!(RecordId::new("").is_err());
    }

    #[test]
    fn test_principal_valid() {
        assert!(Principal::new("U1").is_ok());
        assert!(Principal::new("jane.doe@example.com").is_ok());
        assert!(Principal::new("user:1").is_err());
    }

    #[test]
    fn test_proposal_id_parse() {
        let id = ProposalId::generate();
        let parsed = ProposalId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(ProposalId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_proposal_ids_unique() {
        assert_ne!(ProposalId::generate(), ProposalId::generate());
    }

    #[test]
    fn test_serde_rejects_invalid_table() {
        let result: Result<TableName, _> = serde_json::from_str("\"bad name\"");
        assert!(result.is_err());
    }
}
