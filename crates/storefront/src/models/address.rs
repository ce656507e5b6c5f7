//! Delivery address types.

use serde::{Deserialize, Deserializer, Serialize};

use msgrocery_core::{AddressId, UserId};

/// A saved delivery address. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone_number: String,
    pub pincode: String,
    pub area: String,
    pub city: String,
    pub state: String,
}

/// A validated address ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub full_name: String,
    pub phone_number: String,
    pub pincode: String,
    pub area: String,
    pub city: String,
    pub state: String,
}

/// Address form as submitted by clients.
///
/// Phone numbers and postal codes are accepted as either strings or numbers
/// since form libraries send both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pincode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
}

impl AddressInput {
    /// Check that every field is present and non-blank.
    ///
    /// Returns `None` if any field is missing.
    #[must_use]
    pub fn validate(self) -> Option<NewAddress> {
        fn required(field: Option<String>) -> Option<String> {
            field
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Some(NewAddress {
            full_name: required(self.full_name)?,
            phone_number: required(self.phone_number)?,
            pincode: required(self.pincode)?,
            area: required(self.area)?,
            city: required(self.city)?,
            state: required(self.state)?,
        })
    }
}

impl NewAddress {
    /// Attach identity fields, producing a stored record.
    #[must_use]
    pub fn into_address(self, id: AddressId, user_id: UserId) -> Address {
        Address {
            id,
            user_id,
            full_name: self.full_name,
            phone_number: self.phone_number,
            pincode: self.pincode,
            area: self.area,
            city: self.city,
            state: self.state,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
