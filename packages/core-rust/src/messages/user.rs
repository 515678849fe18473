//! Guest directory payloads: search by surname and check-in updates.

use serde::{Deserialize, Serialize};

use super::Status;

/// A guest row as exposed to callers.
///
/// `id` is the identity; every other field may be rewritten by the store,
/// although the update operation only ever touches `covid_pass` and
/// `checkin`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub name: String,
    /// Guest category (e.g. "vip", "press").
    #[serde(default)]
    pub guest: String,
    #[serde(default)]
    pub covid_pass: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rank: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_mail: String,
    #[serde(default)]
    pub checkin: bool,
}

/// `GET /user/search?surname=...`
///
/// An empty surname is a valid request that yields an empty result set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchUserRequest {
    #[serde(default)]
    pub surname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchUserResponse {
    pub status: Status,
    #[serde(default)]
    pub data: Vec<UserRecord>,
}

impl SearchUserResponse {
    /// Successful response carrying the given records.
    #[must_use]
    pub fn found(data: Vec<UserRecord>) -> Self {
        Self {
            status: Status::ok(),
            data,
        }
    }
}

/// The two mutable guest fields accepted by an update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateData {
    #[serde(default)]
    pub covid_pass: String,
    #[serde(default)]
    pub checkin: bool,
}

/// `PUT /user` with body `{"id": 5, "data": {"covidPass": "X", "checkin": true}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    /// Signed so that a negative id decodes and is rejected by validation
    /// rather than by the decoder.
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UpdateData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateUserResponse {
    pub status: Status,
}

impl UpdateUserRequest {
    /// The record id, once it is known to be positive.
    #[must_use]
    pub fn record_id(&self) -> Option<u64> {
        u64::try_from(self.id).ok().filter(|id| *id > 0)
    }
}

impl UpdateUserResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: Status::ok(),
        }
    }
}
