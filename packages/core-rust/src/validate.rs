//! Request validation run before any request reaches a service.

use crate::messages::{
    LivenessRequest, ReadinessRequest, SearchUserRequest, UpdateUserRequest, VersionRequest,
};

/// A request that failed its structural checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Structural request checks. Requests without constraints keep the default.
pub trait Validate {
    /// # Errors
    ///
    /// Returns the first violated constraint.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Validate for SearchUserRequest {}
impl Validate for LivenessRequest {}
impl Validate for ReadinessRequest {}
impl Validate for VersionRequest {}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.record_id().is_none() {
            return Err(ValidationError::new("id", "id must be positive"));
        }
        if self.data.is_none() {
            return Err(ValidationError::new("data", "data is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::messages::UpdateData;

    #[test]
    fn update_with_zero_id_is_rejected() {
        let req = UpdateUserRequest {
            id: 0,
            data: Some(UpdateData::default()),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.field, "id");
        assert_eq!(err.to_string(), "id: id must be positive");
    }

    #[test]
    fn update_with_negative_id_is_rejected() {
        let req = UpdateUserRequest {
            id: -5,
            data: Some(UpdateData::default()),
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "id: id must be positive");
    }

    #[test]
    fn update_without_data_is_rejected() {
        let req = UpdateUserRequest { id: 4, data: None };
        assert_eq!(req.validate().unwrap_err().field, "data");
    }

    #[test]
    fn well_formed_update_passes() {
        let req = UpdateUserRequest {
            id: 4,
            data: Some(UpdateData {
                covid_pass: "Y".to_string(),
                checkin: false,
            }),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_search_is_valid() {
        assert!(SearchUserRequest::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn any_positive_id_with_data_passes(
            id in 1i64..,
            covid_pass in "[A-Z]{0,3}",
            checkin in any::<bool>(),
        ) {
            let req = UpdateUserRequest {
                id,
                data: Some(UpdateData { covid_pass, checkin }),
            };
            prop_assert!(req.validate().is_ok());
        }
    }
}
