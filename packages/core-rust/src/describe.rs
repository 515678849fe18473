//! Opt-in diagnostic fields for requests and responses.
//!
//! The logging decorator appends [`Describe::log_fields`] to its access line,
//! and the error-reporting decorator attaches [`Describe::report_fields`] to
//! outgoing reports. Messages that expose nothing keep the empty defaults.

use crate::messages::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, SearchUserRequest,
    SearchUserResponse, UpdateUserRequest, UpdateUserResponse, VersionRequest, VersionResponse,
};

/// A named diagnostic value.
pub type Field = (&'static str, String);

pub trait Describe {
    /// Extra key/value pairs for the access log line.
    fn log_fields(&self) -> Vec<Field> {
        Vec::new()
    }

    /// Extra key/value pairs attached to error reports.
    fn report_fields(&self) -> Vec<Field> {
        Vec::new()
    }
}

impl Describe for SearchUserRequest {
    fn log_fields(&self) -> Vec<Field> {
        vec![("surname", self.surname.clone())]
    }

    fn report_fields(&self) -> Vec<Field> {
        self.log_fields()
    }
}

impl Describe for SearchUserResponse {
    fn log_fields(&self) -> Vec<Field> {
        vec![("found", self.data.len().to_string())]
    }
}

impl Describe for UpdateUserRequest {
    fn log_fields(&self) -> Vec<Field> {
        let mut fields = vec![("id", self.id.to_string())];
        if let Some(data) = &self.data {
            fields.push(("checkin", data.checkin.to_string()));
        }
        fields
    }

    // The pass value itself stays out of reports.
    fn report_fields(&self) -> Vec<Field> {
        let mut fields = self.log_fields();
        if let Some(data) = &self.data {
            fields.push(("has_covid_pass", (!data.covid_pass.is_empty()).to_string()));
        }
        fields
    }
}

impl Describe for UpdateUserResponse {}
impl Describe for LivenessRequest {}
impl Describe for LivenessResponse {}
impl Describe for ReadinessRequest {}
impl Describe for ReadinessResponse {}
impl Describe for VersionRequest {}
impl Describe for VersionResponse {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{UpdateData, UserRecord};

    #[test]
    fn search_request_exposes_surname() {
        let req = SearchUserRequest {
            surname: "smith".to_string(),
        };
        assert_eq!(req.log_fields(), vec![("surname", "smith".to_string())]);
    }

    #[test]
    fn search_response_exposes_count() {
        let resp = SearchUserResponse::found(vec![UserRecord::default(), UserRecord::default()]);
        assert_eq!(resp.log_fields(), vec![("found", "2".to_string())]);
        assert!(resp.report_fields().is_empty());
    }

    #[test]
    fn update_report_does_not_leak_pass_value() {
        let req = UpdateUserRequest {
            id: 5,
            data: Some(UpdateData {
                covid_pass: "SECRET".to_string(),
                checkin: true,
            }),
        };
        let report = req.report_fields();
        assert!(report.contains(&("has_covid_pass", "true".to_string())));
        assert!(report.iter().all(|(_, v)| v != "SECRET"));
    }

    #[test]
    fn probes_expose_nothing() {
        assert!(LivenessRequest {}.log_fields().is_empty());
        assert!(VersionResponse::default().report_fields().is_empty());
    }
}
