//! Funded research projects

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{
    bounded_text, parse_choice, Entry, InvalidChoice, Record, RecordFields, RecordKind,
};

pub type Project = Entry<ProjectFields>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectRole {
    #[serde(rename = "PI")]
    PrincipalInvestigator,
    #[serde(rename = "Co-PI")]
    CoPrincipalInvestigator,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::PrincipalInvestigator => "PI",
            ProjectRole::CoPrincipalInvestigator => "Co-PI",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectRole {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(
            s,
            &[
                ("PI", ProjectRole::PrincipalInvestigator),
                ("Co-PI", ProjectRole::CoPrincipalInvestigator),
            ],
            &["PI", "Co-PI"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    #[validate(
        length(min = 1, message = "Please provide the project title"),
        custom(function = "bounded_text")
    )]
    pub title: String,

    #[validate(
        length(min = 1, message = "Please provide the funding agency"),
        custom(function = "bounded_text")
    )]
    pub funding_agency: String,

    pub role: ProjectRole,

    #[validate(
        length(min = 1, message = "Please provide the principal investigator name"),
        custom(function = "bounded_text")
    )]
    pub principal_investigator: String,

    #[validate(custom(function = "bounded_text"))]
    pub co_principal_investigator: Option<String>,

    #[serde(default, rename = "numberOfCoPIs")]
    pub number_of_co_pis: u32,

    pub grant_date: NaiveDate,

    #[validate(range(min = 0.0, message = "Grant amount cannot be negative"))]
    pub grant_amount: f64,

    #[validate(length(min = 1, message = "Please upload the sanction order"))]
    pub sanction_order_file_path: String,

    #[validate(range(min = 0.0, message = "Amount received cannot be negative"))]
    pub amount_received: Option<f64>,

    pub dd_file_path: Option<String>,

    pub date_received: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub funding_agency: Option<String>,
    pub role: Option<ProjectRole>,
    pub principal_investigator: Option<String>,
    pub co_principal_investigator: Option<String>,
    pub number_of_co_pis: Option<u32>,
    pub grant_date: Option<NaiveDate>,
    pub grant_amount: Option<f64>,
    pub sanction_order_file_path: Option<String>,
    pub amount_received: Option<f64>,
    pub dd_file_path: Option<String>,
    pub date_received: Option<NaiveDate>,
}

impl RecordFields for ProjectFields {
    type Patch = ProjectPatch;

    const KIND: RecordKind = RecordKind::Project;

    fn apply(&mut self, patch: ProjectPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(agency) = patch.funding_agency {
            self.funding_agency = agency;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(pi) = patch.principal_investigator {
            self.principal_investigator = pi;
        }
        if patch.co_principal_investigator.is_some() {
            self.co_principal_investigator = patch.co_principal_investigator;
        }
        if let Some(count) = patch.number_of_co_pis {
            self.number_of_co_pis = count;
        }
        if let Some(date) = patch.grant_date {
            self.grant_date = date;
        }
        if let Some(amount) = patch.grant_amount {
            self.grant_amount = amount;
        }
        if let Some(path) = patch.sanction_order_file_path {
            self.sanction_order_file_path = path;
        }
        if patch.amount_received.is_some() {
            self.amount_received = patch.amount_received;
        }
        if patch.dd_file_path.is_some() {
            self.dd_file_path = patch.dd_file_path;
        }
        if patch.date_received.is_some() {
            self.date_received = patch.date_received;
        }
    }

    fn file_paths(&self) -> Vec<&str> {
        let mut paths = vec![self.sanction_order_file_path.as_str()];
        if let Some(dd) = self.dd_file_path.as_deref() {
            paths.push(dd);
        }
        paths
    }

    fn into_record(entry: Entry<Self>) -> Record {
        Record::Project(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectFields {
        ProjectFields {
            title: "Solar Grid".into(),
            funding_agency: "DST".into(),
            role: ProjectRole::PrincipalInvestigator,
            principal_investigator: "Dr. Rao".into(),
            co_principal_investigator: None,
            number_of_co_pis: 0,
            grant_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            grant_amount: 250000.0,
            sanction_order_file_path: "/uploads/projects/3_1.pdf".into(),
            amount_received: None,
            dd_file_path: None,
            date_received: None,
        }
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("Co-PI".parse::<ProjectRole>().unwrap().as_str(), "Co-PI");
        assert_eq!(
            serde_json::to_value(ProjectRole::PrincipalInvestigator).unwrap(),
            "PI"
        );
        assert!("Lead".parse::<ProjectRole>().is_err());
    }

    #[test]
    fn test_negative_grant_is_rejected() {
        let mut fields = sample();
        fields.grant_amount = -1.0;
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_file_paths_include_optional_dd_copy() {
        let mut fields = sample();
        assert_eq!(fields.file_paths(), vec!["/uploads/projects/3_1.pdf"]);

        fields.apply(ProjectPatch {
            dd_file_path: Some("/uploads/projects/3_2.pdf".into()),
            amount_received: Some(100000.0),
            ..Default::default()
        });
        assert_eq!(fields.file_paths().len(), 2);
        assert_eq!(fields.amount_received, Some(100000.0));
        assert_eq!(fields.title, "Solar Grid");
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["numberOfCoPIs"], 0);
        assert_eq!(json["sanctionOrderFilePath"], "/uploads/projects/3_1.pdf");
        assert!(json["ddFilePath"].is_null());
    }
}
