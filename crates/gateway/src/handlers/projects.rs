//! Funded research project submissions

use incentive_common::{
    errors::{AppError, Result},
    records::{ProjectFields, ProjectPatch},
    store::{Collection, RecordStore},
};

use super::records::FormRecord;
use crate::upload::SubmissionForm;

/// Multipart field carrying the sanction order (required on create)
pub const SANCTION_ORDER: &str = "sanctionOrder";

/// Multipart field carrying the demand-draft copy
pub const DD_COPY: &str = "ddCopy";

impl FormRecord for ProjectFields {
    const FILE_FIELDS: &'static [&'static str] = &[SANCTION_ORDER, DD_COPY];

    fn collection(store: &RecordStore) -> &Collection<Self> {
        &store.projects
    }

    fn from_form(form: &SubmissionForm) -> Result<Self> {
        let sanction_order_file_path =
            form.file(SANCTION_ORDER).ok_or_else(|| AppError::Validation {
                message: "Please upload sanction order".to_string(),
                field: Some(SANCTION_ORDER.to_string()),
            })?;

        Ok(ProjectFields {
            title: form.text("title")?,
            funding_agency: form.text("fundingAgency")?,
            role: form.parse("role")?,
            principal_investigator: form.text("principalInvestigator")?,
            co_principal_investigator: form.optional_text("coPrincipalInvestigator"),
            number_of_co_pis: form.optional_parse("numberOfCoPIs")?.unwrap_or_default(),
            grant_date: form.date("grantDate")?,
            grant_amount: form.parse("grantAmount")?,
            sanction_order_file_path,
            amount_received: form.optional_parse("amountReceived")?,
            dd_file_path: form.file(DD_COPY),
            date_received: form.optional_date("dateReceived")?,
        })
    }

    fn patch_from_form(form: &SubmissionForm) -> Result<ProjectPatch> {
        Ok(ProjectPatch {
            title: form.optional_text("title"),
            funding_agency: form.optional_text("fundingAgency"),
            role: form.optional_parse("role")?,
            principal_investigator: form.optional_text("principalInvestigator"),
            co_principal_investigator: form.optional_text("coPrincipalInvestigator"),
            number_of_co_pis: form.optional_parse("numberOfCoPIs")?,
            grant_date: form.optional_date("grantDate")?,
            grant_amount: form.optional_parse("grantAmount")?,
            sanction_order_file_path: form.file(SANCTION_ORDER),
            amount_received: form.optional_parse("amountReceived")?,
            dd_file_path: form.file(DD_COPY),
            date_received: form.optional_date("dateReceived")?,
        })
    }
}
