// Business Registration Domain Model

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Surrogate identity assigned by the store
pub type RegistrationId = i64;

/// Business-facing sequential identifier
pub type ErpCode = i32;

/// First value handed out by the ERP code sequence
pub const ERP_CODE_MIN: ErpCode = 50001;

/// Last value the ERP code sequence may hand out
pub const ERP_CODE_MAX: ErpCode = 99999;

/// Registration status (job-queue state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::Pending,
        RegistrationStatus::Processing,
        RegistrationStatus::Completed,
        RegistrationStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Processing => "processing",
            RegistrationStatus::Completed => "completed",
            RegistrationStatus::Failed => "failed",
        }
    }

    /// Terminal states stamp `processed_at`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Completed | RegistrationStatus::Failed
        )
    }

    /// Forward-only workflow: pending -> processing -> {completed, failed}.
    ///
    /// Staying in the same state is allowed. A pending record may also be
    /// failed directly. The repository does not consult this table; callers do.
    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        match (self, next) {
            (from, to) if *from == to => true,
            (Pending, Processing) | (Pending, Failed) => true,
            (Processing, Completed) | (Processing, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "processing" => Ok(RegistrationStatus::Processing),
            "completed" => Ok(RegistrationStatus::Completed),
            "failed" => Ok(RegistrationStatus::Failed),
            other => Err(DomainError::InvalidEnum {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// ERP client classification code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientType {
    I,
    O,
    M,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::I => "I",
            ClientType::O => "O",
            ClientType::M => "M",
        }
    }
}

impl FromStr for ClientType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "I" => Ok(ClientType::I),
            "O" => Ok(ClientType::O),
            "M" => Ok(ClientType::M),
            other => Err(DomainError::InvalidEnum {
                field: "client_type",
                value: other.to_string(),
            }),
        }
    }
}

/// ERP outbound price grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceGrade {
    O,
    Z,
    N,
    E,
}

impl PriceGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceGrade::O => "O",
            PriceGrade::Z => "Z",
            PriceGrade::N => "N",
            PriceGrade::E => "E",
        }
    }
}

impl FromStr for PriceGrade {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "O" => Ok(PriceGrade::O),
            "Z" => Ok(PriceGrade::Z),
            "N" => Ok(PriceGrade::N),
            "E" => Ok(PriceGrade::E),
            other => Err(DomainError::InvalidEnum {
                field: "price_grade",
                value: other.to_string(),
            }),
        }
    }
}

/// Persisted business registration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    // Identity (store-assigned, immutable)
    pub id: RegistrationId,
    pub erp_code: ErpCode,

    // Mandatory
    pub client_name: String,
    pub business_name: String,

    pub representative_name: Option<String>,
    pub business_number: Option<String>,
    pub branch_number: Option<String>,

    // Address
    pub postal_code: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,

    // Industry
    pub business_type: Option<String>,
    pub business_item: Option<String>,

    // Contacts
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub fax: Option<String>,
    pub contact_person1: Option<String>,
    pub mobile1: Option<String>,
    pub contact_person2: Option<String>,
    pub mobile2: Option<String>,

    // ERP classification
    pub client_type: Option<ClientType>,
    pub price_grade: Option<PriceGrade>,
    pub initial_balance: i64,
    pub optimal_balance: i64,
    pub memo: Option<String>,

    // Extraction metadata
    pub confidence: Option<f64>,
    pub image_url: Option<String>,

    // Workflow
    pub status: RegistrationStatus,
    pub discord_user_id: Option<String>,
    pub discord_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Fields submitted for a new registration.
///
/// Enumerated codes arrive as raw strings so that an out-of-range value is
/// reported as a validation failure rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRegistration {
    /// Explicit ERP code; the sequence assigns one when absent.
    /// It must exceed every code assigned so far and the sequence
    /// continues after it.
    pub erp_code: Option<ErpCode>,

    pub client_name: String,
    pub business_name: String,

    pub representative_name: Option<String>,
    pub business_number: Option<String>,
    pub branch_number: Option<String>,
    pub postal_code: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub business_type: Option<String>,
    pub business_item: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub fax: Option<String>,
    pub contact_person1: Option<String>,
    pub mobile1: Option<String>,
    pub contact_person2: Option<String>,
    pub mobile2: Option<String>,

    pub client_type: Option<String>,
    pub price_grade: Option<String>,
    pub initial_balance: i64,
    pub optimal_balance: i64,
    pub memo: Option<String>,

    pub confidence: Option<f64>,
    pub image_url: Option<String>,

    pub discord_user_id: Option<String>,
    pub discord_message_id: Option<String>,
}

impl NewRegistration {
    pub fn new(client_name: impl Into<String>, business_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            business_name: business_name.into(),
            ..Default::default()
        }
    }

    pub fn with_business_number(mut self, business_number: impl Into<String>) -> Self {
        self.business_number = Some(business_number.into());
        self
    }

    /// Check every field constraint before anything is written
    pub fn validate(&self) -> Result<()> {
        require_non_empty("client_name", &self.client_name)?;
        require_non_empty("business_name", &self.business_name)?;

        if let Some(code) = self.erp_code {
            validate_erp_code(code)?;
        }
        validate_codes(self.client_type.as_deref(), self.price_grade.as_deref())?;
        if let Some(confidence) = self.confidence {
            validate_confidence(confidence)?;
        }
        Ok(())
    }

    /// Parsed client type (call after `validate`)
    pub fn client_type(&self) -> Result<Option<ClientType>> {
        self.client_type.as_deref().map(str::parse).transpose()
    }

    /// Parsed price grade (call after `validate`)
    pub fn price_grade(&self) -> Result<Option<PriceGrade>> {
        self.price_grade.as_deref().map(str::parse).transpose()
    }
}

/// Partial update of a registration's mutable attributes.
///
/// `None` leaves the stored value untouched. Identity, status and
/// timestamps are not reachable through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationPatch {
    pub client_name: Option<String>,
    pub business_name: Option<String>,
    pub representative_name: Option<String>,
    pub business_number: Option<String>,
    pub branch_number: Option<String>,
    pub postal_code: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub business_type: Option<String>,
    pub business_item: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub fax: Option<String>,
    pub contact_person1: Option<String>,
    pub mobile1: Option<String>,
    pub contact_person2: Option<String>,
    pub mobile2: Option<String>,
    pub client_type: Option<String>,
    pub price_grade: Option<String>,
    pub initial_balance: Option<i64>,
    pub optimal_balance: Option<i64>,
    pub memo: Option<String>,
}

impl RegistrationPatch {
    pub fn is_empty(&self) -> bool {
        *self == RegistrationPatch::default()
    }

    /// Same rules as insert, applied to the fields being set
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.client_name {
            require_non_empty("client_name", name)?;
        }
        if let Some(name) = &self.business_name {
            require_non_empty("business_name", name)?;
        }
        validate_codes(self.client_type.as_deref(), self.price_grade.as_deref())
    }

    /// Text columns being set, in a stable order
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        TextColumn::ALL
            .into_iter()
            .filter_map(|column| self.text(column).map(|v| (column.as_str(), v)))
            .collect()
    }

    /// Integer columns being set
    pub fn integer_fields(&self) -> Vec<(&'static str, i64)> {
        [
            ("initial_balance", self.initial_balance),
            ("optimal_balance", self.optimal_balance),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect()
    }

    /// Apply to an in-memory record (used by non-SQL repositories)
    pub fn apply_to(&self, record: &mut Registration) -> Result<()> {
        self.validate()?;
        for column in TextColumn::ALL {
            if let Some(value) = self.text(column) {
                column.assign(record, value)?;
            }
        }
        if let Some(balance) = self.initial_balance {
            record.initial_balance = balance;
        }
        if let Some(balance) = self.optimal_balance {
            record.optimal_balance = balance;
        }
        Ok(())
    }

    fn text(&self, column: TextColumn) -> Option<&str> {
        let value = match column {
            TextColumn::ClientName => &self.client_name,
            TextColumn::BusinessName => &self.business_name,
            TextColumn::RepresentativeName => &self.representative_name,
            TextColumn::BusinessNumber => &self.business_number,
            TextColumn::BranchNumber => &self.branch_number,
            TextColumn::PostalCode => &self.postal_code,
            TextColumn::Address1 => &self.address1,
            TextColumn::Address2 => &self.address2,
            TextColumn::BusinessType => &self.business_type,
            TextColumn::BusinessItem => &self.business_item,
            TextColumn::Phone1 => &self.phone1,
            TextColumn::Phone2 => &self.phone2,
            TextColumn::Fax => &self.fax,
            TextColumn::ContactPerson1 => &self.contact_person1,
            TextColumn::Mobile1 => &self.mobile1,
            TextColumn::ContactPerson2 => &self.contact_person2,
            TextColumn::Mobile2 => &self.mobile2,
            TextColumn::ClientType => &self.client_type,
            TextColumn::PriceGrade => &self.price_grade,
            TextColumn::Memo => &self.memo,
        };
        value.as_deref()
    }
}

/// Patchable text columns of `business_registrations`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColumn {
    ClientName,
    BusinessName,
    RepresentativeName,
    BusinessNumber,
    BranchNumber,
    PostalCode,
    Address1,
    Address2,
    BusinessType,
    BusinessItem,
    Phone1,
    Phone2,
    Fax,
    ContactPerson1,
    Mobile1,
    ContactPerson2,
    Mobile2,
    ClientType,
    PriceGrade,
    Memo,
}

impl TextColumn {
    pub const ALL: [TextColumn; 20] = [
        TextColumn::ClientName,
        TextColumn::BusinessName,
        TextColumn::RepresentativeName,
        TextColumn::BusinessNumber,
        TextColumn::BranchNumber,
        TextColumn::PostalCode,
        TextColumn::Address1,
        TextColumn::Address2,
        TextColumn::BusinessType,
        TextColumn::BusinessItem,
        TextColumn::Phone1,
        TextColumn::Phone2,
        TextColumn::Fax,
        TextColumn::ContactPerson1,
        TextColumn::Mobile1,
        TextColumn::ContactPerson2,
        TextColumn::Mobile2,
        TextColumn::ClientType,
        TextColumn::PriceGrade,
        TextColumn::Memo,
    ];

    /// Column name in SQL
    pub fn as_str(&self) -> &'static str {
        match self {
            TextColumn::ClientName => "client_name",
            TextColumn::BusinessName => "business_name",
            TextColumn::RepresentativeName => "representative_name",
            TextColumn::BusinessNumber => "business_number",
            TextColumn::BranchNumber => "branch_number",
            TextColumn::PostalCode => "postal_code",
            TextColumn::Address1 => "address1",
            TextColumn::Address2 => "address2",
            TextColumn::BusinessType => "business_type",
            TextColumn::BusinessItem => "business_item",
            TextColumn::Phone1 => "phone1",
            TextColumn::Phone2 => "phone2",
            TextColumn::Fax => "fax",
            TextColumn::ContactPerson1 => "contact_person1",
            TextColumn::Mobile1 => "mobile1",
            TextColumn::ContactPerson2 => "contact_person2",
            TextColumn::Mobile2 => "mobile2",
            TextColumn::ClientType => "client_type",
            TextColumn::PriceGrade => "price_grade",
            TextColumn::Memo => "memo",
        }
    }

    fn assign(&self, record: &mut Registration, value: &str) -> Result<()> {
        let text = Some(value.to_string());
        match self {
            TextColumn::ClientName => record.client_name = value.to_string(),
            TextColumn::BusinessName => record.business_name = value.to_string(),
            TextColumn::RepresentativeName => record.representative_name = text,
            TextColumn::BusinessNumber => record.business_number = text,
            TextColumn::BranchNumber => record.branch_number = text,
            TextColumn::PostalCode => record.postal_code = text,
            TextColumn::Address1 => record.address1 = text,
            TextColumn::Address2 => record.address2 = text,
            TextColumn::BusinessType => record.business_type = text,
            TextColumn::BusinessItem => record.business_item = text,
            TextColumn::Phone1 => record.phone1 = text,
            TextColumn::Phone2 => record.phone2 = text,
            TextColumn::Fax => record.fax = text,
            TextColumn::ContactPerson1 => record.contact_person1 = text,
            TextColumn::Mobile1 => record.mobile1 = text,
            TextColumn::ContactPerson2 => record.contact_person2 = text,
            TextColumn::Mobile2 => record.mobile2 = text,
            TextColumn::ClientType => record.client_type = Some(value.parse()?),
            TextColumn::PriceGrade => record.price_grade = Some(value.parse()?),
            TextColumn::Memo => record.memo = text,
        }
        Ok(())
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField(field));
    }
    Ok(())
}

fn validate_codes(client_type: Option<&str>, price_grade: Option<&str>) -> Result<()> {
    if let Some(code) = client_type {
        ClientType::from_str(code)?;
    }
    if let Some(code) = price_grade {
        PriceGrade::from_str(code)?;
    }
    Ok(())
}

pub fn validate_erp_code(code: ErpCode) -> Result<()> {
    if !(ERP_CODE_MIN..=ERP_CODE_MAX).contains(&code) {
        return Err(DomainError::OutOfRange {
            field: "erp_code",
            value: code.to_string(),
        });
    }
    Ok(())
}

fn validate_confidence(confidence: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(DomainError::OutOfRange {
            field: "confidence",
            value: confidence.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registration_requires_names() {
        assert!(NewRegistration::new("Acme", "Acme Foods").validate().is_ok());

        let err = NewRegistration::new("", "Acme Foods").validate().unwrap_err();
        assert!(matches!(err, DomainError::MissingField("client_name")));

        let err = NewRegistration::new("Acme", "   ").validate().unwrap_err();
        assert!(matches!(err, DomainError::MissingField("business_name")));
    }

    #[test]
    fn test_missing_names_in_json_are_validation_failures() {
        let new: NewRegistration =
            serde_json::from_str(r#"{"business_name": "Acme Foods"}"#).unwrap();
        assert!(matches!(
            new.validate(),
            Err(DomainError::MissingField("client_name"))
        ));
    }

    #[test]
    fn test_enum_codes_are_closed() {
        let mut new = NewRegistration::new("Acme", "Acme Foods");
        new.client_type = Some("X".to_string());
        assert!(matches!(
            new.validate(),
            Err(DomainError::InvalidEnum { field: "client_type", .. })
        ));

        new.client_type = Some("M".to_string());
        new.price_grade = Some("A".to_string());
        assert!(matches!(
            new.validate(),
            Err(DomainError::InvalidEnum { field: "price_grade", .. })
        ));

        new.price_grade = Some("E".to_string());
        assert!(new.validate().is_ok());
        assert_eq!(new.client_type().unwrap(), Some(ClientType::M));
        assert_eq!(new.price_grade().unwrap(), Some(PriceGrade::E));
    }

    #[test]
    fn test_erp_code_and_confidence_bounds() {
        let mut new = NewRegistration::new("Acme", "Acme Foods");
        new.erp_code = Some(50000);
        assert!(new.validate().is_err());
        new.erp_code = Some(ERP_CODE_MAX);
        assert!(new.validate().is_ok());

        new.confidence = Some(1.5);
        assert!(matches!(
            new.validate(),
            Err(DomainError::OutOfRange { field: "confidence", .. })
        ));
        new.confidence = Some(0.0);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_status_transitions_only_move_forward() {
        use RegistrationStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in RegistrationStatus::ALL {
            assert_eq!(status.as_str().parse::<RegistrationStatus>().unwrap(), status);
        }
        assert!("done".parse::<RegistrationStatus>().is_err());
    }

    #[test]
    fn test_patch_collects_only_set_columns() {
        let patch = RegistrationPatch {
            memo: Some("call back".to_string()),
            phone1: Some("02-000-0000".to_string()),
            optimal_balance: Some(500),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(
            patch.text_fields(),
            vec![("phone1", "02-000-0000"), ("memo", "call back")]
        );
        assert_eq!(patch.integer_fields(), vec![("optimal_balance", 500)]);
        assert!(RegistrationPatch::default().is_empty());
    }

    #[test]
    fn test_every_text_column_reaches_the_record() {
        let mut patch = RegistrationPatch::default();
        for column in TextColumn::ALL {
            let value = match column {
                TextColumn::ClientType => "M".to_string(),
                TextColumn::PriceGrade => "E".to_string(),
                other => format!("new {}", other.as_str()),
            };
            set_text(&mut patch, column, value);
        }

        let names: std::collections::HashSet<_> =
            TextColumn::ALL.iter().map(TextColumn::as_str).collect();
        assert_eq!(names.len(), TextColumn::ALL.len());
        assert_eq!(patch.text_fields().len(), TextColumn::ALL.len());

        let mut record = sample_record();
        patch.apply_to(&mut record).unwrap();
        assert_eq!(record.client_name, "new client_name");
        assert_eq!(record.fax.as_deref(), Some("new fax"));
        assert_eq!(record.mobile2.as_deref(), Some("new mobile2"));
        assert_eq!(record.memo.as_deref(), Some("new memo"));
        assert_eq!(record.client_type, Some(ClientType::M));
        assert_eq!(record.price_grade, Some(PriceGrade::E));
        assert_eq!(record.erp_code, ERP_CODE_MIN);
    }

    fn set_text(patch: &mut RegistrationPatch, column: TextColumn, value: String) {
        let slot = match column {
            TextColumn::ClientName => &mut patch.client_name,
            TextColumn::BusinessName => &mut patch.business_name,
            TextColumn::RepresentativeName => &mut patch.representative_name,
            TextColumn::BusinessNumber => &mut patch.business_number,
            TextColumn::BranchNumber => &mut patch.branch_number,
            TextColumn::PostalCode => &mut patch.postal_code,
            TextColumn::Address1 => &mut patch.address1,
            TextColumn::Address2 => &mut patch.address2,
            TextColumn::BusinessType => &mut patch.business_type,
            TextColumn::BusinessItem => &mut patch.business_item,
            TextColumn::Phone1 => &mut patch.phone1,
            TextColumn::Phone2 => &mut patch.phone2,
            TextColumn::Fax => &mut patch.fax,
            TextColumn::ContactPerson1 => &mut patch.contact_person1,
            TextColumn::Mobile1 => &mut patch.mobile1,
            TextColumn::ContactPerson2 => &mut patch.contact_person2,
            TextColumn::Mobile2 => &mut patch.mobile2,
            TextColumn::ClientType => &mut patch.client_type,
            TextColumn::PriceGrade => &mut patch.price_grade,
            TextColumn::Memo => &mut patch.memo,
        };
        *slot = Some(value);
    }

    fn sample_record() -> Registration {
        Registration {
            id: 1,
            erp_code: ERP_CODE_MIN,
            client_name: "Acme".to_string(),
            business_name: "Acme Foods".to_string(),
            representative_name: None,
            business_number: None,
            branch_number: None,
            postal_code: None,
            address1: None,
            address2: None,
            business_type: None,
            business_item: None,
            phone1: None,
            phone2: None,
            fax: None,
            contact_person1: None,
            mobile1: None,
            contact_person2: None,
            mobile2: None,
            client_type: None,
            price_grade: None,
            initial_balance: 0,
            optimal_balance: 0,
            memo: None,
            confidence: None,
            image_url: None,
            status: RegistrationStatus::Pending,
            discord_user_id: None,
            discord_message_id: None,
            created_at: chrono::Utc::now(),
            processed_at: None,
        }
    }

    #[test]
    fn test_patch_rejects_blank_name() {
        let patch = RegistrationPatch {
            client_name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(DomainError::MissingField("client_name"))
        ));
    }
}
