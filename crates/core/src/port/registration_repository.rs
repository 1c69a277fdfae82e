// Registration Repository Port (Interface)

use crate::domain::{
    ErpCode, NewRegistration, Registration, RegistrationId, RegistrationPatch, RegistrationStatus,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sort key for status listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
    ErpCodeAsc,
    ErpCodeDesc,
}

impl ListOrder {
    /// SQL ORDER BY clause (id breaks ties)
    pub fn as_sql(&self) -> &'static str {
        match self {
            ListOrder::CreatedAtDesc => "created_at DESC, id DESC",
            ListOrder::CreatedAtAsc => "created_at ASC, id ASC",
            ListOrder::ErpCodeAsc => "erp_code ASC",
            ListOrder::ErpCodeDesc => "erp_code DESC",
        }
    }
}

impl std::str::FromStr for ListOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created_at_desc" | "newest" => Ok(ListOrder::CreatedAtDesc),
            "created_at_asc" | "oldest" => Ok(ListOrder::CreatedAtAsc),
            "erp_code_asc" => Ok(ListOrder::ErpCodeAsc),
            "erp_code_desc" => Ok(ListOrder::ErpCodeDesc),
            other => Err(format!("unknown order: {}", other)),
        }
    }
}

/// Listing parameters; `limit` bounds the result size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub order: ListOrder,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn new(order: ListOrder) -> Self {
        Self { order, limit: None }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Repository interface for registration persistence and job claiming
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Insert a new registration; the store assigns `id`, `erp_code`
    /// (unless supplied) and `created_at`
    async fn insert_registration(&self, new: &NewRegistration) -> Result<Registration>;

    /// Find by ERP code (absence is `Ok(None)`)
    async fn get_by_erp_code(&self, erp_code: ErpCode) -> Result<Option<Registration>>;

    /// Find by business number (duplicate-submission check)
    async fn get_by_business_number(&self, business_number: &str)
        -> Result<Option<Registration>>;

    /// Find by surrogate id
    async fn get_by_id(&self, id: RegistrationId) -> Result<Option<Registration>>;

    /// Partial update of mutable attributes (`NotFound` if id is unknown)
    async fn update_registration(
        &self,
        id: RegistrationId,
        patch: &RegistrationPatch,
    ) -> Result<Registration>;

    /// Records in a given status
    async fn list_by_status(
        &self,
        status: RegistrationStatus,
        query: ListQuery,
    ) -> Result<Vec<Registration>>;

    /// Count records in a given status
    async fn count_by_status(&self, status: RegistrationStatus) -> Result<i64>;

    /// Atomically claim one pending record (pending -> processing).
    /// Returns `Ok(None)` when nothing is claimable.
    async fn fetch_pending_job(&self) -> Result<Option<Registration>>;

    /// Set status; terminal states stamp `processed_at`.
    /// Transition order is not checked here.
    async fn update_status(
        &self,
        id: RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{ERP_CODE_MAX, ERP_CODE_MIN};
    use crate::error::AppError;
    use chrono::Utc;
    use std::sync::Mutex;

    struct State {
        rows: Vec<Registration>,
        next_id: RegistrationId,
        next_erp_code: ErpCode,
    }

    /// In-memory repository with the same sequence, uniqueness and
    /// claiming semantics as the SQL adapter
    pub struct InMemoryRegistrationRepository {
        state: Mutex<State>,
    }

    impl Default for InMemoryRegistrationRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryRegistrationRepository {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State {
                    rows: Vec::new(),
                    next_id: 1,
                    next_erp_code: ERP_CODE_MIN,
                }),
            }
        }

        pub fn len(&self) -> usize {
            self.state.lock().unwrap().rows.len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    fn explicit_code_too_low(code: ErpCode, last_assigned: ErpCode) -> AppError {
        AppError::Validation(format!(
            "erp_code {} is not above the last assigned code {}",
            code, last_assigned
        ))
    }

    fn duplicate(constraint: &str, value: impl std::fmt::Display) -> AppError {
        AppError::UniqueViolation {
            constraint: constraint.to_string(),
            message: format!("Key ({}) already exists", value),
        }
    }

    #[async_trait]
    impl RegistrationRepository for InMemoryRegistrationRepository {
        async fn insert_registration(&self, new: &NewRegistration) -> Result<Registration> {
            new.validate()?;
            let mut state = self.state.lock().unwrap();

            let erp_code = match new.erp_code {
                Some(code) => {
                    let last_assigned = state.next_erp_code - 1;
                    if code <= last_assigned {
                        return Err(explicit_code_too_low(code, last_assigned));
                    }
                    code
                }
                None => {
                    if state.next_erp_code > ERP_CODE_MAX {
                        return Err(AppError::Database("ERP code sequence exhausted".into()));
                    }
                    let code = state.next_erp_code;
                    state.next_erp_code += 1;
                    code
                }
            };

            if state.rows.iter().any(|r| r.erp_code == erp_code) {
                return Err(duplicate("business_registrations_erp_code_key", erp_code));
            }
            if let Some(number) = &new.business_number {
                if state
                    .rows
                    .iter()
                    .any(|r| r.business_number.as_deref() == Some(number.as_str()))
                {
                    return Err(duplicate("business_registrations_business_number_key", number));
                }
            }

            let record = Registration {
                id: state.next_id,
                erp_code,
                client_name: new.client_name.clone(),
                business_name: new.business_name.clone(),
                representative_name: new.representative_name.clone(),
                business_number: new.business_number.clone(),
                branch_number: new.branch_number.clone(),
                postal_code: new.postal_code.clone(),
                address1: new.address1.clone(),
                address2: new.address2.clone(),
                business_type: new.business_type.clone(),
                business_item: new.business_item.clone(),
                phone1: new.phone1.clone(),
                phone2: new.phone2.clone(),
                fax: new.fax.clone(),
                contact_person1: new.contact_person1.clone(),
                mobile1: new.mobile1.clone(),
                contact_person2: new.contact_person2.clone(),
                mobile2: new.mobile2.clone(),
                client_type: new.client_type()?,
                price_grade: new.price_grade()?,
                initial_balance: new.initial_balance,
                optimal_balance: new.optimal_balance,
                memo: new.memo.clone(),
                confidence: new.confidence,
                image_url: new.image_url.clone(),
                status: RegistrationStatus::Pending,
                discord_user_id: new.discord_user_id.clone(),
                discord_message_id: new.discord_message_id.clone(),
                created_at: Utc::now(),
                processed_at: None,
            };
            state.next_id += 1;
            state.next_erp_code = state.next_erp_code.max(erp_code + 1);
            state.rows.push(record.clone());
            Ok(record)
        }

        async fn get_by_erp_code(&self, erp_code: ErpCode) -> Result<Option<Registration>> {
            let state = self.state.lock().unwrap();
            Ok(state.rows.iter().find(|r| r.erp_code == erp_code).cloned())
        }

        async fn get_by_business_number(
            &self,
            business_number: &str,
        ) -> Result<Option<Registration>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .rows
                .iter()
                .find(|r| r.business_number.as_deref() == Some(business_number))
                .cloned())
        }

        async fn get_by_id(&self, id: RegistrationId) -> Result<Option<Registration>> {
            let state = self.state.lock().unwrap();
            Ok(state.rows.iter().find(|r| r.id == id).cloned())
        }

        async fn update_registration(
            &self,
            id: RegistrationId,
            patch: &RegistrationPatch,
        ) -> Result<Registration> {
            patch.validate()?;
            let mut state = self.state.lock().unwrap();

            if let Some(number) = &patch.business_number {
                if state
                    .rows
                    .iter()
                    .any(|r| r.id != id && r.business_number.as_deref() == Some(number.as_str()))
                {
                    return Err(duplicate("business_registrations_business_number_key", number));
                }
            }

            let record = state
                .rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))?;
            patch.apply_to(record)?;
            Ok(record.clone())
        }

        async fn list_by_status(
            &self,
            status: RegistrationStatus,
            query: ListQuery,
        ) -> Result<Vec<Registration>> {
            let state = self.state.lock().unwrap();
            let mut rows: Vec<Registration> = state
                .rows
                .iter()
                .filter(|r| r.status == status)
                .cloned()
                .collect();
            match query.order {
                ListOrder::CreatedAtDesc => {
                    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
                }
                ListOrder::CreatedAtAsc => {
                    rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
                }
                ListOrder::ErpCodeAsc => rows.sort_by_key(|r| r.erp_code),
                ListOrder::ErpCodeDesc => rows.sort_by_key(|r| std::cmp::Reverse(r.erp_code)),
            }
            if let Some(limit) = query.limit {
                rows.truncate(limit.max(0) as usize);
            }
            Ok(rows)
        }

        async fn count_by_status(&self, status: RegistrationStatus) -> Result<i64> {
            let state = self.state.lock().unwrap();
            Ok(state.rows.iter().filter(|r| r.status == status).count() as i64)
        }

        async fn fetch_pending_job(&self) -> Result<Option<Registration>> {
            // Oldest first; the mutex stands in for the row lock
            let mut state = self.state.lock().unwrap();
            let next = state
                .rows
                .iter_mut()
                .filter(|r| r.status == RegistrationStatus::Pending)
                .min_by_key(|r| (r.created_at, r.id));
            Ok(next.map(|record| {
                record.status = RegistrationStatus::Processing;
                record.clone()
            }))
        }

        async fn update_status(
            &self,
            id: RegistrationId,
            status: RegistrationStatus,
        ) -> Result<Registration> {
            let mut state = self.state.lock().unwrap();
            let record = state
                .rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))?;
            record.status = status;
            if status.is_terminal() && record.processed_at.is_none() {
                record.processed_at = Some(Utc::now());
            }
            Ok(record.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::InMemoryRegistrationRepository;
    use super::*;
    use crate::domain::ERP_CODE_MIN;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_sequence_starts_at_first_erp_code() {
        let repo = InMemoryRegistrationRepository::new();
        let first = repo
            .insert_registration(&NewRegistration::new("Acme", "Acme Foods"))
            .await
            .unwrap();
        let second = repo
            .insert_registration(&NewRegistration::new("Beta", "Beta Metals"))
            .await
            .unwrap();

        assert_eq!(first.erp_code, ERP_CODE_MIN);
        assert!(second.erp_code > first.erp_code);
        assert_eq!(first.status, RegistrationStatus::Pending);
    }

    #[tokio::test]
    async fn test_explicit_code_moves_the_sequence_forward() {
        let repo = InMemoryRegistrationRepository::new();
        let mut explicit = NewRegistration::new("Acme", "Acme Foods");
        explicit.erp_code = Some(ERP_CODE_MIN + 1);
        repo.insert_registration(&explicit).await.unwrap();

        let next = repo
            .insert_registration(&NewRegistration::new("Beta", "Beta Metals"))
            .await
            .unwrap();
        assert_eq!(next.erp_code, ERP_CODE_MIN + 2);

        let mut stale = NewRegistration::new("Gamma", "Gamma Oil");
        stale.erp_code = Some(ERP_CODE_MIN);
        assert!(matches!(
            repo.insert_registration(&stale).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_business_number_rejected() {
        let repo = InMemoryRegistrationRepository::new();
        let new = NewRegistration::new("Acme", "Acme Foods").with_business_number("111-11-11111");
        repo.insert_registration(&new).await.unwrap();

        let err = repo.insert_registration(&new).await.unwrap_err();
        assert!(err.is_duplicate_business_number());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_persists_nothing() {
        let repo = InMemoryRegistrationRepository::new();
        let err = repo
            .insert_registration(&NewRegistration::new("Acme", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_keeps_first_processed_at() {
        let repo = InMemoryRegistrationRepository::new();
        let record = repo
            .insert_registration(&NewRegistration::new("Acme", "Acme Foods"))
            .await
            .unwrap();

        let first = repo
            .update_status(record.id, RegistrationStatus::Completed)
            .await
            .unwrap();
        let second = repo
            .update_status(record.id, RegistrationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(second.status, RegistrationStatus::Completed);
        assert_eq!(first.processed_at, second.processed_at);

        let err = repo
            .update_status(9999, RegistrationStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_list_order_parsing() {
        assert_eq!("newest".parse::<ListOrder>().unwrap(), ListOrder::CreatedAtDesc);
        assert_eq!("erp_code_asc".parse::<ListOrder>().unwrap(), ListOrder::ErpCodeAsc);
        assert!("random".parse::<ListOrder>().is_err());
    }
}
