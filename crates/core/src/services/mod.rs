//! Operations on the record store, each taken on behalf of an account.
//!
//! Services check permissions before touching the store, commit every mutation with the acting
//! account as author, and filter listings down to what the actor may see.

mod accounts;
mod auth;
mod cases;
mod facility;
mod orders;
mod patients;
mod reports;

pub use accounts::{AccountService, NewEmployee};
pub use auth::AuthService;
pub use cases::CaseService;
pub use facility::FacilityService;
pub use orders::OrderService;
pub use patients::{HistoryEntry, PatientDetails, PatientService};
pub use reports::ReportService;

use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use crate::store::Store;
use std::sync::Arc;

/// All services over one store.
#[derive(Clone, Debug)]
pub struct HisServices {
    pub auth: AuthService,
    pub accounts: AccountService,
    pub facility: FacilityService,
    pub patients: PatientService,
    pub cases: CaseService,
    pub orders: OrderService,
    pub reports: ReportService,
    store: Arc<Store>,
}

impl HisServices {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            auth: AuthService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            facility: FacilityService::new(store.clone()),
            patients: PatientService::new(store.clone()),
            cases: CaseService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            reports: ReportService::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

/// Turns a failed permission check into `HisError::PermissionDenied`.
fn ensure(allowed: bool, actor: &Account, what: &str) -> HisResult<()> {
    if allowed {
        return Ok(());
    }
    tracing::debug!("permission denied: {} may not {}", actor.username, what);
    Err(HisError::PermissionDenied(what.to_string()))
}
