//! Commit authorship.
//!
//! Every change to the record store is committed on behalf of an account. [`Author`] carries
//! the identity rendered into the git signature and the `Author-*` commit trailers.

use crate::constants::COMMIT_EMAIL_DOMAIN;
use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use his_types::NonEmptyText;

/// The account a commit is made on behalf of.
#[derive(Clone, Debug)]
pub struct Author {
    /// Display name, e.g. "Dr. Robert Koch".
    pub name: NonEmptyText,
    /// Role label, e.g. "doctor" or "superuser".
    pub role: NonEmptyText,
    /// Login name of the account.
    pub username: NonEmptyText,
    /// Address used in the git signature.
    pub email: String,
}

impl Author {
    /// Author used for store initialisation and other changes no account asked for.
    pub fn system() -> HisResult<Self> {
        Ok(Self {
            name: NonEmptyText::new("HIS System")?,
            role: NonEmptyText::new("system")?,
            username: NonEmptyText::new("system")?,
            email: format!("system@{COMMIT_EMAIL_DOMAIN}"),
        })
    }

    /// Author describing `account`.
    pub fn for_account(account: &Account) -> HisResult<Self> {
        let email = match &account.email {
            Some(email) => email.to_string(),
            None => format!("{}@{COMMIT_EMAIL_DOMAIN}", account.username),
        };
        Ok(Self {
            name: NonEmptyText::new(account.display_name())?,
            role: NonEmptyText::new(account.role_label())?,
            username: account.username.clone(),
            email,
        })
    }

    /// Checks the fields can be rendered as single-line commit trailers.
    pub fn validate_commit_author(&self) -> HisResult<()> {
        for (field, value) in [
            ("name", self.name.as_str()),
            ("role", self.role.as_str()),
            ("username", self.username.as_str()),
            ("email", self.email.as_str()),
        ] {
            if value.contains(['\n', '\r']) {
                return Err(HisError::InvalidAuthor(format!(
                    "{field} must be a single line"
                )));
            }
        }
        Ok(())
    }
}
