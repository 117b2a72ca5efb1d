use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use crate::password::PasswordHash;
use crate::store::Store;
use std::sync::Arc;

/// Checks login credentials.
#[derive(Clone, Debug)]
pub struct AuthService {
    store: Arc<Store>,
}

impl AuthService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Returns the active account matching `username` and `password`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidCredentials` for an unknown user, a wrong password and an
    /// inactive account alike.
    pub fn authenticate(&self, username: &str, password: &str) -> HisResult<Account> {
        let username = username.trim().to_lowercase();
        let Some(account) = self
            .store
            .list::<Account>()
            .into_iter()
            .find(|a| a.username.as_str() == username)
        else {
            PasswordHash::verify_without_account(password);
            tracing::debug!("login failed: unknown user");
            return Err(HisError::InvalidCredentials);
        };

        match account.password.verify(password) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("login failed: wrong password for {}", account.username);
                return Err(HisError::InvalidCredentials);
            }
            Err(e) => {
                tracing::warn!(
                    "login failed: stored password of {} is unusable: {e}",
                    account.username
                );
                return Err(HisError::InvalidCredentials);
            }
        }
        if !account.is_active {
            tracing::debug!("login failed: {} is inactive", account.username);
            return Err(HisError::InvalidCredentials);
        }

        tracing::info!("{} logged in", account.username);
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use crate::author::Author;
    use crate::error::HisError;
    use crate::password::PasswordHash;
    use crate::testing::TestHospital;
    use crate::versioned_files::{HisCommitAction, HisCommitDomain};

    #[test]
    fn authenticate_checks_password_and_activity() {
        let hospital = TestHospital::new();
        let services = &hospital.services;

        let account = services.auth.authenticate("koch", "test").unwrap();
        assert_eq!(account.username.as_str(), "koch");
        // Usernames are matched case-insensitively.
        assert!(services.auth.authenticate(" KOCH ", "test").is_ok());

        assert!(matches!(
            services.auth.authenticate("koch", "wrong"),
            Err(HisError::InvalidCredentials)
        ));
        assert!(matches!(
            services.auth.authenticate("nobody", "test"),
            Err(HisError::InvalidCredentials)
        ));

        let admin = hospital.login("tom");
        services
            .accounts
            .set_active(&admin, &account.id, false)
            .unwrap();
        assert!(matches!(
            services.auth.authenticate("koch", "test"),
            Err(HisError::InvalidCredentials)
        ));
    }

    #[test]
    fn unusable_stored_password_is_a_failed_login() {
        let hospital = TestHospital::new();
        let mut account = hospital.login("koch");
        account.password =
            serde_yaml::from_str::<PasswordHash>("iterations: 0\nsalt: ''\nhash: ''").unwrap();
        hospital
            .store
            .save(
                &Author::system().unwrap(),
                HisCommitDomain::Account,
                HisCommitAction::Update,
                "Damaged password",
                &account,
            )
            .unwrap();

        assert!(matches!(
            hospital.services.auth.authenticate("koch", "test"),
            Err(HisError::InvalidCredentials)
        ));
        assert!(hospital.services.auth.authenticate("fleming", "test").is_ok());
    }
}
