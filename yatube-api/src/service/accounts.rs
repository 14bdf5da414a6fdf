use crate::service::{FormErrors, Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::info;
use yatube_common::model::{
    auth::{AuthToken, Authentication},
    user::{CreateUser, User, UserHandle},
};
use yatube_db::{DbError, Store};

const INVALID_HANDLE: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct SignUpForm {
    pub handle: String,
}

/// A new account and the bearer token it signs in with.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct SignUp {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
}

impl Accounts {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SignUp> {
        let handle = UserHandle::new(form.handle.trim().to_owned()).map_err(|_| {
            let mut errors = FormErrors::default();
            errors.add("handle", INVALID_HANDLE);
            ServiceError::Validation(errors)
        })?;
        let user = CreateUser { handle };

        let user = match self.store.create_user(&user).await {
            Ok(user) => user,
            Err(DbError::Conflict) => return Err(ServiceError::HandleTaken),
            Err(err) => return Err(err.into()),
        };

        let token = AuthToken::generate_random(user.id);
        self.store
            .create_auth(&Authentication {
                user: user.id,
                token_hash: token.hash()?,
                created_at: UtcDateTime::now(),
                expires_after: None,
            })
            .await?;

        info!(user_id = %user.id, handle = user.handle.get(), "New user");
        Ok(SignUp {
            user,
            token: token.as_token_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::service::{
        ServiceError,
        accounts::{Accounts, SignUpForm},
        test_support::store,
    };
    use yatube_common::model::auth::AuthToken;
    use yatube_db::Store;

    fn form(handle: &str) -> SignUpForm {
        SignUpForm {
            handle: handle.to_owned(),
        }
    }

    #[tokio::test]
    async fn sign_up_issues_a_stored_token() {
        let store = store();
        let accounts = Accounts::new(store.clone());

        let sign_up = accounts.sign_up(&form("TestUser")).await.unwrap();
        assert_eq!(sign_up.user.handle.get(), "TestUser");

        let token: AuthToken = sign_up.token.parse().unwrap();
        assert_eq!(token.user_id, sign_up.user.id);
        let stored = store
            .fetch_auth(&token.hash().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user, sign_up.user.id);
    }

    #[tokio::test]
    async fn handles_are_validated_and_unique() {
        let store = store();
        let accounts = Accounts::new(store.clone());
        accounts.sign_up(&form("TestUser")).await.unwrap();

        assert!(matches!(
            accounts.sign_up(&form("TestUser")).await,
            Err(ServiceError::HandleTaken)
        ));
        let Err(ServiceError::Validation(errors)) = accounts.sign_up(&form("with space")).await
        else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.field("handle").len(), 1);
    }
}
