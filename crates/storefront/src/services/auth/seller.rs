//! Seller authorization.

use std::sync::Arc;

use async_trait::async_trait;

use msgrocery_core::{UserId, UserRole};

use super::AuthError;
use crate::db::UserRepository;

/// Decides whether an identity may manage catalog products.
#[async_trait]
pub trait SellerAuthorizer: Send + Sync {
    async fn is_authorized(&self, user: &UserId) -> Result<bool, AuthError>;
}

/// Authorizes users whose mirrored role is [`UserRole::Seller`].
#[derive(Clone)]
pub struct RoleAuthorizer {
    users: Arc<dyn UserRepository>,
}

impl RoleAuthorizer {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl SellerAuthorizer for RoleAuthorizer {
    async fn is_authorized(&self, user: &UserId) -> Result<bool, AuthError> {
        let role = self.users.get_role(user).await?;
        Ok(role == Some(UserRole::Seller))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use msgrocery_core::Email;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::UserProfile;

    #[tokio::test]
    async fn test_only_sellers_are_authorized() {
        let store = MemoryStore::new();
        for (id, role) in [("user_seller", UserRole::Seller), ("user_customer", UserRole::Customer)] {
            store
                .upsert(&UserProfile {
                    id: UserId::new(id).unwrap(),
                    email: Email::parse("someone@example.com").unwrap(),
                    name: String::new(),
                    image_url: String::new(),
                    role,
                })
                .await
                .unwrap();
        }
        let authorizer = RoleAuthorizer::new(Arc::new(store));

        let check = |id: &str| {
            let id = UserId::new(id).unwrap();
            let authorizer = authorizer.clone();
            async move { authorizer.is_authorized(&id).await.unwrap() }
        };
        assert!(check("user_seller").await);
        assert!(!check("user_customer").await);
        assert!(!check("user_unknown").await);
    }
}
