//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::{
    AddressRepository, MemoryStore, PgAddressRepository, PgProductRepository, PgUserRepository,
    ProductRepository, UserRepository,
};
use crate::events::EventPublisher;
use crate::events::identity::{IdentitySync, WebhookVerifier};
use crate::services::auth::{SellerAuthorizer, SessionVerifier};
use crate::services::media::MediaStore;
use crate::services::{
    AddressBook, CartStore, LineItemPolicy, OrderService, PricingEngine, ProductService,
};

/// Repository handles used by request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub addresses: Arc<dyn AddressRepository>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            addresses: Arc::new(PgAddressRepository::new(pool.clone())),
        }
    }

    /// Repositories backed by an in-memory store.
    #[must_use]
    pub fn memory(store: &MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            addresses: Arc::new(store.clone()),
        }
    }
}

/// Everything needed to build an [`AppState`].
///
/// Constructed once at startup; tests build it with in-memory parts.
pub struct Services {
    pub repositories: Repositories,
    pub events: Arc<dyn EventPublisher>,
    pub media: Arc<dyn MediaStore>,
    pub sellers: Arc<dyn SellerAuthorizer>,
    pub sessions: SessionVerifier,
    pub webhooks: WebhookVerifier,
    pub line_item_policy: LineItemPolicy,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    users: Arc<dyn UserRepository>,
    carts: CartStore,
    addresses: AddressBook,
    orders: OrderService,
    products: ProductService,
    identity: IdentitySync,
    sessions: SessionVerifier,
    webhooks: WebhookVerifier,
}

impl AppState {
    /// Wire services together.
    #[must_use]
    pub fn new(services: Services) -> Self {
        let Services {
            repositories,
            events,
            media,
            sellers,
            sessions,
            webhooks,
            line_item_policy,
        } = services;

        let carts = CartStore::new(Arc::clone(&repositories.users));
        let pricing = PricingEngine::new(Arc::clone(&repositories.products), line_item_policy);

        Self {
            inner: Arc::new(AppStateInner {
                users: Arc::clone(&repositories.users),
                orders: OrderService::new(pricing, events, carts.clone()),
                carts,
                addresses: AddressBook::new(repositories.addresses),
                products: ProductService::new(repositories.products, media, sellers),
                identity: IdentitySync::new(repositories.users),
                sessions,
                webhooks,
            }),
        }
    }

    /// User repository, used for readiness checks.
    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressBook {
        &self.inner.addresses
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.inner.products
    }

    #[must_use]
    pub fn identity(&self) -> &IdentitySync {
        &self.inner.identity
    }

    /// Session token verifier.
    #[must_use]
    pub fn sessions(&self) -> &SessionVerifier {
        &self.inner.sessions
    }

    /// Identity webhook signature verifier.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookVerifier {
        &self.inner.webhooks
    }
}
