//! In-memory repository backend.
//!
//! Implements every repository trait over maps guarded by a single mutex.
//! Used by the integration tests and for running the API without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use msgrocery_core::{AddressId, EventId, OrderId, ProductId, ProductPrice, UserId, UserRole};

use super::{
    AddressRepository, OrderRepository, ProductRepository, RepositoryError, UserRepository,
};
use crate::models::{
    Address, CartItems, NewAddress, NewOrder, NewProduct, Order, Product, User, UserProfile,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    addresses: Vec<Address>,
    orders: BTreeMap<EventId, Order>,
}

/// Shared in-memory store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a product.
    pub fn insert_product(&self, product: Product) {
        self.lock().products.insert(product.id, product);
    }

    /// Insert or replace a user.
    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id.clone(), user);
    }

    /// Look up a user.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<User> {
        self.lock().users.get(id).cloned()
    }

    /// All stored products.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.values().cloned().collect()
    }

    /// All stored orders, ordered by event id.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.values().cloned().collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_cart(&self, id: &UserId) -> Result<Option<CartItems>, RepositoryError> {
        Ok(self.lock().users.get(id).map(|u| u.cart_items.clone()))
    }

    async fn set_cart(&self, id: &UserId, cart: &CartItems) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()
            .users
            .get_mut(id)
            .map(|u| u.cart_items = cart.clone())
            .is_some())
    }

    async fn get_role(&self, id: &UserId) -> Result<Option<UserRole>, RepositoryError> {
        Ok(self.lock().users.get(id).map(|u| u.role))
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let cart_items = tables
            .users
            .remove(&profile.id)
            .map(|u| u.cart_items)
            .unwrap_or_default();
        tables.users.insert(
            profile.id.clone(),
            User {
                id: profile.id.clone(),
                email: profile.email.clone(),
                name: profile.name.clone(),
                image_url: profile.image_url.clone(),
                role: profile.role,
                cart_items,
            },
        );
        Ok(())
    }

    async fn update(&self, profile: &UserProfile) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let Some(user) = tables.users.get_mut(&profile.id) else {
            return Ok(false);
        };
        user.email = profile.email.clone();
        user.name.clone_from(&profile.name);
        user.image_url.clone_from(&profile.image_url);
        user.role = profile.role;
        Ok(true)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        Ok(self.lock().users.remove(id).is_some())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn find_price(&self, id: ProductId) -> Result<Option<ProductPrice>, RepositoryError> {
        Ok(self.lock().products.get(&id).map(Product::price))
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let product = product.into_product(ProductId::new_v4(), Utc::now());
        self.insert_product(product.clone());
        Ok(product)
    }
}

#[async_trait]
impl AddressRepository for MemoryStore {
    async fn create(
        &self,
        user_id: &UserId,
        address: NewAddress,
    ) -> Result<Address, RepositoryError> {
        let address = address.into_address(AddressId::new_v4(), user_id.clone());
        self.lock().addresses.push(address.clone());
        Ok(address)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        Ok(self
            .lock()
            .addresses
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_many(&self, orders: &[NewOrder]) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let mut inserted = 0;
        for order in orders {
            if tables.orders.contains_key(&order.event_id) {
                continue;
            }
            tables
                .orders
                .insert(order.event_id, order.clone().into_order(OrderId::new_v4()));
            inserted += 1;
        }
        Ok(inserted)
    }
}
