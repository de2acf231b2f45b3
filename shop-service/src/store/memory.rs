use super::{Settlement, ShopStore, StoreError, StoreResult};
use crate::models::{
    Cart, CartItem, CartLine, Product, PurchasedItem, Transaction, TransactionStatus, User,
};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    items: HashMap<Uuid, CartItem>,
    transactions: HashMap<Uuid, Transaction>,
}

impl Tables {
    fn line(&self, item: &CartItem) -> Option<CartLine> {
        self.products.get(&item.product_id).map(|product| CartLine {
            item: item.clone(),
            product: product.clone(),
        })
    }
}

/// In-process store with the same uniqueness and atomicity rules as
/// `PgStore`. Every operation holds one lock for its whole duration.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transaction_count(&self) -> usize {
        self.tables.lock().await.transactions.len()
    }

    pub async fn find_cart(&self, cart_id: Uuid) -> Option<Cart> {
        self.tables.lock().await.carts.get(&cart_id).cloned()
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let tables = self.tables.lock().await;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(products)
    }

    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&product_id).cloned())
    }

    async fn find_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn list_similar_products(
        &self,
        category: &str,
        exclude_product_id: Uuid,
    ) -> StoreResult<Vec<Product>> {
        let tables = self.tables.lock().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.category.as_deref() == Some(category))
            .filter(|p| p.product_id != exclude_product_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(products)
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.products.values().any(|p| p.slug == slug))
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.products.values().any(|p| p.slug == product.slug) {
            return Err(StoreError::Conflict("product slug".to_string()));
        }
        tables.products.insert(product.product_id, product.clone());
        Ok(())
    }

    async fn get_or_create_cart(&self, cart_code: &str) -> StoreResult<Cart> {
        let mut tables = self.tables.lock().await;
        if let Some(cart) = tables.carts.values().find(|c| c.cart_code == cart_code) {
            return Ok(cart.clone());
        }

        let now = Utc::now();
        let cart = Cart {
            cart_id: Uuid::new_v4(),
            cart_code: cart_code.to_string(),
            user_id: None,
            paid: false,
            created_utc: now,
            modified_utc: now,
        };
        tables.carts.insert(cart.cart_id, cart.clone());
        Ok(cart)
    }

    async fn find_cart_by_code(&self, cart_code: &str) -> StoreResult<Option<Cart>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .carts
            .values()
            .find(|c| c.cart_code == cart_code)
            .cloned())
    }

    async fn list_cart_lines(&self, cart_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let tables = self.tables.lock().await;
        let mut lines: Vec<CartLine> = tables
            .items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .filter_map(|item| tables.line(item))
            .collect();
        lines.sort_by(|a, b| {
            a.product
                .name
                .cmp(&b.product.name)
                .then_with(|| a.item.item_id.cmp(&b.item.item_id))
        });
        Ok(lines)
    }

    async fn find_cart_line(&self, item_id: Uuid) -> StoreResult<Option<CartLine>> {
        let tables = self.tables.lock().await;
        Ok(tables.items.get(&item_id).and_then(|item| tables.line(item)))
    }

    async fn add_or_increment_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<CartItem> {
        let mut tables = self.tables.lock().await;
        if !tables.carts.contains_key(&cart_id) {
            return Err(StoreError::Missing("cart".to_string()));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::Missing("product".to_string()));
        }

        if let Some(item) = tables
            .items
            .values_mut()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
        {
            item.quantity += 1;
            return Ok(item.clone());
        }

        let item = CartItem {
            item_id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity: 1,
            cart_paid: false,
        };
        tables.items.insert(item.item_id, item.clone());
        Ok(item)
    }

    async fn set_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> StoreResult<Option<CartItem>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.items.get_mut(&item_id).map(|item| {
            item.quantity = quantity;
            item.clone()
        }))
    }

    async fn delete_item(&self, item_id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.lock().await.items.remove(&item_id).is_some())
    }

    async fn cart_contains_product(&self, cart_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .items
            .values()
            .any(|item| item.cart_id == cart_id && item.product_id == product_id))
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables
            .transactions
            .values()
            .any(|t| t.tx_ref == transaction.tx_ref)
        {
            return Err(StoreError::Conflict("transaction reference".to_string()));
        }
        if !tables.carts.contains_key(&transaction.cart_id) {
            return Err(StoreError::Missing("cart".to_string()));
        }
        if !tables.users.contains_key(&transaction.user_id) {
            return Err(StoreError::Missing("user".to_string()));
        }
        tables
            .transactions
            .insert(transaction.transaction_id, transaction.clone());
        Ok(())
    }

    async fn find_transaction_by_ref(&self, tx_ref: &str) -> StoreResult<Option<Transaction>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transactions
            .values()
            .find(|t| t.tx_ref == tx_ref)
            .cloned())
    }

    async fn find_transaction_by_order_id(
        &self,
        provider_order_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transactions
            .values()
            .find(|t| t.provider_order_id.as_deref() == Some(provider_order_id))
            .cloned())
    }

    async fn attach_provider_order(
        &self,
        transaction_id: Uuid,
        provider_order_id: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.transactions.values().any(|t| {
            t.transaction_id != transaction_id
                && t.provider_order_id.as_deref() == Some(provider_order_id)
        }) {
            return Err(StoreError::Conflict("provider order".to_string()));
        }

        let transaction = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| StoreError::Missing("transaction".to_string()))?;
        transaction.provider_order_id = Some(provider_order_id.to_string());
        transaction.modified_utc = Utc::now();
        Ok(())
    }

    async fn settle_transaction(&self, transaction_id: Uuid) -> StoreResult<Settlement> {
        let mut tables = self.tables.lock().await;

        let current = tables
            .transactions
            .get(&transaction_id)
            .cloned()
            .ok_or_else(|| StoreError::Missing("transaction".to_string()))?;

        match current.status {
            TransactionStatus::Completed => return Ok(Settlement::AlreadyCompleted(current)),
            TransactionStatus::Failed => {
                return Err(StoreError::Conflict("closed transaction".to_string()))
            }
            TransactionStatus::Pending => {}
        }

        // Validate everything before the first write so a refusal leaves no trace.
        let cart_paid = tables
            .carts
            .get(&current.cart_id)
            .map(|c| c.paid)
            .ok_or_else(|| StoreError::Missing("cart".to_string()))?;
        if cart_paid {
            return Err(StoreError::Conflict(
                "completed payment for this cart".to_string(),
            ));
        }

        let now = Utc::now();
        if let Some(cart) = tables.carts.get_mut(&current.cart_id) {
            cart.paid = true;
            cart.user_id = Some(current.user_id);
            cart.modified_utc = now;
        }
        for item in tables
            .items
            .values_mut()
            .filter(|item| item.cart_id == current.cart_id)
        {
            item.cart_paid = true;
        }

        let mut settled = current;
        settled.status = TransactionStatus::Completed;
        settled.modified_utc = now;
        tables
            .transactions
            .insert(settled.transaction_id, settled.clone());

        Ok(Settlement::Settled(settled))
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        tables.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_purchased_items(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<PurchasedItem>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<PurchasedItem> = tables
            .items
            .values()
            .filter(|item| item.cart_paid)
            .filter_map(|item| {
                let cart = tables.carts.get(&item.cart_id)?;
                if cart.user_id != Some(user_id) {
                    return None;
                }
                let product = tables.products.get(&item.product_id)?;
                Some(PurchasedItem {
                    item_id: item.item_id,
                    quantity: item.quantity,
                    order_id: cart.cart_code.clone(),
                    order_date: cart.modified_utc,
                    product: product.clone(),
                })
            })
            .collect();

        items.sort_by(|a, b| {
            Reverse(a.order_date)
                .cmp(&Reverse(b.order_date))
                .then_with(|| a.product.name.cmp(&b.product.name))
        });
        items.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentProvider;
    use rust_decimal_macros::dec;

    fn product(name: &str, slug: &str) -> Product {
        Product {
            product_id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            image: None,
            description: None,
            price: dec!(10.00),
            category: Some("Electronics".to_string()),
            created_utc: Utc::now(),
        }
    }

    fn user(username: &str) -> User {
        User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            country: None,
            created_utc: Utc::now(),
        }
    }

    fn pending(cart: &Cart, user: &User, tx_ref: &str) -> Transaction {
        let now = Utc::now();
        Transaction {
            transaction_id: Uuid::new_v4(),
            tx_ref: tx_ref.to_string(),
            provider: PaymentProvider::Flutterwave,
            provider_order_id: None,
            cart_id: cart.cart_id,
            user_id: user.user_id,
            amount: dec!(24.00),
            currency: "KES".to_string(),
            settlement_currency: "KES".to_string(),
            status: TransactionStatus::Pending,
            created_utc: now,
            modified_utc: now,
        }
    }

    #[tokio::test]
    async fn get_or_create_cart_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.get_or_create_cart("abc").await.unwrap();
        let second = store.get_or_create_cart("abc").await.unwrap();
        assert_eq!(first.cart_id, second.cart_id);
        assert!(!first.paid);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_product(&product("Phone", "phone")).await.unwrap();
        let err = store
            .insert_product(&product("Phone", "phone"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn settlement_updates_transaction_cart_and_items_together() {
        let store = MemoryStore::new();
        let buyer = user("buyer");
        store.insert_user(&buyer).await.unwrap();
        let phone = product("Phone", "phone");
        store.insert_product(&phone).await.unwrap();
        let cart = store.get_or_create_cart("cart-1").await.unwrap();
        store
            .add_or_increment_item(cart.cart_id, phone.product_id)
            .await
            .unwrap();
        let tx = pending(&cart, &buyer, "ref-1");
        store.insert_transaction(&tx).await.unwrap();

        let settlement = store.settle_transaction(tx.transaction_id).await.unwrap();
        match settlement {
            Settlement::Settled(settled) => assert!(settled.is_completed()),
            other => panic!("unexpected settlement: {:?}", other),
        }

        let cart = store.find_cart(cart.cart_id).await.unwrap();
        assert!(cart.paid);
        assert_eq!(cart.user_id, Some(buyer.user_id));
        let lines = store.list_cart_lines(cart.cart_id).await.unwrap();
        assert!(lines.iter().all(|line| line.item.cart_paid));

        let again = store.settle_transaction(tx.transaction_id).await.unwrap();
        assert!(matches!(again, Settlement::AlreadyCompleted(_)));
    }

    #[tokio::test]
    async fn second_transaction_cannot_settle_a_paid_cart() {
        let store = MemoryStore::new();
        let buyer = user("buyer");
        store.insert_user(&buyer).await.unwrap();
        let cart = store.get_or_create_cart("cart-1").await.unwrap();
        let first = pending(&cart, &buyer, "ref-1");
        let second = pending(&cart, &buyer, "ref-2");
        store.insert_transaction(&first).await.unwrap();
        store.insert_transaction(&second).await.unwrap();

        store.settle_transaction(first.transaction_id).await.unwrap();
        let err = store
            .settle_transaction(second.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let second = store.find_transaction_by_ref("ref-2").await.unwrap().unwrap();
        assert_eq!(second.status, TransactionStatus::Pending);
    }
}
