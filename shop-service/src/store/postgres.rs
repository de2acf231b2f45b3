use super::{Settlement, ShopStore, StoreError, StoreResult};
use crate::models::{Cart, CartItem, CartLine, Product, PurchasedItem, Transaction, User};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Map a unique-index violation to `Conflict`, anything else to `Database`.
fn unique_violation(what: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        other => StoreError::Database(other),
    }
}

/// PostgreSQL connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[instrument(skip(database_url), fields(service = "shop-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> StoreResult<Self> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl ShopStore for PgStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    #[instrument(skip(self))]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, slug, image, description, price, category, created_utc
            FROM products
            ORDER BY name, slug
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, slug, image, description, price, category, created_utc
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn find_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, slug, image, description, price, category, created_utc
            FROM products
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list_similar_products(
        &self,
        category: &str,
        exclude_product_id: Uuid,
    ) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, slug, image, description, price, category, created_utc
            FROM products
            WHERE category = $1 AND product_id <> $2
            ORDER BY name, slug
            "#,
        )
        .bind(category)
        .bind(exclude_product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    #[instrument(skip(self, product), fields(slug = %product.slug))]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, name, slug, image, description, price, category, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.product_id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.image)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(product.created_utc)
        .execute(&self.pool)
        .await
        .map_err(unique_violation("product slug"))?;

        Ok(())
    }

    // =========================================================================
    // Carts
    // =========================================================================

    #[instrument(skip(self))]
    async fn get_or_create_cart(&self, cart_code: &str) -> StoreResult<Cart> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (cart_id, cart_code)
            VALUES ($1, $2)
            ON CONFLICT (cart_code) DO UPDATE SET cart_code = EXCLUDED.cart_code
            RETURNING cart_id, cart_code, user_id, paid, created_utc, modified_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn find_cart_by_code(&self, cart_code: &str) -> StoreResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT cart_id, cart_code, user_id, paid, created_utc, modified_utc
            FROM carts
            WHERE cart_code = $1
            "#,
        )
        .bind(cart_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn list_cart_lines(&self, cart_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT ci.item_id, ci.cart_id, ci.product_id, ci.quantity, ci.cart_paid,
                   p.name, p.slug, p.image, p.description, p.price, p.category, p.created_utc
            FROM cart_items ci
            JOIN products p ON p.product_id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY p.name, ci.item_id
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    #[instrument(skip(self))]
    async fn find_cart_line(&self, item_id: Uuid) -> StoreResult<Option<CartLine>> {
        let line = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT ci.item_id, ci.cart_id, ci.product_id, ci.quantity, ci.cart_paid,
                   p.name, p.slug, p.image, p.description, p.price, p.category, p.created_utc
            FROM cart_items ci
            JOIN products p ON p.product_id = ci.product_id
            WHERE ci.item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(line)
    }

    #[instrument(skip(self))]
    async fn add_or_increment_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<CartItem> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (item_id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + 1
            RETURNING item_id, cart_id, product_id, quantity, cart_paid
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    #[instrument(skip(self))]
    async fn set_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> StoreResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = $2
            WHERE item_id = $1
            RETURNING item_id, cart_id, product_id, quantity, cart_paid
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, item_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn cart_contains_product(&self, cart_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM cart_items WHERE cart_id = $1 AND product_id = $2)",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    #[instrument(skip(self, transaction), fields(tx_ref = %transaction.tx_ref))]
    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (transaction_id, tx_ref, provider, provider_order_id, cart_id, user_id,
                                      amount, currency, settlement_currency, status, created_utc, modified_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(transaction.transaction_id)
        .bind(&transaction.tx_ref)
        .bind(transaction.provider.as_str())
        .bind(&transaction.provider_order_id)
        .bind(transaction.cart_id)
        .bind(transaction.user_id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.settlement_currency)
        .bind(transaction.status.as_str())
        .bind(transaction.created_utc)
        .bind(transaction.modified_utc)
        .execute(&self.pool)
        .await
        .map_err(unique_violation("transaction reference"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_transaction_by_ref(&self, tx_ref: &str) -> StoreResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT transaction_id, tx_ref, provider, provider_order_id, cart_id, user_id,
                   amount, currency, settlement_currency, status, created_utc, modified_utc
            FROM transactions
            WHERE tx_ref = $1
            "#,
        )
        .bind(tx_ref)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn find_transaction_by_order_id(
        &self,
        provider_order_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT transaction_id, tx_ref, provider, provider_order_id, cart_id, user_id,
                   amount, currency, settlement_currency, status, created_utc, modified_utc
            FROM transactions
            WHERE provider_order_id = $1
            "#,
        )
        .bind(provider_order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn attach_provider_order(
        &self,
        transaction_id: Uuid,
        provider_order_id: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET provider_order_id = $2, modified_utc = NOW()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .bind(provider_order_id)
        .execute(&self.pool)
        .await
        .map_err(unique_violation("provider order"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("transaction".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn settle_transaction(&self, transaction_id: Uuid) -> StoreResult<Settlement> {
        let mut tx = self.pool.begin().await?;

        let settled = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = 'completed', modified_utc = NOW()
            WHERE transaction_id = $1 AND status = 'pending'
            RETURNING transaction_id, tx_ref, provider, provider_order_id, cart_id, user_id,
                      amount, currency, settlement_currency, status, created_utc, modified_utc
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unique_violation("completed payment for this cart"))?;

        let Some(settled) = settled else {
            let current = sqlx::query_as::<_, Transaction>(
                r#"
                SELECT transaction_id, tx_ref, provider, provider_order_id, cart_id, user_id,
                       amount, currency, settlement_currency, status, created_utc, modified_utc
                FROM transactions
                WHERE transaction_id = $1
                "#,
            )
            .bind(transaction_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;

            return match current {
                Some(current) if current.is_completed() => Ok(Settlement::AlreadyCompleted(current)),
                Some(_) => Err(StoreError::Conflict("closed transaction".to_string())),
                None => Err(StoreError::Missing("transaction".to_string())),
            };
        };

        let cart_rows = sqlx::query(
            r#"
            UPDATE carts
            SET paid = TRUE, user_id = $2, modified_utc = NOW()
            WHERE cart_id = $1 AND paid = FALSE
            "#,
        )
        .bind(settled.cart_id)
        .bind(settled.user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if cart_rows == 0 {
            tx.rollback().await?;
            warn!(
                tx_ref = %settled.tx_ref,
                cart_id = %settled.cart_id,
                "Cart was already paid by another transaction"
            );
            return Err(StoreError::Conflict("completed payment for this cart".to_string()));
        }

        sqlx::query("UPDATE cart_items SET cart_paid = TRUE WHERE cart_id = $1")
            .bind(settled.cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(tx_ref = %settled.tx_ref, cart_id = %settled.cart_id, "Transaction settled");
        Ok(Settlement::Settled(settled))
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, password_hash, first_name, last_name,
                               phone, address, city, state, country, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.state)
        .bind(&user.country)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(unique_violation("username"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, first_name, last_name,
                   phone, address, city, state, country, created_utc
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, first_name, last_name,
                   phone, address, city, state, country, created_utc
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list_purchased_items(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<PurchasedItem>> {
        let items = sqlx::query_as::<_, PurchasedItem>(
            r#"
            SELECT ci.item_id, ci.quantity, c.cart_code AS order_id, c.modified_utc AS order_date,
                   p.product_id, p.name, p.slug, p.image, p.description, p.price, p.category, p.created_utc
            FROM cart_items ci
            JOIN carts c ON c.cart_id = ci.cart_id
            JOIN products p ON p.product_id = ci.product_id
            WHERE c.user_id = $1 AND ci.cart_paid = TRUE
            ORDER BY c.modified_utc DESC, p.name
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
