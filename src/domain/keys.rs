//! Key layout inside the shared store.
//!
//! Every entity is addressed by a string key. A configurable prefix lets
//! several deployments share one store without colliding:
//!
//! ```text
//! {prefix}{counter}                         counter value
//! {prefix}{resource}:{identifier}:{window}  rate window hit count (TTL = window)
//! {prefix}{resource}                        lock owner token (TTL = lock ttl)
//! {prefix}product:{id}:stock                remaining stock
//! {prefix}product:{id}:sold                 units sold
//! {prefix}product:{id}:sales                sales history list, newest first
//! {prefix}order:{order_id}                  order record hash
//! ```

/// Builds store keys under an optional namespace prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

/// The four keys touched by an inventory decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryKeys {
    /// Remaining stock counter
    pub stock: String,
    /// Units sold counter
    pub sold: String,
    /// Order record hash
    pub order: String,
    /// Sales history list
    pub sales: String,
}

impl InventoryKeys {
    /// Keys in the positional order the decrement procedure expects.
    pub fn into_vec(self) -> Vec<String> {
        vec![self.stock, self.sold, self.order, self.sales]
    }
}

impl KeySpace {
    /// Create a key space with the given prefix (may be empty).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A caller-named key with only the prefix applied.
    pub fn plain(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Key holding a counter value.
    pub fn counter(&self, key: &str) -> String {
        self.plain(key)
    }

    /// Key holding the hit count of one fixed rate-limit window.
    pub fn rate_window(&self, resource: &str, identifier: &str, window_index: u64) -> String {
        format!("{}{}:{}:{}", self.prefix, resource, identifier, window_index)
    }

    /// Key holding a lock's owner token.
    pub fn lock(&self, resource: &str) -> String {
        self.plain(resource)
    }

    /// Stock counter for a product.
    pub fn stock(&self, product_id: &str) -> String {
        format!("{}product:{}:stock", self.prefix, product_id)
    }

    /// Sold counter for a product.
    pub fn sold(&self, product_id: &str) -> String {
        format!("{}product:{}:sold", self.prefix, product_id)
    }

    /// Sales history list for a product.
    pub fn sales(&self, product_id: &str) -> String {
        format!("{}product:{}:sales", self.prefix, product_id)
    }

    /// Order record hash.
    pub fn order(&self, order_id: &str) -> String {
        format!("{}order:{}", self.prefix, order_id)
    }

    /// All keys touched by a decrement of `product_id` for `order_id`.
    pub fn inventory(&self, product_id: &str, order_id: &str) -> InventoryKeys {
        InventoryKeys {
            stock: self.stock(product_id),
            sold: self.sold(product_id),
            order: self.order(order_id),
            sales: self.sales(product_id),
        }
    }
}
