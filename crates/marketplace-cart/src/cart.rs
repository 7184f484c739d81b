//! Cart and line item types.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CartError;
use crate::ids::ProductId;

/// A line item in the cart.
///
/// Field names match the persisted snapshot format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Product title (denormalized for display).
    pub title: String,
    /// Product image.
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    /// Unit price.
    pub price: f64,
    /// Quantity, at least 1 for items held in a cart.
    pub quantity: i64,
}

/// A product being added to the cart: a [`LineItem`] without a quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLineItem {
    pub id: ProductId,
    pub title: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    pub price: f64,
}

impl NewLineItem {
    /// Create a new item to add.
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }

    /// Turn into a line item with the given quantity.
    pub fn with_quantity(self, quantity: i64) -> LineItem {
        LineItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity,
        }
    }
}

/// The ordered set of line items in a cart.
///
/// No two items share an `id`. Items keep the position of their first add;
/// updates happen in place. Serializes as a plain JSON array of items.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from a stored snapshot.
    ///
    /// Fails if two items share an id.
    pub fn from_items(items: Vec<LineItem>) -> Result<Self, CartError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CartError::MalformedSnapshot(format!(
                    "duplicate line item id: {}",
                    item.id
                )));
            }
        }
        Ok(Self { items })
    }

    /// Add a product.
    ///
    /// An existing item with the same id is replaced by the new fields with
    /// its quantity increased by one. Otherwise the product is appended with
    /// quantity 1.
    pub fn add(&mut self, item: NewLineItem) -> Result<bool, CartError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            let quantity = existing
                .quantity
                .checked_add(1)
                .ok_or(CartError::Overflow)?;
            *existing = item.with_quantity(quantity);
        } else {
            self.items.push(item.with_quantity(1));
        }
        Ok(true)
    }

    /// Increase the quantity of the item with `id` by one.
    ///
    /// Returns `false` if no item matches.
    pub fn increment(&mut self, id: &ProductId) -> Result<bool, CartError> {
        match self.items.iter_mut().find(|i| &i.id == id) {
            Some(item) => {
                item.quantity = item.quantity.checked_add(1).ok_or(CartError::Overflow)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Decrease the quantity of the item with `id` by one, then drop every
    /// item whose quantity is no longer positive.
    ///
    /// Returns whether the cart changed.
    pub fn decrement(&mut self, id: &ProductId) -> Result<bool, CartError> {
        let mut changed = false;
        if let Some(item) = self.items.iter_mut().find(|i| &i.id == id) {
            item.quantity = item.quantity.checked_sub(1).ok_or(CartError::Overflow)?;
            changed = true;
        }

        let len_before = self.items.len();
        self.items.retain(|i| i.quantity > 0);
        Ok(changed || self.items.len() < len_before)
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consume and return the items.
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Get an item by id.
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Check if an item with `id` is in the cart.
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Get number of unique items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get total item count (sum of quantities), saturating at `i64::MAX`.
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |total, i| total.saturating_add(i.quantity))
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<LineItem>::deserialize(deserializer)?;
        Cart::from_items(items).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, title: &str) -> NewLineItem {
        NewLineItem::new(id, title, format!("https://img/{id}.png"), 10.0)
    }

    fn cart_with(id: &str, quantity: i64) -> Cart {
        Cart::from_items(vec![product(id, "T").with_quantity(quantity)]).unwrap()
    }

    #[test]
    fn test_add_new_item() {
        let mut cart = Cart::new();
        cart.add(NewLineItem::new("a", "T", "u", 10.0)).unwrap();

        assert_eq!(
            cart.items(),
            &[LineItem {
                id: ProductId::new("a"),
                title: "T".into(),
                image_url: "u".into(),
                price: 10.0,
                quantity: 1,
            }]
        );
    }

    #[test]
    fn test_add_existing_refreshes_fields() {
        let mut cart = cart_with("a", 2);
        cart.add(NewLineItem::new("a", "T2", "u2", 12.5)).unwrap();

        assert_eq!(cart.len(), 1);
        let item = cart.get(&"a".into()).unwrap();
        assert_eq!(item.title, "T2");
        assert_eq!(item.image_url, "u2");
        assert_eq!(item.price, 12.5);
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_add_preserves_order() {
        let mut cart = Cart::new();
        cart.add(product("a", "A")).unwrap();
        cart.add(product("b", "B")).unwrap();
        cart.add(product("a", "A again")).unwrap();

        let ids: Vec<_> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_increment_missing_is_noop() {
        let mut cart = cart_with("a", 1);
        let before = cart.clone();

        assert!(!cart.increment(&"z".into()).unwrap());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_increment_overflow() {
        let mut cart = cart_with("a", i64::MAX);
        assert!(matches!(cart.increment(&"a".into()), Err(CartError::Overflow)));
        assert_eq!(cart.get(&"a".into()).unwrap().quantity, i64::MAX);
    }

    #[test]
    fn test_decrement_to_zero_removes() {
        let mut cart = cart_with("a", 1);
        assert!(cart.decrement(&"a".into()).unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_decrement_above_zero_retains() {
        let mut cart = cart_with("a", 2);
        cart.decrement(&"a".into()).unwrap();
        assert_eq!(cart.get(&"a".into()).unwrap().quantity, 1);
    }

    #[test]
    fn test_decrement_drops_non_positive_items() {
        let mut cart = Cart::from_items(vec![
            product("a", "A").with_quantity(0),
            product("b", "B").with_quantity(3),
        ])
        .unwrap();

        assert!(cart.decrement(&"missing".into()).unwrap());
        assert_eq!(cart.len(), 1);
        assert!(cart.contains(&"b".into()));
    }

    #[test]
    fn test_item_count() {
        let mut cart = cart_with("a", 2);
        cart.add(product("b", "B")).unwrap();
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_item_count_saturates() {
        let cart = Cart::from_items(vec![
            product("a", "A").with_quantity(i64::MAX),
            product("b", "B").with_quantity(5),
        ])
        .unwrap();
        assert_eq!(cart.item_count(), i64::MAX);
    }

    #[test]
    fn test_snapshot_format() {
        let cart = Cart::from_items(vec![NewLineItem::new("a", "T", "u", 10.0).with_quantity(2)])
            .unwrap();
        let json = serde_json::to_string(&cart).unwrap();

        assert_eq!(
            json,
            r#"[{"id":"a","title":"T","image_url":"u","price":10.0,"quantity":2}]"#
        );
    }

    #[test]
    fn test_snapshot_accepts_camel_case_image() {
        let cart: Cart = serde_json::from_str(
            r#"[{"id":"a","title":"T","imageUrl":"u","price":10,"quantity":1}]"#,
        )
        .unwrap();
        assert_eq!(cart.items()[0].image_url, "u");
    }

    #[test]
    fn test_snapshot_rejects_duplicate_ids() {
        let result: Result<Cart, _> = serde_json::from_str(
            r#"[{"id":"a","title":"T","image_url":"u","price":1,"quantity":1},
                {"id":"a","title":"T","image_url":"u","price":1,"quantity":2}]"#,
        );
        assert!(result.is_err());
    }
}
