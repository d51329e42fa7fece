//! Managed entities and their CRUD endpoint catalog.
//!
//! One [`CrudApi`] per collection pins the admin dashboard paths
//! (`/menus`, `/categories`, …) and decodes responses into the typed
//! entities below. List endpoints may answer with a bare array or with the
//! paginated envelope; both are accepted. Money amounts are integer minor
//! units.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::api::{ApiClient, Page};
use crate::error::Error;
use crate::fetch::{FetchRequest, PaginatedFetcher};
use crate::session::Role;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    pub category_id: i64,
    pub status: MenuStatus,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    #[serde(default)]
    pub id: i64,
    pub number: u32,
    pub capacity: u32,
    pub status: TableStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Served,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_id: i64,
    pub name: String,
    pub quantity: u32,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub table_id: Option<i64>,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Booked,
    Seated,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(default)]
    pub id: i64,
    pub customer_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub table_id: i64,
    pub party_size: u32,
    pub reserved_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Qris,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: i64,
    pub order_id: i64,
    pub method: PaymentMethod,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// CRUD catalog
// ---------------------------------------------------------------------------

/// Typed CRUD access to one collection endpoint.
pub struct CrudApi<T> {
    client: Arc<dyn ApiClient>,
    base: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl CrudApi<MenuItem> {
    pub fn menus(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/menus")
    }

    /// `PUT /menus/{id}/status`.
    pub async fn update_status(&self, id: i64, status: MenuStatus) -> Result<MenuItem, Error> {
        self.set_status(id, status).await
    }
}

impl CrudApi<Category> {
    pub fn categories(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/categories")
    }
}

impl CrudApi<DiningTable> {
    pub fn tables(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/tables")
    }

    /// `PUT /tables/{id}/status`.
    pub async fn update_status(
        &self,
        id: i64,
        status: TableStatus,
    ) -> Result<DiningTable, Error> {
        self.set_status(id, status).await
    }
}

impl CrudApi<Order> {
    pub fn orders(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/orders")
    }

    /// `PUT /orders/{id}/status`.
    pub async fn update_status(&self, id: i64, status: OrderStatus) -> Result<Order, Error> {
        self.set_status(id, status).await
    }
}

impl CrudApi<Reservation> {
    pub fn reservations(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/reservations")
    }
}

impl CrudApi<Payment> {
    pub fn payments(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/payments")
    }
}

impl CrudApi<User> {
    pub fn users(client: Arc<dyn ApiClient>) -> Self {
        Self::at(client, "/users")
    }
}

impl<T> CrudApi<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    fn at(client: Arc<dyn ApiClient>, base: &'static str) -> Self {
        Self {
            client,
            base,
            _entity: PhantomData,
        }
    }

    pub fn base_path(&self) -> &'static str {
        self.base
    }

    fn decode<D: DeserializeOwned>(value: Value) -> Result<D, Error> {
        serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Fetch the whole collection. Accepts both a bare JSON array and the
    /// paginated envelope (in which case the envelope's `data` is returned).
    pub async fn list(&self) -> Result<Vec<T>, Error> {
        let value = self.client.get(self.base, &[]).await?;
        if value.is_array() {
            Self::decode(value)
        } else {
            Self::decode::<Page<T>>(value).map(|page| page.data)
        }
    }

    pub async fn get(&self, id: i64) -> Result<T, Error> {
        let value = self.client.get(&format!("{}/{id}", self.base), &[]).await?;
        Self::decode(value)
    }

    pub async fn create<B: Serialize + Sync>(&self, body: &B) -> Result<T, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Decode(e.to_string()))?;
        let value = self.client.post(self.base, &body).await?;
        Self::decode(value)
    }

    pub async fn update<B: Serialize + Sync>(&self, id: i64, body: &B) -> Result<T, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Decode(e.to_string()))?;
        let value = self
            .client
            .put(&format!("{}/{id}", self.base), &body)
            .await?;
        Self::decode(value)
    }

    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        self.client.delete(&format!("{}/{id}", self.base)).await?;
        Ok(())
    }

    // Status routes exist only for menus, tables, and orders; those impls
    // expose `update_status` with their own status enum.
    async fn set_status<S: Serialize + Sync>(&self, id: i64, status: S) -> Result<T, Error> {
        let body = serde_json::json!({ "status": status });
        let value = self
            .client
            .put(&format!("{}/{id}/status", self.base), &body)
            .await?;
        Self::decode(value)
    }

    /// The request a single-resource [`Fetcher`](crate::fetch::Fetcher)
    /// would use for this collection with the given filters.
    pub fn list_request(&self, filters: &[(&str, &str)]) -> FetchRequest {
        let mut request = FetchRequest::new(self.base);
        for (key, value) in filters {
            request = request.with_query(*key, *value);
        }
        request
    }

    /// A paginated fetcher bound to this collection.
    pub fn paginated(&self) -> PaginatedFetcher<T> {
        PaginatedFetcher::new(self.client.clone(), self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApiClient;
    use serde_json::json;

    fn menu_json(id: i64, name: &str) -> Value {
        json!({
            "id": id, "name": name, "price": 25_000,
            "categoryId": 2, "status": "available"
        })
    }

    #[tokio::test]
    async fn list_accepts_bare_array() {
        let client = Arc::new(FakeApiClient::new());
        client.push_ok(json!([menu_json(1, "Nasi Goreng"), menu_json(2, "Sate Ayam")]));
        let menus = CrudApi::menus(client.clone());

        let items = menus.list().await.expect("list");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Nasi Goreng");
        assert_eq!(items[0].status, MenuStatus::Available);
        assert_eq!(client.calls(), vec!["GET /menus"]);
    }

    #[tokio::test]
    async fn list_accepts_paginated_envelope() {
        let client = Arc::new(FakeApiClient::new());
        client.push_ok(json!({
            "data": [menu_json(1, "Es Teh")],
            "page": 1, "limit": 10, "total": 1, "totalPages": 1
        }));
        let menus = CrudApi::menus(client);

        let items = menus.list().await.expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Es Teh");
    }

    #[tokio::test]
    async fn crud_paths_follow_the_catalog() {
        let client = Arc::new(FakeApiClient::new());
        client.push_ok(menu_json(7, "Gado-Gado"));
        client.push_ok(menu_json(8, "Bakso"));
        client.push_ok(menu_json(8, "Bakso Spesial"));
        client.push_ok(Value::Null);
        client.push_ok(menu_json(7, "Gado-Gado"));
        let menus = CrudApi::menus(client.clone());

        menus.get(7).await.expect("get");
        menus
            .create(&json!({"name": "Bakso", "price": 18_000, "categoryId": 1, "status": "available"}))
            .await
            .expect("create");
        menus
            .update(8, &json!({"name": "Bakso Spesial"}))
            .await
            .expect("update");
        menus.delete(8).await.expect("delete");
        menus
            .update_status(7, MenuStatus::Unavailable)
            .await
            .expect("status");

        assert_eq!(
            client.calls(),
            vec![
                "GET /menus/7",
                "POST /menus",
                "PUT /menus/8",
                "DELETE /menus/8",
                "PUT /menus/7/status",
            ]
        );
    }

    #[tokio::test]
    async fn status_routes_send_the_typed_vocabulary() {
        let client = Arc::new(FakeApiClient::new());
        client.push_ok(json!({"id": 4, "number": 4, "capacity": 2, "status": "occupied"}));
        client.push_ok(json!({
            "id": 9, "tableId": 4, "items": [], "total": 0,
            "status": "cancelled", "createdAt": "2024-05-01T10:30:00Z"
        }));

        let table = CrudApi::tables(client.clone())
            .update_status(4, TableStatus::Occupied)
            .await
            .expect("table status");
        assert_eq!(table.status, TableStatus::Occupied);

        let order = CrudApi::orders(client.clone())
            .update_status(9, OrderStatus::Cancelled)
            .await
            .expect("order status");
        assert_eq!(order.status, OrderStatus::Cancelled);

        assert_eq!(
            client.calls(),
            vec!["PUT /tables/4/status", "PUT /orders/9/status"]
        );
    }

    #[tokio::test]
    async fn validation_errors_pass_through_untouched() {
        let client = Arc::new(FakeApiClient::new());
        client.push_err(Error::Validation("price must be positive".into()));
        let menus = CrudApi::menus(client);

        let err = menus
            .create(&json!({"name": "x", "price": -1}))
            .await
            .expect_err("must fail");
        assert_eq!(err, Error::Validation("price must be positive".into()));
    }

    #[test]
    fn list_request_carries_filters() {
        let client = Arc::new(FakeApiClient::new());
        let orders = CrudApi::orders(client);
        let request = orders.list_request(&[("status", "pending")]);
        assert_eq!(request.path, "/orders");
        assert_eq!(
            request.query,
            vec![("status".to_string(), "pending".to_string())]
        );
    }

    #[tokio::test]
    async fn paginated_fetcher_uses_collection_path() {
        let client = Arc::new(FakeApiClient::new());
        client.push_ok(json!({
            "data": [menu_json(1, "Soto")],
            "page": 1, "limit": 10, "total": 1, "totalPages": 1
        }));
        let fetcher = CrudApi::menus(client.clone()).paginated();
        let items = fetcher.refetch().await.expect("page");
        assert_eq!(items[0].name, "Soto");
        assert_eq!(client.calls(), vec!["GET /menus?page=1&limit=10"]);
    }

    #[test]
    fn order_timestamps_round_trip_rfc3339() {
        let order: Order = serde_json::from_value(json!({
            "id": 1,
            "tableId": 4,
            "items": [{"menuId": 1, "name": "Soto", "quantity": 2, "price": 20_000}],
            "total": 40_000,
            "status": "preparing",
            "createdAt": "2024-05-01T10:30:00Z"
        }))
        .expect("decode order");
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.created_at.to_rfc3339(), "2024-05-01T10:30:00+00:00");
    }
}
