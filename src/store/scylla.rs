use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use futures_util::future::join_all;
use futures_util::TryStreamExt;
use scylla::client::session::Session;
use scylla::serialize::row::SerializeRow;
use scylla::value::{CqlValue, Row};
use std::sync::Arc;
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{
    response_timestamp, GeoPoint, Order, OrderDraft, OrderError, OrderItem, OrderLocation,
    OrderStatus,
};

// ============================================================================
// ScyllaDB Order Store
// ============================================================================
//
// Tables:
// - orders           - one row per order, keyed by id
// - orders_by_buyer  - (buyer_id, created_at DESC, order_id) for listing
//
// Every write to `orders` is a lightweight transaction, so Paxos ballots
// order the insert and all later updates. Mixing in a plain write would let
// its coordinator timestamp outrank an accepted response. `create` inserts
// with IF NOT EXISTS and then adds the buyer index row. `transition` is
// `UPDATE ... IF status = ?`; the echoed `status` column tells a conflict
// apart from a missing row.
//
// ============================================================================

const ORDER_COLUMNS: &str = "id, buyer_id, seller_id, status, items, total_amount, \
     longitude, latitude, address, prescription_image, responded_at, created_at, updated_at";

type OrderRow = (
    Uuid,
    String,
    Option<String>,
    String,
    String,
    f64,
    f64,
    f64,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
);

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Create keyspace and tables if missing, then switch the session to the
    /// keyspace.
    pub async fn ensure_schema(session: &Session, keyspace: &str) -> anyhow::Result<()> {
        if keyspace.is_empty() || !keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            anyhow::bail!("Invalid keyspace name: {keyspace:?}");
        }

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
                ),
                (),
            )
            .await?;
        session.use_keyspace(keyspace, false).await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS orders (
                    id uuid PRIMARY KEY,
                    buyer_id text,
                    seller_id text,
                    status text,
                    items text,
                    total_amount double,
                    longitude double,
                    latitude double,
                    address text,
                    prescription_image text,
                    responded_at timestamp,
                    created_at timestamp,
                    updated_at timestamp
                )",
                (),
            )
            .await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS orders_by_buyer (
                    buyer_id text,
                    created_at timestamp,
                    order_id uuid,
                    PRIMARY KEY ((buyer_id), created_at, order_id)
                ) WITH CLUSTERING ORDER BY (created_at DESC, order_id DESC)",
                (),
            )
            .await?;

        tracing::info!(keyspace = %keyspace, "✅ Order schema ready");
        Ok(())
    }

    /// Run a conditional statement and decode its `[applied]` row.
    async fn conditional(
        &self,
        statement: &str,
        values: impl SerializeRow,
    ) -> Result<LwtOutcome, StoreError> {
        let rows = self
            .session
            .query_unpaged(statement, values)
            .await
            .map_err(StoreError::backend)?
            .into_rows_result()
            .map_err(StoreError::backend)?;

        let columns: Vec<String> = rows
            .column_specs()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();
        let row = rows
            .maybe_first_row::<Row>()
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::Backend("LWT returned no result row".to_string()))?;

        lwt_outcome(&columns, &row)
    }

    async fn fetch(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let rows = self
            .session
            .query_unpaged(
                format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"),
                (order_id,),
            )
            .await
            .map_err(StoreError::backend)?
            .into_rows_result()
            .map_err(StoreError::backend)?;

        rows.maybe_first_row::<OrderRow>()
            .map_err(StoreError::backend)?
            .map(order_from_row)
            .transpose()
    }
}

/// Decode a row of `ORDER_COLUMNS` into an order.
fn order_from_row(row: OrderRow) -> Result<Order, StoreError> {
    let (
        id,
        buyer_id,
        seller_id,
        status,
        items,
        total_amount,
        longitude,
        latitude,
        address,
        prescription_image,
        responded_at,
        created_at,
        updated_at,
    ) = row;

    let status: OrderStatus = status.parse()?;
    let items: Vec<OrderItem> = serde_json::from_str(&items).map_err(StoreError::backend)?;

    Ok(Order {
        id,
        buyer_id,
        items,
        total_amount,
        location: OrderLocation {
            point: GeoPoint { longitude, latitude },
            address,
        },
        prescription_image,
        status,
        seller_id,
        responded_at,
        created_at,
        updated_at,
    })
}

/// Outcome of a conditional statement, read from the `[applied]` column and
/// the echoed `status` column of an LWT result row.
#[derive(Debug, PartialEq)]
enum LwtOutcome {
    Applied,
    Missing,
    Rejected(String),
}

/// Columns are looked up by name; the server only echoes the existing row's
/// columns when the condition failed on a row that exists.
fn lwt_outcome(columns: &[String], row: &Row) -> Result<LwtOutcome, StoreError> {
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| row.columns.get(idx))
            .and_then(Option::as_ref)
    };

    let applied = column("[applied]")
        .and_then(CqlValue::as_boolean)
        .ok_or_else(|| StoreError::Backend("LWT result without [applied] column".to_string()))?;

    if applied {
        return Ok(LwtOutcome::Applied);
    }

    Ok(match column("status").and_then(CqlValue::as_text) {
        Some(status) => LwtOutcome::Rejected(status.clone()),
        None => LwtOutcome::Missing,
    })
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        draft.validate()?;
        // Scylla timestamps are millisecond precision
        let order = Order::from_draft(draft, Utc::now().trunc_subsecs(3));
        let items_json = serde_json::to_string(&order.items).map_err(StoreError::backend)?;

        let inserted = self
            .conditional(
                &format!(
                    "INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     IF NOT EXISTS"
                ),
                (
                    order.id,
                    order.buyer_id.as_str(),
                    order.seller_id.as_deref(),
                    order.status.as_str(),
                    items_json,
                    order.total_amount,
                    order.location.point.longitude,
                    order.location.point.latitude,
                    order.location.address.as_deref(),
                    order.prescription_image.as_deref(),
                    order.responded_at,
                    order.created_at,
                    order.updated_at,
                ),
            )
            .await?;
        if inserted != LwtOutcome::Applied {
            return Err(StoreError::Backend(format!("order id {} already exists", order.id)));
        }

        // The buyer index is never updated, so a plain write is safe here
        self.session
            .query_unpaged(
                "INSERT INTO orders_by_buyer (buyer_id, created_at, order_id) VALUES (?, ?, ?)",
                (order.buyer_id.as_str(), order.created_at, order.id),
            )
            .await
            .map_err(|e| {
                tracing::error!(order_id = %order.id, error = %e, "❌ Order stored but buyer index write failed");
                StoreError::backend(e)
            })?;

        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            item_count = order.items.len(),
            "✅ Persisted order"
        );

        Ok(order)
    }

    async fn get(&self, order_id: Uuid) -> Result<Order, StoreError> {
        self.fetch(order_id)
            .await?
            .ok_or(StoreError::NotFound(order_id))
    }

    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StoreError> {
        let rows = self
            .session
            .query_unpaged(
                "SELECT order_id FROM orders_by_buyer WHERE buyer_id = ?",
                (buyer_id,),
            )
            .await
            .map_err(StoreError::backend)?
            .into_rows_result()
            .map_err(StoreError::backend)?;

        let ids = rows
            .rows::<(Uuid,)>()
            .map_err(StoreError::backend)?
            .map(|row| row.map(|(id,)| id).map_err(StoreError::backend))
            .collect::<Result<Vec<_>, _>>()?;

        // clustering order already gives newest first; keep it
        let mut orders = Vec::with_capacity(ids.len());
        for (id, fetched) in ids.iter().zip(join_all(ids.iter().map(|id| self.fetch(*id))).await) {
            match fetched? {
                Some(order) => orders.push(order),
                None => tracing::warn!(order_id = %id, buyer_id = %buyer_id, "Buyer index points at missing order"),
            }
        }
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders = self
            .session
            .query_iter(format!("SELECT {ORDER_COLUMNS} FROM orders"), ())
            .await
            .map_err(StoreError::backend)?
            .rows_stream::<OrderRow>()
            .map_err(StoreError::backend)?
            .map_err(StoreError::backend)
            .and_then(|row| async move { order_from_row(row) })
            .try_collect::<Vec<_>>()
            .await?;

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        seller_id: Option<&str>,
    ) -> Result<Order, StoreError> {
        if !expected.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition { from: expected, to: next }.into());
        }

        let current = self.fetch(order_id).await?.ok_or(StoreError::NotFound(order_id))?;
        let now = Utc::now().trunc_subsecs(3);
        let updated_at = now.max(current.updated_at);

        let outcome = match seller_id {
            Some(seller_id) => {
                let responded_at = response_timestamp(current.created_at, now);
                self.conditional(
                    "UPDATE orders SET status = ?, seller_id = ?, responded_at = ?, updated_at = ? \
                     WHERE id = ? IF status = ?",
                    (next.as_str(), seller_id, responded_at, updated_at, order_id, expected.as_str()),
                )
                .await?
            }
            None => {
                self.conditional(
                    "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? IF status = ?",
                    (next.as_str(), updated_at, order_id, expected.as_str()),
                )
                .await?
            }
        };

        match outcome {
            LwtOutcome::Applied => {
                tracing::info!(
                    order_id = %order_id,
                    from = %expected,
                    to = %next,
                    seller_id = ?seller_id,
                    "Order transition applied"
                );
                self.get(order_id).await
            }
            LwtOutcome::Missing => Err(StoreError::NotFound(order_id)),
            LwtOutcome::Rejected(current) => Err(StoreError::Conflict {
                order_id,
                current: current.parse()?,
            }),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Round trips against a live cluster are exercised by running the service
// against ScyllaDB; here we cover row decoding and LWT result handling for
// both the conditional insert and the conditional update.
//
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, seller: Option<&str>) -> OrderRow {
        let created = Utc::now().trunc_subsecs(3);
        (
            Uuid::new_v4(),
            "b1".to_string(),
            seller.map(str::to_string),
            status.to_string(),
            r#"[{"name":"Paracetamol","manufacturer":"Acme","unitPrice":2.5,"quantity":2}]"#.to_string(),
            5.0,
            77.59,
            12.97,
            Some("MG Road".to_string()),
            None,
            seller.map(|_| created),
            created,
            created,
        )
    }

    #[test]
    fn test_order_from_row() {
        let order = order_from_row(row("accepted", Some("s1"))).unwrap();

        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.location.point.latitude, 12.97);
        assert!(order.response_fields_consistent());
    }

    #[test]
    fn test_order_from_row_with_unknown_status() {
        let err = order_from_row(row("archived", None)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(OrderError::UnknownStatus(_))));
    }

    fn lwt_row(columns: &[(&str, Option<CqlValue>)]) -> (Vec<String>, Row) {
        (
            columns.iter().map(|(name, _)| name.to_string()).collect(),
            Row { columns: columns.iter().map(|(_, value)| value.clone()).collect() },
        )
    }

    #[test]
    fn test_lwt_outcomes() {
        let (names, applied) = lwt_row(&[("[applied]", Some(CqlValue::Boolean(true)))]);
        assert_eq!(lwt_outcome(&names, &applied).unwrap(), LwtOutcome::Applied);

        let (names, rejected) = lwt_row(&[
            ("[applied]", Some(CqlValue::Boolean(false))),
            ("status", Some(CqlValue::Text("accepted".into()))),
        ]);
        assert_eq!(
            lwt_outcome(&names, &rejected).unwrap(),
            LwtOutcome::Rejected("accepted".to_string())
        );

        let (names, missing) = lwt_row(&[("[applied]", Some(CqlValue::Boolean(false))), ("status", None)]);
        assert_eq!(lwt_outcome(&names, &missing).unwrap(), LwtOutcome::Missing);

        let (names, malformed) = lwt_row(&[]);
        assert!(lwt_outcome(&names, &malformed).is_err());
    }

    #[test]
    fn test_lwt_outcome_reads_columns_by_name() {
        // a failed IF NOT EXISTS echoes the whole existing row, status not second
        let (names, row) = lwt_row(&[
            ("[applied]", Some(CqlValue::Boolean(false))),
            ("id", Some(CqlValue::Uuid(Uuid::new_v4()))),
            ("address", Some(CqlValue::Text("MG Road".into()))),
            ("buyer_id", Some(CqlValue::Text("b1".into()))),
            ("status", Some(CqlValue::Text("pending".into()))),
        ]);
        assert_eq!(
            lwt_outcome(&names, &row).unwrap(),
            LwtOutcome::Rejected("pending".to_string())
        );

        let (names, row) = lwt_row(&[
            ("status", Some(CqlValue::Text("rejected".into()))),
            ("[applied]", Some(CqlValue::Boolean(false))),
        ]);
        assert_eq!(
            lwt_outcome(&names, &row).unwrap(),
            LwtOutcome::Rejected("rejected".to_string())
        );
    }

    #[test]
    fn test_insert_if_not_exists_outcome() {
        let (names, fresh) = lwt_row(&[("[applied]", Some(CqlValue::Boolean(true)))]);
        assert_eq!(lwt_outcome(&names, &fresh).unwrap(), LwtOutcome::Applied);

        let (names, duplicate) = lwt_row(&[
            ("[applied]", Some(CqlValue::Boolean(false))),
            ("id", Some(CqlValue::Uuid(Uuid::new_v4()))),
            ("status", Some(CqlValue::Text("accepted".into()))),
        ]);
        assert_ne!(lwt_outcome(&names, &duplicate).unwrap(), LwtOutcome::Applied);
    }
}
