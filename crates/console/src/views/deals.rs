use admin_api::{Order, ORDER_STATUSES};
use api_client::AdminClient;
use async_trait::async_trait;
use chrono::{Local, TimeZone};
use sync_engine::filters::format_amount;
use sync_engine::{FilterSet, Page, QueryParams, TimedEntity, ViewSource, ALL};

use super::{choice, Column, RowView, SavedFilters, TableSource, TabKind};

const FIELDS: &[&str] = &[
    "status",
    "traderId",
    "merchantId",
    "orderId",
    "amountMin",
    "amountMax",
    "dateFrom",
    "dateTo",
];

/// Filters of the deals list. Date bounds are interpreted as local days.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DealFilters {
    pub(crate) status: String,
    pub(crate) trader_id: String,
    pub(crate) merchant_id: String,
    pub(crate) order_id: String,
    pub(crate) amount_min: String,
    pub(crate) amount_max: String,
    pub(crate) date_from: String,
    pub(crate) date_to: String,
}

impl Default for DealFilters {
    fn default() -> Self {
        Self {
            status: ALL.to_string(),
            trader_id: String::new(),
            merchant_id: String::new(),
            order_id: String::new(),
            amount_min: String::new(),
            amount_max: String::new(),
            date_from: String::new(),
            date_to: String::new(),
        }
    }
}

impl DealFilters {
    fn apply_in<Tz: TimeZone>(&self, query: &mut QueryParams, tz: &Tz) {
        query.push_choice("status", &self.status);
        query.push_text("traderId", &self.trader_id);
        query.push_text("merchantId", &self.merchant_id);
        query.push_text("orderId", &self.order_id);
        query.push_amount("amountMin", &self.amount_min);
        query.push_amount("amountMax", &self.amount_max);
        query.push_day_start("dateFrom", &self.date_from, tz);
        query.push_day_end("dateTo", &self.date_to, tz);
    }
}

impl FilterSet for DealFilters {
    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn set(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match field {
            "status" => self.status = choice(field, value, ORDER_STATUSES)?,
            "traderId" => self.trader_id = value.to_string(),
            "merchantId" => self.merchant_id = value.to_string(),
            "orderId" => self.order_id = value.to_string(),
            "amountMin" => self.amount_min = value.to_string(),
            "amountMax" => self.amount_max = value.to_string(),
            "dateFrom" => self.date_from = value.to_string(),
            "dateTo" => self.date_to = value.to_string(),
            other => anyhow::bail!(
                "unknown deals filter {other:?} (expected one of {})",
                FIELDS.join(", ")
            ),
        }
        Ok(())
    }

    fn values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("status", self.status.clone()),
            ("traderId", self.trader_id.clone()),
            ("merchantId", self.merchant_id.clone()),
            ("orderId", self.order_id.clone()),
            ("amountMin", self.amount_min.clone()),
            ("amountMax", self.amount_max.clone()),
            ("dateFrom", self.date_from.clone()),
            ("dateTo", self.date_to.clone()),
        ]
    }

    fn apply(&self, query: &mut QueryParams) {
        self.apply_in(query, &Local);
    }
}

pub(crate) struct DealsSource {
    client: AdminClient,
}

impl DealsSource {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ViewSource for DealsSource {
    type Item = Order;
    type Filters = DealFilters;

    async fn fetch(&self, query: QueryParams) -> anyhow::Result<Page<Order>> {
        let page = self.client.list_orders(query.pairs()).await?;
        Ok(Page {
            items: page.orders,
            total_items: page.pagination.total_items,
        })
    }

    fn timed_entity(&self, item: &Order) -> Option<TimedEntity> {
        Some(TimedEntity::from_raw(item.id.clone(), item.expires_at.as_deref()))
    }
}

const COLUMNS: &[Column] = &[
    Column::new("id", 14),
    Column::new("status", 12),
    Column::new("amount", 12),
    Column::new("trader", 12),
    Column::new("merchant", 12),
    Column::new("method", 10),
];

impl TableSource for DealsSource {
    const KIND: TabKind = TabKind::Deals;

    fn columns() -> &'static [Column] {
        COLUMNS
    }

    fn countdown_header() -> Option<&'static str> {
        Some("expires in")
    }

    fn row(item: &Order) -> RowView {
        let amount = match item.currency.as_deref() {
            Some(currency) => format!("{} {currency}", format_amount(item.amount)),
            None => format_amount(item.amount),
        };
        RowView {
            id: item.id.clone(),
            cells: vec![
                item.id.clone(),
                item.status.clone(),
                amount,
                item.trader_id.clone().unwrap_or_default(),
                item.merchant_id.clone().unwrap_or_default(),
                item.payment_method.clone().unwrap_or_default(),
            ],
            remaining: None,
            is_active: None,
        }
    }

    fn load_filters(saved: &SavedFilters) -> DealFilters {
        saved.deals.clone()
    }

    fn store_filters(filters: DealFilters, saved: &mut SavedFilters) {
        saved.deals = filters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn serializes_only_constrained_fields() {
        let mut filters = DealFilters::default();
        filters.set("traderId", " t-7 ").unwrap();
        filters.set("amountMin", "1 000,5").unwrap();
        filters.set("amountMax", "lots").unwrap();
        filters.set("dateFrom", "2024-03-05").unwrap();
        filters.set("dateTo", "2024-03-06").unwrap();

        let mut query = QueryParams::new();
        filters.apply_in(&mut query, &Utc);
        assert!(!query.contains("status"));
        assert!(!query.contains("amountMax"));
        assert_eq!(query.get("traderId"), Some("t-7"));
        assert_eq!(query.get("amountMin"), Some("1000.5"));
        assert_eq!(query.get("dateFrom"), Some("2024-03-05T00:00:00.000Z"));
        assert_eq!(query.get("dateTo"), Some("2024-03-06T23:59:59.999Z"));
    }

    #[test]
    fn validates_status_and_field_names() {
        let mut filters = DealFilters::default();
        filters.set("status", "completed").unwrap();
        assert_eq!(filters.status, "COMPLETED");
        filters.set("status", "ALL").unwrap();
        assert_eq!(filters.status, ALL);
        assert!(filters.set("status", "LOST").is_err());
        assert!(filters.set("colour", "red").is_err());
    }

    #[test]
    fn renders_amount_with_currency() {
        let order: Order = serde_json::from_str(
            r#"{"id":"o-1","status":"PENDING","amount":1500,"currency":"RUB","trader_id":"t-1"}"#,
        )
        .unwrap();
        let row = DealsSource::row(&order);
        assert_eq!(row.id, "o-1");
        assert_eq!(row.cells[2], "1500 RUB");
        assert_eq!(row.cells[3], "t-1");
        assert_eq!(row.cells[4], "");
    }
}
