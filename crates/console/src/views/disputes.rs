use admin_api::{Dispute, DISPUTE_STATUSES};
use api_client::AdminClient;
use async_trait::async_trait;
use sync_engine::filters::format_amount;
use sync_engine::{FilterSet, Page, QueryParams, TimedEntity, ViewSource, ALL};

use super::{choice, Column, RowView, SavedFilters, TableSource, TabKind};

const FIELDS: &[&str] = &["status", "traderId", "merchantId", "disputeId", "orderId"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DisputeFilters {
    pub(crate) status: String,
    pub(crate) trader_id: String,
    pub(crate) merchant_id: String,
    pub(crate) dispute_id: String,
    pub(crate) order_id: String,
}

impl Default for DisputeFilters {
    fn default() -> Self {
        Self {
            status: ALL.to_string(),
            trader_id: String::new(),
            merchant_id: String::new(),
            dispute_id: String::new(),
            order_id: String::new(),
        }
    }
}

impl FilterSet for DisputeFilters {
    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn set(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match field {
            "status" => self.status = choice(field, value, DISPUTE_STATUSES)?,
            "traderId" => self.trader_id = value.to_string(),
            "merchantId" => self.merchant_id = value.to_string(),
            "disputeId" => self.dispute_id = value.to_string(),
            "orderId" => self.order_id = value.to_string(),
            other => anyhow::bail!(
                "unknown disputes filter {other:?} (expected one of {})",
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
            ("disputeId", self.dispute_id.clone()),
            ("orderId", self.order_id.clone()),
        ]
    }

    fn apply(&self, query: &mut QueryParams) {
        query.push_choice("status", &self.status);
        query.push_text("traderId", &self.trader_id);
        query.push_text("merchantId", &self.merchant_id);
        query.push_text("disputeId", &self.dispute_id);
        query.push_text("orderId", &self.order_id);
    }
}

pub(crate) struct DisputesSource {
    client: AdminClient,
}

impl DisputesSource {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ViewSource for DisputesSource {
    type Item = Dispute;
    type Filters = DisputeFilters;

    async fn fetch(&self, query: QueryParams) -> anyhow::Result<Page<Dispute>> {
        let page = self.client.list_disputes(query.pairs()).await?;
        Ok(Page {
            items: page.disputes,
            total_items: page.pagination.total_items,
        })
    }

    fn timed_entity(&self, item: &Dispute) -> Option<TimedEntity> {
        Some(TimedEntity::from_raw(item.id.clone(), item.accept_at.as_deref()))
    }
}

const COLUMNS: &[Column] = &[
    Column::new("id", 14),
    Column::new("order", 14),
    Column::new("status", 10),
    Column::new("amount", 10),
    Column::new("trader", 12),
    Column::new("reason", 24),
];

impl TableSource for DisputesSource {
    const KIND: TabKind = TabKind::Disputes;

    fn columns() -> &'static [Column] {
        COLUMNS
    }

    fn countdown_header() -> Option<&'static str> {
        Some("auto-accept")
    }

    fn row(item: &Dispute) -> RowView {
        RowView {
            id: item.id.clone(),
            cells: vec![
                item.id.clone(),
                item.order_id.clone().unwrap_or_default(),
                item.status.clone(),
                item.amount.map(format_amount).unwrap_or_default(),
                item.trader_id.clone().unwrap_or_default(),
                item.reason.clone().unwrap_or_default(),
            ],
            remaining: None,
            is_active: None,
        }
    }

    fn load_filters(saved: &SavedFilters) -> DisputeFilters {
        saved.disputes.clone()
    }

    fn store_filters(filters: DisputeFilters, saved: &mut SavedFilters) {
        saved.disputes = filters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_sentinel_status() {
        let mut filters = DisputeFilters::default();
        filters.set("disputeId", "d-4").unwrap();
        let mut query = QueryParams::new();
        filters.apply(&mut query);
        assert_eq!(query.pairs().len(), 1);
        assert_eq!(query.get("disputeId"), Some("d-4"));

        filters.set("status", "frozen").unwrap();
        let mut query = QueryParams::new();
        filters.apply(&mut query);
        assert_eq!(query.get("status"), Some("FROZEN"));
    }

    #[test]
    fn rejects_order_only_fields() {
        let mut filters = DisputeFilters::default();
        assert!(filters.set("amountMin", "100").is_err());
        assert!(filters.set("status", "PAID").is_err());
    }
}
