//! Storage seam implementations used by the checkout workflow.

use async_trait::async_trait;

use caisse_core::{CatalogSource, Product, Sale, SaleStore, Scope, StoreError};

use crate::pool::Database;

#[async_trait]
impl CatalogSource for Database {
    async fn products_for(&self, scope: &Scope) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products()
            .list_for_scope(scope.event_id.as_deref(), scope.point_of_sale_id.as_deref())
            .await?)
    }
}

#[async_trait]
impl SaleStore for Database {
    async fn create_sale(&self, sale: &Sale) -> Result<Sale, StoreError> {
        Ok(self.sales().insert(sale).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use caisse_core::checkout::{checkout, CheckoutGate, CheckoutOptions};
    use caisse_core::{Event, EventStatus, PaymentMode, PointOfSale, PosSession, Selection};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_checkout_against_sqlite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        db.events()
            .insert(&Event {
                id: "e1".into(),
                name: "Festival".into(),
                start_date: day,
                end_date: day,
                location: String::new(),
                status: EventStatus::Active,
            })
            .await
            .unwrap();
        db.points_of_sale()
            .insert(&PointOfSale {
                id: "s1".into(),
                event_id: "e1".into(),
                name: "Bar".into(),
                active: true,
            })
            .await
            .unwrap();
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: "p1".into(),
                name: "T-shirt".into(),
                unit_price_inclusive_tax: dec!(25.00),
                tax_rate_percent: dec!(8.1),
                sku: None,
                image_ref: None,
                active: true,
                point_of_sale_ids: vec![],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let session = Mutex::new(PosSession::new(Selection::restore(
            Some("e1".into()),
            Some("s1".into()),
        )));
        session.lock().unwrap().cart.add("p1").unwrap();
        session.lock().unwrap().cart.add("p1").unwrap();

        let gate = CheckoutGate::new();
        let receipt = checkout(
            &gate,
            &session,
            &db,
            &db,
            PaymentMode::Card,
            CheckoutOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.sale.total_inclusive_tax, dec!(50.00));
        assert_eq!(receipt.sale.total_exclusive_tax, dec!(46.25));
        assert!(session.lock().unwrap().cart.is_empty());

        let stored = db.sales().get_by_id(&receipt.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.point_of_sale_id.as_deref(), Some("s1"));
    }
}
