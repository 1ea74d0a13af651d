//! # CSV Export
//!
//! One row per sale line, for spreadsheets and accounting.
//!
//! ```text
//! sale_id,date,event,payment_method,product_name,sku,quantity,unit_price_inclusive_tax,line_subtotal_inclusive_tax,tax_rate
//! 7f3c…,2026-07-04T14:02:11Z,Festival Été,card,T-shirt Noir,TSHIRT-BLACK,2,25.00,50.00,8.10
//! ```
//!
//! Fields containing a quote, comma or line break are wrapped in quotes
//! with inner quotes doubled. Rows are separated by `\n`.

use std::collections::HashMap;

use chrono::SecondsFormat;

use crate::money::format_plain;
use crate::types::{Event, Product, Sale};

pub const CSV_HEADER: [&str; 10] = [
    "sale_id",
    "date",
    "event",
    "payment_method",
    "product_name",
    "sku",
    "quantity",
    "unit_price_inclusive_tax",
    "line_subtotal_inclusive_tax",
    "tax_rate",
];

/// Renders `sales` as CSV. Names are looked up in `events` and `products`;
/// an unknown product falls back to its id, an unknown event to its id.
pub fn sales_to_csv(sales: &[Sale], events: &[Event], products: &[Product]) -> String {
    let events: HashMap<&str, &Event> = events.iter().map(|e| (e.id.as_str(), e)).collect();
    let products: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut rows = Vec::with_capacity(1 + sales.iter().map(|s| s.lines.len()).sum::<usize>());
    rows.push(CSV_HEADER.join(","));

    for sale in sales {
        let date = sale.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        let event = events
            .get(sale.event_id.as_str())
            .map(|e| e.name.as_str())
            .unwrap_or(sale.event_id.as_str());

        for line in &sale.lines {
            let product = products.get(line.product_id.as_str());
            let name = product
                .map(|p| p.name.as_str())
                .unwrap_or(line.product_id.as_str());
            let sku = product.and_then(|p| p.sku.as_deref()).unwrap_or("");

            let fields = [
                escape(&sale.id),
                escape(&date),
                escape(event),
                escape(sale.payment_mode.as_str()),
                escape(name),
                escape(sku),
                line.quantity.to_string(),
                format_plain(line.unit_price_inclusive_tax),
                format_plain(line.line_subtotal_inclusive_tax),
                format_plain(line.tax_rate_percent),
            ];
            rows.push(fields.join(","));
        }
    }

    rows.join("\n")
}

/// Quotes a field if it contains `"`, `,`, `\n` or `\r`.
pub fn escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{assemble_sale, LineDraft};
    use crate::types::{EventStatus, PaymentMode};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_export_rows() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();
        let event = Event {
            id: "e1".into(),
            name: "Festival Été".into(),
            start_date: day,
            end_date: day,
            location: "Lausanne".into(),
            status: EventStatus::Active,
        };
        let now = Utc::now();
        let product = Product {
            id: "p1".into(),
            name: "Tote Bag, large".into(),
            unit_price_inclusive_tax: dec!(12),
            tax_rate_percent: dec!(8.1),
            sku: Some("TOTE".into()),
            image_ref: None,
            active: true,
            point_of_sale_ids: vec![],
            created_at: now,
            updated_at: now,
        };
        let drafts = vec![
            LineDraft {
                product_id: "p1".into(),
                quantity: 2,
                unit_price_inclusive_tax: dec!(12),
                tax_rate_percent: dec!(8.1),
            },
            LineDraft {
                product_id: "ghost".into(),
                quantity: 1,
                unit_price_inclusive_tax: dec!(5),
                tax_rate_percent: dec!(2.6),
            },
        ];
        let timestamp = Utc.with_ymd_and_hms(2026, 7, 4, 14, 2, 11).unwrap();
        let sale = assemble_sale("e1", Some("s1"), PaymentMode::Card, &drafts, timestamp).unwrap();

        let csv = sales_to_csv(&[sale.clone()], &[event], &[product]);
        let rows: Vec<&str> = csv.split('\n').collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CSV_HEADER.join(","));
        assert_eq!(
            rows[1],
            format!(
                "{},2026-07-04T14:02:11Z,Festival Été,card,\"Tote Bag, large\",TOTE,2,12.00,24.00,8.10",
                sale.id
            )
        );
        assert!(rows[2].contains(",ghost,,1,5.00,5.00,2.60"));
    }

    #[test]
    fn test_export_empty() {
        assert_eq!(sales_to_csv(&[], &[], &[]), CSV_HEADER.join(","));
    }
}
