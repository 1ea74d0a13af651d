//! Revenue summaries for the history screen and the printable report.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use ts_rs::TS;

use crate::money::round2;
use crate::totals::tax_breakdown;
use crate::types::{PaymentMode, Product, Sale};

/// Revenue split by payment mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModeRevenue {
    #[ts(type = "string")]
    pub card: Decimal,
    #[ts(type = "string")]
    pub cash: Decimal,
}

/// Units and revenue for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductRevenue {
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    #[ts(type = "string")]
    pub revenue: Decimal,
}

/// Collected tax for one rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxRateTotal {
    #[ts(type = "string")]
    pub tax_rate_percent: Decimal,
    #[ts(type = "string")]
    pub total_inclusive_tax: Decimal,
    #[ts(type = "string")]
    pub total_tax_amount: Decimal,
}

/// Headline figures over a set of sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    #[ts(type = "string")]
    pub total_revenue: Decimal,
    pub sale_count: usize,
    /// Zero when there are no sales.
    #[ts(type = "string")]
    pub average_ticket: Decimal,
    pub revenue_by_payment_mode: PaymentModeRevenue,
    /// Sorted by revenue, highest first.
    pub revenue_by_product: Vec<ProductRevenue>,
    /// Sorted by rate.
    pub tax_by_rate: Vec<TaxRateTotal>,
}

/// Summarizes `sales`; `products` only supplies display names.
pub fn summarize(sales: &[Sale], products: &[Product]) -> KpiSummary {
    let names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let mut total = Decimal::ZERO;
    let mut by_mode = PaymentModeRevenue::default();
    let mut by_product: HashMap<&str, (i64, Decimal)> = HashMap::new();

    for sale in sales {
        total = total.saturating_add(sale.total_inclusive_tax);
        let mode_total = match sale.payment_mode {
            PaymentMode::Card => &mut by_mode.card,
            PaymentMode::Cash => &mut by_mode.cash,
        };
        *mode_total = mode_total.saturating_add(sale.total_inclusive_tax);
        for line in &sale.lines {
            let entry = by_product.entry(line.product_id.as_str()).or_default();
            entry.0 = entry.0.saturating_add(line.quantity);
            entry.1 = entry.1.saturating_add(line.line_subtotal_inclusive_tax);
        }
    }

    let sale_count = sales.len();
    let average_ticket = if sale_count == 0 {
        Decimal::ZERO
    } else {
        round2(total / Decimal::from(sale_count))
    };

    let mut revenue_by_product: Vec<ProductRevenue> = by_product
        .into_iter()
        .map(|(product_id, (quantity, revenue))| ProductRevenue {
            product_id: product_id.to_string(),
            product_name: names.get(product_id).map(|n| n.to_string()),
            quantity,
            revenue: round2(revenue),
        })
        .collect();
    revenue_by_product.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let all_lines: Vec<_> = sales.iter().flat_map(|s| s.lines.iter().cloned()).collect();
    let tax_by_rate = tax_breakdown(&all_lines)
        .into_iter()
        .map(|(tax_rate_percent, total_inclusive_tax, total_tax_amount)| TaxRateTotal {
            tax_rate_percent,
            total_inclusive_tax,
            total_tax_amount,
        })
        .collect();

    KpiSummary {
        total_revenue: round2(total),
        sale_count,
        average_ticket,
        revenue_by_payment_mode: PaymentModeRevenue {
            card: round2(by_mode.card),
            cash: round2(by_mode.cash),
        },
        revenue_by_product,
        tax_by_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{assemble_sale, LineDraft};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sale(mode: PaymentMode, lines: &[(&str, i64, Decimal)]) -> Sale {
        let drafts: Vec<LineDraft> = lines
            .iter()
            .map(|(id, qty, price)| LineDraft {
                product_id: id.to_string(),
                quantity: *qty,
                unit_price_inclusive_tax: *price,
                tax_rate_percent: dec!(8.1),
            })
            .collect();
        assemble_sale("e1", Some("s1"), mode, &drafts, Utc::now()).unwrap()
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], &[]);
        assert_eq!(summary.sale_count, 0);
        assert_eq!(summary.average_ticket, Decimal::ZERO);
        assert!(summary.revenue_by_product.is_empty());
        assert!(summary.tax_by_rate.is_empty());
    }

    #[test]
    fn test_summary_figures() {
        let sales = vec![
            sale(PaymentMode::Card, &[("tshirt", 2, dec!(25.00)), ("sticker", 1, dec!(5.00))]),
            sale(PaymentMode::Cash, &[("sticker", 3, dec!(5.00))]),
            sale(PaymentMode::Cash, &[("tote", 1, dec!(12.00))]),
        ];
        let summary = summarize(&sales, &[]);

        assert_eq!(summary.total_revenue, dec!(82.00));
        assert_eq!(summary.sale_count, 3);
        assert_eq!(summary.average_ticket, dec!(27.33));
        assert_eq!(summary.revenue_by_payment_mode.card, dec!(55.00));
        assert_eq!(summary.revenue_by_payment_mode.cash, dec!(27.00));

        let top = &summary.revenue_by_product[0];
        assert_eq!(top.product_id, "tshirt");
        assert_eq!(top.quantity, 2);
        let stickers = summary
            .revenue_by_product
            .iter()
            .find(|p| p.product_id == "sticker")
            .unwrap();
        assert_eq!(stickers.quantity, 4);
        assert_eq!(stickers.revenue, dec!(20.00));
        assert_eq!(stickers.product_name, None);

        // 82.00 at 8.1 %: 82.00 - round2(82.00 / 1.081) = 82.00 - 75.86
        assert_eq!(summary.tax_by_rate.len(), 1);
        assert_eq!(summary.tax_by_rate[0].tax_rate_percent, dec!(8.1));
        assert_eq!(summary.tax_by_rate[0].total_inclusive_tax, dec!(82.00));
        assert_eq!(summary.tax_by_rate[0].total_tax_amount, dec!(6.14));
    }
}
