//! # Seed Data Generator
//!
//! Populates the database with a demo event, stands and merchandise.
//!
//! ## Usage
//! ```bash
//! # Seed ./caisse_dev.db (default)
//! cargo run -p caisse-db --bin seed
//!
//! # Specify database path
//! cargo run -p caisse-db --bin seed -- --db ./data/caisse.db
//! ```
//!
//! ## Generated Data
//! - "Festival Été" (active) with two stands: "Stand Merch" and "Bar"
//! - "Marché de Noël" (archived) with one stand
//! - Six products priced tax-inclusive in CHF, at the 8.1 % standard rate
//!   or the 2.6 % reduced rate (printed matter)
//! - The vinyl is only sold at "Stand Merch"; everything else is sold at
//!   every stand

use std::env;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use caisse_core::{Event, EventStatus, PointOfSale, Product};
use caisse_db::{Database, DbConfig, SELECTED_EVENT_KEY, SELECTED_POINT_OF_SALE_KEY};

/// (name, price in centimes, tax rate in tenths of a percent, sku, merch stand only)
const PRODUCTS: &[(&str, i64, i64, &str, bool)] = &[
    ("T-shirt Noir", 2500, 81, "TSHIRT-BLACK", false),
    ("Tote Bag", 1200, 81, "TOTE", false),
    ("Casquette", 2000, 81, "CAP", false),
    ("Affiche A3", 800, 26, "POSTER-A3", false),
    ("Sticker Pack", 500, 81, "STICKERS", false),
    ("Vinyle", 3000, 26, "VINYL", true),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./caisse_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caisse Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./caisse_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Caisse Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Events
    let festival = Event {
        id: new_id(),
        name: "Festival Été".to_string(),
        start_date: date(2026, 7, 3)?,
        end_date: date(2026, 7, 5)?,
        location: "Lausanne".to_string(),
        status: EventStatus::Active,
    };
    let christmas = Event {
        id: new_id(),
        name: "Marché de Noël".to_string(),
        start_date: date(2025, 12, 1)?,
        end_date: date(2025, 12, 24)?,
        location: "Genève".to_string(),
        status: EventStatus::Archived,
    };
    db.events().insert(&festival).await?;
    db.events().insert(&christmas).await?;
    println!("✓ Created 2 events");

    // Stands
    let merch = stand(&festival, "Stand Merch");
    let bar = stand(&festival, "Bar");
    let chalet = stand(&christmas, "Chalet");
    for point_of_sale in [&merch, &bar, &chalet] {
        db.points_of_sale().insert(point_of_sale).await?;
    }
    println!("✓ Created 3 points of sale");

    // Products
    let now = Utc::now();
    for (name, price_centimes, rate_tenths, sku, merch_only) in PRODUCTS {
        let product = Product {
            id: new_id(),
            name: name.to_string(),
            unit_price_inclusive_tax: Decimal::new(*price_centimes, 2),
            tax_rate_percent: Decimal::new(*rate_tenths, 1),
            sku: Some(sku.to_string()),
            image_ref: None,
            active: true,
            point_of_sale_ids: if *merch_only {
                vec![merch.id.clone()]
            } else {
                Vec::new()
            },
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", sku, e);
            continue;
        }
        println!("  + {} (CHF {})", product.name, product.unit_price_inclusive_tax);
    }

    // Resume the cashier on the active event's merch stand
    db.settings().set(SELECTED_EVENT_KEY, &festival.id).await?;
    db.settings().set(SELECTED_POINT_OF_SALE_KEY, &merch.id).await?;

    println!();
    println!("Verifying catalog scope...");
    let at_bar = db
        .products()
        .list_for_scope(Some(&festival.id), Some(&bar.id))
        .await?;
    let at_merch = db
        .products()
        .list_for_scope(Some(&festival.id), Some(&merch.id))
        .await?;
    println!("  Bar: {} products", at_bar.len());
    println!("  Stand Merch: {} products", at_merch.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn stand(event: &Event, name: &str) -> PointOfSale {
    PointOfSale {
        id: new_id(),
        event_id: event.id.clone(),
        name: name.to_string(),
        active: true,
    }
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, String> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("invalid date {year}-{month}-{day}"))
}
