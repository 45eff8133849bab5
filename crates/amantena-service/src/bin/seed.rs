//! # Seed Data Generator
//!
//! Populates a fresh database with the first admin account and a starter
//! product catalog for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p amantena-service --bin seed
//!
//! # Specify database path and admin credentials
//! cargo run -p amantena-service --bin seed -- \
//!     --db ./amantena.db \
//!     --admin-email admin@amantena.farm \
//!     --admin-password change-me-soon
//! ```
//!
//! Refuses to run against a database that already has users.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use amantena_core::{Product, Role, User};
use amantena_db::{Database, DbConfig};
use amantena_service::password::hash_password;

/// Starter catalog: (name, category, price in cents, quantity, threshold)
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("Heirloom Tomatoes (lb)", "produce", 450, 40, 10),
    ("Sweet Corn (dozen)", "produce", 600, 30, 8),
    ("Butternut Squash", "produce", 350, 25, 6),
    ("Mixed Salad Greens (bag)", "produce", 400, 20, 8),
    ("Raw Honey 500g", "preserves", 1200, 18, 5),
    ("Strawberry Jam 300g", "preserves", 750, 24, 6),
    ("Apple Butter 300g", "preserves", 700, 15, 5),
    ("Free-Range Eggs (dozen)", "dairy", 550, 36, 12),
    ("Goat Cheese 200g", "dairy", 950, 12, 4),
    ("Whole Milk (half gallon)", "dairy", 480, 20, 8),
    ("Apple Cider (half gallon)", "beverages", 800, 16, 5),
    ("Cold-Pressed Juice 330ml", "beverages", 500, 30, 10),
    ("Sourdough Loaf", "bakery", 850, 14, 6),
    ("Cinnamon Rolls (4-pack)", "bakery", 900, 10, 4),
    ("Beeswax Candle", "crafts", 1100, 8, 3),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./amantena.db");
    let mut admin_email = String::from("admin@amantena.farm");
    let mut admin_password = String::from("change-me-soon");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-email" => {
                if i + 1 < args.len() {
                    admin_email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Amantena Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>            Database file path (default: ./amantena.db)");
                println!("      --admin-email <EMAIL>  First admin account email");
                println!("      --admin-password <PW>  First admin account password");
                println!("  -h, --help                 Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Amantena Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Refuse to reseed
    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} user(s)", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // First admin account
    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        name: "Farm Admin".to_string(),
        email: admin_email.trim().to_lowercase(),
        password_hash: hash_password(&admin_password)?,
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&admin).await?;

    println!("✓ Admin account created: {}", admin.email);

    // Starter catalog
    println!();
    println!("Seeding product catalog...");

    let mut seeded = 0;
    for (name, category, price_cents, quantity, threshold) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price_cents: *price_cents,
            quantity: *quantity,
            threshold: *threshold,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        seeded += 1;
    }

    println!("✓ Seeded {} products", seeded);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
