//! # Seed Data Loader
//!
//! Loads the demo branches, staff, catalog and opening stock.
//!
//! ## Usage
//! ```bash
//! # Seed ./brewline_dev.db
//! cargo run -p brewline-db --bin seed
//!
//! # Specify database path
//! cargo run -p brewline-db --bin seed -- --db ./data/brewline.db
//! ```
//!
//! Every account's password is `demo123`. An already seeded database is
//! left untouched.

use std::env;
use std::time::Instant;

use brewline_db::seed::{seed_demo_data, DEMO_PASSWORD};
use brewline_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut db_path = String::from("./brewline_dev.db");

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" | "-d" => {
                db_path = args.next().ok_or("--db expects a file path")?;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                return Ok(());
            }
        }
    }

    println!("Brewline Seed Data Loader");
    println!("=========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Database open, schema current");

    let started = Instant::now();
    let summary = seed_demo_data(&db).await?;

    if summary.skipped {
        println!("⚠ Branches already exist, nothing written.");
        println!("  Remove {} to start over.", db_path);
        db.close().await;
        return Ok(());
    }

    println!();
    println!("✓ Seeded in {:?}", started.elapsed());
    println!("  Branches:      {}", summary.branches);
    println!("  Users:         {} (password: {})", summary.users, DEMO_PASSWORD);
    println!("  Ingredients:   {}", summary.ingredients);
    println!("  Menu items:    {}", summary.menu_items);
    println!("  Recipe lines:  {}", summary.recipes);
    println!("  Stock entries: {}", summary.stock_entries);

    db.close().await;
    Ok(())
}

fn print_usage() {
    println!("Brewline Seed Data Loader");
    println!();
    println!("USAGE: seed [--db <PATH>]");
    println!();
    println!("  -d, --db <PATH>  SQLite file to seed (default ./brewline_dev.db)");
    println!("  -h, --help       Print this text");
}
