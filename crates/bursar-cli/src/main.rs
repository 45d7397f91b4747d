//! bursar admin CLI: database bootstrap and a demo catalog seeder.

use anyhow::Result;
use bursar_db::catalog::NewProduct;
use bursar_schemas::Cents;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "bursar")]
#[command(about = "Bursar store admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Insert a small demo catalog for one school (dev/test convenience).
    SeedDemo {
        /// School id to attach the demo products to; random when omitted.
        #[arg(long)]
        school_id: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence check.
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let pool = bursar_db::connect_from_env().await?;
                let st = bursar_db::status(&pool).await?;
                println!("ok: {}", st.ok);
                println!("has_orders_table: {}", st.has_orders_table);
            }
            DbCmd::Migrate => {
                let pool = bursar_db::connect_from_env().await?;
                bursar_db::migrate(&pool).await?;
                println!("migrations applied");
            }
        },

        Commands::SeedDemo { school_id } => {
            let pool = bursar_db::connect_from_env().await?;
            bursar_db::migrate(&pool).await?;

            let school = school_id.unwrap_or_else(Uuid::new_v4);
            let demo: [(&str, Option<&str>, i64, i32); 4] = [
                ("School Blazer", Some("uniform"), 4500, 40),
                ("House Tie", Some("uniform"), 1000, 120),
                ("Exercise Book (pack of 10)", Some("stationery"), 500, 200),
                ("Scientific Calculator", Some("stationery"), 2300, 35),
            ];

            for (name, category, price, stock) in demo {
                let id = bursar_db::catalog::insert_product(
                    &pool,
                    &NewProduct {
                        school_id: school,
                        name: name.to_string(),
                        category: category.map(str::to_string),
                        price_cents: Cents::new(price),
                        stock_quantity: stock,
                        is_active: true,
                    },
                )
                .await?;
                println!("seeded product {id}: {name}");
            }
            println!("school_id: {school}");
        }
    }

    Ok(())
}
