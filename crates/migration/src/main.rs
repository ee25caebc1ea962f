//! Migration runner for the parcel-guardian schema.
//!
//! The database URL is resolved in order: `DATABASE_URL` from the
//! environment, then the `database_url` key of `config.yaml`, so the runner
//! works against the same configuration the server reads.

use config::Config;
use sea_orm_migration::prelude::*;
use std::env;

#[tokio::main]
async fn main() {
    if env::var("DATABASE_URL").is_err() {
        match Config::builder()
            .add_source(config::File::with_name("config.yaml"))
            .build()
        {
            Ok(settings) => {
                if let Ok(url) = settings.get_string("database_url") {
                    env::set_var("DATABASE_URL", url);
                }
            }
            Err(e) => {
                eprintln!("No DATABASE_URL set and config.yaml could not be read: {e}");
            }
        }
    }
    cli::run_cli(migration::Migrator).await;
}
