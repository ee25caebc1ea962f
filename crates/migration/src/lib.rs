pub use sea_orm_migration::prelude::*;

mod m20250512_101500_create_users;
mod m20250512_102200_create_trackings;
mod m20250528_143000_create_exception_rules;
mod m20250610_090000_create_tracking_history;
mod m20250703_120000_create_events;
mod m20250801_160000_add_exception_email_queue;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250512_101500_create_users::Migration),
            Box::new(m20250512_102200_create_trackings::Migration),
            Box::new(m20250528_143000_create_exception_rules::Migration),
            Box::new(m20250610_090000_create_tracking_history::Migration),
            Box::new(m20250703_120000_create_events::Migration),
            Box::new(m20250801_160000_add_exception_email_queue::Migration),
        ]
    }
}
