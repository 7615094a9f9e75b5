use sea_orm_migration::prelude::*;

const DEVICE_TABLES: [&str; 4] = ["transmitters", "switches", "valves", "indicators"];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Every device table joined to its own images, flattened into one
        // row per (device, image) so equipment pages can group them.
        let selects: Vec<String> = DEVICE_TABLES
            .iter()
            .map(|table| {
                format!(
                    r#"
                SELECT
                    '{table}' AS device_type,
                    d.id,
                    d.tag,
                    d.type,
                    d.location,
                    d.status,
                    d.equipment_code,
                    i.url AS image_url,
                    i.sort_order
                FROM {table} d
                LEFT JOIN {table}_images i ON i.device_id = d.id"#
                )
            })
            .collect();

        let create_view_sql = match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres | sea_orm::DatabaseBackend::Sqlite => {
                format!("CREATE VIEW devices_view AS {};", selects.join("\nUNION ALL"))
            }
            _ => {
                return Err(DbErr::Custom("Unsupported database backend".to_string()));
            }
        };

        manager
            .get_connection()
            .execute_unprepared(&create_view_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS devices_view")
            .await?;
        Ok(())
    }
}
