use sea_orm_migration::prelude::*;

/// Device tables and the type-specific columns each one carries on top of
/// the shared set.
const DEVICE_TABLES: [(&str, &[DeviceColumn]); 4] = [
    (
        "transmitters",
        &[DeviceColumn::Range, DeviceColumn::LastCalibration],
    ),
    (
        "switches",
        &[DeviceColumn::SetPoint, DeviceColumn::LastCalibration],
    ),
    (
        "valves",
        &[
            DeviceColumn::ValveType,
            DeviceColumn::ActionType,
            DeviceColumn::IsControl,
            DeviceColumn::Size,
            DeviceColumn::LastMaintenance,
        ],
    ),
    (
        "indicators",
        &[DeviceColumn::Range, DeviceColumn::LastCalibration],
    ),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Equipments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Equipments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Equipments::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Equipments::ImageUrl).string())
                    .col(
                        ColumnDef::new(Equipments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        for (table, extra_columns) in DEVICE_TABLES {
            manager.create_table(device_table(table, extra_columns)).await?;
            manager.create_table(device_images_table(table)).await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(format!("idx_{table}_images_device_id"))
                        .table(Alias::new(format!("{table}_images")))
                        .col(DeviceImage::DeviceId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(format!("idx_{table}_equipment_code"))
                        .table(Alias::new(table))
                        .col(DeviceColumn::EquipmentCode)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Calibration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Calibration::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Calibration::Name).string().not_null())
                    .col(ColumnDef::new(Calibration::Type).string().not_null())
                    .col(ColumnDef::new(Calibration::Image).string().not_null())
                    .col(ColumnDef::new(Calibration::Video).string().not_null())
                    .col(
                        ColumnDef::new(Calibration::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Malfunctions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Malfunctions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Malfunctions::Title).string().not_null())
                    .col(ColumnDef::new(Malfunctions::Description).text().not_null())
                    .col(ColumnDef::new(Malfunctions::Severity).string().not_null())
                    .col(ColumnDef::new(Malfunctions::Importance).string().not_null())
                    .col(
                        ColumnDef::new(Malfunctions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::FullName).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::Online)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Malfunctions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Calibration::Table).if_exists().to_owned())
            .await?;
        for (table, _) in DEVICE_TABLES {
            manager
                .drop_table(
                    Table::drop()
                        .table(Alias::new(format!("{table}_images")))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(Equipments::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn device_table(table: &str, extra_columns: &[DeviceColumn]) -> TableCreateStatement {
    let mut statement = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(
            ColumnDef::new(DeviceColumn::Id)
                .string()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(DeviceColumn::Tag).string().not_null())
        .col(ColumnDef::new(DeviceColumn::Type).string().not_null())
        .col(ColumnDef::new(DeviceColumn::Location).string().not_null())
        .col(ColumnDef::new(DeviceColumn::Status).string().not_null())
        .col(ColumnDef::new(DeviceColumn::Description).text())
        .col(
            ColumnDef::new(DeviceColumn::NeedsScaffold)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(DeviceColumn::NeedsIsolation)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(DeviceColumn::IsSpareExist)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(ColumnDef::new(DeviceColumn::HowManySpares).integer())
        .col(ColumnDef::new(DeviceColumn::CreatedAt).string().not_null())
        .col(ColumnDef::new(DeviceColumn::EquipmentCode).string())
        .col(ColumnDef::new(DeviceColumn::Video).string())
        .to_owned();

    for column in extra_columns {
        let mut def = ColumnDef::new(*column);
        if matches!(column, DeviceColumn::IsControl) {
            def.boolean().not_null().default(false);
        } else {
            def.string();
        }
        statement.col(&mut def);
    }

    statement
}

fn device_images_table(table: &str) -> TableCreateStatement {
    let images_table = format!("{table}_images");
    Table::create()
        .table(Alias::new(images_table.as_str()))
        .if_not_exists()
        .col(
            ColumnDef::new(DeviceImage::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(DeviceImage::DeviceId).string().not_null())
        .col(ColumnDef::new(DeviceImage::Url).string().not_null())
        .col(
            ColumnDef::new(DeviceImage::SortOrder)
                .integer()
                .not_null()
                .default(0),
        )
        .col(ColumnDef::new(DeviceImage::CreatedAt).string().not_null())
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{images_table}_device_id"))
                .from(Alias::new(images_table.as_str()), DeviceImage::DeviceId)
                .to(Alias::new(table), DeviceColumn::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::NoAction),
        )
        .to_owned()
}

#[derive(DeriveIden)]
enum Equipments {
    Table,
    Id,
    Code,
    ImageUrl,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum DeviceColumn {
    Id,
    Tag,
    Type,
    Location,
    Status,
    Description,
    NeedsScaffold,
    NeedsIsolation,
    IsSpareExist,
    HowManySpares,
    CreatedAt,
    EquipmentCode,
    Video,
    Range,
    LastCalibration,
    SetPoint,
    ValveType,
    ActionType,
    IsControl,
    Size,
    LastMaintenance,
}

#[derive(DeriveIden)]
enum DeviceImage {
    Id,
    DeviceId,
    Url,
    SortOrder,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Calibration {
    Table,
    Id,
    Name,
    Type,
    Image,
    Video,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Malfunctions {
    Table,
    Id,
    Title,
    Description,
    Severity,
    Importance,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    FullName,
    Role,
    PasswordHash,
    Online,
    LastLogin,
    CreatedAt,
}
