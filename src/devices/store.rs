//! Table-agnostic record access for device and device-image tables.
//!
//! Device tables share a workflow but not a Rust type, so rows travel as
//! JSON maps and statements are built at runtime with SeaQuery.

use super::schema::DeviceKind;
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Keyword, Order, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, QueryResult};
use serde_json::Value;
use tracing::debug;

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Bool,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Conjunction of column equalities.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::default().and(column, value)
    }

    #[must_use]
    pub fn and(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }
}

/// Backend query interface: select, insert, update and delete against a
/// named table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(
        &self,
        table: &str,
        columns: &[Column],
        filter: Option<&Filter>,
        order_by: &[&str],
    ) -> Result<Vec<Row>, DbErr>;

    async fn insert(&self, table: &str, row: Row) -> Result<(), DbErr>;

    /// Returns the number of rows changed.
    async fn update(&self, table: &str, filter: &Filter, row: Row) -> Result<u64, DbErr>;

    /// Returns the number of rows removed.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, DbErr>;
}

pub struct SqlRecordStore {
    db: DatabaseConnection,
}

impl SqlRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_expr(value: &Value) -> SimpleExpr {
    match value {
        Value::Null => SimpleExpr::Keyword(Keyword::Null),
        Value::Bool(flag) => (*flag).into(),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                i32::try_from(integer).map_or_else(|_| integer.into(), Into::into)
            } else {
                number.as_f64().unwrap_or_default().into()
            }
        }
        Value::String(text) => text.clone().into(),
        other => other.to_string().into(),
    }
}

fn decode(result: &QueryResult, column: &Column) -> Result<Value, DbErr> {
    Ok(match column.kind {
        ColumnKind::Text => result
            .try_get::<Option<String>>("", column.name)?
            .map_or(Value::Null, Value::String),
        ColumnKind::Bool => result
            .try_get::<Option<bool>>("", column.name)?
            .map_or(Value::Null, Value::Bool),
        ColumnKind::Integer => result
            .try_get::<Option<i32>>("", column.name)?
            .map_or(Value::Null, Value::from),
    })
}

fn apply_filter<T>(statement: &mut T, filter: &Filter)
where
    T: sea_orm::sea_query::ConditionalStatement,
{
    for (column, value) in &filter.conditions {
        statement.and_where(Expr::col(Alias::new(column.as_str())).eq(to_expr(value)));
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn select(
        &self,
        table: &str,
        columns: &[Column],
        filter: Option<&Filter>,
        order_by: &[&str],
    ) -> Result<Vec<Row>, DbErr> {
        let mut query = Query::select();
        query
            .columns(columns.iter().map(|column| Alias::new(column.name)))
            .from(Alias::new(table));
        if let Some(filter) = filter {
            apply_filter(&mut query, filter);
        }
        for column in order_by {
            query.order_by(Alias::new(*column), Order::Asc);
        }

        let statement = self.db.get_database_backend().build(&query);
        let results = self.db.query_all(statement).await?;

        results
            .iter()
            .map(|result| {
                columns
                    .iter()
                    .map(|column| Ok((column.name.to_string(), decode(result, column)?)))
                    .collect::<Result<Row, DbErr>>()
            })
            .collect()
    }

    async fn insert(&self, table: &str, row: Row) -> Result<(), DbErr> {
        let mut query = Query::insert();
        query
            .into_table(Alias::new(table))
            .columns(row.keys().map(|column| Alias::new(column.as_str())))
            .values(row.values().map(to_expr))
            .map_err(|e| DbErr::Custom(e.to_string()))?;

        let statement = self.db.get_database_backend().build(&query);
        self.db.execute(statement).await?;
        debug!(table, "Inserted row");
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, row: Row) -> Result<u64, DbErr> {
        if row.is_empty() {
            return Ok(0);
        }
        let mut query = Query::update();
        query.table(Alias::new(table));
        for (column, value) in &row {
            query.value(Alias::new(column.as_str()), to_expr(value));
        }
        apply_filter(&mut query, filter);

        let statement = self.db.get_database_backend().build(&query);
        Ok(self.db.execute(statement).await?.rows_affected())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, DbErr> {
        let mut query = Query::delete();
        query.from_table(Alias::new(table));
        apply_filter(&mut query, filter);

        let statement = self.db.get_database_backend().build(&query);
        Ok(self.db.execute(statement).await?.rows_affected())
    }
}

/// Record Writer: inserts a validated device row. A primary-key clash comes
/// back as `Duplicate` so callers can report "device already exists".
pub async fn insert_device(
    records: &dyn RecordStore,
    kind: DeviceKind,
    row: Row,
) -> BusinessResult<()> {
    let id = row
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    records
        .insert(kind.table(), row)
        .await
        .map_err(|err| match err.to_business_error(kind.singular()) {
            BusinessError::Duplicate { resource, .. } => BusinessError::Duplicate {
                resource,
                field: "id".to_string(),
            },
            other => other,
        })?;
    debug!(kind = %kind, id = %id, "Inserted device");
    Ok(())
}

/// Record Writer: updates an existing device row by id.
pub async fn update_device(
    records: &dyn RecordStore,
    kind: DeviceKind,
    id: &str,
    row: Row,
) -> BusinessResult<()> {
    if row.is_empty() {
        return Ok(());
    }
    let changed = records
        .update(kind.table(), &Filter::eq("id", id), row)
        .await
        .map_err(|err| err.to_business_error(kind.singular()))?;
    if changed == 0 {
        return Err(crate::not_found!(kind.singular(), id));
    }
    Ok(())
}

pub async fn find_device(
    records: &dyn RecordStore,
    kind: DeviceKind,
    id: &str,
) -> BusinessResult<Row> {
    records
        .select(
            kind.table(),
            &kind.schema().columns(),
            Some(&Filter::eq("id", id)),
            &[],
        )
        .await
        .map_err(|err| err.to_business_error(kind.singular()))?
        .into_iter()
        .next()
        .ok_or_else(|| crate::not_found!(kind.singular(), id))
}

pub async fn list_devices(records: &dyn RecordStore, kind: DeviceKind) -> BusinessResult<Vec<Row>> {
    records
        .select(kind.table(), &kind.schema().columns(), None, &["id"])
        .await
        .map_err(|err| err.to_business_error(kind.table()))
}
