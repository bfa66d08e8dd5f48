//! Transaction and row abstraction over `tokio-postgres`, in the teacher's
//! `dal` style: a `DBTable` trait backing typed rows, an `EasyTransaction`
//! wrapper, and `FKey<T>`/`ID` as the primary-key types.
//!
//! Unlike the teacher's `dal`, this does not rely on nightly-only trait
//! specialization (`min_specialization`/`negative_impls`) — the teacher
//! uses those only to let a blanket `AnyWay` impl coexist with two
//! string-specific ones, which is unnecessary since `String`/`&str` do not
//! implement `std::error::Error`. Recorded in DESIGN.md.

pub mod web;

use std::{collections::HashMap, hash::Hash, marker::PhantomData};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio_postgres::{types::ToSql, Client, NoTls, Transaction};

use web::AnyWay;

/// Marker for anything we're willing to bind as a query parameter.
pub trait ToSqlObject: ToSql + Send + Sync + 'static {}
impl<T> ToSqlObject for T where T: ToSql + Send + Sync + 'static {}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, Hash, PartialEq, Eq, derive_more::Into, derive_more::From)]
pub struct ID(uuid::Uuid);

impl ID {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }
}

impl Default for ID {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::try_parse(s)?))
    }
}

impl std::fmt::Display for ID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for ID {
    fn to_sql(
        &self,
        ty: &tokio_postgres::types::Type,
        out: &mut tokio_postgres::types::private::BytesMut,
    ) -> Result<tokio_postgres::types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.0.to_sql(ty, out)
    }

    fn accepts(ty: &tokio_postgres::types::Type) -> bool {
        <uuid::Uuid as ToSql>::accepts(ty)
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> tokio_postgres::types::FromSql<'a> for ID {
    fn from_sql(
        ty: &tokio_postgres::types::Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(ID(uuid::Uuid::from_sql(ty, raw)?))
    }

    fn accepts(ty: &tokio_postgres::types::Type) -> bool {
        <uuid::Uuid as tokio_postgres::types::FromSql>::accepts(ty)
    }
}

pub struct FKey<T: DBTable> {
    id: ID,
    _p: PhantomData<T>,
}

impl<T: DBTable> std::fmt::Debug for FKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[FKey<{}> -> {}]", std::any::type_name::<T>(), self.id.0)
    }
}

impl<T: DBTable> Serialize for FKey<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.id.serialize(serializer)
    }
}

impl<'de, T: DBTable> Deserialize<'de> for FKey<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self {
            id: ID::deserialize(deserializer)?,
            _p: PhantomData,
        })
    }
}

impl<T: DBTable> PartialEq for FKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: DBTable> Eq for FKey<T> {}
impl<T: DBTable> Clone for FKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: DBTable> Copy for FKey<T> {}
impl<T: DBTable> Hash for FKey<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl<'a, T: DBTable> tokio_postgres::types::FromSql<'a> for FKey<T> {
    fn from_sql(
        ty: &tokio_postgres::types::Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(FKey {
            id: ID::from_sql(ty, raw)?,
            _p: PhantomData,
        })
    }

    fn accepts(ty: &tokio_postgres::types::Type) -> bool {
        <ID as tokio_postgres::types::FromSql>::accepts(ty)
    }
}

impl<T: DBTable> ToSql for FKey<T> {
    fn to_sql(
        &self,
        ty: &tokio_postgres::types::Type,
        out: &mut tokio_postgres::types::private::BytesMut,
    ) -> Result<tokio_postgres::types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.id.to_sql(ty, out)
    }

    fn accepts(ty: &tokio_postgres::types::Type) -> bool {
        <ID as ToSql>::accepts(ty)
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<T: DBTable> FKey<T> {
    pub async fn get(&self, t: &mut EasyTransaction<'_>) -> Result<ExistingRow<T>, anyhow::Error> {
        T::get(t, self.id).await
    }

    pub fn from_id(id: ID) -> Self {
        Self { id, _p: PhantomData }
    }

    pub fn into_id(&self) -> ID {
        self.id
    }

    pub fn new_id_dangling() -> Self {
        Self::from_id(ID::new())
    }
}

#[derive(Clone, Debug, Copy, Hash)]
pub struct ExistingRow<T: DBTable> {
    data: T,
    had_id: ID,
}

impl<T: DBTable> std::ops::Deref for ExistingRow<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T: DBTable> std::ops::DerefMut for ExistingRow<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: DBTable> ExistingRow<T> {
    pub fn from_existing(v: T) -> Self {
        let had_id = v.id();
        Self { data: v, had_id }
    }

    pub fn into_inner(self) -> T {
        self.data
    }

    pub async fn update(&self, t: &mut EasyTransaction<'_>) -> Result<(), anyhow::Error> {
        assert_eq!(self.data.id(), self.had_id, "tried to change the id of a row during update");
        self.data.update(t).await
    }
}

pub struct NewRow<T>(T);
impl<T: DBTable> NewRow<T> {
    pub fn new(v: T) -> Self {
        Self(v)
    }

    pub async fn insert(&self, t: &mut EasyTransaction<'_>) -> Result<FKey<T>, anyhow::Error> {
        self.0.insert(t).await
    }
}

pub fn col(name: &'static str, v: impl ToSqlObject) -> (&'static str, Box<dyn ToSqlObject>) {
    (name, Box::new(v))
}

pub enum FilterOperation {
    Eq,
}

pub struct Filter {
    field_name: String,
    value: Box<dyn ToSqlObject>,
}

pub struct SelectBuilder<T> {
    filters: Vec<Filter>,
    _p: PhantomData<T>,
}

pub struct WhereBuilder<T> {
    select: SelectBuilder<T>,
    field_name: String,
}

impl<T: DBTable> WhereBuilder<T> {
    pub fn equals<U: ToSqlObject>(self, value: U) -> SelectBuilder<T> {
        let mut select = self.select;
        select.filters.push(Filter {
            field_name: self.field_name,
            value: Box::new(value),
        });
        select
    }
}

impl<T: DBTable> Default for SelectBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DBTable> SelectBuilder<T> {
    pub fn new() -> Self {
        Self { filters: vec![], _p: PhantomData }
    }

    pub fn where_field(self, field_name: &str) -> WhereBuilder<T> {
        WhereBuilder { select: self, field_name: field_name.to_owned() }
    }

    pub async fn run(self, t: &mut EasyTransaction<'_>) -> Result<Vec<ExistingRow<T>>, anyhow::Error> {
        let where_clauses = if self.filters.is_empty() {
            String::new()
        } else {
            let clauses = self
                .filters
                .iter()
                .enumerate()
                .map(|(i, f)| format!("({} = ${})", f.field_name, i + 1))
                .join(" AND ");
            format!("WHERE {clauses}")
        };

        let tn = T::table_name();
        let q = format!("SELECT * FROM {tn} {where_clauses};");

        let params: Vec<&(dyn ToSql + Sync)> =
            self.filters.iter().map(|f| &*f.value as &(dyn ToSql + Sync)).collect_vec();

        let rows = t.query(&q, params.as_slice()).await.anyway()?;
        T::from_rows(rows)
    }
}

/// Implement for any model stored as a Postgres row keyed by an `ID`.
pub trait DBTable: Sized + 'static + Send + Sync {
    fn table_name() -> &'static str;
    fn id(&self) -> ID;
    fn from_row(row: tokio_postgres::Row) -> Result<ExistingRow<Self>, anyhow::Error>;
    fn to_rowlike(&self) -> Result<HashMap<&str, Box<dyn ToSqlObject>>, anyhow::Error>;

    fn from_rows(rows: Vec<tokio_postgres::Row>) -> Result<Vec<ExistingRow<Self>>, anyhow::Error> {
        rows.into_iter().map(Self::from_row).collect()
    }

    async fn get(t: &mut EasyTransaction<'_>, id: ID) -> Result<ExistingRow<Self>, anyhow::Error> {
        let tn = Self::table_name();
        let q = format!("SELECT * FROM {tn} WHERE id = $1;");
        let row = t.query_one(&q, &[&id]).await.anyway()?;
        Self::from_row(row)
    }

    fn select() -> SelectBuilder<Self> {
        SelectBuilder::new()
    }

    async fn insert(&self, t: &mut EasyTransaction<'_>) -> Result<FKey<Self>, anyhow::Error> {
        let row = self.to_rowlike()?;
        let tname = Self::table_name();

        let mut columns = vec![];
        let mut params = vec![];
        let mut args = vec![];
        for (i, (c, v)) in row.iter().enumerate() {
            columns.push(*c);
            params.push(format!("${}", i + 1));
            args.push(&**v);
        }

        let q = format!(
            "INSERT INTO {tname} ({}) VALUES ({});",
            columns.join(", "),
            params.join(", ")
        );
        let args = args.into_iter().map(|d| d as &(dyn ToSql + Sync)).collect_vec();
        t.execute(q.as_str(), args.as_slice()).await.anyway()?;
        Ok(FKey::from_id(self.id()))
    }

    async fn update(&self, t: &mut EasyTransaction<'_>) -> Result<(), anyhow::Error> {
        let row = self.to_rowlike()?;
        let tname = Self::table_name();

        let mut columns = vec![];
        let mut args = vec![];
        for (k, v) in row.iter() {
            columns.push(*k);
            args.push(&**v);
        }
        let pairs = columns.iter().enumerate().map(|(i, c)| format!("{c} = ${}", i + 1)).join(", ");

        let id = self.id();
        let last = args.len() + 1;
        let q = format!("UPDATE {tname} SET {pairs} WHERE id = ${last};");
        args.push(&id);
        let args = args.into_iter().map(|d| d as &(dyn ToSql + Sync)).collect_vec();
        t.execute(q.as_str(), args.as_slice()).await.anyway()?;
        Ok(())
    }
}

pub struct ClientPair {
    client: Client,
}

impl std::ops::Deref for ClientPair {
    type Target = Client;
    fn deref(&self) -> &Client {
        &self.client
    }
}
impl std::ops::DerefMut for ClientPair {
    fn deref_mut(&mut self) -> &mut Client {
        &mut self.client
    }
}

/// Connection parameters for [`new_client`]. Kept independent of the
/// `config` crate's `DatabaseConfig` so `dal` has no upward dependency on it
/// (callers convert at the edge, typically in the binary's startup code).
#[derive(Debug, Clone)]
pub struct DbConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

pub async fn new_client(db: &DbConnectParams) -> Result<ClientPair, anyhow::Error> {
    let (client, conn) = tokio_postgres::config::Config::new()
        .user(&db.username)
        .password(&db.password)
        .dbname(&db.database_name)
        .host(db.host.as_str())
        .port(db.port)
        .connect(NoTls)
        .await
        .anyway()?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::error!("database connection task ended with an error: {e}");
        }
    });

    Ok(ClientPair { client })
}

pub trait AsEasyTransaction {
    async fn easy_transaction(&mut self) -> Result<EasyTransaction<'_>, anyhow::Error>;
}

impl AsEasyTransaction for Client {
    async fn easy_transaction(&mut self) -> Result<EasyTransaction<'_>, anyhow::Error> {
        Ok(EasyTransaction { inner: Some(self.transaction().await.anyway()?) })
    }
}

pub struct EasyTransaction<'a> {
    inner: Option<Transaction<'a>>,
}

impl<'a> EasyTransaction<'a> {
    pub async fn commit(mut self) -> Result<(), anyhow::Error> {
        let inner = self.inner.take().ok_or_else(|| anyhow::anyhow!("no inner transaction to commit"))?;
        inner.commit().await.anyway()
    }

    pub async fn rollback(mut self) -> Result<(), anyhow::Error> {
        let inner = self.inner.take().ok_or_else(|| anyhow::anyhow!("no inner transaction to roll back"))?;
        inner.rollback().await.anyway()
    }
}

impl<'a> std::ops::Deref for EasyTransaction<'a> {
    type Target = Transaction<'a>;
    fn deref(&self) -> &Transaction<'a> {
        self.inner.as_ref().expect("transaction already consumed")
    }
}
impl<'a> std::ops::DerefMut for EasyTransaction<'a> {
    fn deref_mut(&mut self) -> &mut Transaction<'a> {
        self.inner.as_mut().expect("transaction already consumed")
    }
}

impl<'a> Drop for EasyTransaction<'a> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::warn!("dropping a transaction without an explicit commit/rollback");
        }
    }
}
