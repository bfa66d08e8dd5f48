use std::collections::HashMap;

use dal::{web::AnyWay, DBTable, EasyTransaction, ExistingRow, ToSqlObject, FKey, ID};
use serde::{Deserialize, Serialize};

/// A physical location; owns floors (§3 Site). Immutable identity — name is
/// set at creation and not revised in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: FKey<Site>,
    pub name: String,
}

impl DBTable for Site {
    fn table_name() -> &'static str {
        "sites"
    }

    fn id(&self) -> ID {
        self.id.into_id()
    }

    fn from_row(row: tokio_postgres::Row) -> Result<ExistingRow<Self>, anyhow::Error> {
        Ok(ExistingRow::from_existing(Self {
            id: row.try_get("id").anyway()?,
            name: row.try_get("name").anyway()?,
        }))
    }

    fn to_rowlike(&self) -> Result<HashMap<&str, Box<dyn ToSqlObject>>, anyhow::Error> {
        let c: [(&str, Box<dyn ToSqlObject>); 2] =
            [("id", Box::new(self.id)), ("name", Box::new(self.name.clone()))];
        Ok(c.into_iter().collect())
    }
}
