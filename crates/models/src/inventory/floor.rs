use std::collections::HashMap;

use dal::{web::AnyWay, DBTable, EasyTransaction, ExistingRow, ToSqlObject, FKey, ID};
use serde::{Deserialize, Serialize};

use super::site::Site;

/// A floor within a site; name unique within that site, owns switches (§3
/// Floor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Floor {
    pub id: FKey<Floor>,
    pub site: FKey<Site>,
    pub name: String,
}

impl DBTable for Floor {
    fn table_name() -> &'static str {
        "floors"
    }

    fn id(&self) -> ID {
        self.id.into_id()
    }

    fn from_row(row: tokio_postgres::Row) -> Result<ExistingRow<Self>, anyhow::Error> {
        Ok(ExistingRow::from_existing(Self {
            id: row.try_get("id").anyway()?,
            site: row.try_get("site").anyway()?,
            name: row.try_get("name").anyway()?,
        }))
    }

    fn to_rowlike(&self) -> Result<HashMap<&str, Box<dyn ToSqlObject>>, anyhow::Error> {
        let c: [(&str, Box<dyn ToSqlObject>); 3] = [
            ("id", Box::new(self.id)),
            ("site", Box::new(self.site)),
            ("name", Box::new(self.name.clone())),
        ];
        Ok(c.into_iter().collect())
    }
}
