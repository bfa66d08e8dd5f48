use std::collections::HashMap;

use dal::{web::AnyWay, DBTable, EasyTransaction, ExistingRow, ToSqlObject, FKey, ID};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::floor::Floor;

/// The CLI dialect family a switch speaks (§4.1 Model families). `Unknown`
/// is accepted for read-only auto-probing; it cannot back a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SwitchModel {
    N2000N3000,
    N3200,
    Os10,
    Unknown,
}

impl SwitchModel {
    pub fn supports_writes(&self) -> bool {
        !matches!(self, SwitchModel::Unknown)
    }

    /// The family's uplink-kind interface prefix (§4.1 Uplink detection),
    /// if the family has one beyond the generic `Po`/trunk rules.
    pub fn uplink_kind_prefix(&self) -> Option<&'static str> {
        match self {
            SwitchModel::N2000N3000 => Some("Te"),
            SwitchModel::N3200 => Some("Tw"),
            SwitchModel::Os10 | SwitchModel::Unknown => None,
        }
    }

    pub fn access_kind_prefix(&self) -> Option<&'static str> {
        match self {
            SwitchModel::N2000N3000 => Some("Gi"),
            SwitchModel::N3200 => Some("Te"),
            SwitchModel::Os10 => Some("ethernet"),
            SwitchModel::Unknown => None,
        }
    }
}

/// A manageable switch (§3 Switch). `address` must be a routable host on the
/// management network; `model` one of the recognized families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Switch {
    pub id: FKey<Switch>,
    pub floor: FKey<Floor>,
    pub name: String,
    pub address: String,
    pub model: SwitchModel,
    pub enabled: bool,
    pub description: Option<String>,
}

impl DBTable for Switch {
    fn table_name() -> &'static str {
        "switches"
    }

    fn id(&self) -> ID {
        self.id.into_id()
    }

    fn from_row(row: tokio_postgres::Row) -> Result<ExistingRow<Self>, anyhow::Error> {
        let model: String = row.try_get("model").anyway()?;
        Ok(ExistingRow::from_existing(Self {
            id: row.try_get("id").anyway()?,
            floor: row.try_get("floor").anyway()?,
            name: row.try_get("name").anyway()?,
            address: row.try_get("address").anyway()?,
            model: model
                .parse()
                .map_err(|_| anyhow::anyhow!("unrecognized switch model tag: {model}"))?,
            enabled: row.try_get("enabled").anyway()?,
            description: row.try_get("description").anyway()?,
        }))
    }

    fn to_rowlike(&self) -> Result<HashMap<&str, Box<dyn ToSqlObject>>, anyhow::Error> {
        let c: [(&str, Box<dyn ToSqlObject>); 7] = [
            ("id", Box::new(self.id)),
            ("floor", Box::new(self.floor)),
            ("name", Box::new(self.name.clone())),
            ("address", Box::new(self.address.clone())),
            ("model", Box::new(self.model.to_string())),
            ("enabled", Box::new(self.enabled)),
            ("description", Box::new(self.description.clone())),
        ];
        Ok(c.into_iter().collect())
    }
}
