use dal::{web::AnyWay, DBTable, EasyTransaction, ExistingRow, FKey};

use super::{floor::Floor, site::Site, switch::Switch};

/// Enabled switches on a floor, in deterministic order (§4.6: "must return
/// enabled switches filtered by site+floor in deterministic order"). Order
/// is by name, matching the MAC Trace Engine's stable-ordering requirement
/// (§4.4 step 6).
pub async fn enabled_switches_on_floor(
    t: &mut EasyTransaction<'_>,
    floor: FKey<Floor>,
) -> Result<Vec<ExistingRow<Switch>>, anyhow::Error> {
    let rows = t
        .query(
            "SELECT * FROM switches WHERE floor = $1 AND enabled = true ORDER BY name ASC;",
            &[&floor],
        )
        .await
        .anyway()?;
    Switch::from_rows(rows)
}

/// All switches on a floor regardless of `enabled`, for the inventory-read
/// endpoints (§4.6 "Writes... are out of scope... straightforward against
/// the same store"; a net-admin browsing inventory needs to see disabled
/// switches too, unlike the trace engine's floor scan).
pub async fn all_switches_on_floor(
    t: &mut EasyTransaction<'_>,
    floor: FKey<Floor>,
) -> Result<Vec<ExistingRow<Switch>>, anyhow::Error> {
    Switch::select().where_field("floor").equals(floor).run(t).await
}

/// Single-switch lookup by id (§4.6).
pub async fn get_switch(
    t: &mut EasyTransaction<'_>,
    id: FKey<Switch>,
) -> Result<ExistingRow<Switch>, anyhow::Error> {
    id.get(t).await
}

/// All sites, for `GET /api/sites` (§6).
pub async fn all_sites(t: &mut EasyTransaction<'_>) -> Result<Vec<ExistingRow<Site>>, anyhow::Error> {
    Site::select().run(t).await
}

/// All floors in a site, for `GET /api/floors` (§6).
pub async fn floors_for_site(
    t: &mut EasyTransaction<'_>,
    site: FKey<Site>,
) -> Result<Vec<ExistingRow<Floor>>, anyhow::Error> {
    Floor::select().where_field("site").equals(site).run(t).await
}

/// Resolves a site by its (unique) display name — the trace request's `site`
/// field is a name, not an id (§6 `POST /trace`).
pub async fn find_site_by_name(
    t: &mut EasyTransaction<'_>,
    name: &str,
) -> Result<Option<ExistingRow<Site>>, anyhow::Error> {
    Ok(Site::select().where_field("name").equals(name.to_owned()).run(t).await?.into_iter().next())
}

/// Resolves a floor by name within a site — unique within that site but not
/// globally (§3 Floor).
pub async fn find_floor_by_name(
    t: &mut EasyTransaction<'_>,
    site: FKey<Site>,
    name: &str,
) -> Result<Option<ExistingRow<Floor>>, anyhow::Error> {
    let rows = t
        .query(
            "SELECT * FROM floors WHERE site = $1 AND name = $2;",
            &[&site, &name],
        )
        .await
        .anyway()?;
    Ok(Floor::from_rows(rows)?.into_iter().next())
}
