//! `GET /api/sites`, `/api/floors`, `/api/switches` (§4.6, §6).

use axum::extract::{Query, State};
use axum::Json;
use common::prelude::*;
use dal::AsEasyTransaction;
use models::{Floor, Role, Site, Switch};

use crate::dto::{FloorsQuery, SwitchesQuery};
use crate::extract::AuthenticatedPrincipal;
use crate::state::SharedState;

pub async fn sites(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<Vec<Site>>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let sites = models::all_sites(&mut t).await.internal()?;
    t.commit().await.internal()?;

    Ok(Json(sites.into_iter().map(|s| s.into_inner()).collect()))
}

pub async fn floors(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<FloorsQuery>,
) -> Result<Json<Vec<Floor>>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let floors = models::floors_for_site(&mut t, query.site_id).await.internal()?;
    t.commit().await.internal()?;

    Ok(Json(floors.into_iter().map(|f| f.into_inner()).collect()))
}

pub async fn switches(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<SwitchesQuery>,
) -> Result<Json<Vec<Switch>>, CoreError> {
    auth::require_role(&principal, Role::NetAdmin)?;

    let mut client = dal::new_client(&state.db).await.internal()?;
    let mut t = client.easy_transaction().await.internal()?;
    let switches = models::all_switches_on_floor(&mut t, query.floor_id).await.internal()?;
    t.commit().await.internal()?;

    Ok(Json(switches.into_iter().map(|s| s.into_inner()).collect()))
}
