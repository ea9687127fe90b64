pub mod tree;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::shared::dates::WireDate;
use crate::shared::error::ApiError;
use crate::shared::schema::{employees, org_units};
use crate::shared::state::AppState;
use crate::shared::utils::AppJson;

use self::tree::OrgNode;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = org_units)]
pub struct OrgUnit {
    pub objid: String,
    pub otype: String,
    pub short: String,
    pub stext: String,
    pub parent_objid: Option<String>,
    pub begda: WireDate,
    pub endda: WireDate,
    pub responsible_objid: Option<String>,
    pub costcenter: Option<String>,
    pub location: Option<String>,
    pub org_level: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub objid: String,
    pub stext: String,
    pub short: String,
    pub otype: Option<String>,
    pub parent_objid: Option<String>,
    pub begda: WireDate,
    pub endda: WireDate,
    pub responsible_objid: Option<String>,
    pub costcenter: Option<String>,
    pub location: Option<String>,
    pub org_level: String,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = org_units)]
pub struct UpdateOrgRequest {
    pub stext: Option<String>,
    pub short: Option<String>,
    pub otype: Option<String>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub parent_objid: Option<Option<String>>,
    pub begda: Option<WireDate>,
    pub endda: Option<WireDate>,
    #[serde(default, deserialize_with = "crate::shared::utils::double_option")]
    pub responsible_objid: Option<Option<String>>,
    pub costcenter: Option<String>,
    pub location: Option<String>,
    pub org_level: Option<String>,
}

impl UpdateOrgRequest {
    /// An empty string in a reference field means "clear it"; the changeset
    /// must carry an explicit NULL, never an empty objid.
    fn normalized(mut self) -> Self {
        if let Some(Some(p)) = &self.parent_objid {
            if p.is_empty() {
                self.parent_objid = Some(None);
            }
        }
        if let Some(Some(r)) = &self.responsible_objid {
            if r.is_empty() {
                self.responsible_objid = Some(None);
            }
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.stext.is_none()
            && self.short.is_none()
            && self.otype.is_none()
            && self.parent_objid.is_none()
            && self.begda.is_none()
            && self.endda.is_none()
            && self.responsible_objid.is_none()
            && self.costcenter.is_none()
            && self.location.is_none()
            && self.org_level.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct OrgListQuery {
    pub parent_objid: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrgSummary {
    #[serde(flatten)]
    pub org: OrgUnit,
    pub parent_name: Option<String>,
    pub employee_count: i64,
}

#[derive(Debug, Serialize, Queryable)]
pub struct OrgChildSummary {
    pub objid: String,
    pub short: String,
    pub stext: String,
    pub org_level: String,
}

#[derive(Debug, Serialize, Queryable)]
pub struct OrgEmployeeSummary {
    pub pernr: String,
    pub firstname: String,
    pub lastname: String,
    pub job: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrgDetail {
    #[serde(flatten)]
    pub org: OrgUnit,
    pub parent_name: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub direct_employees: i64,
    pub child_orgs: i64,
    pub children: Vec<OrgChildSummary>,
    pub employees: Vec<OrgEmployeeSummary>,
}

/// Distinct employee count per org unit, for the given ids.
pub(crate) fn employee_counts(
    conn: &mut PgConnection,
    ids: &[String],
) -> Result<HashMap<String, i64>, diesel::result::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(String, i64)> = employees::table
        .filter(employees::orgeh.eq_any(ids))
        .group_by(employees::orgeh)
        .select((employees::orgeh, diesel::dsl::count_star()))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrgListQuery>,
) -> Result<Json<Vec<OrgSummary>>, ApiError> {
    let mut conn = state.conn.get()?;

    let mut q = org_units::table.into_boxed();

    if let Some(parent) = query.parent_objid {
        // The UI sends "null" (or empty) to ask for root units.
        if parent.is_empty() || parent == "null" {
            q = q.filter(org_units::parent_objid.is_null());
        } else {
            q = q.filter(org_units::parent_objid.eq(parent));
        }
    }

    if let Some(search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            org_units::stext
                .ilike(pattern.clone())
                .or(org_units::short.ilike(pattern.clone()))
                .or(org_units::objid.ilike(pattern)),
        );
    }

    let orgs: Vec<OrgUnit> = q.order(org_units::objid.asc()).load(&mut conn)?;

    let parent_ids: Vec<String> = orgs.iter().filter_map(|o| o.parent_objid.clone()).collect();
    let parent_names: HashMap<String, String> = if parent_ids.is_empty() {
        HashMap::new()
    } else {
        org_units::table
            .filter(org_units::objid.eq_any(&parent_ids))
            .select((org_units::objid, org_units::stext))
            .load::<(String, String)>(&mut conn)?
            .into_iter()
            .collect()
    };

    let ids: Vec<String> = orgs.iter().map(|o| o.objid.clone()).collect();
    let counts = employee_counts(&mut conn, &ids)?;

    let summaries = orgs
        .into_iter()
        .map(|org| {
            let parent_name = org
                .parent_objid
                .as_ref()
                .and_then(|p| parent_names.get(p).cloned());
            let employee_count = counts.get(&org.objid).copied().unwrap_or(0);
            OrgSummary {
                org,
                parent_name,
                employee_count,
            }
        })
        .collect();

    Ok(Json(summaries))
}

pub async fn get_organization_tree(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OrgNode>>, ApiError> {
    let mut conn = state.conn.get()?;

    let orgs: Vec<OrgUnit> = org_units::table
        .order(org_units::objid.asc())
        .load(&mut conn)?;
    let ids: Vec<String> = orgs.iter().map(|o| o.objid.clone()).collect();
    let counts = employee_counts(&mut conn, &ids)?;

    let forest = tree::build_forest(&orgs, &counts)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
    Ok(Json(forest))
}

pub async fn get_organization(
    State(state): State<Arc<AppState>>,
    Path(objid): Path<String>,
) -> Result<Json<OrgDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    let org: OrgUnit = org_units::table
        .find(&objid)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    let parent_name: Option<String> = match &org.parent_objid {
        Some(parent) => org_units::table
            .find(parent)
            .select(org_units::stext)
            .first(&mut conn)
            .optional()?,
        None => None,
    };

    let manager: Option<(String, String, Option<String>)> = match &org.responsible_objid {
        Some(responsible) => employees::table
            .find(responsible)
            .select((employees::firstname, employees::lastname, employees::email))
            .first(&mut conn)
            .optional()?,
        None => None,
    };
    let (manager_name, manager_email) = match manager {
        Some((firstname, lastname, email)) => (Some(format!("{firstname} {lastname}")), email),
        None => (None, None),
    };

    let direct_employees: i64 = employees::table
        .filter(employees::orgeh.eq(&objid))
        .count()
        .get_result(&mut conn)?;

    let child_orgs: i64 = org_units::table
        .filter(org_units::parent_objid.eq(&objid))
        .count()
        .get_result(&mut conn)?;

    let children: Vec<OrgChildSummary> = org_units::table
        .filter(org_units::parent_objid.eq(&objid))
        .select((
            org_units::objid,
            org_units::short,
            org_units::stext,
            org_units::org_level,
        ))
        .order(org_units::objid.asc())
        .load(&mut conn)?;

    let employees_preview: Vec<OrgEmployeeSummary> = employees::table
        .filter(employees::orgeh.eq(&objid))
        .select((
            employees::pernr,
            employees::firstname,
            employees::lastname,
            employees::job,
            employees::email,
        ))
        .order((employees::lastname.asc(), employees::firstname.asc()))
        .limit(10)
        .load(&mut conn)?;

    Ok(Json(OrgDetail {
        org,
        parent_name,
        manager_name,
        manager_email,
        direct_employees,
        child_orgs,
        children,
        employees: employees_preview,
    }))
}

pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateOrgRequest>,
) -> Result<(StatusCode, Json<OrgUnit>), ApiError> {
    for (field, value) in [
        ("objid", &req.objid),
        ("stext", &req.stext),
        ("short", &req.short),
        ("org_level", &req.org_level),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{field} is required")));
        }
    }
    if req.endda < req.begda {
        return Err(ApiError::Validation(
            "endda must not be before begda".to_string(),
        ));
    }

    let mut conn = state.conn.get()?;
    let org = conn.transaction::<OrgUnit, ApiError, _>(|conn| {
        let exists: Option<String> = org_units::table
            .find(&req.objid)
            .select(org_units::objid)
            .first(conn)
            .optional()?;
        if exists.is_some() {
            return Err(ApiError::Conflict(
                "Organization with this Object ID already exists".to_string(),
            ));
        }

        let parent_objid = req.parent_objid.clone().filter(|p| !p.is_empty());
        if let Some(parent) = &parent_objid {
            let parent_exists: Option<String> = org_units::table
                .find(parent)
                .select(org_units::objid)
                .first(conn)
                .optional()?;
            if parent_exists.is_none() {
                return Err(ApiError::Validation(
                    "Parent organization does not exist".to_string(),
                ));
            }
        }

        let org = OrgUnit {
            objid: req.objid,
            otype: req.otype.unwrap_or_else(|| "O".to_string()),
            short: req.short,
            stext: req.stext,
            parent_objid,
            begda: req.begda,
            endda: req.endda,
            responsible_objid: req.responsible_objid.filter(|r| !r.is_empty()),
            costcenter: req.costcenter,
            location: req.location,
            org_level: req.org_level,
        };
        diesel::insert_into(org_units::table)
            .values(&org)
            .execute(conn)?;
        Ok(org)
    })?;

    Ok((StatusCode::CREATED, Json(org)))
}

/// The new parent must exist and must not be the unit itself or one of its
/// descendants, otherwise the stored links stop forming a forest.
fn ensure_valid_parent(
    conn: &mut PgConnection,
    objid: &str,
    parent: &str,
) -> Result<(), ApiError> {
    if parent == objid {
        return Err(ApiError::Validation(
            "Organization cannot be its own parent".to_string(),
        ));
    }

    let parent_exists: Option<String> = org_units::table
        .find(parent)
        .select(org_units::objid)
        .first(conn)
        .optional()?;
    if parent_exists.is_none() {
        return Err(ApiError::Validation(
            "Parent organization does not exist".to_string(),
        ));
    }

    // Walk up from the proposed parent; reaching the unit itself means the
    // parent sits below it. The visited set bounds the walk on bad data.
    let mut seen: HashSet<String> = HashSet::new();
    let mut current = Some(parent.to_string());
    while let Some(node) = current {
        if node == objid {
            return Err(ApiError::Validation(
                "Parent organization is a descendant of this organization".to_string(),
            ));
        }
        if !seen.insert(node.clone()) {
            break;
        }
        current = org_units::table
            .find(&node)
            .select(org_units::parent_objid)
            .first::<Option<String>>(conn)
            .optional()?
            .flatten();
    }

    Ok(())
}

pub async fn update_organization(
    State(state): State<Arc<AppState>>,
    Path(objid): Path<String>,
    AppJson(req): AppJson<UpdateOrgRequest>,
) -> Result<Json<OrgUnit>, ApiError> {
    if req.is_empty() {
        return Err(ApiError::Validation("No valid fields to update".to_string()));
    }
    let req = req.normalized();

    let mut conn = state.conn.get()?;
    let org = conn.transaction::<OrgUnit, ApiError, _>(|conn| {
        let current: OrgUnit = org_units::table
            .find(&objid)
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

        // Patches may carry one date; validate the pair that would be stored.
        let begda = req.begda.unwrap_or(current.begda);
        let endda = req.endda.unwrap_or(current.endda);
        if endda < begda {
            return Err(ApiError::Validation(
                "endda must not be before begda".to_string(),
            ));
        }

        if let Some(Some(parent)) = &req.parent_objid {
            ensure_valid_parent(conn, &objid, parent)?;
        }

        diesel::update(org_units::table.find(&objid))
            .set(&req)
            .get_result(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))
    })?;

    Ok(Json(org))
}

pub async fn delete_organization(
    State(state): State<Arc<AppState>>,
    Path(objid): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;

    let deleted = conn.transaction::<OrgUnit, ApiError, _>(|conn| {
        let org: OrgUnit = org_units::table
            .find(&objid)
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

        let children: i64 = org_units::table
            .filter(org_units::parent_objid.eq(&objid))
            .count()
            .get_result(conn)?;
        if children > 0 {
            return Err(ApiError::Conflict(
                "Cannot delete organization with child organizations. Please delete child organizations first."
                    .to_string(),
            ));
        }

        let assigned: i64 = employees::table
            .filter(employees::orgeh.eq(&objid))
            .count()
            .get_result(conn)?;
        if assigned > 0 {
            return Err(ApiError::Conflict(
                "Cannot delete organization with assigned employees. Please reassign employees first."
                    .to_string(),
            ));
        }

        diesel::delete(org_units::table.find(&objid)).execute(conn)?;
        Ok(org)
    })?;

    Ok(Json(json!({
        "message": "Organization deleted successfully",
        "deleted_organization": deleted,
    })))
}

pub fn configure_org_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/organizations",
            get(list_organizations).post(create_organization),
        )
        .route("/api/organizations/tree", get(get_organization_tree))
        .route(
            "/api/organizations/{objid}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_null_and_empty_parent() {
        let req: UpdateOrgRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.parent_objid, None);
        assert!(req.is_empty());

        let req: UpdateOrgRequest = serde_json::from_value(json!({ "parent_objid": null })).unwrap();
        assert_eq!(req.parent_objid, Some(None));
        assert!(!req.is_empty());

        let req: UpdateOrgRequest = serde_json::from_value(json!({ "parent_objid": "" })).unwrap();
        assert_eq!(req.normalized().parent_objid, Some(None));

        let req: UpdateOrgRequest =
            serde_json::from_value(json!({ "parent_objid": "1000" })).unwrap();
        assert_eq!(req.normalized().parent_objid, Some(Some("1000".to_string())));
    }

    #[test]
    fn empty_responsible_clears_instead_of_storing_empty_id() {
        let req: UpdateOrgRequest =
            serde_json::from_value(json!({ "responsible_objid": "" })).unwrap();
        assert_eq!(req.normalized().responsible_objid, Some(None));
    }
}
