pub mod pernr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::fixtures;
use crate::shared::dates::WireDate;
use crate::shared::error::ApiError;
use crate::shared::schema::{employees, org_units};
use crate::shared::state::AppState;
use crate::shared::utils::AppJson;

use self::pernr::next_pernr;

/// Advisory lock key serializing pernr allocation across concurrent creates.
const PERNR_ALLOC_LOCK: i64 = 874_302;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = employees)]
pub struct Employee {
    pub pernr: String,
    pub firstname: String,
    pub lastname: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub orgeh: String,
    pub job: Option<String>,
    pub plans: Option<String>,
    pub begda: WireDate,
    pub endda: WireDate,
    pub contract_type: Option<String>,
    pub workschedule: Option<String>,
    pub birthdate: Option<WireDate>,
    pub gender: Option<String>,
    pub natio: Option<String>,
    pub persg: Option<String>,
    pub persk: Option<String>,
    pub parent_pernr: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub firstname: String,
    pub lastname: String,
    pub orgeh: String,
    pub begda: WireDate,
    pub endda: WireDate,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub job: Option<String>,
    pub plans: Option<String>,
    pub contract_type: Option<String>,
    pub workschedule: Option<String>,
    pub birthdate: Option<WireDate>,
    pub gender: Option<String>,
    pub natio: Option<String>,
    pub persg: Option<String>,
    pub persk: Option<String>,
}

#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = employees)]
pub struct UpdateEmployeeRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub orgeh: Option<String>,
    pub job: Option<String>,
    pub plans: Option<String>,
    pub begda: Option<WireDate>,
    pub endda: Option<WireDate>,
    pub contract_type: Option<String>,
    pub workschedule: Option<String>,
    pub birthdate: Option<WireDate>,
    pub gender: Option<String>,
    pub natio: Option<String>,
    pub persg: Option<String>,
    pub persk: Option<String>,
}

impl UpdateEmployeeRequest {
    fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.title.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.location.is_none()
            && self.orgeh.is_none()
            && self.job.is_none()
            && self.plans.is_none()
            && self.begda.is_none()
            && self.endda.is_none()
            && self.contract_type.is_none()
            && self.workschedule.is_none()
            && self.birthdate.is_none()
            && self.gender.is_none()
            && self.natio.is_none()
            && self.persg.is_none()
            && self.persk.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct EmployeeListQuery {
    pub orgeh: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeListItem {
    #[serde(flatten)]
    pub employee: Employee,
    pub org_name: Option<String>,
    pub org_short: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct EmployeeListResponse {
    pub data: Vec<EmployeeListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Queryable)]
pub struct ContractPeriod {
    pub pernr: String,
    pub begda: WireDate,
    pub endda: WireDate,
    pub contract_type: Option<String>,
    pub workschedule: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub org_name: Option<String>,
    pub org_short: Option<String>,
    pub parent_objid: Option<String>,
    pub responsible_objid: Option<String>,
    pub costcenter: Option<String>,
    pub org_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts: Option<Vec<ContractPeriod>>,
}

pub(crate) fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmployeeListQuery>,
) -> Result<Json<EmployeeListResponse>, ApiError> {
    let mut conn = state.conn.get()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).max(1);
    let offset = (page - 1) * limit;

    let mut q = employees::table
        .left_join(org_units::table.on(org_units::objid.eq(employees::orgeh)))
        .select((
            Employee::as_select(),
            org_units::stext.nullable(),
            org_units::short.nullable(),
        ))
        .into_boxed();
    let mut count_q = employees::table.into_boxed();

    if let Some(orgeh) = &query.orgeh {
        q = q.filter(employees::orgeh.eq(orgeh.clone()));
        count_q = count_q.filter(employees::orgeh.eq(orgeh.clone()));
    }

    if let Some(search) = &query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            employees::firstname
                .ilike(pattern.clone())
                .or(employees::lastname.ilike(pattern.clone()))
                .or(employees::pernr.ilike(pattern.clone()))
                .nullable()
                .or(employees::email.ilike(pattern.clone())),
        );
        count_q = count_q.filter(
            employees::firstname
                .ilike(pattern.clone())
                .or(employees::lastname.ilike(pattern.clone()))
                .or(employees::pernr.ilike(pattern.clone()))
                .nullable()
                .or(employees::email.ilike(pattern)),
        );
    }

    let total: i64 = count_q.count().get_result(&mut conn)?;

    let rows: Vec<(Employee, Option<String>, Option<String>)> = q
        .order(employees::pernr.asc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)?;

    let data = rows
        .into_iter()
        .map(|(employee, org_name, org_short)| EmployeeListItem {
            employee,
            org_name,
            org_short,
        })
        .collect();

    Ok(Json(EmployeeListResponse {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: page_count(total, limit),
        },
    }))
}

pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(pernr): Path<String>,
) -> Result<Json<EmployeeDetail>, ApiError> {
    let mut conn = state.conn.get()?;

    type DetailRow = (
        Employee,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );
    let row: DetailRow = employees::table
        .left_join(org_units::table.on(org_units::objid.eq(employees::orgeh)))
        .filter(employees::pernr.eq(&pernr))
        .select((
            Employee::as_select(),
            org_units::stext.nullable(),
            org_units::short.nullable(),
            org_units::parent_objid.nullable(),
            org_units::responsible_objid.nullable(),
            org_units::costcenter.nullable(),
            org_units::org_level.nullable(),
        ))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))?;

    let (employee, org_name, org_short, parent_objid, responsible_objid, costcenter, org_level) =
        row;

    // Contract lineage only exists when the record is not its own root.
    let contracts = match &employee.parent_pernr {
        Some(parent) if *parent != employee.pernr => {
            let periods: Vec<ContractPeriod> = employees::table
                .filter(employees::parent_pernr.eq(parent))
                .select((
                    employees::pernr,
                    employees::begda,
                    employees::endda,
                    employees::contract_type,
                    employees::workschedule,
                ))
                .order(employees::begda.desc())
                .load(&mut conn)?;
            Some(periods)
        }
        _ => None,
    };

    Ok(Json(EmployeeDetail {
        employee,
        org_name,
        org_short,
        parent_objid,
        responsible_objid,
        costcenter,
        org_level,
        contracts,
    }))
}

pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    for (field, value) in [
        ("firstname", &req.firstname),
        ("lastname", &req.lastname),
        ("orgeh", &req.orgeh),
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
    let created = conn.transaction::<Employee, ApiError, _>(|conn| {
        let org_exists: Option<String> = org_units::table
            .find(&req.orgeh)
            .select(org_units::objid)
            .first(conn)
            .optional()?;
        if org_exists.is_none() {
            return Err(ApiError::Validation(
                "Organization does not exist".to_string(),
            ));
        }

        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(PERNR_ALLOC_LOCK)
            .execute(conn)?;

        let existing: Vec<String> = employees::table.select(employees::pernr).load(conn)?;
        let pernr = next_pernr(existing);

        let employee = Employee {
            pernr: pernr.clone(),
            firstname: req.firstname,
            lastname: req.lastname,
            title: req.title,
            email: req.email,
            phone: req.phone,
            location: req.location,
            orgeh: req.orgeh,
            job: req.job,
            plans: req.plans,
            begda: req.begda,
            endda: req.endda,
            contract_type: req.contract_type,
            workschedule: req.workschedule,
            birthdate: req.birthdate,
            gender: req.gender,
            natio: req.natio,
            persg: req.persg,
            persk: req.persk,
            // A freshly created record is its own contract lineage root.
            parent_pernr: Some(pernr),
        };
        diesel::insert_into(employees::table)
            .values(&employee)
            .execute(conn)?;
        Ok(employee)
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(pernr): Path<String>,
    AppJson(req): AppJson<UpdateEmployeeRequest>,
) -> Result<Json<Employee>, ApiError> {
    if req.is_empty() {
        return Err(ApiError::Validation("No valid fields to update".to_string()));
    }

    let mut conn = state.conn.get()?;
    let employee = conn.transaction::<Employee, ApiError, _>(|conn| {
        let current: Employee = employees::table
            .find(&pernr)
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))?;

        // Patches may carry one date; validate the pair that would be stored.
        let begda = req.begda.unwrap_or(current.begda);
        let endda = req.endda.unwrap_or(current.endda);
        if endda < begda {
            return Err(ApiError::Validation(
                "endda must not be before begda".to_string(),
            ));
        }

        if let Some(orgeh) = &req.orgeh {
            if orgeh.is_empty() {
                return Err(ApiError::Validation("orgeh must not be empty".to_string()));
            }
            let org_exists: Option<String> = org_units::table
                .find(orgeh)
                .select(org_units::objid)
                .first(conn)
                .optional()?;
            if org_exists.is_none() {
                return Err(ApiError::Validation(
                    "Organization does not exist".to_string(),
                ));
            }
        }

        diesel::update(employees::table.find(&pernr))
            .set(&req)
            .get_result(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))
    })?;

    Ok(Json(employee))
}

/// Produces realistic demo data for the employee creation form.
pub async fn generate_sample_employee(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get()?;

    let orgs: Vec<(String, String)> = org_units::table
        .select((org_units::objid, org_units::stext))
        .order(org_units::objid.asc())
        .limit(50)
        .load(&mut conn)?;

    let employee = fixtures::sample_employee(&mut rand::thread_rng(), &orgs);

    Ok(Json(json!({
        "message": "Sample employee data generated",
        "employee": employee,
        "note": "Use this data to test the employee creation form",
    })))
}

pub fn configure_employee_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route(
            "/api/employees/generate-sample",
            get(generate_sample_employee),
        )
        .route(
            "/api/employees/{pernr}",
            get(get_employee).put(update_employee),
        )
}
