//! Handler-level checks against a migrated database: the referential guards
//! on update, the deletion guards, and the hierarchy staying buildable after
//! writes. Each test works on its own objid prefix and cleans up after
//! itself so tests can run in parallel against one database.

use std::sync::Arc;

use axum::extract::{Path, State};
use diesel::prelude::*;
use serde_json::json;

use hcmserver::auth::InMemoryUserRepository;
use hcmserver::employee::{
    create_employee, update_employee, CreateEmployeeRequest, UpdateEmployeeRequest,
};
use hcmserver::org::{
    create_organization, delete_organization, get_organization, get_organization_tree,
    update_organization, CreateOrgRequest, UpdateOrgRequest,
};
use hcmserver::shared::config::AppConfig;
use hcmserver::shared::error::ApiError;
use hcmserver::shared::schema::{employees, org_units};
use hcmserver::shared::state::AppState;
use hcmserver::shared::utils::{create_conn, run_migrations, AppJson};

fn test_state() -> Arc<AppState> {
    let config = AppConfig::from_env().unwrap();
    let pool = create_conn(&config.database).unwrap();
    {
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();
    }
    Arc::new(AppState {
        conn: pool,
        config,
        users: Arc::new(InMemoryUserRepository::with_users(Vec::new())),
    })
}

fn wipe(state: &AppState, prefix: &str) {
    let mut conn = state.conn.get().unwrap();
    diesel::delete(employees::table.filter(employees::orgeh.like(format!("{prefix}%"))))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(org_units::table.filter(org_units::objid.like(format!("{prefix}%"))))
        .execute(&mut conn)
        .unwrap();
}

fn org_request(objid: &str, parent: Option<&str>) -> CreateOrgRequest {
    CreateOrgRequest {
        objid: objid.to_string(),
        stext: format!("Unit {objid}"),
        short: format!("U{objid}"),
        otype: None,
        parent_objid: parent.map(str::to_string),
        begda: "01.01.2020".parse().unwrap(),
        endda: "31.12.2099".parse().unwrap(),
        responsible_objid: None,
        costcenter: None,
        location: None,
        org_level: "Abteilung".to_string(),
    }
}

fn employee_request(orgeh: &str) -> CreateEmployeeRequest {
    CreateEmployeeRequest {
        firstname: "Anna".to_string(),
        lastname: "Schmidt".to_string(),
        orgeh: orgeh.to_string(),
        begda: "01.01.2021".parse().unwrap(),
        endda: "31.12.2099".parse().unwrap(),
        title: None,
        email: None,
        phone: None,
        location: None,
        job: None,
        plans: None,
        contract_type: None,
        workschedule: None,
        birthdate: None,
        gender: None,
        natio: None,
        persg: None,
        persk: None,
    }
}

fn org_patch(value: serde_json::Value) -> UpdateOrgRequest {
    serde_json::from_value(value).unwrap()
}

fn employee_patch(value: serde_json::Value) -> UpdateEmployeeRequest {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn clearing_parent_promotes_to_root_and_keeps_tree_buildable() {
    let state = test_state();
    wipe(&state, "91");

    create_organization(State(state.clone()), AppJson(org_request("9100", None)))
        .await
        .unwrap();
    create_organization(State(state.clone()), AppJson(org_request("9110", Some("9100"))))
        .await
        .unwrap();

    let updated = update_organization(
        State(state.clone()),
        Path("9110".to_string()),
        AppJson(org_patch(json!({ "parent_objid": "" }))),
    )
    .await
    .unwrap();
    assert_eq!(updated.0.parent_objid, None);

    assert!(get_organization_tree(State(state.clone())).await.is_ok());

    wipe(&state, "91");
}

#[tokio::test]
async fn rejects_self_and_descendant_parents() {
    let state = test_state();
    wipe(&state, "92");

    create_organization(State(state.clone()), AppJson(org_request("9200", None)))
        .await
        .unwrap();
    create_organization(State(state.clone()), AppJson(org_request("9210", Some("9200"))))
        .await
        .unwrap();

    let err = update_organization(
        State(state.clone()),
        Path("9200".to_string()),
        AppJson(org_patch(json!({ "parent_objid": "9200" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = update_organization(
        State(state.clone()),
        Path("9200".to_string()),
        AppJson(org_patch(json!({ "parent_objid": "9210" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    assert!(get_organization_tree(State(state.clone())).await.is_ok());

    wipe(&state, "92");
}

#[tokio::test]
async fn single_date_patch_cannot_invert_validity_window() {
    let state = test_state();
    wipe(&state, "93");

    create_organization(State(state.clone()), AppJson(org_request("9300", None)))
        .await
        .unwrap();

    let err = update_organization(
        State(state.clone()),
        Path("9300".to_string()),
        AppJson(org_patch(json!({ "endda": "31.12.2019" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = update_organization(
        State(state.clone()),
        Path("9300".to_string()),
        AppJson(org_patch(json!({ "begda": "01.01.2100" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    wipe(&state, "93");
}

#[tokio::test]
async fn delete_is_blocked_by_children_and_assigned_employees() {
    let state = test_state();
    wipe(&state, "94");

    create_organization(State(state.clone()), AppJson(org_request("9400", None)))
        .await
        .unwrap();
    create_organization(State(state.clone()), AppJson(org_request("9410", Some("9400"))))
        .await
        .unwrap();

    let err = delete_organization(State(state.clone()), Path("9400".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert!(get_organization(State(state.clone()), Path("9400".to_string()))
        .await
        .is_ok());

    create_employee(State(state.clone()), AppJson(employee_request("9410")))
        .await
        .unwrap();
    let err = delete_organization(State(state.clone()), Path("9410".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert!(get_organization(State(state.clone()), Path("9410".to_string()))
        .await
        .is_ok());

    wipe(&state, "94");
}

#[tokio::test]
async fn duplicate_objid_is_a_conflict() {
    let state = test_state();
    wipe(&state, "95");

    create_organization(State(state.clone()), AppJson(org_request("9500", None)))
        .await
        .unwrap();
    let err = create_organization(State(state.clone()), AppJson(org_request("9500", None)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    wipe(&state, "95");
}

#[tokio::test]
async fn create_with_missing_parent_leaves_no_row() {
    let state = test_state();
    wipe(&state, "96");

    let err = create_organization(
        State(state.clone()),
        AppJson(org_request("9600", Some("9699"))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = get_organization(State(state.clone()), Path("9600".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    wipe(&state, "96");
}

#[tokio::test]
async fn employee_update_guards_orgeh_and_validity_window() {
    let state = test_state();
    wipe(&state, "97");

    create_organization(State(state.clone()), AppJson(org_request("9700", None)))
        .await
        .unwrap();
    let (_, created) = create_employee(State(state.clone()), AppJson(employee_request("9700")))
        .await
        .unwrap();
    let pernr = created.0.pernr.clone();

    let err = update_employee(
        State(state.clone()),
        Path(pernr.clone()),
        AppJson(employee_patch(json!({ "orgeh": "" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = update_employee(
        State(state.clone()),
        Path(pernr.clone()),
        AppJson(employee_patch(json!({ "orgeh": "9799" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = update_employee(
        State(state.clone()),
        Path(pernr.clone()),
        AppJson(employee_patch(json!({ "endda": "31.12.2020" }))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    wipe(&state, "97");
}
