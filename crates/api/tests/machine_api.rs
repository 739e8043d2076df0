//! Integration tests for machines, manual status reports, assignments and
//! collections.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_machine, delete, get, machine_status, patch_json, post_json, seed_staff,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn created_machine_is_ok_with_initial_history(pool: PgPool) {
    let staff = seed_staff(&pool).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/machines",
        &staff.manager.token,
        json!({
            "name": "  Lathe 3 ",
            "serial_number": "L3-0001",
            "model_number": "LX-200",
            "importance": 2
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let machine = body_json(response).await["data"].clone();
    assert_eq!(machine["name"], "Lathe 3");
    assert_eq!(machine["status"], "OK");
    assert_eq!(machine["importance"], 2);

    let id = machine["id"].as_i64().unwrap();
    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/machines/{id}/status-history"),
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await["data"].clone();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["previous_status"], "OK");
    assert_eq!(history[0]["new_status"], "OK");
    assert_eq!(history[0]["reason"], "Initial machine creation");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_machine_fields_are_rejected(pool: PgPool) {
    let staff = seed_staff(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/machines",
        &staff.manager.token,
        json!({ "name": "   ", "serial_number": "SN-1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_machine_returns_404(pool: PgPool) {
    let staff = seed_staff(&pool).await;

    let response = get(
        common::build_test_app(pool),
        "/api/v1/machines/424242",
        &staff.viewer.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Manual status reports
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn warning_report_raises_a_warning(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.technician.token,
        json!({ "status": "Warning", "reason": "Vibration" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await["data"].clone();
    assert_eq!(report["machine"]["status"], "Warning");
    assert_eq!(report["effect"]["action"], "warning_raised");
    assert_eq!(report["effect"]["created"], true);
    assert_eq!(report["effect"]["warning"]["text"], "Vibration");

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/machines/{id}/status-history"),
        &staff.viewer.token,
    )
    .await;
    let history = body_json(response).await["data"].clone();
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert_eq!(history[0]["previous_status"], "OK");
    assert_eq!(history[0]["new_status"], "Warning");
    assert_eq!(history[0]["changed_by"], staff.technician.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fault_report_opens_a_case(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.technician.token,
        json!({ "status": "Fault" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await["data"].clone();
    assert_eq!(report["machine"]["status"], "Fault");
    assert_eq!(report["effect"]["action"], "case_opened");
    assert_eq!(report["effect"]["case"]["status"], "OPEN");
    assert_eq!(report["effect"]["case"]["title"], "Fault reported");
    assert_eq!(report["effect"]["case"]["machine_id"], id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ok_report_is_blocked_while_cases_are_open(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;
    common::open_case(&pool, &staff.technician, id, "Hydraulic leak").await;

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.repair.token,
        json!({ "status": "OK" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
    assert_eq!(machine_status(&pool, &staff.viewer, id).await, "Fault");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ok_report_clears_warnings(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;
    for text in ["Hot bearing", "Noisy belt"] {
        post_json(
            common::build_test_app(pool.clone()),
            &format!("/api/v1/machines/{id}/warnings"),
            &staff.technician.token,
            json!({ "text": text }),
        )
        .await;
    }

    // Technicians may not declare a machine OK.
    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.technician.token,
        json!({ "status": "OK" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.repair.token,
        json!({ "status": "OK", "reason": "Belt replaced" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await["data"].clone();
    assert_eq!(report["machine"]["status"], "OK");
    assert_eq!(report["effect"]["action"], "warnings_cleared");
    let cleared = report["effect"]["warnings"].as_array().unwrap();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|w| w["active"] == false));
    assert!(cleared.iter().all(|w| w["auto_resolution"] == true));
    assert!(cleared.iter().all(|w| w["resolution_note"] == "Belt replaced"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reporting_the_current_status_is_rejected(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;

    let response = patch_json(
        common::build_test_app(pool),
        &format!("/api/v1/machines/{id}"),
        &staff.manager.token,
        json!({ "status": "OK" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn viewer_cannot_report_status(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.viewer.token,
        json!({ "status": "Warning" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(machine_status(&pool, &staff.viewer, id).await, "OK");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_filter_and_summary(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let healthy = create_machine(&pool, &staff.manager, "Drill").await;
    let broken = create_machine(&pool, &staff.manager, "Press").await;
    common::open_case(&pool, &staff.technician, broken, "Motor burnt out").await;

    let response = get(
        common::build_test_app(pool.clone()),
        "/api/v1/machines?status=Fault",
        &staff.viewer.token,
    )
    .await;
    let machines = body_json(response).await["data"].clone();
    let machines = machines.as_array().unwrap();
    assert_eq!(machines.len(), 1);
    assert_eq!(machines[0]["id"], broken);

    let response = get(
        common::build_test_app(pool.clone()),
        "/api/v1/machines/status-summary",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await["data"].clone();
    assert_eq!(summary["aggregate"], "Fault");
    let counts = summary["counts"].as_array().unwrap();
    let count_of = |status: &str| {
        counts
            .iter()
            .find(|c| c["status"] == status)
            .map(|c| c["count"].as_i64().unwrap())
            .unwrap_or(0)
    };
    assert_eq!(count_of("OK"), 1);
    assert_eq!(count_of("Fault"), 1);
    assert_eq!(machine_status(&pool, &staff.viewer, healthy).await, "OK");
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn assign_and_unassign_users(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;
    let uri = format!("/api/v1/machines/{id}/assignments");

    let response = post_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.technician.token,
        json!({ "user_id": staff.technician.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.manager.token,
        json!({ "user_id": staff.technician.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.manager.token,
        json!({ "user_id": staff.technician.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get(
        common::build_test_app(pool.clone()),
        "/api/v1/machines?assigned_to_me=true",
        &staff.technician.token,
    )
    .await;
    let mine = body_json(response).await["data"].clone();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["id"], id);

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{id}"),
        &staff.viewer.token,
    )
    .await;
    let detail = body_json(response).await["data"].clone();
    assert_eq!(detail["assignments"].as_array().unwrap().len(), 1);
    assert_eq!(detail["assignments"][0]["user_id"], staff.technician.id);

    let unassign = format!("{uri}/{}", staff.technician.id);
    let response =
        delete(common::build_test_app(pool.clone()), &unassign, &staff.manager.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(common::build_test_app(pool), &unassign, &staff.manager.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assigning_unknown_user_is_404(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let id = create_machine(&pool, &staff.manager, "Press").await;

    let response = post_json(
        common::build_test_app(pool),
        &format!("/api/v1/machines/{id}/assignments"),
        &staff.manager.token,
        json!({ "user_id": 987654 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn collection_status_is_the_worst_member(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let drill = create_machine(&pool, &staff.manager, "Drill").await;
    let press = create_machine(&pool, &staff.manager, "Press").await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/collections",
        &staff.manager.token,
        json!({ "name": "Line A" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/collections",
        &staff.manager.token,
        json!({ "name": "Line-A", "description": "Stamping line" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let collection_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let members_uri = format!("/api/v1/collections/{collection_id}/machines");
    let status_uri = format!("/api/v1/collections/{collection_id}/status");

    // Empty collections aggregate to OK.
    let response =
        get(common::build_test_app(pool.clone()), &status_uri, &staff.viewer.token).await;
    assert_eq!(body_json(response).await["data"]["status"], "OK");

    for machine_id in [drill, press] {
        let response = post_json(
            common::build_test_app(pool.clone()),
            &members_uri,
            &staff.manager.token,
            json!({ "machine_id": machine_id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = post_json(
        common::build_test_app(pool.clone()),
        &members_uri,
        &staff.manager.token,
        json!({ "machine_id": drill }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["added"], false);

    post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{drill}/warnings"),
        &staff.technician.token,
        json!({ "text": "Chuck slipping" }),
    )
    .await;
    let response =
        get(common::build_test_app(pool.clone()), &status_uri, &staff.viewer.token).await;
    let body = body_json(response).await["data"].clone();
    assert_eq!(body["status"], "Warning");
    assert_eq!(body["machines"].as_array().unwrap().len(), 2);

    common::open_case(&pool, &staff.technician, press, "Ram stuck").await;
    let response =
        get(common::build_test_app(pool.clone()), &status_uri, &staff.viewer.token).await;
    assert_eq!(body_json(response).await["data"]["status"], "Fault");

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/machines?collection_id={collection_id}&status=Warning"),
        &staff.viewer.token,
    )
    .await;
    let warned = body_json(response).await["data"].clone();
    assert_eq!(warned.as_array().unwrap().len(), 1);
    assert_eq!(warned[0]["id"], drill);
}
