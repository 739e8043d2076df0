//! Integration tests for the case lifecycle and its effect on machine status.

mod common;

use axum::http::StatusCode;
use axum::http::header;
use common::{
    body_json, body_text, create_machine, get, get_anonymous, machine_status, open_case,
    patch_json, post_json, seed_staff, Staff, TestUser,
};
use millwright_core::types::DbId;
use serde_json::{json, Value};
use sqlx::PgPool;

async fn set_status(
    pool: &PgPool,
    user: &TestUser,
    case_id: DbId,
    status: &str,
) -> (StatusCode, Value) {
    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/{case_id}"),
        &user.token,
        json!({ "status": status }),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn case_detail(pool: &PgPool, staff: &Staff, case_id: DbId) -> Value {
    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/{case_id}"),
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

async fn machine_history_len(pool: &PgPool, staff: &Staff, machine_id: DbId) -> usize {
    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{machine_id}/status-history"),
        &staff.viewer.token,
    )
    .await;
    body_json(response).await["data"].as_array().unwrap().len()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn case_drives_machine_through_fault_and_back(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;

    let case = open_case(&pool, &staff.technician, machine, "  Hydraulic leak ").await;
    let case_id = case["id"].as_i64().unwrap();
    assert_eq!(case["status"], "OPEN");
    assert_eq!(case["title"], "Hydraulic leak");
    assert_eq!(case["priority"], "MEDIUM");
    assert_eq!(case["created_by"], staff.technician.id);
    let number = case["case_number"].as_str().unwrap();
    assert!(number.starts_with("CASE-"));
    assert!(number.ends_with(&format!("-{machine}-{case_id}")));
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");

    let (status, _) = set_status(&pool, &staff.repair, case_id, "IN_PROGRESS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");

    let (status, body) = set_status(&pool, &staff.repair, case_id, "RESOLVED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "RESOLVED");
    assert!(body["data"]["resolved_at"].is_string());
    assert!(body["data"]["closed_at"].is_null());
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "OK");

    let (status, body) = set_status(&pool, &staff.technician, case_id, "CLOSED").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["closed_at"].is_string());

    let detail = case_detail(&pool, &staff, case_id).await;
    let history = detail["status_history"].as_array().unwrap();
    let edges: Vec<(&str, &str)> = history
        .iter()
        .map(|h| {
            (
                h["previous_status"].as_str().unwrap(),
                h["new_status"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        edges,
        vec![
            ("OPEN", "IN_PROGRESS"),
            ("IN_PROGRESS", "RESOLVED"),
            ("RESOLVED", "CLOSED"),
        ]
    );

    // Initial row, OK -> Fault and Fault -> OK; the in-progress and close
    // steps did not move the machine.
    assert_eq!(machine_history_len(&pool, &staff, machine).await, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolving_with_active_warnings_leaves_machine_in_warning(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/machines/{machine}/warnings"),
        &staff.technician.token,
        json!({ "text": "Oil pressure low" }),
    )
    .await;
    let case_id = open_case(&pool, &staff.technician, machine, "Pump failure").await["id"]
        .as_i64()
        .unwrap();
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");

    set_status(&pool, &staff.repair, case_id, "IN_PROGRESS").await;
    let (status, _) = set_status(&pool, &staff.repair, case_id, "RESOLVED").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Warning");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn machine_stays_in_fault_while_any_case_is_open(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let first = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();
    open_case(&pool, &staff.technician, machine, "Noise").await;

    let (status, _) = set_status(&pool, &staff.manager, first, "CLOSED").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");
    // Only the first case moved the machine.
    assert_eq!(machine_history_len(&pool, &staff, machine).await, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolved_at_is_stamped_once(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    set_status(&pool, &staff.repair, case_id, "IN_PROGRESS").await;
    let (_, first) = set_status(&pool, &staff.repair, case_id, "RESOLVED").await;
    let first_resolved = first["data"]["resolved_at"].clone();

    let (status, _) = set_status(&pool, &staff.repair, case_id, "IN_PROGRESS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");

    let (_, again) = set_status(&pool, &staff.repair, case_id, "RESOLVED").await;
    assert_eq!(again["data"]["resolved_at"], first_resolved);
}

// ---------------------------------------------------------------------------
// Transition rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_managers_close_open_cases(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "False alarm").await["id"]
        .as_i64()
        .unwrap();

    let (status, body) = set_status(&pool, &staff.technician, case_id, "CLOSED").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");

    let (status, body) = set_status(&pool, &staff.manager, case_id, "CLOSED").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["closed_at"].is_string());
    assert!(body["data"]["resolved_at"].is_null());
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "OK");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn closed_cases_are_terminal(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();
    set_status(&pool, &staff.manager, case_id, "CLOSED").await;

    for target in ["OPEN", "IN_PROGRESS", "RESOLVED", "CLOSED"] {
        let (status, body) = set_status(&pool, &staff.manager, case_id, target).await;
        assert_eq!(status, StatusCode::CONFLICT, "CLOSED -> {target}");
        assert_eq!(body["code"], "INVALID_TRANSITION");
    }

    let detail = case_detail(&pool, &staff, case_id).await;
    assert_eq!(detail["status_history"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn skipping_states_is_rejected_even_for_managers(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    let (status, body) = set_status(&pool, &staff.manager, case_id, "RESOLVED").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn viewers_cannot_open_cases(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/cases",
        &staff.viewer.token,
        json!({ "machine_id": machine, "title": "Leak" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "OK");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn case_on_unknown_machine_is_404(pool: PgPool) {
    let staff = seed_staff(&pool).await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/cases",
        &staff.technician.token,
        json!({ "machine_id": 31337, "title": "Leak" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_update_is_a_bad_request(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    let response = patch_json(
        common::build_test_app(pool),
        &format!("/api/v1/cases/{case_id}"),
        &staff.manager.token,
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Assignment and priority
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn reassignment_is_recorded_only_on_change(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();
    let uri = format!("/api/v1/cases/{case_id}");

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.technician.token,
        json!({ "assigned_to": staff.repair.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    for _ in 0..2 {
        let response = patch_json(
            common::build_test_app(pool.clone()),
            &uri,
            &staff.manager.token,
            json!({ "assigned_to": staff.repair.id }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["assigned_to"], staff.repair.id);
    }
    let detail = case_detail(&pool, &staff, case_id).await;
    assert_eq!(detail["assignment_history"].as_array().unwrap().len(), 1);

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.manager.token,
        json!({ "assigned_to": null }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["assigned_to"].is_null());

    let detail = case_detail(&pool, &staff, case_id).await;
    let history = detail["assignment_history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["previous_assignee"], staff.repair.id);
    assert!(history[1]["new_assignee"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assigning_an_unknown_user_is_rejected(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    let response = patch_json(
        common::build_test_app(pool),
        &format!("/api/v1/cases/{case_id}"),
        &staff.manager.token,
        json!({ "assigned_to": 555_555 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn combined_update_applies_every_field(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    let response = patch_json(
        common::build_test_app(pool),
        &format!("/api/v1/cases/{case_id}"),
        &staff.repair.token,
        json!({ "priority": "HIGH", "assigned_to": staff.repair.id, "status": "IN_PROGRESS" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let case = body_json(response).await["data"].clone();
    assert_eq!(case["priority"], "HIGH");
    assert_eq!(case["assigned_to"], staff.repair.id);
    assert_eq!(case["status"], "IN_PROGRESS");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_combined_update_changes_nothing(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    // Repair may reprioritize and reassign, but only a manager closes an Open case.
    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/{case_id}"),
        &staff.repair.token,
        json!({ "priority": "CRITICAL", "assigned_to": staff.repair.id, "status": "CLOSED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let case = case_detail(&pool, &staff, case_id).await;
    assert_eq!(case["priority"], "MEDIUM");
    assert!(case["assigned_to"].is_null());
    assert_eq!(case["status"], "OPEN");
    assert!(case["assignment_history"].as_array().unwrap().is_empty());
    assert!(case["status_history"].as_array().unwrap().is_empty());

    let response = get(
        common::build_test_app(pool),
        "/api/v1/notifications?notification_type=ASSIGNMENT_CHANGED",
        &staff.repair.token,
    )
    .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unreachable_status_rolls_back_priority(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    let response = patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/{case_id}"),
        &staff.manager.token,
        json!({ "priority": "HIGH", "status": "RESOLVED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");

    let case = case_detail(&pool, &staff, case_id).await;
    assert_eq!(case["priority"], "MEDIUM");
    assert_eq!(case["status"], "OPEN");
    assert_eq!(machine_status(&pool, &staff.viewer, machine).await, "Fault");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn technicians_cannot_change_priority(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();

    let response = patch_json(
        common::build_test_app(pool),
        &format!("/api/v1/cases/{case_id}"),
        &staff.technician.token,
        json!({ "priority": "CRITICAL" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

async fn machine_with_importance(
    pool: &PgPool,
    staff: &Staff,
    name: &str,
    importance: i32,
) -> DbId {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/machines",
        &staff.manager.token,
        json!({ "name": name, "serial_number": format!("SN-{name}"), "importance": importance }),
    )
    .await;
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn open_with_priority(pool: &PgPool, staff: &Staff, machine: DbId, priority: &str) -> DbId {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/cases",
        &staff.technician.token,
        json!({
            "machine_id": machine,
            "title": format!("{priority} issue"),
            "priority": priority
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn prioritized_queue_orders_by_score(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let critical_line = machine_with_importance(&pool, &staff, "Kiln", 5).await;
    let spare = machine_with_importance(&pool, &staff, "Spare", 0).await;

    // LOW on importance 5: 10 + 250; HIGH on importance 0 (floored to 1): 500 + 50.
    let low = open_with_priority(&pool, &staff, critical_line, "LOW").await;
    let high = open_with_priority(&pool, &staff, spare, "HIGH").await;
    let critical = open_with_priority(&pool, &staff, spare, "CRITICAL").await;
    let closed = open_with_priority(&pool, &staff, spare, "CRITICAL").await;
    set_status(&pool, &staff.manager, closed, "CLOSED").await;

    let response = get(
        common::build_test_app(pool),
        "/api/v1/cases/prioritized",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let queue = body_json(response).await["data"].clone();
    let queue = queue.as_array().unwrap();

    let ids: Vec<i64> = queue.iter().map(|c| c["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![critical, high, low]);
    assert_eq!(queue[0]["priority_score"], 1050);
    assert_eq!(queue[1]["priority_score"], 550);
    assert_eq!(queue[2]["priority_score"], 260);
    assert_eq!(queue[2]["machine_importance"], 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn statistics_count_cases(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let press = machine_with_importance(&pool, &staff, "Press", 1).await;
    let drill = machine_with_importance(&pool, &staff, "Drill", 1).await;

    let fixed = open_with_priority(&pool, &staff, press, "HIGH").await;
    open_with_priority(&pool, &staff, press, "LOW").await;
    open_with_priority(&pool, &staff, drill, "LOW").await;
    set_status(&pool, &staff.repair, fixed, "IN_PROGRESS").await;
    set_status(&pool, &staff.repair, fixed, "RESOLVED").await;

    let response = get(
        common::build_test_app(pool.clone()),
        "/api/v1/cases/statistics",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await["data"].clone();
    assert_eq!(stats["total"], 3);
    assert!(stats["average_resolution_secs"].as_f64().unwrap() >= 0.0);

    let count = |list: &Value, key: &str, value: &str| {
        list.as_array()
            .unwrap()
            .iter()
            .find(|row| row[key] == value)
            .map(|row| row["count"].as_i64().unwrap())
            .unwrap_or(0)
    };
    assert_eq!(count(&stats["by_status"], "status", "OPEN"), 2);
    assert_eq!(count(&stats["by_status"], "status", "RESOLVED"), 1);
    assert_eq!(count(&stats["by_priority"], "priority", "LOW"), 2);
    assert_eq!(count(&stats["by_priority"], "priority", "HIGH"), 1);

    let top = stats["top_machines"].as_array().unwrap();
    assert_eq!(top[0]["machine_id"], press);
    assert_eq!(top[0]["case_count"], 2);

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/statistics?machine_id={drill}"),
        &staff.viewer.token,
    )
    .await;
    let stats = body_json(response).await["data"].clone();
    assert_eq!(stats["total"], 1);
    assert!(stats["average_resolution_secs"].is_null());

    let response = get(
        common::build_test_app(pool),
        "/api/v1/cases/statistics?from=2026-02-01T00:00:00Z&to=2026-01-01T00:00:00Z",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_status_and_machine(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let press = create_machine(&pool, &staff.manager, "Press").await;
    let drill = create_machine(&pool, &staff.manager, "Drill").await;
    let closed = open_case(&pool, &staff.technician, press, "Leak").await["id"]
        .as_i64()
        .unwrap();
    open_case(&pool, &staff.technician, press, "Noise").await;
    open_case(&pool, &staff.technician, drill, "Bit broken").await;
    set_status(&pool, &staff.manager, closed, "CLOSED").await;

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases?machine_id={press}&status=OPEN"),
        &staff.viewer.token,
    )
    .await;
    let cases = body_json(response).await["data"].clone();
    assert_eq!(cases.as_array().unwrap().len(), 1);
    assert_eq!(cases[0]["title"], "Noise");

    let response = get(
        common::build_test_app(pool),
        "/api/v1/cases?limit=2",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn comments_are_listed_in_order(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let machine = create_machine(&pool, &staff.manager, "Press").await;
    let case_id = open_case(&pool, &staff.technician, machine, "Leak").await["id"]
        .as_i64()
        .unwrap();
    let uri = format!("/api/v1/cases/{case_id}/updates");

    let entries = [
        (&staff.repair, "Replaced seal"),
        (&staff.technician, " Still dripping "),
    ];
    for (user, text) in entries {
        let response = post_json(
            common::build_test_app(pool.clone()),
            &uri,
            &user.token,
            json!({ "text": text }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = post_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.repair.token,
        json!({ "text": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        common::build_test_app(pool.clone()),
        &uri,
        &staff.viewer.token,
        json!({ "text": "Looks bad" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(common::build_test_app(pool.clone()), &uri, &staff.viewer.token).await;
    let comments = body_json(response).await["data"].clone();
    let texts: Vec<&str> = comments
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Replaced seal", "Still dripping"]);
    assert_eq!(comments[0]["author_id"], staff.repair.id);

    let response = get(
        common::build_test_app(pool),
        "/api/v1/cases/999999/updates",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn export_writes_a_csv_report(pool: PgPool) {
    let staff = seed_staff(&pool).await;
    let press = create_machine(&pool, &staff.manager, "Press").await;
    let lathe = create_machine(&pool, &staff.manager, "Lathe").await;
    let leak = open_case(&pool, &staff.technician, press, "Leak, left side").await;
    open_case(&pool, &staff.technician, lathe, "Chatter").await;
    patch_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/{}", leak["id"]),
        &staff.manager.token,
        json!({ "assigned_to": staff.repair.id }),
    )
    .await;

    let response = get(
        common::build_test_app(pool.clone()),
        "/api/v1/cases/export",
        &staff.viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let report = body_text(response).await;
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Case Number,Title,Machine,Status,Priority,Created By"));
    // Newest first.
    assert!(lines[1].contains(",Chatter,Lathe,OPEN,MEDIUM,tech,Unassigned,"));
    let number = leak["case_number"].as_str().unwrap();
    let expected = format!("{number},\"Leak, left side\",Press,OPEN,MEDIUM,tech,fixer,");
    assert!(lines[2].starts_with(&expected));

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/cases/export?machine_id={press}"),
        &staff.viewer.token,
    )
    .await;
    assert_eq!(body_text(response).await.lines().count(), 2);

    let response = get_anonymous(common::build_test_app(pool), "/api/v1/cases/export").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
