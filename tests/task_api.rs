mod common;

use pretty_assertions::assert_eq;
use reqwest::Method;
use serde_json::{json, Value};

use common::{checklist_body, spawn_test_server};
use task_flow::models::task::{TaskListResponse, TaskMutationResponse, TaskStatus};

fn flags(resp: &TaskMutationResponse) -> Vec<(String, bool)> {
    resp.task
        .todo_checklist
        .iter()
        .map(|item| (item.title.clone(), item.completed))
        .collect()
}

#[actix_web::test]
async fn checklist_update_recomputes_status() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let member = server.member("Mia").await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Write release notes",
                "assignedTo": [member.id],
                "todoChecklist": [{ "title": "a" }, { "title": "b" }]
            }),
        )
        .await;
    assert_eq!(task.status, TaskStatus::Pending);
    let task_id = task.id.to_string();

    let resp = server
        .put_checklist(&member.token, &task_id, checklist_body(&[("a", true), ("b", false)]))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.message, "Task checklist updated");
    assert_eq!(body.task.status, TaskStatus::InProgress);
    assert_eq!(body.task.completed_todo_count, 1);
    assert_eq!(
        flags(&body),
        vec![("a".to_string(), true), ("b".to_string(), false)]
    );

    let resp = server
        .put_checklist(&member.token, &task_id, checklist_body(&[("a", true), ("b", true)]))
        .await;
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.task.status, TaskStatus::Completed);

    // Emptying the list puts the task back to Pending.
    let resp = server
        .put_checklist(&member.token, &task_id, checklist_body(&[]))
        .await;
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.task.status, TaskStatus::Pending);
    assert!(body.task.todo_checklist.is_empty());
}

#[actix_web::test]
async fn checklist_replacement_keeps_caller_order_and_other_fields() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let member = server.member("Kai").await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Plan offsite",
                "description": "Venue and agenda",
                "priority": "High",
                "assignedTo": [member.id],
                "attachments": ["example.com/agenda"],
                "todoChecklist": [{ "title": "venue" }]
            }),
        )
        .await;

    let resp = server
        .put_checklist(
            &member.token,
            &task.id.to_string(),
            checklist_body(&[("catering", false), ("venue", true), ("agenda", false)]),
        )
        .await;
    let body: TaskMutationResponse = resp.json().await.unwrap();
    let titles: Vec<&str> = body
        .task
        .todo_checklist
        .iter()
        .map(|item| item.title.as_str())
        .collect();
    assert_eq!(titles, vec!["catering", "venue", "agenda"]);
    assert_eq!(body.task.title, "Plan offsite");
    assert_eq!(body.task.description, "Venue and agenda");
    assert_eq!(body.task.attachments, vec!["example.com/agenda".to_string()]);
    assert_eq!(body.task.assigned_to.len(), 1);
    assert_eq!(body.task.assigned_to[0].name, "Kai");
}

#[actix_web::test]
async fn todo_alias_updates_the_checklist() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Alias",
                "assignedTo": [admin.id],
                "todoChecklist": [{ "title": "only" }]
            }),
        )
        .await;

    let resp = server
        .request(
            Method::PUT,
            &format!("/api/tasks/{}/todo", task.id),
            Some(&admin.token),
        )
        .json(&checklist_body(&[("only", true)]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.task.status, TaskStatus::Completed);
}

#[actix_web::test]
async fn checklist_errors() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let assignee = server.member("Ana").await;
    let outsider = server.member("Ola").await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Guarded",
                "assignedTo": [assignee.id],
                "todoChecklist": [{ "title": "a" }]
            }),
        )
        .await;
    let task_id = task.id.to_string();

    // Unknown and malformed ids
    let resp = server
        .put_checklist(
            &admin.token,
            "00000000-0000-0000-0000-000000000000",
            checklist_body(&[("a", true)]),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 404);
    let resp = server
        .put_checklist(&admin.token, "not-a-uuid", checklist_body(&[("a", true)]))
        .await;
    assert_eq!(resp.status().as_u16(), 404);

    // Payload without a checklist array
    let resp = server
        .put_checklist(&admin.token, &task_id, json!({ "todoChecklist": "nope" }))
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));

    // No token
    let resp = server
        .request(Method::PUT, &format!("/api/tasks/{task_id}/checklist"), None)
        .json(&checklist_body(&[("a", true)]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // Member outside the task
    let resp = server
        .put_checklist(&outsider.token, &task_id, checklist_body(&[("a", true)]))
        .await;
    assert_eq!(resp.status().as_u16(), 403);

    // Nothing above changed the task.
    let resp = server
        .request(Method::GET, &format!("/api/tasks/{task_id}"), Some(&admin.token))
        .send()
        .await
        .unwrap();
    let stored: task_flow::models::task::TaskView = resp.json().await.unwrap();
    assert_eq!(stored.status, TaskStatus::Pending);
    assert!(!stored.todo_checklist[0].completed);
}

#[actix_web::test]
async fn stale_version_is_rejected() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Versioned",
                "assignedTo": [admin.id],
                "todoChecklist": [{ "title": "a" }, { "title": "b" }]
            }),
        )
        .await;
    let task_id = task.id.to_string();

    let mut body = checklist_body(&[("a", true), ("b", false)]);
    body["version"] = json!(task.version);
    let resp = server.put_checklist(&admin.token, &task_id, body.clone()).await;
    assert_eq!(resp.status().as_u16(), 200);
    let first: TaskMutationResponse = resp.json().await.unwrap();
    assert!(first.task.version > task.version);

    // Same held version again: someone else already wrote.
    let resp = server.put_checklist(&admin.token, &task_id, body).await;
    assert_eq!(resp.status().as_u16(), 409);

    // Without a version the last writer wins.
    let resp = server
        .put_checklist(&admin.token, &task_id, checklist_body(&[("a", false), ("b", false)]))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[actix_web::test]
async fn completing_a_task_completes_its_checklist() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Finish",
                "assignedTo": [admin.id],
                "todoChecklist": [{ "title": "a" }, { "title": "b", "completed": true }]
            }),
        )
        .await;
    assert_eq!(task.status, TaskStatus::InProgress);

    let resp = server
        .request(
            Method::PUT,
            &format!("/api/tasks/{}/status", task.id),
            Some(&admin.token),
        )
        .json(&json!({ "status": "Completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.task.status, TaskStatus::Completed);
    assert!(body.task.todo_checklist.iter().all(|item| item.completed));

    let resp = server
        .request(
            Method::PUT,
            &format!("/api/tasks/{}/status", task.id),
            Some(&admin.token),
        )
        .json(&json!({ "status": "Done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn members_only_see_their_tasks() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let mia = server.member("Mia").await;
    let ben = server.member("Ben").await;
    server
        .create_task(&admin, json!({ "title": "Mine", "assignedTo": [mia.id] }))
        .await;
    server
        .create_task(
            &admin,
            json!({
                "title": "Shared",
                "assignedTo": [mia.id, ben.id],
                "todoChecklist": [{ "title": "x", "completed": true }]
            }),
        )
        .await;
    server
        .create_task(&admin, json!({ "title": "Ben only", "assignedTo": [ben.id] }))
        .await;

    let resp = server
        .request(Method::GET, "/api/tasks", Some(&mia.token))
        .send()
        .await
        .unwrap();
    let list: TaskListResponse = resp.json().await.unwrap();
    assert_eq!(list.tasks.len(), 2);
    assert_eq!(list.status_summary.all, 2);
    assert_eq!(list.status_summary.completed_tasks, 1);

    let resp = server
        .request(Method::GET, "/api/tasks?status=Pending", Some(&mia.token))
        .send()
        .await
        .unwrap();
    let list: TaskListResponse = resp.json().await.unwrap();
    assert_eq!(list.tasks.len(), 1);
    assert_eq!(list.tasks[0].title, "Mine");
    assert_eq!(list.status_summary.all, 2);

    // The summary ignores the status filter.
    let resp = server
        .request(Method::GET, "/api/tasks?status=Completed", Some(&admin.token))
        .send()
        .await
        .unwrap();
    let list: TaskListResponse = resp.json().await.unwrap();
    assert_eq!(list.tasks.len(), 1);
    assert_eq!(list.tasks[0].title, "Shared");
    assert_eq!(list.status_summary.all, 3);
    assert_eq!(list.status_summary.pending_tasks, 2);

    let resp = server
        .request(Method::GET, "/api/tasks?status=Someday", Some(&admin.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn only_admins_create_and_delete() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let member = server.member("Mia").await;

    let resp = server
        .request(Method::POST, "/api/tasks", Some(&member.token))
        .json(&json!({ "title": "Sneaky", "assignedTo": [member.id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = server
        .request(Method::POST, "/api/tasks", Some(&admin.token))
        .json(&json!({ "title": "Nobody", "assignedTo": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let task = server
        .create_task(&admin, json!({ "title": "Short lived", "assignedTo": [member.id] }))
        .await;
    let path = format!("/api/tasks/{}", task.id);

    let resp = server
        .request(Method::DELETE, &path, Some(&member.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = server
        .request(Method::DELETE, &path, Some(&admin.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = server
        .request(Method::GET, &path, Some(&admin.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn generic_update_leaves_status_alone() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Draft",
                "assignedTo": [admin.id],
                "todoChecklist": [{ "title": "a" }]
            }),
        )
        .await;

    let resp = server
        .request(
            Method::PUT,
            &format!("/api/tasks/{}", task.id),
            Some(&admin.token),
        )
        .json(&json!({ "title": "Final", "priority": "Low" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.message, "Task updated successfully");
    assert_eq!(body.task.title, "Final");
    assert_eq!(body.task.status, TaskStatus::Pending);
}

#[actix_web::test]
async fn dashboards_count_by_status() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let mia = server.member("Mia").await;
    server
        .create_task(
            &admin,
            json!({
                "title": "Half",
                "assignedTo": [mia.id],
                "todoChecklist": [{ "title": "a", "completed": true }, { "title": "b" }]
            }),
        )
        .await;
    server
        .create_task(
            &admin,
            json!({
                "title": "Late",
                "priority": "High",
                "dueDate": "2020-01-01T00:00:00Z",
                "assignedTo": [admin.id]
            }),
        )
        .await;

    let resp = server
        .request(Method::GET, "/api/tasks/dashboard-data", Some(&admin.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["statistics"]["totalTasks"], json!(2));
    assert_eq!(body["statistics"]["inProgressTasks"], json!(1));
    assert_eq!(body["statistics"]["overdueTasks"], json!(1));
    assert_eq!(body["charts"]["taskDistribution"]["All"], json!(2));
    assert_eq!(body["charts"]["taskPriorityLevels"]["High"], json!(1));

    let resp = server
        .request(Method::GET, "/api/tasks/dashboard-data", Some(&mia.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = server
        .request(Method::GET, "/api/tasks/user-dashboard-data", Some(&mia.token))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["statistics"]["totalTasks"], json!(1));
    assert_eq!(body["recentTasks"][0]["title"], json!("Half"));
}

#[actix_web::test]
async fn reports_and_users_are_admin_only() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let mia = server.member("Mia").await;
    server
        .create_task(&admin, json!({ "title": "Report me", "assignedTo": [mia.id] }))
        .await;

    let resp = server
        .request(Method::GET, "/api/reports/export/tasks", Some(&admin.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("tasks_report.json"));
    let rows: Value = resp.json().await.unwrap();
    assert_eq!(rows[0]["assignedTo"], json!("Mia (mia@example.com)"));

    let resp = server
        .request(Method::GET, "/api/reports/export/users", Some(&mia.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = server
        .request(Method::GET, "/api/users", Some(&admin.token))
        .send()
        .await
        .unwrap();
    let users: Value = resp.json().await.unwrap();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], json!("Mia"));
    assert_eq!(users[0]["pendingTasks"], json!(1));
}

#[actix_web::test]
async fn unknown_routes_answer_json_404() {
    let server = spawn_test_server().await;
    let resp = server
        .request(Method::GET, "/api/nowhere", None)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], json!("Route not found"));
    assert!(body["availableRoutes"].as_array().unwrap().len() > 1);

    let resp = server
        .request(Method::GET, "/api/health", None)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("OK"));
}

#[actix_web::test]
async fn due_date_is_kept_unless_cleared() {
    let server = spawn_test_server().await;
    let admin = server.admin().await;
    let task = server
        .create_task(
            &admin,
            json!({
                "title": "Dated",
                "dueDate": "2030-06-01T09:00:00Z",
                "assignedTo": [admin.id]
            }),
        )
        .await;
    let path = format!("/api/tasks/{}", task.id);

    let resp = server
        .request(Method::PUT, &path, Some(&admin.token))
        .json(&json!({ "description": "no date change" }))
        .send()
        .await
        .unwrap();
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.task.due_date, task.due_date);

    let resp = server
        .request(Method::PUT, &path, Some(&admin.token))
        .json(&json!({ "dueDate": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: TaskMutationResponse = resp.json().await.unwrap();
    assert_eq!(body.task.due_date, None);
}
