mod common;

use reqwest::StatusCode;
use serde_json::json;

use common::{ADMIN_EMAIL, PASSWORD};

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

// ── Registration & Auth ─────────────────────────────────────────

#[tokio::test]
async fn register_bootstrap_creates_global_admin() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("Acme", ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["expiresIn"], 900);
    assert_eq!(body["user"]["role"], "GlobalAdmin");
    assert_eq!(body["user"]["companyName"], "Acme");
    assert!(body["user"].get("passwordHash").is_none());

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_closed_after_bootstrap() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.register("Other", "other@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("closed"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_reports_every_validation_error() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("  ", "not-an-email", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert!(errors.contains(&"companyName is required"));
    assert!(errors.iter().any(|e| e.starts_with("email")));
    assert!(errors.iter().any(|e| e.contains("at least 8")));

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_valid_credentials() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.login("Admin@Test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_invalid_credentials() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (_, status) = app.login(ADMIN_EMAIL, "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.login("nobody@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_rate_limited_after_repeated_failures() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    for _ in 0..5 {
        let (_, status) = app.login(ADMIN_EMAIL, "wrongpassword").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused until the window passes
    let (_, status) = app.login(ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_limit_ignores_email_case_and_padding() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    for email in [
        " Admin@Test.com",
        "ADMIN@TEST.COM ",
        "admin@test.com",
        "\tAdmin@test.com",
        "admin@TEST.com",
    ] {
        let (_, status) = app.login(email, "wrongpassword").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (_, status) = app.login(ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_refused_until_password_is_set() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (body, status) = app
        .post_auth(
            "/api/users",
            &token,
            &json!({
                "email": "pending@test.com",
                "firstName": "Pen",
                "lastName": "Ding",
                "role": "User",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isPasswordSet"], false);
    assert!(body["setupToken"].is_string());

    let (_, status) = app.login("pending@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn setup_token_is_single_use() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (body, _) = app
        .post_auth(
            "/api/users",
            &token,
            &json!({ "email": "once@test.com", "firstName": "O", "lastName": "N", "role": "User" }),
        )
        .await;
    let setup_token = body["setupToken"].as_str().unwrap();

    let payload = json!({ "email": "once@test.com", "token": setup_token, "password": PASSWORD });
    let resp = app
        .client
        .post(app.url("/api/auth/setup-password"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .client
        .post(app.url("/api/auth/setup-password"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn concurrent_setup_token_use_succeeds_once() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (body, _) = app
        .post_auth(
            "/api/users",
            &token,
            &json!({ "email": "race@test.com", "firstName": "R", "lastName": "A", "role": "User" }),
        )
        .await;
    let setup_token = body["setupToken"].as_str().unwrap();

    let submit = |password: &'static str| {
        let request = app
            .client
            .post(app.url("/api/auth/setup-password"))
            .json(&json!({ "email": "race@test.com", "token": setup_token, "password": password }));
        async move { request.send().await.unwrap().status() }
    };

    let (first, second) = tokio::join!(submit("firstpassword1"), submit("secondpassword2"));
    let mut statuses = vec![first, second];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::NO_CONTENT, StatusCode::BAD_REQUEST]);

    common::cleanup(app).await;
}

#[tokio::test]
async fn refresh_rotates_and_reuse_revokes_all_sessions() {
    let app = common::spawn_app().await;
    let (_, auth) = app.bootstrap().await;
    let first = auth["refreshToken"].as_str().unwrap().to_string();

    let refresh = |token: String| {
        let client = app.client.clone();
        let url = app.url("/api/auth/refresh");
        async move {
            client
                .post(url)
                .json(&json!({ "refreshToken": token }))
                .send()
                .await
                .unwrap()
        }
    };

    let resp = refresh(first.clone()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    let second = body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    // Replaying the rotated token revokes every session, including the new one
    let resp = refresh(first).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = refresh(second).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn refresh_without_token_unauthorized() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn logout_invalidates_refresh_token() {
    let app = common::spawn_app().await;
    let (_, auth) = app.bootstrap().await;
    let refresh_token = auth["refreshToken"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url("/api/auth/logout"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn change_password_signs_out_other_sessions() {
    let app = common::spawn_app().await;
    let (token, auth) = app.bootstrap().await;
    let old_refresh = auth["refreshToken"].as_str().unwrap();

    let (body, status) = app
        .post_auth(
            "/api/auth/change-password",
            &token,
            &json!({ "currentPassword": PASSWORD, "newPassword": "newpassword456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, status) = app.login(ADMIN_EMAIL, "newpassword456").await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
async fn me_returns_caller() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (body, status) = app.get_auth("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);

    common::cleanup(app).await;
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/api/projects")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, status) = app.get_auth("/api/projects", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

// ── Users & Roles ───────────────────────────────────────────────

#[tokio::test]
async fn admin_cannot_create_global_admin() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (_, admin) = app.create_user(&root, "admin2@test.com", "Admin", None).await;

    let (_, status) = app
        .post_auth(
            "/api/users",
            &admin,
            &json!({ "email": "g@test.com", "firstName": "G", "lastName": "A", "role": "GlobalAdmin" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (body, status) = app
        .post_auth(
            "/api/users",
            &admin,
            &json!({ "email": "m@test.com", "firstName": "M", "lastName": "G", "role": "Manager" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    common::cleanup(app).await;
}

#[tokio::test]
async fn plain_user_cannot_manage_users() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (_, user) = app.create_user(&root, "user@test.com", "User", None).await;

    let (_, status) = app
        .post_auth(
            "/api/users",
            &user,
            &json!({ "email": "x@test.com", "firstName": "X", "lastName": "Y", "role": "User" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;

    let (_, status) = app
        .post_auth(
            "/api/users",
            &root,
            &json!({ "email": "ADMIN@test.com", "firstName": "D", "lastName": "U", "role": "User" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::cleanup(app).await;
}

#[tokio::test]
async fn user_cannot_delete_self() {
    let app = common::spawn_app().await;
    let (root, auth) = app.bootstrap().await;
    let id = auth["user"]["id"].as_str().unwrap();

    let (_, status) = app.delete_auth(&format!("/api/users/{id}"), &root).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn reset_password_requires_new_setup() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (user_id, _) = app.create_user(&root, "reset@test.com", "User", None).await;

    let (body, status) = app
        .post_auth(&format!("/api/users/{user_id}/reset-password"), &root, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["setupToken"].is_string());

    let (_, status) = app.login("reset@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

// ── CRUD & Soft Delete ──────────────────────────────────────────

#[tokio::test]
async fn project_lifecycle() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let project = app.create_project(&token, "Website").await;
    let id = project["id"].as_str().unwrap();
    assert_eq!(project["companyName"], "Acme");
    assert_eq!(project["ownerEmail"], ADMIN_EMAIL);
    assert_eq!(project["isDeleted"], false);

    let (_, status) = app
        .put_auth(
            &format!("/api/projects/{id}"),
            &token,
            &json!({ "name": "Website v2", "isShared": true }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (body, status) = app.get_auth(&format!("/api/projects/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Website v2");
    assert_eq!(body["isShared"], true);
    assert!(body["updatedBy"].is_string());

    let (_, status) = app.delete_auth(&format!("/api/projects/{id}"), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, status) = app.get_auth(&format!("/api/projects/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (body, _) = app.get_auth("/api/projects", &token).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let (body, status) = app.get_auth("/api/projects/deleted", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["isDeleted"], true);

    let (_, status) = app
        .post_auth(&format!("/api/projects/{id}/restore"), &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, status) = app.get_auth(&format!("/api/projects/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
async fn validation_errors_are_listed() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (body, status) = app
        .post_auth("/api/projects", &token, &json!({ "name": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["name is required"]));

    common::cleanup(app).await;
}

#[tokio::test]
async fn unknown_id_not_found() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let fake_id = uuid::Uuid::now_v7();
    let (_, status) = app.get_auth(&format!("/api/notes/{fake_id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn screen_and_action_inherit_project_company() {
    let app = common::spawn_app().await;
    let (token, auth) = app.bootstrap().await;
    let company_id = auth["user"]["companyId"].as_str().unwrap();

    let project = app.create_project(&token, "App").await;
    let project_id = project["id"].as_str().unwrap();

    let (screen, status) = app
        .post_auth(
            "/api/screens",
            &token,
            &json!({ "projectId": project_id, "name": "Login", "route": "/login" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{screen}");
    assert_eq!(screen["companyId"], company_id);
    assert_eq!(screen["projectName"], "App");

    let (action_type, status) = app
        .post_auth("/api/screen-action-types", &token, &json!({ "name": "Click" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (action, status) = app
        .post_auth(
            "/api/screen-actions",
            &token,
            &json!({
                "screenId": screen["id"],
                "actionTypeId": action_type["id"],
                "name": "Submit",
                "sortOrder": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{action}");
    assert_eq!(action["companyId"], company_id);

    let screen_id = screen["id"].as_str().unwrap();
    let (body, _) = app
        .get_auth(&format!("/api/screen-actions?screenId={screen_id}"), &token)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn screen_action_types_are_global_admin_only() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (_, admin) = app.create_user(&root, "admin2@test.com", "Admin", None).await;

    let (_, status) = app
        .post_auth("/api/screen-action-types", &admin, &json!({ "name": "Swipe" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app
        .post_auth("/api/screen-action-types", &root, &json!({ "name": "Swipe" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, status) = app
        .post_auth("/api/screen-action-types", &root, &json!({ "name": "swipe" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (body, status) = app.get_auth("/api/screen-action-types", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn company_with_active_users_cannot_be_deleted() {
    let app = common::spawn_app().await;
    let (root, auth) = app.bootstrap().await;
    let company_id = auth["user"]["companyId"].as_str().unwrap();

    let (_, status) = app
        .delete_auth(&format!("/api/companies/{company_id}"), &root)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let empty = app.create_company(&root, "Empty Co").await;
    let (_, status) = app.delete_auth(&format!("/api/companies/{empty}"), &root).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    common::cleanup(app).await;
}

#[tokio::test]
async fn restore_conflicts_with_active_name() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;

    let first = app.create_company(&root, "Initech").await;
    let (_, status) = app.delete_auth(&format!("/api/companies/{first}"), &root).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The name is free again once the first company is deleted
    app.create_company(&root, "initech").await;

    let (body, status) = app
        .post_auth(&format!("/api/companies/{first}/restore"), &root, &json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A company with this name already exists");

    let (body, _) = app.get_auth("/api/companies/deleted", &root).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

// ── Employees ───────────────────────────────────────────────────

#[tokio::test]
async fn employee_create_then_fetch() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (created, status) = app
        .post_auth(
            "/api/employees",
            &token,
            &json!({
                "firstName": "  Ada ",
                "lastName": "Lovelace",
                "email": "ada@test.com",
                "position": "Analyst",
                "hiredOn": "2024-03-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["firstName"], "Ada");
    let id = created["id"].as_str().unwrap();

    let (body, status) = app.get_auth(&format!("/api/employees/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastName"], "Lovelace");
    assert_eq!(body["hiredOn"], "2024-03-01");
    assert_eq!(body["companyId"], created["companyId"]);

    let (_, status) = app
        .post_auth(
            "/api/employees",
            &token,
            &json!({ "firstName": "No", "lastName": "Mail", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn employee_changes_need_a_manager() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (_, user) = app.create_user(&root, "staff@test.com", "User", None).await;
    let (_, manager) = app.create_user(&root, "lead@test.com", "Manager", None).await;

    let (created, _) = app
        .post_auth("/api/employees", &root, &json!({ "firstName": "Grace", "lastName": "Hopper" }))
        .await;
    let path = format!("/api/employees/{}", created["id"].as_str().unwrap());
    let edit = json!({ "firstName": "Grace", "lastName": "Brewster" });

    // Every role may read
    let (body, status) = app.get_auth("/api/employees", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, status) = app
        .post_auth("/api/employees", &user, &json!({ "firstName": "A", "lastName": "B" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app.put_auth(&path, &user, &edit).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app.delete_auth(&path, &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app.put_auth(&path, &manager, &edit).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (body, _) = app.get_auth(&path, &manager).await;
    assert_eq!(body["lastName"], "Brewster");

    // Restoring takes an admin
    let (_, status) = app.delete_auth(&path, &manager).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, status) = app
        .post_auth(&format!("{path}/restore"), &manager, &json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app.post_auth(&format!("{path}/restore"), &root, &json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    common::cleanup(app).await;
}

#[tokio::test]
async fn employees_are_isolated_by_company() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;

    let (created, _) = app
        .post_auth("/api/employees", &root, &json!({ "firstName": "Acme", "lastName": "Staff" }))
        .await;
    let path = format!("/api/employees/{}", created["id"].as_str().unwrap());

    let globex = app.create_company(&root, "Globex").await;
    let (_, outsider) = app
        .create_user(&root, "hr@globex.com", "Admin", Some(&globex))
        .await;

    let (body, _) = app.get_auth("/api/employees", &outsider).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
    let (_, status) = app.get_auth(&path, &outsider).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app
        .put_auth(&path, &outsider, &json!({ "firstName": "X", "lastName": "Y" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A tenant admin cannot place an employee in another company
    let (body, status) = app
        .post_auth(
            "/api/employees",
            &outsider,
            &json!({ "firstName": "G", "lastName": "X", "companyId": created["companyId"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["companyId"], globex);

    common::cleanup(app).await;
}

#[tokio::test]
async fn employee_link_must_stay_in_company() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;

    let globex = app.create_company(&root, "Globex").await;
    let (foreign_user, _) = app
        .create_user(&root, "dev@globex.com", "User", Some(&globex))
        .await;

    let (body, status) = app
        .post_auth(
            "/api/employees",
            &root,
            &json!({ "firstName": "Link", "lastName": "Me", "userId": foreign_user }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Linked user not found in this company");

    let (body, status) = app
        .post_auth(
            "/api/employees",
            &root,
            &json!({
                "firstName": "Link",
                "lastName": "Me",
                "userId": foreign_user,
                "companyId": globex,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["userId"], foreign_user);

    common::cleanup(app).await;
}

#[tokio::test]
async fn employee_export_imports_back() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (_, status) = app
        .post_auth(
            "/api/employees",
            &token,
            &json!({
                "firstName": "Katherine",
                "lastName": "Johnson",
                "position": "Mathematician, Flight Research",
                "hiredOn": "1953-06-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (csv, status) = app.get_text("/api/employees/export", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(csv.starts_with("id,firstName,lastName,email,phone,position,hiredOn,companyId,createdAt"));

    let (body, status) = app.post_csv("/api/employees/import", &token, &csv).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["imported"], 1);
    assert_eq!(body["failed"], 0);

    let (body, _) = app.get_auth("/api/employees", &token).await;
    let employees = body.as_array().unwrap();
    assert_eq!(employees.len(), 2);
    for employee in employees {
        assert_eq!(employee["lastName"], "Johnson");
        assert_eq!(employee["position"], "Mathematician, Flight Research");
        assert_eq!(employee["hiredOn"], "1953-06-01");
    }

    common::cleanup(app).await;
}

// ── Tenant Isolation ────────────────────────────────────────────

#[tokio::test]
async fn other_company_rows_are_invisible() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;

    let project = app.create_project(&root, "Acme Secret").await;
    let project_id = project["id"].as_str().unwrap();

    let globex = app.create_company(&root, "Globex").await;
    let (_, outsider) = app
        .create_user(&root, "boss@globex.com", "Admin", Some(&globex))
        .await;

    let (_, status) = app
        .get_auth(&format!("/api/projects/{project_id}"), &outsider)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, status) = app
        .delete_auth(&format!("/api/projects/{project_id}"), &outsider)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (body, _) = app.get_auth("/api/projects", &outsider).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    // A screen cannot be attached to another company's project
    let (_, status) = app
        .post_auth(
            "/api/screens",
            &outsider,
            &json!({ "projectId": project_id, "name": "Sneaky" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The global admin sees both companies
    let (body, _) = app.get_auth("/api/companies", &root).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (body, _) = app.get_auth("/api/companies", &outsider).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Globex");

    common::cleanup(app).await;
}

#[tokio::test]
async fn plain_user_sees_own_and_shared_projects() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (_, user) = app.create_user(&root, "user@test.com", "User", None).await;

    app.create_project(&root, "Private").await;
    let (_, status) = app
        .post_auth("/api/projects", &root, &json!({ "name": "Shared", "isShared": true }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let mine = app.create_project(&user, "Mine").await;
    assert_eq!(mine["ownerEmail"], "user@test.com");

    let (body, _) = app.get_auth("/api/projects", &user).await;
    let mut names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Mine", "Shared"]);

    common::cleanup(app).await;
}

#[tokio::test]
async fn plain_user_sees_only_own_notes() {
    let app = common::spawn_app().await;
    let (root, _) = app.bootstrap().await;
    let (_, user) = app.create_user(&root, "writer@test.com", "User", None).await;

    let (theirs, status) = app
        .post_auth("/api/notes", &root, &json!({ "title": "Admin only" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (mine, status) = app
        .post_auth("/api/notes", &user, &json!({ "title": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(mine["authorEmail"], "writer@test.com");

    let (body, _) = app.get_auth("/api/notes", &user).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Mine"]);

    let theirs_id = theirs["id"].as_str().unwrap();
    let (_, status) = app.get_auth(&format!("/api/notes/{theirs_id}"), &user).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (body, _) = app.get_auth("/api/notes/paged", &user).await;
    assert_eq!(body["totalCount"], 1);

    // Managers and above read every note in the company
    let (body, _) = app.get_auth("/api/notes", &root).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

// ── Paging ──────────────────────────────────────────────────────

#[tokio::test]
async fn paged_listing_reports_totals() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let records: Vec<_> = (1..=25)
        .map(|i| json!({ "name": format!("Project {i:02}") }))
        .collect();
    let (body, status) = app
        .post_auth("/api/projects/bulk-create", &token, &json!(records))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 25);

    let (body, status) = app
        .get_auth("/api/projects/paged?page=3&pageSize=10&sortBy=name", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 25);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["items"][0]["name"], "Project 21");

    let (body, _) = app
        .get_auth("/api/projects/paged?page=0&pageSize=1000", &token)
        .await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 100);

    let (body, _) = app
        .get_auth("/api/projects/paged?search=project%2007", &token)
        .await;
    assert_eq!(body["totalCount"], 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn huge_page_number_returns_empty_page() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;
    app.create_project(&token, "Only").await;

    let (body, status) = app
        .get_auth(
            &format!("/api/projects/paged?page={}&pageSize=100", i64::MAX),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    common::cleanup(app).await;
}

// ── Bulk ────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_create_reports_failures_by_index() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (body, status) = app
        .post_auth(
            "/api/notes/bulk-create",
            &token,
            &json!([{ "title": "One" }, { "title": "" }, { "title": "Three" }]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn bulk_update_reports_missing_and_invalid_items() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let project = app.create_project(&token, "Before").await;
    let id = project["id"].as_str().unwrap();
    let missing = uuid::Uuid::now_v7().to_string();

    let (body, status) = app
        .put_auth(
            "/api/projects/bulk-update",
            &token,
            &json!([
                { "id": id, "name": "After", "isShared": true },
                { "id": missing, "name": "Ghost" },
                { "id": id, "name": "" },
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 2);
    assert_eq!(body["items"][0]["name"], "After");
    assert_eq!(body["errors"][0]["index"], 1);
    assert_eq!(body["errors"][1]["index"], 2);
    assert_eq!(body["errors"][1]["errors"], json!(["name is required"]));

    let (body, _) = app.get_auth(&format!("/api/projects/{id}"), &token).await;
    assert_eq!(body["name"], "After");
    assert_eq!(body["isShared"], true);

    common::cleanup(app).await;
}

#[tokio::test]
async fn bulk_delete_continues_past_missing_ids() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let project = app.create_project(&token, "Doomed").await;
    let missing = uuid::Uuid::now_v7().to_string();

    let (body, status) = app
        .post_auth(
            "/api/projects/bulk-delete",
            &token,
            &json!({ "ids": [missing, project["id"]] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["index"], 0);

    common::cleanup(app).await;
}

// ── CSV ─────────────────────────────────────────────────────────

#[tokio::test]
async fn csv_import_reports_row_numbers() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let csv = "name,description,isShared\n\
               Alpha,First,true\n\
               ,No name,false\n\
               Gamma,,false\n";
    let (body, status) = app.post_csv("/api/projects/import", &token, csv).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["imported"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["row"], 3);
    assert_eq!(body["errors"][0]["errors"], json!(["name is required"]));

    let (body, _) = app.get_auth("/api/projects", &token).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn csv_import_rejects_empty_upload() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (_, status) = app.post_csv("/api/notes/import", &token, "  \n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn csv_export_includes_header() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    let (text, status) = app.get_text("/api/notes/export", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text.trim_end(), "id,title,content,projectId,authorEmail,createdAt");

    app.create_project(&token, "Exported").await;
    let resp = app
        .client
        .get(app.url("/api/projects/export"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("projects.csv"));
    let text = resp.text().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("id,name,description,isShared"));
    assert!(lines[1].contains("Exported"));

    common::cleanup(app).await;
}

// ── Dashboard ───────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_counts_visible_rows() {
    let app = common::spawn_app().await;
    let (token, _) = app.bootstrap().await;

    app.create_project(&token, "One").await;
    app.create_project(&token, "Two").await;

    let (body, status) = app.get_auth("/api/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"], 2);
    assert_eq!(body["users"], 1);
    assert_eq!(body["recentProjects"].as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}
