/// Integration tests for the TeamPulse API
///
/// These tests drive the full router against PostgreSQL:
/// - Team creation and ownership
/// - Invitation acceptance, expiry and mail failures
/// - Membership guards (last owner, management retention, role hierarchy)
/// - Permission checks on projects and task/team consistency
/// - Team membership of assignees, project members and customers
/// - Watchers, team switching, search and the dashboard
///
/// Database URL should be set via DATABASE_URL environment variable.

mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Duration;
use common::{create_user, test_config, token_for, TestContext};
use serde_json::json;
use std::sync::Arc;
use teampulse_shared::mail::{MailError, Mailer, OutgoingMail};
use teampulse_shared::models::invitation::{Invitation, NewInvitation};
use teampulse_shared::models::membership::{Membership, TeamRole};
use teampulse_shared::models::user::User;
use uuid::Uuid;

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _mail: OutgoingMail) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

fn first_field(body: &serde_json::Value) -> &str {
    body["details"][0]["field"].as_str().unwrap_or_default()
}

async fn create_project(ctx: &TestContext, body: serde_json::Value) -> String {
    let (status, project) = ctx.send("POST", "/v1/projects", Some(&ctx.owner_token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    project["id"].as_str().unwrap().to_string()
}

async fn create_task(ctx: &TestContext, project_id: &str, body: serde_json::Value) -> String {
    let (status, task) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", project_id),
            Some(&ctx.owner_token),
            Some(body),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    task["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.send("GET", "/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_create_team_attaches_owner_and_switches() {
    let ctx = TestContext::new().await.unwrap();
    let founder = create_user(&ctx.db, "founder").await.unwrap();
    let token = token_for(founder.id);

    let (status, body) = ctx
        .send("POST", "/v1/teams", Some(&token), Some(json!({ "name": "Research" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let team_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(
        Membership::get_role(&ctx.db, team_id, founder.id).await.unwrap(),
        Some(TeamRole::Owner)
    );

    let reloaded = User::find_by_id(&ctx.db, founder.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_team_id, Some(team_id));

    let (status, body) = ctx.send("GET", "/v1/teams", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["role"], "owner");
    assert_eq!(body[0]["member_count"], 1);

    let (status, _) = ctx
        .send("POST", "/v1/teams", Some(&token), Some(json!({ "name": "  " })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_accept_valid_invitation_joins_team() {
    let ctx = TestContext::new().await.unwrap();
    let invitee = create_user(&ctx.db, "invitee").await.unwrap();

    let (invitation, token) = Invitation::create(
        &ctx.db,
        NewInvitation {
            team_id: ctx.team.id,
            email: invitee.email.to_uppercase(),
            role: TeamRole::Manager,
            invited_by: Some(ctx.owner.id),
            ttl: Duration::hours(24),
        },
    )
    .await
    .unwrap();

    let (status, body) = ctx
        .send("GET", &format!("/v1/invitations/{}", token), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registration_required"], false);
    assert_eq!(body["role"], "manager");

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/invitations/{}/accept", token),
            Some(&token_for(invitee.id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team_id"], ctx.team.id.to_string());

    assert_eq!(
        Membership::get_role(&ctx.db, ctx.team.id, invitee.id).await.unwrap(),
        Some(TeamRole::Manager)
    );
    let reloaded = User::find_by_id(&ctx.db, invitee.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_team_id, Some(ctx.team.id));

    let pending = Invitation::list_pending(&ctx.db, ctx.team.id).await.unwrap();
    assert!(pending.iter().all(|i| i.id != invitation.id));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_invitation_for_another_email_is_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    let stranger = create_user(&ctx.db, "stranger").await.unwrap();

    let (_, token) = Invitation::create(
        &ctx.db,
        NewInvitation {
            team_id: ctx.team.id,
            email: format!("someone-{}@example.com", Uuid::new_v4()),
            role: TeamRole::Member,
            invited_by: Some(ctx.owner.id),
            ttl: Duration::hours(24),
        },
    )
    .await
    .unwrap();

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/v1/invitations/{}/accept", token),
            Some(&token_for(stranger.id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!Membership::is_member(&ctx.db, ctx.team.id, stranger.id).await.unwrap());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_expired_invitation_cannot_be_accepted() {
    let ctx = TestContext::new().await.unwrap();
    let invitee = create_user(&ctx.db, "late").await.unwrap();

    let (_, token) = Invitation::create(
        &ctx.db,
        NewInvitation {
            team_id: ctx.team.id,
            email: invitee.email.clone(),
            role: TeamRole::Member,
            invited_by: Some(ctx.owner.id),
            ttl: Duration::hours(-1),
        },
    )
    .await
    .unwrap();

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/v1/invitations/{}/accept", token),
            Some(&token_for(invitee.id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!Membership::is_member(&ctx.db, ctx.team.id, invitee.id).await.unwrap());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_register_with_invitation_token_joins_team() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("newcomer-{}@example.com", Uuid::new_v4());

    let (_, token) = Invitation::create(
        &ctx.db,
        NewInvitation {
            team_id: ctx.team.id,
            email: email.clone(),
            role: TeamRole::Member,
            invited_by: Some(ctx.owner.id),
            ttl: Duration::hours(24),
        },
    )
    .await
    .unwrap();

    let (status, body) = ctx
        .send("GET", &format!("/v1/invitations/{}", token), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registration_required"], true);

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "name": "Newcomer",
                "email": email,
                "password": "welcome2024",
                "invitation_token": token,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["joined_team_id"], ctx.team.id.to_string());
    assert_eq!(body["user"]["current_team_id"], ctx.team.id.to_string());
    assert!(body["user"].get("password_hash").is_none());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_invitation_mail_failure_revokes_invitation() {
    let config = test_config();
    let ctx = TestContext::with_mailer(config, Arc::new(FailingMailer)).await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/teams/{}/invitations", ctx.team.id),
            Some(&ctx.owner_token),
            Some(json!({ "email": "unreachable@example.com", "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");

    let pending = Invitation::list_pending(&ctx.db, ctx.team.id).await.unwrap();
    assert!(pending.is_empty());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_invitation_is_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let uri = format!("/v1/teams/{}/invitations", ctx.team.id);
    let body = json!({ "email": "twice@example.com", "role": "guest" });

    let (status, invitation) = ctx
        .send("POST", &uri, Some(&ctx.owner_token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(invitation.get("token_hash").is_none());

    let (status, error) = ctx.send("POST", &uri, Some(&ctx.owner_token), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&error), "email");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_manager_cannot_invite_owner() {
    let ctx = TestContext::new().await.unwrap();
    let (_, manager_token) = ctx.member("manager", TeamRole::Manager).await.unwrap();

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/v1/teams/{}/invitations", ctx.team.id),
            Some(&manager_token),
            Some(json!({ "email": "boss@example.com", "role": "owner" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_removing_last_owner_is_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(
            "DELETE",
            &format!("/v1/teams/{}/members/{}", ctx.team.id, ctx.owner.id),
            Some(&ctx.owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "user_id");
    assert!(Membership::is_member(&ctx.db, ctx.team.id, ctx.owner.id).await.unwrap());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_removed_member_falls_back_to_no_team() {
    let ctx = TestContext::new().await.unwrap();
    let (member, _) = ctx.member("leaver", TeamRole::Member).await.unwrap();

    let (status, _) = ctx
        .send(
            "DELETE",
            &format!("/v1/teams/{}/members/{}", ctx.team.id, member.id),
            Some(&ctx.owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let reloaded = User::find_by_id(&ctx.db, member.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_team_id, None);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_bulk_role_update_without_manager_is_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let (member, _) = ctx.member("member", TeamRole::Member).await.unwrap();

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/v1/teams/{}/members/roles", ctx.team.id),
            Some(&ctx.owner_token),
            Some(json!({
                "roles": [
                    { "user_id": ctx.owner.id, "role": "member" },
                    { "user_id": member.id, "role": "guest" },
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "roles");

    assert_eq!(
        Membership::get_role(&ctx.db, ctx.team.id, ctx.owner.id).await.unwrap(),
        Some(TeamRole::Owner)
    );
    assert_eq!(
        Membership::get_role(&ctx.db, ctx.team.id, member.id).await.unwrap(),
        Some(TeamRole::Member)
    );

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/v1/teams/{}/members/roles", ctx.team.id),
            Some(&ctx.owner_token),
            Some(json!({ "roles": [{ "user_id": member.id, "role": "manager" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["user_id"] == member.id.to_string() && m["role"] == "manager"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_member_cannot_create_project() {
    let ctx = TestContext::new().await.unwrap();
    let (_, member_token) = ctx.member("member", TeamRole::Member).await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&member_token),
            Some(json!({ "name": "Side project" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Main project" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_user_without_team_has_no_active_team() {
    let ctx = TestContext::new().await.unwrap();
    let loner = create_user(&ctx.db, "loner").await.unwrap();

    let (status, body) = ctx.send("GET", "/v1/projects", Some(&token_for(loner.id)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "No active team");

    let (status, _) = ctx
        .send(
            "GET",
            &format!("/v1/teams/{}/members", ctx.team.id),
            Some(&token_for(loner.id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_team_mismatch_is_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let (status, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Launch", "status": "active" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = project["id"].as_str().unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", project_id),
            Some(&ctx.owner_token),
            Some(json!({ "title": "Write copy", "team_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "team_id");

    let (status, task) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", project_id),
            Some(&ctx.owner_token),
            Some(json!({ "title": "Write copy", "team_id": ctx.team.id, "status": "done" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["team_id"], ctx.team.id.to_string());
    assert!(task["completed_at"].is_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_project_listing_filters_and_soft_delete() {
    let ctx = TestContext::new().await.unwrap();

    for (name, status) in [("Alpha", "active"), ("Beta", "completed"), ("Gamma", "active")] {
        let (code, _) = ctx
            .send(
                "POST",
                "/v1/projects",
                Some(&ctx.owner_token),
                Some(json!({ "name": name, "status": status })),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, body) = ctx
        .send(
            "GET",
            "/v1/projects?status=active&sort=name&direction=asc",
            Some(&ctx.owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"]["total"], 2);
    assert_eq!(body["projects"]["data"][0]["name"], "Alpha");
    assert_eq!(body["stats"]["total"], 3);
    assert_eq!(body["stats"]["completed"], 1);

    let (status, _) = ctx
        .send("GET", "/v1/projects?status=sleeping", Some(&ctx.owner_token), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let alpha = body["projects"]["data"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = ctx
        .send("DELETE", &format!("/v1/projects/{}", alpha), Some(&ctx.owner_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .send("GET", &format!("/v1/projects/{}", alpha), Some(&ctx.owner_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_projects_are_invisible_across_teams() {
    let ctx = TestContext::new().await.unwrap();
    let other = TestContext::new().await.unwrap();

    let (_, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Secret" })),
        )
        .await;
    let project_id = project["id"].as_str().unwrap();

    let (status, _) = other
        .send("GET", &format!("/v1/projects/{}", project_id), Some(&other.owner_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
    other.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_comment_edit_is_author_only() {
    let ctx = TestContext::new().await.unwrap();
    let (_, member_token) = ctx.member("commenter", TeamRole::Member).await.unwrap();

    let (_, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Docs" })),
        )
        .await;
    let (_, task) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", project["id"].as_str().unwrap()),
            Some(&ctx.owner_token),
            Some(json!({ "title": "Review" })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, comment) = ctx
        .send(
            "POST",
            &format!("/v1/tasks/{}/comments", task_id),
            Some(&member_token),
            Some(json!({ "content": "On it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_uri = format!("/v1/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = ctx
        .send("PUT", &comment_uri, Some(&ctx.owner_token), Some(json!({ "content": "Edited" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Owners hold `delete tasks`, so they may remove it
    let (status, _) = ctx.send("DELETE", &comment_uri, Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.send("GET", "/v1/admin/users", Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_bulk_role_update_cannot_demote_last_owner() {
    let ctx = TestContext::new().await.unwrap();
    let (manager, manager_token) = ctx.member("manager", TeamRole::Manager).await.unwrap();
    let roles_uri = format!("/v1/teams/{}/members/roles", ctx.team.id);

    let (status, body) = ctx
        .send(
            "PUT",
            &roles_uri,
            Some(&ctx.owner_token),
            Some(json!({ "roles": [{ "user_id": ctx.owner.id, "role": "manager" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "roles");
    assert_eq!(
        Membership::get_role(&ctx.db, ctx.team.id, ctx.owner.id).await.unwrap(),
        Some(TeamRole::Owner)
    );

    // Handing ownership over in the same batch is fine
    let (status, _) = ctx
        .send(
            "PUT",
            &roles_uri,
            Some(&ctx.owner_token),
            Some(json!({
                "roles": [
                    { "user_id": manager.id, "role": "owner" },
                    { "user_id": ctx.owner.id, "role": "manager" },
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        Membership::get_role(&ctx.db, ctx.team.id, manager.id).await.unwrap(),
        Some(TeamRole::Owner)
    );

    let (status, _) = ctx
        .send("DELETE", &format!("/v1/teams/{}", ctx.team.id), Some(&manager_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_task_assignee_must_belong_to_team() {
    let ctx = TestContext::new().await.unwrap();
    let (member, _) = ctx.member("assignee", TeamRole::Member).await.unwrap();
    let stranger = create_user(&ctx.db, "stranger").await.unwrap();
    let project_id = create_project(&ctx, json!({ "name": "Assignments" })).await;
    let tasks_uri = format!("/v1/projects/{}/tasks", project_id);

    let (status, body) = ctx
        .send(
            "POST",
            &tasks_uri,
            Some(&ctx.owner_token),
            Some(json!({ "title": "Outsourced", "assignee_id": stranger.id })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "assignee_id");

    let (status, task) = ctx
        .send(
            "POST",
            &tasks_uri,
            Some(&ctx.owner_token),
            Some(json!({ "title": "In house", "assignee_id": member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["assignee_id"], member.id.to_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_parent_task_must_share_project() {
    let ctx = TestContext::new().await.unwrap();
    let first = create_project(&ctx, json!({ "name": "First" })).await;
    let second = create_project(&ctx, json!({ "name": "Second" })).await;
    let foreign_parent = create_task(&ctx, &second, json!({ "title": "Elsewhere" })).await;
    let local_parent = create_task(&ctx, &first, json!({ "title": "Epic" })).await;

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", first),
            Some(&ctx.owner_token),
            Some(json!({ "title": "Subtask", "parent_id": foreign_parent })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "parent_id");

    let (status, task) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", first),
            Some(&ctx.owner_token),
            Some(json!({ "title": "Subtask", "parent_id": local_parent })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["parent_id"], local_parent.as_str());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_cannot_be_nested_under_its_subtask() {
    let ctx = TestContext::new().await.unwrap();
    let project_id = create_project(&ctx, json!({ "name": "Hierarchy" })).await;
    let parent = create_task(&ctx, &project_id, json!({ "title": "Parent" })).await;
    let child = create_task(&ctx, &project_id, json!({ "title": "Child", "parent_id": parent })).await;
    let parent_uri = format!("/v1/tasks/{}", parent);

    let (status, body) = ctx
        .send(
            "PUT",
            &parent_uri,
            Some(&ctx.owner_token),
            Some(json!({ "title": "Parent", "parent_id": child })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "parent_id");

    let (status, body) = ctx
        .send(
            "PUT",
            &parent_uri,
            Some(&ctx.owner_token),
            Some(json!({ "title": "Parent", "parent_id": parent })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "parent_id");

    // Detaching the child lets the former parent move under it
    let (status, _) = ctx
        .send("PUT", &format!("/v1/tasks/{}", child), Some(&ctx.owner_token), Some(json!({ "title": "Child" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, task) = ctx
        .send(
            "PUT",
            &parent_uri,
            Some(&ctx.owner_token),
            Some(json!({ "title": "Parent", "parent_id": child })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["parent_id"], child.as_str());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_project_members_must_belong_to_team() {
    let ctx = TestContext::new().await.unwrap();
    let (member, _) = ctx.member("crew", TeamRole::Member).await.unwrap();
    let stranger = create_user(&ctx.db, "stranger").await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Crewed", "members": [member.id, stranger.id] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "members");

    let project_id = create_project(&ctx, json!({ "name": "Crewed", "members": [member.id, member.id] })).await;

    let (status, body) = ctx
        .send("GET", &format!("/v1/projects/{}", project_id), Some(&ctx.owner_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_project_customer_must_belong_to_team() {
    let ctx = TestContext::new().await.unwrap();
    let other = TestContext::new().await.unwrap();

    let (status, foreign) = other
        .send("POST", "/v1/customers", Some(&other.owner_token), Some(json!({ "name": "Globex" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Billing", "customer_id": foreign["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(first_field(&body), "customer_id");

    let (status, own) = ctx
        .send("POST", "/v1/customers", Some(&ctx.owner_token), Some(json!({ "name": "Initech" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&ctx.owner_token),
            Some(json!({ "name": "Billing", "customer_id": own["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["customer_id"], own["id"]);

    ctx.cleanup().await.unwrap();
    other.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_watch_and_unwatch_task() {
    let ctx = TestContext::new().await.unwrap();
    let project_id = create_project(&ctx, json!({ "name": "Observed" })).await;
    let task_id = create_task(&ctx, &project_id, json!({ "title": "Keep an eye" })).await;
    let watchers_uri = format!("/v1/tasks/{}/watchers", task_id);

    let (status, body) = ctx.send("POST", &watchers_uri, Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watching"], true);

    // Watching twice keeps a single row
    ctx.send("POST", &watchers_uri, Some(&ctx.owner_token), None).await;

    let (status, body) = ctx.send("GET", &watchers_uri, Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], ctx.owner.id.to_string());

    let (_, task) = ctx
        .send("GET", &format!("/v1/tasks/{}", task_id), Some(&ctx.owner_token), None)
        .await;
    assert_eq!(task["watchers"].as_array().unwrap().len(), 1);

    let (status, body) = ctx.send("DELETE", &watchers_uri, Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watching"], false);

    let (_, body) = ctx.send("GET", &watchers_uri, Some(&ctx.owner_token), None).await;
    assert!(body.as_array().unwrap().is_empty());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_switch_team_requires_membership() {
    let ctx = TestContext::new().await.unwrap();
    let other = TestContext::new().await.unwrap();
    let switch_uri = format!("/v1/teams/{}/switch", ctx.team.id);

    let (status, _) = other.send("POST", &switch_uri, Some(&other.owner_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Membership::attach(&ctx.db, ctx.team.id, other.owner.id, TeamRole::Member)
        .await
        .unwrap();

    let (status, body) = other.send("POST", &switch_uri, Some(&other.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_team_id"], ctx.team.id.to_string());

    let reloaded = User::find_by_id(&ctx.db, other.owner.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_team_id, Some(ctx.team.id));

    ctx.cleanup().await.unwrap();
    other.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_search_groups_results_by_kind() {
    let ctx = TestContext::new().await.unwrap();
    let project_id = create_project(&ctx, json!({ "name": "Lighthouse" })).await;
    create_task(&ctx, &project_id, json!({ "title": "Lighthouse lens" })).await;

    let (status, body) = ctx.send("GET", "/v1/search?q=", Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["projects", "tasks", "teams", "members"] {
        assert_eq!(body[key], json!([]));
    }

    let (status, body) = ctx.send("GET", "/v1/search?q=lighthouse", Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"].as_array().unwrap().len(), 1);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
    assert!(body["members"].as_array().unwrap().is_empty());

    let (_, body) = ctx.send("GET", "/v1/search?q=owner", Some(&ctx.owner_token), None).await;
    assert_eq!(body["members"][0]["id"], ctx.owner.id.to_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_dashboard_tabs() {
    let ctx = TestContext::new().await.unwrap();
    let project_id = create_project(&ctx, json!({ "name": "Roadmap" })).await;
    create_task(
        &ctx,
        &project_id,
        json!({ "title": "Plan", "assignee_id": ctx.owner.id, "priority": "high" }),
    )
    .await;
    create_task(
        &ctx,
        &project_id,
        json!({ "title": "Kickoff", "assignee_id": ctx.owner.id, "status": "done" }),
    )
    .await;

    let (status, body) = ctx.send("GET", "/v1/dashboard", Some(&ctx.owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_tab"], "dashboard");
    assert_eq!(body["current_team_id"], ctx.team.id.to_string());
    assert_eq!(body["teams"][0]["can_delete"], true);
    assert_eq!(body["dashboard"]["task_stats"]["open"], 1);
    assert_eq!(body["dashboard"]["task_stats"]["completed"], 1);
    assert_eq!(body["dashboard"]["open_by_priority"][0]["priority"], "high");
    assert_eq!(body["dashboard"]["projects"][0]["project"]["id"], project_id.as_str());
    assert_eq!(body["dashboard"]["is_manager"], true);
    assert!(body.get("projects").is_none());

    let (status, body) = ctx
        .send("GET", "/v1/dashboard?tab=projects", Some(&ctx.owner_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"]["projects"]["total"], 1);
    assert_eq!(body["projects"]["stats"]["total"], 1);
    assert!(body.get("dashboard").is_none());

    ctx.cleanup().await.unwrap();
}
