/// Resource policies
///
/// Role permissions answer "may this member edit tasks in general?". Policies
/// add resource-level rules on top: assignees may edit their own task,
/// creators may delete it, authors own their comments. Superadmins pass
/// every policy through [`TeamContext::can`].

use super::authorization::{AuthzError, TeamContext};
use super::permission::TeamPermission;
use crate::models::comment::Comment;
use crate::models::task::Task;

/// `view all projects`, or membership of the project
pub fn can_view_project(ctx: &TeamContext, is_project_member: bool) -> bool {
    ctx.can(TeamPermission::ViewAllProjects) || is_project_member
}

/// `edit tasks`, or being the assignee
pub fn can_update_task(ctx: &TeamContext, task: &Task) -> bool {
    ctx.can(TeamPermission::EditTasks) || task.assignee_id == Some(ctx.user_id)
}

/// `delete tasks`, or being the creator
pub fn can_delete_task(ctx: &TeamContext, task: &Task) -> bool {
    ctx.can(TeamPermission::DeleteTasks) || task.created_by == Some(ctx.user_id)
}

/// Only the author (or a superadmin)
pub fn can_update_comment(ctx: &TeamContext, comment: &Comment) -> bool {
    ctx.is_superadmin || comment.user_id == ctx.user_id
}

/// The author, or anyone allowed to delete tasks
pub fn can_delete_comment(ctx: &TeamContext, comment: &Comment) -> bool {
    comment.user_id == ctx.user_id || ctx.can(TeamPermission::DeleteTasks)
}

/// Turns a policy decision into a result
pub fn authorize(allowed: bool) -> Result<(), AuthzError> {
    if allowed {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::membership::TeamRole;
    use crate::models::task::TaskInput;
    use chrono::Utc;
    use uuid::Uuid;

    fn ctx(role: TeamRole) -> TeamContext {
        TeamContext {
            user_id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            role: Some(role),
            is_superadmin: false,
        }
    }

    fn task(assignee_id: Option<Uuid>, created_by: Option<Uuid>) -> Task {
        let input = TaskInput::titled("Review");
        Task {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            assignee_id,
            parent_id: None,
            created_by,
            title: input.title,
            description: None,
            status: input.status,
            priority: input.priority,
            start_date: None,
            due_date: None,
            completed_at: None,
            progress: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn comment(user_id: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            user_id,
            content: "Looks good".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_visibility() {
        let member = ctx(TeamRole::Member);
        assert!(!can_view_project(&member, false));
        assert!(can_view_project(&member, true));
        assert!(can_view_project(&ctx(TeamRole::Manager), false));
    }

    #[test]
    fn test_assignee_may_update_but_not_delete() {
        let member = ctx(TeamRole::Member);
        let assigned = task(Some(member.user_id), None);

        assert!(can_update_task(&member, &assigned));
        assert!(!can_delete_task(&member, &assigned));
        assert!(!can_update_task(&member, &task(None, None)));
    }

    #[test]
    fn test_creator_may_delete() {
        let member = ctx(TeamRole::Member);
        assert!(can_delete_task(&member, &task(None, Some(member.user_id))));
        assert!(can_delete_task(&ctx(TeamRole::Manager), &task(None, None)));
    }

    #[test]
    fn test_comment_ownership() {
        let author = ctx(TeamRole::Guest);
        let own = comment(author.user_id);
        let other = comment(Uuid::new_v4());

        assert!(can_update_comment(&author, &own));
        assert!(can_delete_comment(&author, &own));
        assert!(!can_update_comment(&author, &other));
        assert!(!can_delete_comment(&author, &other));

        let manager = ctx(TeamRole::Manager);
        assert!(!can_update_comment(&manager, &other));
        assert!(can_delete_comment(&manager, &other));
    }

    #[test]
    fn test_superadmin_passes_policies() {
        let admin = TeamContext {
            role: None,
            is_superadmin: true,
            ..ctx(TeamRole::Guest)
        };

        assert!(can_view_project(&admin, false));
        assert!(can_update_task(&admin, &task(None, None)));
        assert!(can_update_comment(&admin, &comment(Uuid::new_v4())));
        assert!(authorize(can_delete_task(&admin, &task(None, None))).is_ok());
        assert!(matches!(authorize(false), Err(AuthzError::NotAuthorized)));
    }
}
