/// Global search across the caller's workspace
///
/// Matches projects and tasks of the active team by name/title, the caller's
/// own teams by name, and members of the active team by name. Each group is
/// capped at [`RESULTS_PER_GROUP`].

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::team::Team;
use crate::models::user::{User, UserSummary};

pub const RESULTS_PER_GROUP: i64 = 5;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub teams: Vec<Team>,
    pub members: Vec<UserSummary>,
}

/// Runs every search group; a blank query returns empty groups
pub async fn search(
    pool: &PgPool,
    user_id: Uuid,
    team_id: Option<Uuid>,
    query: &str,
) -> Result<SearchResults, sqlx::Error> {
    let term = query.trim();
    if term.is_empty() {
        return Ok(SearchResults::default());
    }

    let teams = Team::search_for_user(pool, user_id, term, RESULTS_PER_GROUP).await?;

    let Some(team_id) = team_id else {
        return Ok(SearchResults {
            teams,
            ..SearchResults::default()
        });
    };

    let (projects, tasks, members) = tokio::try_join!(
        Project::search_in_team(pool, team_id, term, RESULTS_PER_GROUP),
        Task::search_in_team(pool, team_id, term, RESULTS_PER_GROUP),
        User::search_in_team(pool, team_id, term, RESULTS_PER_GROUP),
    )?;

    Ok(SearchResults {
        projects,
        tasks,
        teams,
        members,
    })
}
