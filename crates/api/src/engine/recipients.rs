//! Who hears about what.

use std::collections::BTreeSet;

use millwright_core::roles::Role;
use millwright_core::types::DbId;
use millwright_db::models::case::Case;
use millwright_db::repositories::{MachineRepo, UserRepo};
use millwright_db::DbPool;

async fn users_with_roles(pool: &DbPool, roles: &[Role]) -> Result<Vec<DbId>, sqlx::Error> {
    Ok(UserRepo::list_active_by_roles(pool, roles)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect())
}

fn collect(ids: impl IntoIterator<Item = DbId>) -> Vec<DbId> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Machine assignees and every manager.
pub async fn machine_watchers(pool: &DbPool, machine_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
    let assignees = MachineRepo::assignee_ids(pool, machine_id).await?;
    let managers = users_with_roles(pool, &[Role::Manager]).await?;
    Ok(collect(assignees.into_iter().chain(managers)))
}

/// All maintenance staff plus the machine's assignees.
pub async fn warning_watchers(pool: &DbPool, machine_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
    let staff = users_with_roles(pool, &[Role::Technician, Role::Repair, Role::Manager]).await?;
    let assignees = MachineRepo::assignee_ids(pool, machine_id).await?;
    Ok(collect(staff.into_iter().chain(assignees)))
}

/// A new case goes to its assignee, the machine's assignees and all managers.
pub async fn case_created(pool: &DbPool, case: &Case) -> Result<Vec<DbId>, sqlx::Error> {
    let watchers = machine_watchers(pool, case.machine_id).await?;
    Ok(collect(watchers.into_iter().chain(case.assigned_to)))
}

/// Status and priority changes go to the creator, the assignee and the
/// machine's assignees.
pub async fn case_followers(pool: &DbPool, case: &Case) -> Result<Vec<DbId>, sqlx::Error> {
    let assignees = MachineRepo::assignee_ids(pool, case.machine_id).await?;
    Ok(collect(
        assignees
            .into_iter()
            .chain(case.created_by)
            .chain(case.assigned_to),
    ))
}

/// Comments go to the creator and assignee, never back to the author.
pub fn comment_audience(case: &Case, author_id: DbId) -> Vec<DbId> {
    collect(
        case.created_by
            .into_iter()
            .chain(case.assigned_to)
            .filter(|id| *id != author_id),
    )
}
