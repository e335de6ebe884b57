use anyhow::Result;
use std::path::Path;

use warden_auth::PermissionStore;

use super::open_engine;

pub async fn create_project(base_dir: &Path, project: &str) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let p = engine.store().create_project(project).await?;
    println!("Created project {} ({})", p.id, p.created_at);
    Ok(())
}

pub async fn create_team(base_dir: &Path, project: &str, team: &str) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    let t = engine.store().create_team(project, team).await?;
    println!("Created team {} in project {}", t.id, t.project_id);
    Ok(())
}

pub async fn add_member(
    base_dir: &Path,
    project: &str,
    team: Option<&str>,
    user: &str,
) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    match team {
        Some(team) => {
            engine.store().add_team_member(project, team, user).await?;
            println!("Added {user} to team {team}");
        }
        None => {
            engine.store().add_project_user(project, user).await?;
            println!("Added {user} to project {project}");
        }
    }
    Ok(())
}

pub async fn remove_member(base_dir: &Path, project: &str, team: &str, user: &str) -> Result<()> {
    let engine = open_engine(base_dir).await?;
    engine.store().remove_team_member(project, team, user).await?;
    println!("Removed {user} from team {team}");
    Ok(())
}
