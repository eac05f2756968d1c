//! Projects, environments and per-environment data.

use super::{Output, json};
use crate::models::{DataMap, Project};
use crate::storage::{Storage, generate_id};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// One line of `td project list`.
#[derive(Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub environments: usize,
    pub tests: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            environments: project.environments.len(),
            tests: project.tests.len(),
            created_at: project.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
    pub count: usize,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }
        let mut lines = vec![format!("{} project(s):\n", self.count)];
        for p in &self.projects {
            lines.push(format!(
                "{}  {}  ({} env, {} tests, created {})",
                p.id,
                p.name,
                p.environments,
                p.tests,
                p.created_at.format("%Y-%m-%d")
            ));
        }
        lines.join("\n")
    }
}

impl Output for Project {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} ({})", self.name, self.id),
            format!("Created: {}", self.created_at.format("%Y-%m-%d %H:%M")),
        ];
        if self.environments.is_empty() {
            lines.push("Environments: none".to_string());
        } else {
            lines.push("Environments:".to_string());
            for env in &self.environments {
                let keys = self.data.get(env).map(|d| d.len()).unwrap_or(0);
                lines.push(format!("  {} ({} keys)", env, keys));
            }
        }
        lines.push(format!("Tests: {}", self.tests.len()));
        for test in &self.tests {
            lines.push(format!("  {}  [{}] {} @ {}", test.id, test.state, test.name, test.environment));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

impl Output for Deleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {}", self.id)
    }
}

pub fn project_create(data_dir: &Path, name: &str) -> Result<Project> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Project name is required".to_string()));
    }
    let mut storage = Storage::open_with_data_dir(data_dir)?;
    let project = Project::new(generate_id(), name.to_string());
    storage.create_project(&project)?;
    Ok(project)
}

pub fn project_list(data_dir: &Path) -> Result<ProjectList> {
    let storage = Storage::open_with_data_dir(data_dir)?;
    let projects: Vec<ProjectSummary> = storage
        .list_projects()?
        .iter()
        .map(ProjectSummary::from)
        .collect();
    Ok(ProjectList {
        count: projects.len(),
        projects,
    })
}

pub fn project_show(data_dir: &Path, project: &str) -> Result<Project> {
    Storage::open_with_data_dir(data_dir)?.resolve_project(project)
}

pub fn project_delete(data_dir: &Path, project: &str) -> Result<Deleted> {
    let mut storage = Storage::open_with_data_dir(data_dir)?;
    let id = storage.resolve_project(project)?.id;
    storage.delete_project(&id)?;
    Ok(Deleted { id, deleted: true })
}

// === Environments ===

#[derive(Serialize)]
pub struct EnvironmentList {
    pub project_id: String,
    pub environments: Vec<String>,
}

impl Output for EnvironmentList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.environments.is_empty() {
            return "No environments.".to_string();
        }
        self.environments.join("\n")
    }
}

#[derive(Serialize)]
pub struct EnvAdded {
    pub project_id: String,
    pub environment: String,
    /// False when the environment already existed
    pub added: bool,
}

impl Output for EnvAdded {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.added {
            format!("Added environment {}", self.environment)
        } else {
            format!("Environment {} already exists", self.environment)
        }
    }
}

pub fn env_add(data_dir: &Path, project: &str, name: &str) -> Result<EnvAdded> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Environment name is required".to_string()));
    }
    let mut storage = Storage::open_with_data_dir(data_dir)?;
    let id = storage.resolve_project(project)?.id;
    let mut added = false;
    storage.modify_project(&id, |p| {
        added = p.add_environment(name);
        Ok(())
    })?;
    Ok(EnvAdded {
        project_id: id,
        environment: name.to_string(),
        added,
    })
}

pub fn env_list(data_dir: &Path, project: &str) -> Result<EnvironmentList> {
    let project = project_show(data_dir, project)?;
    Ok(EnvironmentList {
        project_id: project.id,
        environments: project.environments,
    })
}

// === Environment data ===

#[derive(Serialize)]
pub struct EnvironmentData {
    pub project_id: String,
    pub environment: String,
    pub data: DataMap,
}

impl Output for EnvironmentData {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.data.is_empty() {
            return format!("No data for {}.", self.environment);
        }
        self.data
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn require_environment(project: &Project, env: &str) -> Result<()> {
    if project.has_environment(env) {
        Ok(())
    } else {
        Err(Error::NotFound(format!(
            "Environment not found: {} (project {})",
            env, project.name
        )))
    }
}

pub fn data_set(
    data_dir: &Path,
    project: &str,
    env: &str,
    key: &str,
    value: &str,
) -> Result<EnvironmentData> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("Data key is required".to_string()));
    }
    let mut storage = Storage::open_with_data_dir(data_dir)?;
    let id = storage.resolve_project(project)?.id;
    let project = storage.modify_project(&id, |p| {
        require_environment(p, env)?;
        p.set_data(env, key, value);
        Ok(())
    })?;
    Ok(EnvironmentData {
        project_id: id,
        environment: env.to_string(),
        data: project.environment_data(env),
    })
}

pub fn data_unset(data_dir: &Path, project: &str, env: &str, key: &str) -> Result<EnvironmentData> {
    let mut storage = Storage::open_with_data_dir(data_dir)?;
    let id = storage.resolve_project(project)?.id;
    let project = storage.modify_project(&id, |p| {
        require_environment(p, env)?;
        match p.remove_data(env, key) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("Data key not found: {}", key))),
        }
    })?;
    Ok(EnvironmentData {
        project_id: id,
        environment: env.to_string(),
        data: project.environment_data(env),
    })
}

pub fn data_list(data_dir: &Path, project: &str, env: &str) -> Result<EnvironmentData> {
    let project = project_show(data_dir, project)?;
    require_environment(&project, env)?;
    Ok(EnvironmentData {
        environment: env.to_string(),
        data: project.environment_data(env),
        project_id: project.id,
    })
}
