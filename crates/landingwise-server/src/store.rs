//! Project, conversation and waitlist storage.
//!
//! All data lives in memory behind a single [`RwLock`]. When a snapshot
//! path is configured, the whole store is written to it after every
//! mutation (temp file, then rename) and read back on startup. A mutation
//! only becomes visible once its snapshot has been written.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use landingwise_publish::slugify;
use landingwise_workflow::{ChatMessage, Style};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;

// ============================================================================
// Records
// ============================================================================

/// Publication status of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Only visible to its owner.
    #[default]
    Draft,
    /// Served publicly under its slug.
    Published,
}

/// Design settings stored with a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Style used for generation.
    #[serde(default)]
    pub style: Style,
}

/// A user's landing page project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project id.
    pub id: Uuid,
    /// Owner.
    pub user_id: String,
    /// Display title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// The prompt the project was created with.
    pub prompt: String,
    /// Publication status.
    pub status: ProjectStatus,
    /// Latest accepted HTML.
    pub html_content: Option<String>,
    /// Design settings.
    pub metadata: ProjectMetadata,
    /// Public URL slug.
    pub slug: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Returns `true` if the project has non-empty HTML.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.html_content.as_deref().is_some_and(|html| !html.is_empty())
    }
}

/// A saved chat exchange for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation id.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Messages, oldest first.
    pub messages: Vec<ChatMessage>,
    /// When it was saved.
    pub created_at: DateTime<Utc>,
}

/// A visitor who joined a project's waitlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    /// Entry id.
    pub id: Uuid,
    /// Project the visitor signed up for.
    pub project_id: Uuid,
    /// Submitted address.
    pub email: String,
    /// Extra form data.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Signup time.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new project.
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Display title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Initial prompt.
    pub prompt: String,
    /// Design style.
    pub style: Style,
}

/// Partial update of a project. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New HTML.
    pub html_content: Option<String>,
    /// New status.
    pub status: Option<ProjectStatus>,
    /// New style.
    pub style: Option<Style>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    conversations: Vec<Conversation>,
    #[serde(default)]
    waitlist: Vec<WaitlistEntry>,
}

// ============================================================================
// ProjectStore
// ============================================================================

/// Shared storage for the HTTP API.
#[derive(Debug, Default)]
pub struct ProjectStore {
    data: RwLock<StoreData>,
    snapshot: Option<PathBuf>,
}

impl ProjectStore {
    /// Creates an empty store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a store backed by the snapshot at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first mutation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StoreError::corrupt(&path, e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            projects = data.projects.len(),
            "Project store loaded"
        );
        Ok(Self {
            data: RwLock::new(data),
            snapshot: Some(path),
        })
    }

    /// Snapshot path, if any.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    async fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(data)?;
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, path).await?;
        debug!(path = %path.display(), "Project store saved");
        Ok(())
    }

    /// Persists `next` and installs it as the live data.
    ///
    /// On failure `current` is left untouched.
    async fn commit(&self, current: &mut StoreData, next: StoreData) -> Result<(), StoreError> {
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    /// Creates a draft project owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written.
    pub async fn create_project(
        &self,
        user_id: &str,
        new: NewProject,
    ) -> Result<Project, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let project = Project {
            id,
            user_id: user_id.to_string(),
            slug: slugify(&new.title, &id.to_string()),
            title: new.title,
            description: new.description,
            prompt: new.prompt,
            status: ProjectStatus::Draft,
            html_content: None,
            metadata: ProjectMetadata { style: new.style },
            created_at: now,
            updated_at: now,
        };

        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.projects.push(project.clone());
        self.commit(&mut data, next).await?;
        Ok(project)
    }

    /// Projects owned by `user_id`, most recently updated first.
    pub async fn list_projects(&self, user_id: &str, limit: usize, offset: usize) -> Vec<Project> {
        let data = self.data.read().await;
        let mut projects: Vec<Project> = data
            .projects
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        projects.into_iter().skip(offset).take(limit).collect()
    }

    /// The project `id` if `user_id` owns it.
    pub async fn get_project(&self, user_id: &str, id: Uuid) -> Option<Project> {
        let data = self.data.read().await;
        data.projects
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned()
    }

    /// Applies `update` to a project owned by `user_id`.
    ///
    /// Returns `Ok(None)` when no such project exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written.
    pub async fn update_project(
        &self,
        user_id: &str,
        id: Uuid,
        update: ProjectUpdate,
    ) -> Result<Option<Project>, StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let Some(project) = next
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            project.title = title;
        }
        if let Some(description) = update.description {
            project.description = Some(description);
        }
        if let Some(html) = update.html_content {
            project.html_content = Some(html);
        }
        if let Some(status) = update.status {
            project.status = status;
        }
        if let Some(style) = update.style {
            project.metadata.style = style;
        }
        project.updated_at = Utc::now();

        let updated = project.clone();
        self.commit(&mut data, next).await?;
        Ok(Some(updated))
    }

    /// Deletes a project with its conversations and waitlist entries.
    ///
    /// Returns `Ok(false)` when no such project exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written.
    pub async fn delete_project(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        if !data.projects.iter().any(|p| p.id == id && p.user_id == user_id) {
            return Ok(false);
        }
        let mut next = data.clone();
        next.projects.retain(|p| p.id != id);
        next.conversations.retain(|c| c.project_id != id);
        next.waitlist.retain(|w| w.project_id != id);
        self.commit(&mut data, next).await?;
        Ok(true)
    }

    /// A published project by slug.
    pub async fn published_by_slug(&self, slug: &str) -> Option<Project> {
        let data = self.data.read().await;
        data.projects
            .iter()
            .find(|p| p.slug == slug && p.status == ProjectStatus::Published)
            .cloned()
    }

    /// A published project by id.
    pub async fn published_by_id(&self, id: Uuid) -> Option<Project> {
        let data = self.data.read().await;
        data.projects
            .iter()
            .find(|p| p.id == id && p.status == ProjectStatus::Published)
            .cloned()
    }

    // ------------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------------

    /// Saves a conversation for `project_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written.
    pub async fn append_conversation(
        &self,
        project_id: Uuid,
        messages: Vec<ChatMessage>,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            project_id,
            messages,
            created_at: Utc::now(),
        };
        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.conversations.push(conversation.clone());
        self.commit(&mut data, next).await?;
        Ok(conversation)
    }

    /// The most recently saved conversation of `project_id`.
    pub async fn latest_conversation(&self, project_id: Uuid) -> Option<Conversation> {
        let data = self.data.read().await;
        data.conversations
            .iter()
            .rev()
            .find(|c| c.project_id == project_id)
            .cloned()
    }

    // ------------------------------------------------------------------------
    // Waitlist
    // ------------------------------------------------------------------------

    /// Records a signup.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the snapshot cannot be written.
    pub async fn add_waitlist_entry(
        &self,
        project_id: Uuid,
        email: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<WaitlistEntry, StoreError> {
        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            project_id,
            email: email.to_string(),
            metadata,
            created_at: Utc::now(),
        };
        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.waitlist.push(entry.clone());
        self.commit(&mut data, next).await?;
        Ok(entry)
    }

    /// Signups for `project_id`, newest first.
    ///
    /// `limit` of `None` returns every entry after `offset`.
    pub async fn waitlist_entries(
        &self,
        project_id: Uuid,
        limit: Option<usize>,
        offset: usize,
    ) -> Vec<WaitlistEntry> {
        let data = self.data.read().await;
        let mut entries: Vec<WaitlistEntry> = data
            .waitlist
            .iter()
            .rev()
            .filter(|w| w.project_id == project_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }
}
