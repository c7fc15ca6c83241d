//! Group management.
//!
//! A group is created by the signed-in user together with the friends they
//! selected. Its member list is denormalized into `memberIds` so membership
//! can be queried directly.

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use shared::{CreateGroupRequest, Group, Member, DEFAULT_GROUP_ICON};
use std::sync::Arc;
use uuid::Uuid;

use super::error::DomainError;
use super::session::Session;
use crate::storage::{Connection, GroupStorage};

pub const MAX_GROUP_NAME_LENGTH: usize = 50;
pub const MAX_ICON_LENGTH: usize = 2;

/// Background colours offered when creating a group
pub const GROUP_COLORS: [&str; 8] = [
    "#C8E6C9", "#C8B8E8", "#F4C6D7", "#F7C9A9", "#F2A974", "#FFF3B0", "#B69CCB", "#FFB6A6",
];

pub fn color_for_index(index: usize) -> &'static str {
    GROUP_COLORS[index % GROUP_COLORS.len()]
}

#[derive(Clone)]
pub struct GroupService<C: Connection> {
    group_repository: C::GroupRepository,
}

impl<C: Connection> GroupService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let group_repository = connection.create_group_repository();
        Self { group_repository }
    }

    pub async fn create_group(&self, session: &Session, request: CreateGroupRequest) -> Result<Group> {
        info!("Creating group '{}' for {}", request.name, session.user_id());

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::InvalidGroup("group name is required".to_string()).into());
        }
        if name.chars().count() > MAX_GROUP_NAME_LENGTH {
            return Err(DomainError::InvalidGroup(format!(
                "group name must be at most {} characters",
                MAX_GROUP_NAME_LENGTH
            ))
            .into());
        }

        let icon = match request.icon.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_GROUP_ICON.to_string(),
            Some(icon) if icon.chars().count() > MAX_ICON_LENGTH => {
                return Err(DomainError::InvalidGroup(format!(
                    "icon must be at most {} characters",
                    MAX_ICON_LENGTH
                ))
                .into());
            }
            Some(icon) => icon.to_string(),
        };

        let mut members: Vec<Member> = vec![session.self_member()];
        for friend in request.friends {
            if members.iter().any(|member| member.id == friend.id) {
                continue;
            }
            members.push(friend);
        }

        let group = Group {
            id: Uuid::new_v4().to_string(),
            name,
            icon,
            color: color_for_index(request.color_index).to_string(),
            member_ids: members.iter().map(|member| member.id.clone()).collect(),
            members,
            created_by: session.user_id().to_string(),
            created_at: Utc::now(),
        };

        self.group_repository.store_group(&group).await?;
        info!("Created group {} with {} members", group.id, group.members.len());
        Ok(group)
    }

    /// Groups the caller belongs to, newest first
    pub async fn groups_for_user(&self, session: &Session) -> Result<Vec<Group>> {
        self.group_repository
            .list_groups_for_member(session.user_id())
            .await
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Group> {
        match self.group_repository.get_group(group_id).await? {
            Some(group) => Ok(group),
            None => {
                warn!("Group {} not found", group_id);
                Err(DomainError::GroupNotFound(group_id.to_string()).into())
            }
        }
    }

    /// First group whose name matches exactly
    pub async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self
            .group_repository
            .find_groups_by_name(name)
            .await?
            .into_iter()
            .next())
    }
}
