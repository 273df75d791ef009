//! Access authorization for tab, favorite and subscription changes.

use crate::errors::AuthError;
use crate::project::models::{Project, ProjectRole, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewProject,
    ManageTabs,
    ManageTeamFavorites,
    SavePersonalFavorite,
    Subscribe,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewProject => "view project",
            Self::ManageTabs => "manage tabs",
            Self::ManageTeamFavorites => "manage team favorites",
            Self::SavePersonalFavorite => "save personal favorite",
            Self::Subscribe => "subscribe to history",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Authorizer {
    fn can(&self, user: &User, action: Action, project: &Project) -> bool;

    /// `can`, as a `Result` that callers propagate with `?`.
    fn authorize(&self, user: &User, action: Action, project: &Project) -> Result<(), AuthError> {
        if self.can(user, action, project) {
            Ok(())
        } else {
            tracing::warn!(login = %user.login, %action, project = %project.identifier, "Access denied");
            Err(AuthError::AccessDenied {
                login: user.login.clone(),
                action: action.to_string(),
            })
        }
    }
}

/// Grants actions by project role: admins manage tabs, team members manage
/// team favorites, anyone signed in keeps personal favorites and
/// subscriptions, anonymous users only read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn can(&self, user: &User, action: Action, _project: &Project) -> bool {
        match action {
            Action::ViewProject => true,
            Action::ManageTabs => user.role == ProjectRole::Admin,
            Action::ManageTeamFavorites => {
                matches!(user.role, ProjectRole::Admin | ProjectRole::TeamMember)
            }
            Action::SavePersonalFavorite | Action::Subscribe => user.role != ProjectRole::Anonymous,
        }
    }
}
