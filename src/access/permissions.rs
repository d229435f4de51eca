use crate::models::{CurrentUser, RoleClaim, RolePermissions};

pub const ADMIN: &str = "admin";
pub const EDITOR: &str = "editor";
pub const AUTHOR: &str = "author";
pub const USER: &str = "user";
/// Role of a user record that names no role at all.
pub const GUEST: &str = "guest";

pub mod permission {
    pub const MANAGE_USERS: &str = "manage_users";
    pub const MANAGE_POSTS: &str = "manage_posts";
    pub const PUBLISH_POSTS: &str = "publish_posts";
    pub const MODERATE_COMMENTS: &str = "moderate_comments";
    pub const VIEW_ENQUIRIES: &str = "view_enquiries";
    pub const VIEW_DASHBOARD: &str = "view_dashboard";
    pub const COMMENT: &str = "comment";
}

use permission::*;

// Highest rank first. Decides the primary role of a multi-role user.
const ROLE_RANKING: [&str; 4] = [ADMIN, EDITOR, AUTHOR, USER];

static PERMISSION_TABLE: &[(&str, &[&str])] = &[
    (
        ADMIN,
        &[
            MANAGE_USERS,
            MANAGE_POSTS,
            PUBLISH_POSTS,
            MODERATE_COMMENTS,
            VIEW_ENQUIRIES,
            VIEW_DASHBOARD,
        ],
    ),
    (
        EDITOR,
        &[MANAGE_POSTS, PUBLISH_POSTS, MODERATE_COMMENTS, VIEW_DASHBOARD],
    ),
    (AUTHOR, &[MANAGE_POSTS, VIEW_DASHBOARD]),
    (USER, &[COMMENT]),
];

/// Permissions granted to `role`, matched case-insensitively. Unknown roles get none.
pub fn permissions_for(role: &str) -> &'static [&'static str] {
    let role = role.trim();
    PERMISSION_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(role))
        .map(|(_, granted)| *granted)
        .unwrap_or(&[])
}

pub fn has_permission(role: &str, permission: &str) -> bool {
    let permission = permission.trim();
    permissions_for(role)
        .iter()
        .any(|granted| *granted == permission)
}

/// primary_role
///
/// Collapses whatever the user record says about roles into one string. A single `role` wins
/// over a `roles` list. From a list the highest-ranked known role is taken, or the first entry
/// when none is known. No role at all yields `guest`.
pub fn primary_role(user: &CurrentUser) -> String {
    let listed: Vec<&str> = match (&user.role, &user.roles) {
        (Some(RoleClaim::One(role)), _) => vec![role.as_str()],
        (Some(RoleClaim::Many(roles)), _) => roles.iter().map(String::as_str).collect(),
        (None, Some(roles)) => roles.iter().map(String::as_str).collect(),
        (None, None) => Vec::new(),
    };

    let listed: Vec<&str> = listed
        .into_iter()
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .collect();

    if let [only] = listed.as_slice() {
        return only.to_string();
    }

    ROLE_RANKING
        .iter()
        .find(|ranked| listed.iter().any(|role| role.eq_ignore_ascii_case(ranked)))
        .map(|ranked| ranked.to_string())
        .or_else(|| listed.first().map(|role| role.to_string()))
        .unwrap_or_else(|| GUEST.to_string())
}

/// The whole table, for display to administrators.
pub fn permission_table() -> Vec<RolePermissions> {
    PERMISSION_TABLE
        .iter()
        .map(|(role, granted)| RolePermissions {
            role: role.to_string(),
            permissions: granted.iter().map(|p| p.to_string()).collect(),
        })
        .collect()
}
