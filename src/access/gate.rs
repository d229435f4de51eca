use super::permissions::{has_permission, primary_role};
use super::provider::ProviderChain;
use crate::models::{AccessDecision, CurrentUser};

/// Why a gate showed its fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoUser,
    MissingPermission,
    RoleMismatch,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NoUser => "no_user",
            DenyReason::MissingPermission => "missing_permission",
            DenyReason::RoleMismatch => "role_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Children { primary_role: String },
    Fallback {
        reason: DenyReason,
        primary_role: Option<String>,
    },
}

impl GateVerdict {
    pub fn is_visible(&self) -> bool {
        matches!(self, GateVerdict::Children { .. })
    }
}

impl From<GateVerdict> for AccessDecision {
    fn from(verdict: GateVerdict) -> Self {
        match verdict {
            GateVerdict::Children { primary_role } => AccessDecision {
                visible: true,
                primary_role: Some(primary_role),
                reason: None,
            },
            GateVerdict::Fallback {
                reason,
                primary_role,
            } => AccessDecision {
                visible: false,
                primary_role,
                reason: Some(reason.as_str().to_string()),
            },
        }
    }
}

/// RoleGate
///
/// Shows `children` only to viewers whose primary role grants `permission` and matches `roles`.
/// Both requirements apply when both are set. With `require_all` the primary role must equal
/// every listed role, which only a single-entry list can satisfy in practice.
///
/// Evaluated fresh on every call; nothing is cached between decisions.
#[derive(Debug, Clone, Default)]
pub struct RoleGate {
    permission: Option<String>,
    roles: Vec<String>,
    require_all: bool,
}

impl RoleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    pub fn check(&self, user: Option<&CurrentUser>) -> GateVerdict {
        let Some(user) = user else {
            tracing::warn!(
                permission = ?self.permission,
                roles = ?self.roles,
                "no current user resolved, rendering fallback"
            );
            return GateVerdict::Fallback {
                reason: DenyReason::NoUser,
                primary_role: None,
            };
        };

        let role = primary_role(user);

        if let Some(permission) = &self.permission {
            if !has_permission(&role, permission) {
                return GateVerdict::Fallback {
                    reason: DenyReason::MissingPermission,
                    primary_role: Some(role),
                };
            }
        }

        if !self.roles.is_empty() {
            let wanted = role.to_lowercase();
            let matches = |listed: &String| listed.trim().to_lowercase() == wanted;
            let allowed = if self.require_all {
                self.roles.iter().all(matches)
            } else {
                self.roles.iter().any(matches)
            };

            if !allowed {
                return GateVerdict::Fallback {
                    reason: DenyReason::RoleMismatch,
                    primary_role: Some(role),
                };
            }
        }

        GateVerdict::Children { primary_role: role }
    }

    /// Resolves the viewer through `providers`, then checks.
    pub fn check_with(&self, providers: &ProviderChain) -> GateVerdict {
        self.check(providers.resolve().as_ref())
    }

    pub fn render<T>(&self, user: Option<&CurrentUser>, children: T, fallback: T) -> T {
        conditional_render(self.check(user).is_visible(), children, fallback)
    }

    /// `render` with the default fallback: nothing.
    pub fn render_or_nothing<T>(&self, user: Option<&CurrentUser>, children: T) -> Option<T> {
        self.render(user, Some(children), None)
    }
}

/// ConditionalRender: plain branching, no role logic.
pub fn conditional_render<T>(condition: bool, children: T, fallback: T) -> T {
    if condition { children } else { fallback }
}
