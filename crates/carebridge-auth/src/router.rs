//! Landing routes and redirects.

use carebridge_common_core::{Role, UserProfile};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{error::ResolutionError, gate::Decision};

/// The routes the access core can send a user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePath {
    Home,
    Login,
    PatientDashboard,
    HospitalDashboard,
    PoliceDashboard,
    AdminDashboard,
}

impl RoutePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::PatientDashboard => "/patient/dashboard",
            Self::HospitalDashboard => "/hospital/dashboard",
            Self::PoliceDashboard => "/police/dashboard",
            Self::AdminDashboard => "/admin/dashboard",
        }
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the administrator tier lands.
///
/// The legacy sign-in flow sent `admin` to the hospital dashboard while the
/// admin portal expected administrators on the admin dashboard. One of the
/// two has to be canonical; deployments pick it here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLanding {
    #[default]
    AdminDashboard,
    HospitalDashboard,
}

/// User-visible message attached to a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    SignInRequired,
    PermissionDenied,
    ProfileUnavailable,
    SignedOut,
}

impl Notice {
    /// Stable code carried in the redirect's query string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SignInRequired => "sign_in_required",
            Self::PermissionDenied => "permission_denied",
            Self::ProfileUnavailable => "profile_unavailable",
            Self::SignedOut => "signed_out",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "sign_in_required" => Some(Self::SignInRequired),
            "permission_denied" => Some(Self::PermissionDenied),
            "profile_unavailable" => Some(Self::ProfileUnavailable),
            "signed_out" => Some(Self::SignedOut),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SignInRequired => "Please sign in to continue.",
            Self::PermissionDenied => "You don't have permission to view that page.",
            Self::ProfileUnavailable => {
                "Your account profile could not be loaded. Please contact support."
            }
            Self::SignedOut => "You have been signed out.",
        }
    }
}

/// What a page shell should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render,
    Redirect { to: RoutePath, notice: Option<Notice> },
}

impl Navigation {
    pub fn redirect(to: RoutePath, notice: Notice) -> Self {
        Self::Redirect {
            to,
            notice: Some(notice),
        }
    }

    /// Location header value, notice code included.
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Render => None,
            Self::Redirect { to, notice: None } => Some(to.as_str().to_string()),
            Self::Redirect {
                to,
                notice: Some(notice),
            } => Some(format!("{}?notice={}", to.as_str(), notice.code())),
        }
    }
}

/// Maps roles to landing routes and decisions to navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleRouter {
    admin_landing: AdminLanding,
}

impl RoleRouter {
    pub fn new(admin_landing: AdminLanding) -> Self {
        Self { admin_landing }
    }

    pub fn admin_landing(&self) -> AdminLanding {
        self.admin_landing
    }

    /// Home route for a role. Total over [`Role`].
    pub fn landing_route_for(&self, role: Role) -> RoutePath {
        match role {
            Role::Patient => RoutePath::PatientDashboard,
            Role::HospitalStaff => RoutePath::HospitalDashboard,
            Role::Police => RoutePath::PoliceDashboard,
            Role::Admin | Role::SuperAdmin => match self.admin_landing {
                AdminLanding::AdminDashboard => RoutePath::AdminDashboard,
                AdminLanding::HospitalDashboard => RoutePath::HospitalDashboard,
            },
        }
    }

    /// Guard mode: navigation for a protected page given its gate decision.
    pub fn guard(&self, decision: Decision) -> Navigation {
        match decision {
            Decision::Allow => Navigation::Render,
            Decision::DenyUnauthenticated => {
                Navigation::redirect(RoutePath::Login, Notice::SignInRequired)
            }
            Decision::DenyWrongRole(role) => {
                Navigation::redirect(self.landing_route_for(role), Notice::PermissionDenied)
            }
        }
    }

    /// Post-login mode: where a freshly signed-in user goes.
    pub fn after_sign_in(&self, resolved: &Result<UserProfile, ResolutionError>) -> Navigation {
        match resolved {
            Ok(profile) => Navigation::Redirect {
                to: self.landing_route_for(profile.role),
                notice: None,
            },
            Err(_) => Navigation::redirect(RoutePath::Home, Notice::ProfileUnavailable),
        }
    }

    /// Where a user goes after signing out.
    pub fn after_sign_out(&self) -> Navigation {
        Navigation::redirect(RoutePath::Login, Notice::SignedOut)
    }
}
