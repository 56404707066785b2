//! Page shells. Protected pages only run once their guard has authorized
//! the viewer.

use crate::{middleware::CurrentProfile, response::ApiResponse};
use axum::extract::Query;
use carebridge_auth::{Notice, Role, UserProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct NoticeView {
    pub code: &'static str,
    pub message: &'static str,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            code: notice.code(),
            message: notice.message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicPage {
    pub page: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Serialize)]
pub struct Viewer {
    pub name: String,
    pub role: Role,
    pub role_label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub page: &'static str,
    pub viewer: Viewer,
}

impl DashboardPage {
    fn new(page: &'static str, profile: &UserProfile) -> Self {
        Self {
            page,
            viewer: Viewer {
                name: profile.display_name().to_string(),
                role: profile.role,
                role_label: profile.role.label(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

fn notice_from(query: &NoticeQuery) -> Option<NoticeView> {
    query
        .notice
        .as_deref()
        .and_then(Notice::from_code)
        .map(NoticeView::from)
}

/// `GET /`
pub async fn home(Query(query): Query<NoticeQuery>) -> ApiResponse<PublicPage> {
    ApiResponse::success(PublicPage {
        page: "home",
        notice: notice_from(&query),
    })
}

/// `GET /login`
pub async fn login(Query(query): Query<NoticeQuery>) -> ApiResponse<PublicPage> {
    ApiResponse::success(PublicPage {
        page: "login",
        notice: notice_from(&query),
    })
}

pub async fn patient_dashboard(CurrentProfile(profile): CurrentProfile) -> ApiResponse<DashboardPage> {
    ApiResponse::success(DashboardPage::new("patient_dashboard", &profile))
}

pub async fn hospital_dashboard(CurrentProfile(profile): CurrentProfile) -> ApiResponse<DashboardPage> {
    ApiResponse::success(DashboardPage::new("hospital_dashboard", &profile))
}

pub async fn police_dashboard(CurrentProfile(profile): CurrentProfile) -> ApiResponse<DashboardPage> {
    ApiResponse::success(DashboardPage::new("police_dashboard", &profile))
}

pub async fn admin_dashboard(CurrentProfile(profile): CurrentProfile) -> ApiResponse<DashboardPage> {
    ApiResponse::success(DashboardPage::new("admin_dashboard", &profile))
}
