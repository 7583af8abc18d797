// web-server/src/gate.rs
//! Route classification and the per-request auth decision.
//!
//! Kept free of actix types so the whole table can be tested directly.

use common::{AuthConfig, TokenStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Old admin URL, always sent to the matching dashboard URL
    Legacy { target: String },
    /// Login and friends; authenticated users are bounced away
    AuthPage,
    /// Requires a valid token
    Protected,
    /// Not gated
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    AllowAndClearCookie,
    RedirectToLogin { clear_cookie: bool },
    RedirectToDashboard,
    RedirectLegacy(String),
}

#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub login_path: String,
    pub dashboard_path: String,
    protected_prefixes: Vec<String>,
    auth_pages: Vec<String>,
    bypass_prefixes: Vec<String>,
    legacy_prefix: String,
}

// `/dashboard` matches `/dashboard` and `/dashboard/x`, not `/dashboards`
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl GatePolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            dashboard_path: config.dashboard_path.clone(),
            protected_prefixes: config.protected_prefixes.clone(),
            auth_pages: config.auth_pages.clone(),
            bypass_prefixes: config.bypass_prefixes.clone(),
            legacy_prefix: config.legacy_prefix.clone(),
        }
    }

    pub fn classify(&self, path: &str, query: &str) -> RouteKind {
        if !self.legacy_prefix.is_empty() && matches_prefix(path, &self.legacy_prefix) {
            let rest = &path[self.legacy_prefix.trim_end_matches('/').len()..];
            let mut target = format!("{}{}", self.dashboard_path.trim_end_matches('/'), rest);
            if !query.is_empty() {
                target.push('?');
                target.push_str(query);
            }
            return RouteKind::Legacy { target };
        }

        if self.bypass_prefixes.iter().any(|p| matches_prefix(path, p)) {
            return RouteKind::Public;
        }

        if self.auth_pages.iter().any(|p| matches_prefix(path, p)) {
            return RouteKind::AuthPage;
        }

        if self.protected_prefixes.iter().any(|p| matches_prefix(path, p)) {
            return RouteKind::Protected;
        }

        RouteKind::Public
    }

    /// Whether the token has to be validated before deciding
    pub fn needs_token(&self, route: &RouteKind) -> bool {
        matches!(route, RouteKind::AuthPage | RouteKind::Protected)
    }

    /// `token` is `None` when no token cookie was sent
    pub fn decide(&self, route: &RouteKind, token: Option<TokenStatus>) -> GateDecision {
        match route {
            RouteKind::Legacy { target } => GateDecision::RedirectLegacy(target.clone()),
            RouteKind::Public => GateDecision::Allow,
            RouteKind::AuthPage => match token {
                None => GateDecision::Allow,
                Some(status) if status.is_valid() => GateDecision::RedirectToDashboard,
                Some(_) => GateDecision::AllowAndClearCookie,
            },
            RouteKind::Protected => match token {
                None => GateDecision::RedirectToLogin { clear_cookie: false },
                Some(status) if status.is_valid() => GateDecision::Allow,
                Some(_) => GateDecision::RedirectToLogin { clear_cookie: true },
            },
        }
    }
}
