//! Route gate: redirects navigations by path class, session cookie presence
//! and, for role-restricted paths only, the caller's resolved role.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use super::config::{AuthSettings, BrokerConfig};
use super::cookies;
use super::roles::EdgeRoleResolver;
use super::traits::BackendDirectory;
use crate::types::Role;

/// How a request path is treated by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass<'a> {
    Root,
    Public,
    Private,
    RoleRestricted(&'a str),
    Unclassified,
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Path classification rules.
///
/// Entries match the exact path or any path below it (`/main` matches
/// `/main/cards` but not `/mainframe`). Role-restricted entries win over
/// private ones, private over public.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    root: String,
    sign_in: String,
    private_home: String,
    public: Vec<String>,
    private: Vec<String>,
    restricted: Vec<(String, String)>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            root: "/".into(),
            sign_in: "/signin".into(),
            private_home: "/main".into(),
            public: vec!["/signin".into(), "/cmuEntraIDCallback".into()],
            private: vec!["/main".into()],
            restricted: vec![("/admin-area".into(), "admin".into())],
        }
    }
}

impl RoutePolicy {
    /// Policy with only the root, sign-in page and private home set.
    #[must_use]
    pub fn new(sign_in: impl Into<String>, private_home: impl Into<String>) -> Self {
        let sign_in = sign_in.into();
        let private_home = private_home.into();
        Self {
            root: "/".into(),
            public: vec![sign_in.clone()],
            private: vec![private_home.clone()],
            sign_in,
            private_home,
            restricted: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_public(mut self, path: impl Into<String>) -> Self {
        self.public.push(path.into());
        self
    }

    #[must_use]
    pub fn with_private(mut self, path: impl Into<String>) -> Self {
        self.private.push(path.into());
        self
    }

    #[must_use]
    pub fn with_role_restricted(mut self, path: impl Into<String>, role: impl Into<String>) -> Self {
        self.restricted.push((path.into(), role.into()));
        self
    }

    #[must_use]
    pub fn sign_in(&self) -> &str {
        &self.sign_in
    }

    #[must_use]
    pub fn private_home(&self) -> &str {
        &self.private_home
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass<'_> {
        if path == self.root {
            return RouteClass::Root;
        }
        if let Some((_, role)) = self.restricted.iter().find(|(p, _)| covers(p, path)) {
            return RouteClass::RoleRestricted(role);
        }
        if self.private.iter().any(|p| covers(p, path)) {
            return RouteClass::Private;
        }
        if path == self.sign_in || self.public.iter().any(|p| covers(p, path)) {
            return RouteClass::Public;
        }
        RouteClass::Unclassified
    }

    /// Role the gate must resolve before deciding, if any.
    ///
    /// Only authenticated requests to role-restricted paths need a lookup.
    #[must_use]
    pub fn required_role(&self, path: &str, authenticated: bool) -> Option<&str> {
        match self.classify(path) {
            RouteClass::RoleRestricted(role) if authenticated => Some(role),
            _ => None,
        }
    }

    /// Pure gate decision. `resolved_role` is only consulted for
    /// role-restricted paths; `None` there counts as no role.
    #[must_use]
    pub fn decide(&self, path: &str, authenticated: bool, resolved_role: Option<&Role>) -> GateDecision {
        let to_home = || GateDecision::Redirect(self.private_home.clone());
        let to_sign_in = || GateDecision::Redirect(self.sign_in.clone());

        match (self.classify(path), authenticated) {
            (RouteClass::Root, true) => to_home(),
            (RouteClass::Root, false) => to_sign_in(),
            (RouteClass::Public, true) => to_home(),
            (RouteClass::Private | RouteClass::RoleRestricted(_), false) => to_sign_in(),
            (RouteClass::RoleRestricted(required), true) => {
                if resolved_role.is_some_and(|r| r.satisfies(required)) {
                    GateDecision::Allow
                } else {
                    to_home()
                }
            }
            _ => GateDecision::Allow,
        }
    }
}

fn covers(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub(super) struct GateState<B> {
    resolver: EdgeRoleResolver<B>,
    policy: Arc<RoutePolicy>,
    settings: AuthSettings,
}

// Manual Clone: avoid derive adding a `B: Clone` bound.
impl<B> Clone for GateState<B> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            policy: self.policy.clone(),
            settings: self.settings.clone(),
        }
    }
}

/// Wrap `router` with the route gate.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/main", get(main_page))
///     .merge(auth_routes(&config, config.auth_client(), config.backend_client()));
/// let app = with_route_gate(app, &config, config.backend_client());
/// ```
pub fn with_route_gate<B: BackendDirectory>(router: Router, config: &BrokerConfig, backend: B) -> Router {
    let state = GateState {
        resolver: EdgeRoleResolver::new(Arc::new(backend), config.backend.role_deadline()),
        policy: Arc::new(config.policy.clone()),
        settings: config.settings.clone(),
    };
    router.layer(from_fn_with_state(state, route_gate::<B>))
}

async fn route_gate<B: BackendDirectory>(
    State(state): State<GateState<B>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let authenticated = cookies::value(&jar, &state.settings.session_cookie_name).is_some();

    let resolved = match state.policy.required_role(&path, authenticated) {
        Some(_) => {
            let token = cookies::backend_token(&jar, &state.settings.backend_cookie_name);
            Some(state.resolver.resolve(token.as_ref()).await)
        }
        None => None,
    };

    match state.policy.decide(&path, authenticated, resolved.as_ref()) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(to) => {
            tracing::debug!(%path, %to, authenticated, "Route gate redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}
