//! The navigation guard: permit or redirect, before anything renders.

use std::sync::Arc;

use log::{debug, warn};

use crate::routes::RouteName;
use crate::session::SessionStore;

/// Redirect query parameter the login view reads to send the user back.
const REDIRECT_PARAM: &str = "redirect";

/// Upper bound on redirect hops when resolving a transition. The static
/// table cannot loop, but a misdeclared rule must not spin forever.
const MAX_REDIRECT_HOPS: usize = 8;

/// A requested transition: a named route plus its query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub name: RouteName,
    pub params: Vec<(String, String)>,
}

impl RouteTarget {
    pub fn new(name: RouteName) -> Self {
        Self {
            name,
            params: Vec::new(),
        }
    }

    /// Parse a raw path with an optional query string.
    pub fn from_path(raw: &str) -> Self {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };

        let params = query
            .map(|query| {
                query
                    .split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| match pair.split_once('=') {
                        Some((name, value)) => (decode_component(name), decode_component(value)),
                        None => (decode_component(pair), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: RouteName::from_path(path),
            params,
        }
    }

    /// Append a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Value of a query parameter, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The full path including the encoded query string.
    pub fn full_path(&self) -> String {
        let mut out = self.name.path().to_string();
        for (i, (name, value)) in self.params.iter().enumerate() {
            out.push(if i == 0 { '?' } else { '&' });
            out.push_str(&urlencoding::encode(name));
            out.push('=');
            out.push_str(&urlencoding::encode(value));
        }
        out
    }
}

/// Percent-decode one query component; undecodable input is kept verbatim.
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The transition may proceed unmodified.
    Allow,
    /// The transition is replaced by a new one.
    Redirect(RouteTarget),
}

/// Evaluates route rules against the current session before each transition.
///
/// Decisions read the session but never touch the network, so they complete
/// before the target view can mount or issue a request.
pub struct NavigationGuard {
    session: Arc<SessionStore>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Evaluate one transition request: parameter validation, then the auth
    /// requirement, then the role requirement. The first failing check wins.
    pub async fn decide(&self, target: &RouteTarget) -> GuardDecision {
        let rule = target.name.rule();

        for param in rule.required_params {
            let valid = target.param(param.name).is_some_and(param.check);
            if !valid {
                debug!(
                    "invalid or missing param {} on {:?}, redirecting to {:?}",
                    param.name, target.name, rule.fallback
                );
                return GuardDecision::Redirect(RouteTarget::new(rule.fallback));
            }
        }

        if rule.requires_auth && !self.session.is_authenticated().await {
            debug!("unauthenticated access to {:?}, redirecting to login", target.name);
            return GuardDecision::Redirect(
                RouteTarget::new(RouteName::Login).with_param(REDIRECT_PARAM, target.full_path()),
            );
        }

        if let Some(required) = rule.required_role {
            // Fail closed: a missing or unusable user record reads as "no
            // matching role". A record that failed to restore at startup
            // never reaches this branch at all: the session boots anonymous,
            // so the auth check above already bounced to login rather than
            // redirecting home.
            let allowed = self
                .session
                .current_user()
                .await
                .map(|user| required.allows(&user))
                .unwrap_or(false);
            if !allowed {
                debug!(
                    "role {required} not satisfied for {:?}, redirecting home",
                    target.name
                );
                return GuardDecision::Redirect(RouteTarget::new(RouteName::Home));
            }
        }

        GuardDecision::Allow
    }

    /// Follow redirects until a transition is allowed. Each redirect is a new
    /// transition request and re-enters [`decide`](Self::decide).
    pub async fn resolve(&self, target: &RouteTarget) -> RouteTarget {
        let mut current = target.clone();
        for _ in 0..MAX_REDIRECT_HOPS {
            match self.decide(&current).await {
                GuardDecision::Allow => return current,
                GuardDecision::Redirect(next) => current = next,
            }
        }
        warn!("redirect hop limit reached resolving {:?}, falling back home", target.name);
        RouteTarget::new(RouteName::Home)
    }
}
