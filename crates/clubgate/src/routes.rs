//! Static route table: paths and their guard requirements.
//!
//! Declared once, never mutated at runtime. Redirect targets are named
//! routes, so this table is the only place path strings are bound to
//! behavior.

use clubgate_protocol::RolePredicate;

/// Named routes of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Home,
    News,
    NewsDetail,
    NewsEditor,
    Blog,
    BlogDetail,
    BlogEditor,
    Activities,
    Members,
    Join,
    Register,
    Login,
    ForgotPassword,
    Profile,
    NotFound,
}

impl RouteName {
    /// Path pattern bound to this route.
    pub fn path(&self) -> &'static str {
        match self {
            RouteName::Home => "/",
            RouteName::News => "/news",
            RouteName::NewsDetail => "/news/detail",
            RouteName::NewsEditor => "/news/editor",
            RouteName::Blog => "/blog",
            RouteName::BlogDetail => "/blog/detail",
            RouteName::BlogEditor => "/blog/editor",
            RouteName::Activities => "/activities",
            RouteName::Members => "/members",
            RouteName::Join => "/join",
            RouteName::Register => "/register",
            RouteName::Login => "/login",
            RouteName::ForgotPassword => "/forgot-password",
            RouteName::Profile => "/profile",
            RouteName::NotFound => "/404",
        }
    }

    /// Resolve a path to its route. Unmatched paths land on the catch-all.
    pub fn from_path(path: &str) -> RouteName {
        match path {
            "/" => RouteName::Home,
            "/news" => RouteName::News,
            "/news/detail" => RouteName::NewsDetail,
            "/news/editor" => RouteName::NewsEditor,
            "/blog" => RouteName::Blog,
            "/blog/detail" => RouteName::BlogDetail,
            "/blog/editor" => RouteName::BlogEditor,
            "/activities" => RouteName::Activities,
            "/members" => RouteName::Members,
            "/join" => RouteName::Join,
            "/register" => RouteName::Register,
            "/login" => RouteName::Login,
            "/forgot-password" => RouteName::ForgotPassword,
            "/profile" => RouteName::Profile,
            _ => RouteName::NotFound,
        }
    }

    /// Guard requirements for this route.
    pub fn rule(&self) -> RouteRule {
        match self {
            RouteName::NewsDetail => RouteRule {
                required_params: NEWS_ID_PARAMS,
                fallback: RouteName::News,
                ..RouteRule::open()
            },
            RouteName::NewsEditor => RouteRule {
                requires_auth: true,
                required_role: Some(RolePredicate::Admin),
                ..RouteRule::open()
            },
            RouteName::BlogDetail => RouteRule {
                required_params: BLOG_ID_PARAMS,
                fallback: RouteName::Blog,
                ..RouteRule::open()
            },
            RouteName::BlogEditor | RouteName::Profile | RouteName::Join => RouteRule {
                requires_auth: true,
                ..RouteRule::open()
            },
            _ => RouteRule::open(),
        }
    }
}

// Slices referenced by rule() need a 'static home; const-fn calls inside a
// borrowed slice literal are not promoted.
const NEWS_ID_PARAMS: &[ParamRule] = &[ParamRule::id("newsId")];
const BLOG_ID_PARAMS: &[ParamRule] = &[ParamRule::id("blogId")];

/// A required query/path parameter and its validity predicate.
#[derive(Debug, Clone, Copy)]
pub struct ParamRule {
    pub name: &'static str,
    pub check: fn(&str) -> bool,
}

impl ParamRule {
    /// A numeric identifier parameter. Rejects the textual sentinels a lost
    /// front-end binding produces (`"undefined"`, `"null"`, `"NaN"`) along
    /// with anything that is not an integer.
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            check: valid_id,
        }
    }
}

/// Validity predicate for identifier parameters.
fn valid_id(value: &str) -> bool {
    if value.is_empty() || value == "undefined" || value == "null" {
        return false;
    }
    value.parse::<i64>().is_ok()
}

/// Per-route guard policy.
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    /// Whether an authenticated session is required.
    pub requires_auth: bool,
    /// Role the authenticated user must satisfy, if any.
    pub required_role: Option<RolePredicate>,
    /// Parameters that must be present and valid.
    pub required_params: &'static [ParamRule],
    /// Where invalid required parameters redirect to (typically the list
    /// view the detail page belongs to).
    pub fallback: RouteName,
}

impl RouteRule {
    /// No auth, no role, no params.
    pub const fn open() -> Self {
        Self {
            requires_auth: false,
            required_role: None,
            required_params: &[],
            fallback: RouteName::Home,
        }
    }
}
