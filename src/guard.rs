/// Landing path for anonymous users.
pub const PUBLIC_HOME: &str = "/";
/// Landing path for authenticated users.
pub const DASHBOARD: &str = "/dashboard";

const AUTH_PAGES: &[&str] = &["/login", "/signup"];

/// Where to redirect before entering `path`, if anywhere.
///
/// Anonymous users may only stay on [`PUBLIC_HOME`]; authenticated users are
/// sent past the login and signup pages.
#[must_use]
pub fn redirect_for(path: &str, authenticated: bool) -> Option<&'static str> {
    if !authenticated && path != PUBLIC_HOME {
        return Some(PUBLIC_HOME);
    }
    if authenticated && AUTH_PAGES.contains(&path) {
        return Some(DASHBOARD);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_sent_home() {
        assert_eq!(redirect_for("/dashboard", false), Some("/"));
        assert_eq!(redirect_for("/login", false), Some("/"));
        assert_eq!(redirect_for("/", false), None);
    }

    #[test]
    fn authenticated_skips_auth_pages() {
        assert_eq!(redirect_for("/login", true), Some("/dashboard"));
        assert_eq!(redirect_for("/signup", true), Some("/dashboard"));
        assert_eq!(redirect_for("/repos", true), None);
        assert_eq!(redirect_for("/", true), None);
    }

    #[test]
    fn reachable_from_crate_root() {
        assert_eq!(crate::redirect_for("/repos", false), Some(PUBLIC_HOME));
    }
}
