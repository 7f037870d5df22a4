pub mod auth;
pub mod health;
pub mod users;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use services::auth::CookieDirective;

/// Apply cookie directives produced by the auth service to the jar.
/// This is the only place response cookies are built.
pub fn apply_cookies(mut jar: CookieJar, directives: &[CookieDirective]) -> CookieJar {
    for directive in directives {
        if directive.remove {
            jar = jar.remove(
                Cookie::build(directive.name.clone())
                    .path(directive.path.clone())
                    .build(),
            );
        } else {
            let mut cookie = Cookie::new(directive.name.clone(), directive.value.clone());
            cookie.set_http_only(directive.http_only);
            cookie.set_secure(directive.secure);
            cookie.set_same_site(SameSite::Lax);
            cookie.set_path(directive.path.clone());
            jar = jar.add(cookie);
        }
    }
    jar
}
