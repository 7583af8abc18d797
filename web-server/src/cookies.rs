// web-server/src/cookies.rs
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use common::AuthConfig;

// Token cookie max age in seconds (4 hours)
#[cfg(test)]
pub const TOKEN_MAX_AGE: i64 = 4 * 60 * 60;

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl CookieSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.secure_cookies,
        }
    }

    /// The authoritative credential cookie. The backend's login route issues it;
    /// the gate only reads and clears it.
    #[cfg(test)]
    pub fn token_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build(self.name.clone(), token.to_string())
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(TOKEN_MAX_AGE))
            .finish()
    }

    /// Same attributes as the token cookie so the browser replaces it
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.name.clone(), String::new())
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cookie_attributes() {
        let settings = CookieSettings { name: "token".to_string(), secure: true };
        let cookie = settings.token_cookie("abc");

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(CookieDuration::hours(4)));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let settings = CookieSettings::from_config(&AuthConfig::default());
        let cookie = settings.removal_cookie();

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
        // Development default
        assert_eq!(cookie.secure(), Some(false));
    }
}
