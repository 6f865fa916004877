use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::date::http_date;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SameSite {
    #[default]
    NotSet,
    Strict,
    Lax,
    None,
}

/// A response cookie. Only cookies built through `new` are valid; a
/// default-constructed cookie is rejected by `Output::set_cookie`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    expire: Option<DateTime<Utc>>,
    max_age: Option<i64>,
    valid: bool,
}

impl Cookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            valid: true,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Absolute expiry. Clears any relative max-age.
    pub fn set_expire(&mut self, when: DateTime<Utc>) {
        self.expire = Some(when);
        self.max_age = None;
    }

    /// Relative lifetime in seconds. Clears any absolute expiry.
    pub fn set_max_age(&mut self, seconds: i64) {
        self.max_age = Some(seconds);
        self.expire = None;
    }

    pub fn expire(&self) -> Option<DateTime<Utc>> {
        self.expire
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// Turn this cookie into a deletion instruction for the client.
    pub fn invalidate(&mut self) {
        self.value.clear();
        self.set_max_age(-1);
    }

    /// Attribute emission in fixed order: name=value, Max-Age|Expires, path,
    /// domain, SameSite, Secure, HttpOnly. `SameSite=None` implies Secure.
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);

        if let Some(age) = self.max_age {
            let _ = write!(out, "; Max-Age={age}");
        } else if let Some(when) = self.expire {
            let _ = write!(out, "; Expires={}", http_date(when));
        }
        if let Some(path) = &self.path {
            let _ = write!(out, "; path={path}");
        }
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; domain={domain}");
        }

        let mut secure = self.secure;
        match self.same_site {
            SameSite::NotSet => {}
            SameSite::Strict => out.push_str("; SameSite=Strict"),
            SameSite::Lax => out.push_str("; SameSite=Lax"),
            SameSite::None => {
                out.push_str("; SameSite=None");
                secure = true;
            }
        }
        if secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::{Cookie, SameSite};

    #[test]
    fn default_cookie_is_invalid() {
        assert!(!Cookie::default().is_valid());
        assert!(Cookie::new("session", "abc").is_valid());
    }

    #[test]
    fn expire_and_max_age_are_exclusive() {
        let mut cookie = Cookie::new("a", "b");
        cookie.set_max_age(60);
        cookie.set_expire(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert!(cookie.max_age().is_none());

        cookie.set_max_age(30);
        assert!(cookie.expire().is_none());
    }

    #[test]
    fn attribute_order_is_fixed() {
        let mut cookie = Cookie::new("session", "abc");
        cookie.set_max_age(3600);
        cookie.path = Some("/app".to_string());
        cookie.domain = Some("example.com".to_string());
        cookie.same_site = SameSite::Strict;
        cookie.http_only = true;

        assert_eq!(
            cookie.header_value(),
            "session=abc; Max-Age=3600; path=/app; domain=example.com; SameSite=Strict; HttpOnly"
        );
    }

    #[test]
    fn same_site_none_implies_secure() {
        let mut cookie = Cookie::new("a", "b");
        cookie.same_site = SameSite::None;
        assert_eq!(cookie.header_value(), "a=b; SameSite=None; Secure");
    }

    #[test]
    fn invalidate_deletes_on_the_client() {
        let mut cookie = Cookie::new("session", "abc");
        cookie.invalidate();
        assert_eq!(cookie.header_value(), "session=; Max-Age=-1");
        assert!(cookie.is_valid());
    }

    #[test]
    fn expires_uses_http_date() {
        let mut cookie = Cookie::new("a", "b");
        cookie.set_expire(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap());
        assert_eq!(
            cookie.header_value(),
            "a=b; Expires=Wed, 21 Oct 2015 07:28:00 GMT"
        );
    }
}
