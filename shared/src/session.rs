//! Session gate.
//!
//! Two states, anonymous and authenticated. Expiry is lazy: every read of the
//! session re-checks `now - login_time` against `session_ttl()` and logs out
//! when the session is too old. There is no timer.

use crate::types::AuthUser;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

/// Entry point unauthenticated admin traffic is sent to.
pub const LOGIN_PATH: &str = "/admin/login";

pub fn session_ttl() -> Duration {
    Duration::days(7)
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(&'static str),
}

pub struct SessionContext {
    user: Option<AuthUser>,
    clock: Arc<dyn Clock>,
}

impl SessionContext {
    pub fn anonymous(clock: Arc<dyn Clock>) -> Self {
        Self { user: None, clock }
    }

    /// Rehydrates a previously persisted session. Expiry is checked on the next read.
    pub fn restore(user: AuthUser, clock: Arc<dyn Clock>) -> Self {
        Self { user: Some(user), clock }
    }

    /// Call after the credential check succeeded.
    pub fn login(&mut self, email: &str) -> &AuthUser {
        let login_time = self.clock.now().timestamp_millis();
        tracing::info!("Session started for {}", email);
        self.user.insert(AuthUser {
            email: email.to_string(),
            is_authenticated: true,
            login_time,
        })
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!("Session ended for {}", user.email);
        }
    }

    /// Drops the session when it is older than `session_ttl()`.
    pub fn check_session(&mut self) {
        let expired = match &self.user {
            Some(user) => self.is_expired(user),
            None => false,
        };
        if expired {
            tracing::info!("Session expired");
            self.logout();
        }
    }

    pub fn is_authenticated(&mut self) -> bool {
        self.current_user().map(|u| u.is_authenticated).unwrap_or(false)
    }

    pub fn current_user(&mut self) -> Option<&AuthUser> {
        self.check_session();
        self.user.as_ref()
    }

    /// Run on entry to every protected view.
    pub fn guard(&mut self) -> Access {
        if self.is_authenticated() {
            Access::Granted
        } else {
            Access::Redirect(LOGIN_PATH)
        }
    }

    fn is_expired(&self, user: &AuthUser) -> bool {
        match Utc.timestamp_millis_opt(user.login_time).single() {
            Some(login_time) => self.clock.now() - login_time > session_ttl(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(days_after_login: i64, extra_seconds: i64) -> (AuthUser, Arc<dyn Clock>) {
        let login = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let now = login + Duration::days(days_after_login) + Duration::seconds(extra_seconds);
        let user = AuthUser {
            email: "admin@example.com".into(),
            is_authenticated: true,
            login_time: login.timestamp_millis(),
        };
        (user, Arc::new(FixedClock(now)))
    }

    #[test]
    fn test_login_then_guard_grants() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc::now()));
        let mut session = SessionContext::anonymous(clock);
        assert_eq!(session.guard(), Access::Redirect(LOGIN_PATH));

        let user = session.login("admin@example.com");
        assert!(user.is_authenticated);
        assert_eq!(session.guard(), Access::Granted);

        session.logout();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_eight_day_old_session_logs_out() {
        let (user, clock) = at(8, 0);
        let mut session = SessionContext::restore(user, clock);
        assert!(!session.is_authenticated());
        // Logout happened as a side effect of the read.
        assert!(session.current_user().is_none());
        assert_eq!(session.guard(), Access::Redirect(LOGIN_PATH));
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let (user, clock) = at(7, 0);
        let mut session = SessionContext::restore(user, clock);
        assert!(session.is_authenticated());

        let (user, clock) = at(7, 1);
        let mut session = SessionContext::restore(user, clock);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_unauthenticated_flag_is_denied() {
        let (mut user, clock) = at(0, 0);
        user.is_authenticated = false;
        let mut session = SessionContext::restore(user, clock);
        assert_eq!(session.guard(), Access::Redirect(LOGIN_PATH));
    }
}
