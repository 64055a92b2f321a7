use tokio::sync::{Notify, watch};

use crate::{
    locale::{Locale, LocaleResolver},
    models::Role,
    session::Session,
};

/// RoleDestinations
///
/// Build-time table from every role (and the absent role) to the locale-free page a
/// freshly authenticated user lands on. Localization follows the prefix policy.
#[derive(Debug, Clone)]
pub struct RoleDestinations {
    locales: LocaleResolver,
}

impl RoleDestinations {
    /// Landing page for an absent or unrecognized role.
    pub const FALLBACK: &'static str = "/onboarding";

    pub fn new(locales: LocaleResolver) -> Self {
        Self { locales }
    }

    pub fn path_for(role: Option<Role>) -> &'static str {
        match role {
            Some(Role::Doctor) => "/doctor-onboarding",
            Some(Role::Clinic) => "/clinic-onboarding",
            Some(Role::Patient) => "/onboarding",
            Some(Role::Admin) => "/admin",
            None => Self::FALLBACK,
        }
    }

    pub fn destination(&self, role: Option<Role>, locale: Locale) -> String {
        self.locales.localize(locale, Self::path_for(role))
    }
}

/// What the identity provider has told the client about the session so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub is_loaded: bool,
    pub user_id: Option<String>,
    pub role: Option<Role>,
}

impl SessionSnapshot {
    pub fn loading() -> Self {
        Self::default()
    }

    /// A loaded snapshot; `None` means the provider answered "signed out".
    pub fn loaded(session: Option<&Session>) -> Self {
        Self {
            is_loaded: true,
            user_id: session.map(|s| s.user_id.clone()),
            role: session.and_then(|s| s.role),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState {
    Loading,
    Unauthenticated,
    Authenticated(Option<Role>),
}

#[derive(Debug, Clone, PartialEq)]
enum Guard {
    Armed,
    Fired(String),
    Superseded,
}

/// Receiver of the single navigation the dispatcher issues.
pub trait Navigator {
    fn navigate(&mut self, destination: &str);
}

/// Records every navigation in order.
impl Navigator for Vec<String> {
    fn navigate(&mut self, destination: &str) {
        self.push(destination.to_string());
    }
}

/// RoleDispatcher
///
/// One-shot state machine run after sign-in or sign-up. It waits in `Loading` until
/// session data arrives, then navigates exactly once to the role's destination.
/// After that (or after a superseding navigation) it never navigates again.
#[derive(Debug, Clone)]
pub struct RoleDispatcher {
    destinations: RoleDestinations,
    locale: Locale,
    state: DispatchState,
    guard: Guard,
}

impl RoleDispatcher {
    pub fn new(destinations: RoleDestinations, locale: Locale) -> Self {
        Self {
            destinations,
            locale,
            state: DispatchState::Loading,
            guard: Guard::Armed,
        }
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    /// True while the pending indicator should be shown.
    pub fn is_pending(&self) -> bool {
        self.state == DispatchState::Loading
    }

    pub fn navigated_to(&self) -> Option<&str> {
        match &self.guard {
            Guard::Fired(destination) => Some(destination),
            _ => None,
        }
    }

    /// Feeds one snapshot through the machine. Returns the destination when this call
    /// issued the navigation.
    pub fn observe<N: Navigator>(
        &mut self,
        snapshot: &SessionSnapshot,
        navigator: &mut N,
    ) -> Option<String> {
        self.state = match (snapshot.is_loaded, &snapshot.user_id) {
            (false, _) => DispatchState::Loading,
            (true, None) => DispatchState::Unauthenticated,
            (true, Some(_)) => DispatchState::Authenticated(snapshot.role),
        };

        let DispatchState::Authenticated(role) = self.state else {
            return None;
        };
        if self.guard != Guard::Armed {
            return None;
        }

        let destination = self.destinations.destination(role, self.locale);
        tracing::info!(
            role = role.map(Role::as_str).unwrap_or("none"),
            destination = %destination,
            "dispatching authenticated user"
        );
        navigator.navigate(&destination);
        self.guard = Guard::Fired(destination.clone());
        Some(destination)
    }

    /// The user navigated elsewhere first; disarm without navigating.
    pub fn supersede(&mut self) {
        if self.guard == Guard::Armed {
            tracing::debug!("role dispatch superseded by user navigation");
            self.guard = Guard::Superseded;
        }
    }

    /// Waits for session data on `sessions` and dispatches once, unless `superseded` is
    /// notified first. If the provider goes away before answering, the dispatcher stays
    /// in `Loading`.
    pub async fn dispatch_when_loaded<N: Navigator>(
        &mut self,
        mut sessions: watch::Receiver<SessionSnapshot>,
        superseded: &Notify,
        navigator: &mut N,
    ) -> Option<String> {
        loop {
            let snapshot = sessions.borrow_and_update().clone();
            if let Some(destination) = self.observe(&snapshot, navigator) {
                return Some(destination);
            }
            // Already fired, superseded, or signed out: the pipeline takes over.
            if self.guard != Guard::Armed || self.state == DispatchState::Unauthenticated {
                return None;
            }

            tokio::select! {
                changed = sessions.changed() => {
                    if changed.is_err() {
                        tracing::warn!("session source closed before the session loaded");
                        return None;
                    }
                }
                _ = superseded.notified() => {
                    self.supersede();
                    return None;
                }
            }
        }
    }
}
