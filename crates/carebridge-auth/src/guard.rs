//! The page guard state machine.
//!
//! Every protected page runs one pass of this machine per request:
//!
//! ```text
//! Unauthenticated --SessionFound--> ResolvingProfile
//! Unauthenticated --NoSession--> Denied(Unauthenticated)
//! ResolvingProfile --ProfileResolved(r), r allowed--> Authorized(r)
//! ResolvingProfile --ProfileResolved(r), r not allowed--> Denied(WrongRole(r))
//! ResolvingProfile --ProfileUnavailable--> Denied(Unauthenticated)
//! ```
//!
//! Nothing is carried between passes. Dropping the future returned by
//! [`PageGuard::run`] abandons the pass without touching any state.

use carebridge_common_core::{Role, RoleSet, UserProfile};
use tracing::{debug, instrument};

use crate::{
    error::ResolutionError,
    gate::{authorize, log_decision, Decision},
    resolver::ProfileResolver,
    router::{Navigation, RoleRouter},
    session::SessionStore,
};

/// Why a pass ended in `Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    Unauthenticated,
    WrongRole(Role),
}

/// States of one guard pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardState {
    Unauthenticated,
    ResolvingProfile,
    Authorized(Role),
    Denied(DenyReason),
}

/// Inputs that move the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardEvent {
    SessionFound,
    NoSession,
    ProfileResolved(Role),
    ProfileUnavailable,
}

impl GuardState {
    /// Apply one event. Terminal states and out-of-order events leave the
    /// state as it was.
    pub fn advance(self, event: GuardEvent, allowed: RoleSet) -> GuardState {
        match (self, event) {
            (Self::Unauthenticated, GuardEvent::SessionFound) => Self::ResolvingProfile,
            (Self::Unauthenticated, GuardEvent::NoSession) => {
                Self::Denied(DenyReason::Unauthenticated)
            }
            (Self::ResolvingProfile, GuardEvent::ProfileResolved(role)) => {
                if allowed.contains(role) {
                    Self::Authorized(role)
                } else {
                    Self::Denied(DenyReason::WrongRole(role))
                }
            }
            (Self::ResolvingProfile, GuardEvent::ProfileUnavailable) => {
                Self::Denied(DenyReason::Unauthenticated)
            }
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authorized(_) | Self::Denied(_))
    }

    /// The gate decision a terminal state corresponds to.
    pub fn decision(&self) -> Option<Decision> {
        match self {
            Self::Authorized(_) => Some(Decision::Allow),
            Self::Denied(DenyReason::Unauthenticated) => Some(Decision::DenyUnauthenticated),
            Self::Denied(DenyReason::WrongRole(role)) => Some(Decision::DenyWrongRole(*role)),
            Self::Unauthenticated | Self::ResolvingProfile => None,
        }
    }
}

/// Result of one guard pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub state: GuardState,
    pub decision: Decision,
    pub navigation: Navigation,
    /// The resolved profile, present only when the pass was authorized.
    pub profile: Option<UserProfile>,
}

/// Reusable guard for one protected page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageGuard {
    page: &'static str,
    allowed: RoleSet,
}

impl PageGuard {
    pub fn new(page: &'static str, allowed: impl Into<RoleSet>) -> Self {
        Self {
            page,
            allowed: allowed.into(),
        }
    }

    pub fn page(&self) -> &'static str {
        self.page
    }

    pub fn allowed(&self) -> RoleSet {
        self.allowed
    }

    /// Events a resolution result produces, in order.
    fn events(resolved: &Result<UserProfile, ResolutionError>) -> &'static [GuardEvent] {
        match resolved {
            Err(ResolutionError::NotAuthenticated) => &[GuardEvent::NoSession],
            Err(ResolutionError::ProfileMissing) => {
                &[GuardEvent::SessionFound, GuardEvent::ProfileUnavailable]
            }
            Ok(_) => &[GuardEvent::SessionFound],
        }
    }

    /// Drive the machine from an already-computed resolution result.
    pub fn evaluate(
        &self,
        router: &RoleRouter,
        resolved: Result<UserProfile, ResolutionError>,
    ) -> GuardOutcome {
        let mut state = GuardState::Unauthenticated;
        for event in Self::events(&resolved) {
            state = state.advance(*event, self.allowed);
            debug!(page = self.page, ?event, ?state, "Guard transition");
        }
        if let Ok(profile) = &resolved {
            state = state.advance(GuardEvent::ProfileResolved(profile.role), self.allowed);
            debug!(page = self.page, ?state, "Guard transition");
        }

        let decision = authorize(&resolved, self.allowed);
        debug_assert_eq!(state.decision(), Some(decision));
        log_decision(self.page, &resolved, self.allowed, decision);

        GuardOutcome {
            state,
            decision,
            navigation: router.guard(decision),
            profile: resolved.ok().filter(|_| decision.is_allowed()),
        }
    }

    /// Run one full pass against the given session store.
    #[instrument(name = "page_guard", skip_all, fields(page = self.page))]
    pub async fn run(
        &self,
        resolver: &ProfileResolver,
        router: &RoleRouter,
        sessions: &dyn SessionStore,
    ) -> GuardOutcome {
        let resolved = resolver.resolve_current_profile(sessions).await;
        self.evaluate(router, resolved)
    }
}
