//! Session-to-actor resolution.
//!
//! The resolver turns a raw identity session plus an optional specialist
//! profile into the [`Actor`] the UI renders. Display names come from a
//! fixed candidate chain; a candidate equal to the account email is
//! rejected, and an empty chain yields the neutral fallback.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use freexp_core::{Actor, ActorRole, SessionRecord, SpecialistProfile};
use freexp_storage::{MarketStore, StorageResult, keys};

use crate::context::AppContext;

/// Shown when no usable display name exists for the account.
pub const DISPLAY_NAME_FALLBACK: &str = "Пользователь";

/// Minimum gap between focus-triggered refreshes.
pub const FOCUS_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

type Candidate = fn(&SessionRecord, Option<&SpecialistProfile>) -> Option<String>;

/// Display-name sources in precedence order. Each is a named resolver so
/// the chain reads as policy, not string soup.
const DISPLAY_NAME_CANDIDATES: &[(&str, Candidate)] = &[
    ("profile_full_name", profile_full_name),
    ("metadata_full_name", metadata_full_name),
    ("metadata_name", metadata_name),
];

fn profile_full_name(_: &SessionRecord, profile: Option<&SpecialistProfile>) -> Option<String> {
    profile.and_then(SpecialistProfile::full_name)
}

fn metadata_full_name(session: &SessionRecord, _: Option<&SpecialistProfile>) -> Option<String> {
    session.metadata_str("full_name").map(str::to_string)
}

fn metadata_name(session: &SessionRecord, _: Option<&SpecialistProfile>) -> Option<String> {
    session.metadata_str("name").map(str::to_string)
}

/// Picks the first candidate that is non-blank and distinct from the
/// account email. The email itself is never a display name.
fn resolve_display_name(session: &SessionRecord, profile: Option<&SpecialistProfile>) -> String {
    for (name, candidate) in DISPLAY_NAME_CANDIDATES {
        if let Some(value) = candidate(session, profile) {
            let value = value.trim();
            if !value.is_empty() && value != session.email {
                debug!(candidate = name, "display name resolved");
                return value.to_string();
            }
        }
    }
    DISPLAY_NAME_FALLBACK.to_string()
}

fn build_actor(session: &SessionRecord, profile: Option<&SpecialistProfile>) -> Actor {
    let role = ActorRole::parse_lossy(session.metadata_str("role").unwrap_or_default());
    let avatar_url = profile
        .and_then(|p| p.avatar_url.clone())
        .or_else(|| session.metadata_str("avatar_url").map(str::to_string));
    Actor {
        id: session.user_id.clone(),
        email: session.email.clone(),
        display_name: resolve_display_name(session, profile),
        role,
        avatar_url,
    }
}

/// Derives the current [`Actor`] from session and profile state.
pub struct SessionResolver {
    store: MarketStore,
    last_focus_refresh: Mutex<Option<Instant>>,
}

impl SessionResolver {
    pub fn new(store: MarketStore) -> Self {
        Self {
            store,
            last_focus_refresh: Mutex::new(None),
        }
    }

    /// Resolves the current actor, treating every failure as signed-out.
    ///
    /// Resolution never surfaces an error to the caller: an unreachable
    /// backend logs and reads as no session.
    pub async fn resolve(&self, force_refresh: bool) -> Option<Actor> {
        match self.try_resolve(force_refresh).await {
            Ok(actor) => actor,
            Err(error) => {
                error!(%error, "session resolution failed, treating as signed out");
                None
            }
        }
    }

    async fn try_resolve(&self, force_refresh: bool) -> StorageResult<Option<Actor>> {
        let Some(session) = self.store.session(force_refresh).await? else {
            return Ok(None);
        };
        // A missing or unreadable profile degrades the actor, it does not
        // block resolution.
        let profile = match self.store.profile(&session.user_id, force_refresh).await {
            Ok(profile) => profile,
            Err(error) => {
                warn!(%error, user_id = %session.user_id, "profile unavailable during resolution");
                None
            }
        };
        Ok(Some(build_actor(&session, profile.as_ref())))
    }

    /// Refreshes the actor in response to the window regaining focus.
    ///
    /// Focus events arrive in bursts; refreshes closer together than
    /// [`FOCUS_REFRESH_INTERVAL`] are served from cache instead of hitting
    /// the backend again.
    pub async fn refresh_on_focus(&self) -> Option<Actor> {
        let force = {
            let mut last = self
                .last_focus_refresh
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match *last {
                Some(at) if at.elapsed() < FOCUS_REFRESH_INTERVAL => false,
                _ => {
                    *last = Some(Instant::now());
                    true
                }
            }
        };
        self.resolve(force).await
    }

    /// Spawns the listener that reacts to identity-provider events by
    /// invalidating identity-derived cache state and re-resolving.
    ///
    /// The task ends when the context's event channel closes.
    pub fn spawn_event_listener(self: std::sync::Arc<Self>, ctx: &AppContext) -> JoinHandle<()> {
        let mut events = ctx.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(?event, "auth event received");
                        self.store.cache().invalidate(Some(keys::AUTH_PREFIX));
                        self.resolve(true).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth event stream lagged");
                        self.store.cache().invalidate(Some(keys::AUTH_PREFIX));
                        self.resolve(true).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_with(metadata: serde_json::Value) -> SessionRecord {
        let serde_json::Value::Object(map) = metadata else {
            panic!("metadata must be an object");
        };
        let mut session = SessionRecord::new("user-1", "ivan@example.com");
        session.metadata = map;
        session
    }

    #[test]
    fn profile_name_wins_over_metadata() {
        let session = session_with(json!({"full_name": "Из метаданных"}));
        let profile = SpecialistProfile::new("user-1").with_name("Иван", "Петров");
        assert_eq!(
            resolve_display_name(&session, Some(&profile)),
            "Иван Петров"
        );
    }

    #[test]
    fn metadata_full_name_used_without_profile() {
        let session = session_with(json!({"full_name": "Анна Иванова"}));
        assert_eq!(resolve_display_name(&session, None), "Анна Иванова");
    }

    #[test]
    fn metadata_name_is_the_last_real_candidate() {
        let session = session_with(json!({"name": "anna_designs"}));
        assert_eq!(resolve_display_name(&session, None), "anna_designs");
    }

    #[test]
    fn email_only_session_falls_back_to_neutral_label() {
        let session = SessionRecord::new("user-1", "ivan@example.com");
        assert_eq!(resolve_display_name(&session, None), DISPLAY_NAME_FALLBACK);
    }

    #[test]
    fn candidate_equal_to_email_is_rejected() {
        // Providers sometimes mirror the email into the name field.
        let session = session_with(json!({"full_name": "ivan@example.com"}));
        assert_eq!(resolve_display_name(&session, None), DISPLAY_NAME_FALLBACK);
    }

    #[test]
    fn blank_candidate_is_skipped() {
        let session = session_with(json!({"full_name": "   ", "name": "Иван"}));
        assert_eq!(resolve_display_name(&session, None), "Иван");
    }

    #[test]
    fn role_and_avatar_come_from_metadata_when_profile_is_absent() {
        let session = session_with(json!({
            "role": "company",
            "avatar_url": "https://cdn.example.com/logo.png",
        }));
        let actor = build_actor(&session, None);
        assert_eq!(actor.role, ActorRole::Company);
        assert_eq!(
            actor.avatar_url.as_deref(),
            Some("https://cdn.example.com/logo.png")
        );
    }

    #[test]
    fn profile_avatar_shadows_metadata_avatar() {
        let session = session_with(json!({"avatar_url": "https://old.example.com/a.png"}));
        let mut profile = SpecialistProfile::new("user-1");
        profile.avatar_url = Some("https://cdn.example.com/new.png".to_string());
        let actor = build_actor(&session, Some(&profile));
        assert_eq!(
            actor.avatar_url.as_deref(),
            Some("https://cdn.example.com/new.png")
        );
    }
}
