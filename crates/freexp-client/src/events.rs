/// Discrete identity-provider state changes.
///
/// Each one forces a fresh session resolution and invalidates the `auth:`
/// cache prefix; see [`crate::SessionResolver::spawn_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}
