//! Client-side entry point for the FreeExperience data-access core.
//!
//! [`AppContext`] is constructed once at process start: it runs the static
//! backend-availability check, wires the selected backend into a
//! [`MarketStore`](freexp_storage::MarketStore), and owns the
//! identity-provider event channel. [`SessionResolver`] derives the
//! canonical current-user view from session and profile data, re-resolving
//! on auth events and on throttled focus refreshes.

pub mod context;
pub mod events;
pub mod resolver;

pub use context::AppContext;
pub use events::AuthEvent;
pub use resolver::{DISPLAY_NAME_FALLBACK, FOCUS_REFRESH_INTERVAL, SessionResolver};
