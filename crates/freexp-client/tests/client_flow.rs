//! End-to-end flows over the local backend: registration, session
//! resolution, auth-event invalidation, and the marketplace
//! project/application path.

use std::sync::Arc;
use std::time::Duration;

use time::{Duration as TimeDuration, OffsetDateTime};

use freexp_client::{AppContext, AuthEvent, SessionResolver};
use freexp_core::{
    Application, Project, SessionRecord, SpecialistProfile, Specialization, reconcile,
};
use freexp_storage::StorageError;
use freexp_store_local::create_local_backend;

fn local_context() -> AppContext {
    AppContext::with_backend(create_local_backend(), Duration::from_secs(30))
}

/// Sign-up as the product does it: the form collects one combined name
/// field, the client splits it into the canonical profile shape.
async fn register_specialist(ctx: &AppContext, user_id: &str, email: &str, full_name: &str) {
    let session = SessionRecord::new(user_id, email).with_metadata("full_name", full_name);
    ctx.store().write_session(&session).await.unwrap();

    let (first, last) = reconcile::split_name(full_name);
    let profile = SpecialistProfile::new(user_id).with_name(&first, &last);
    ctx.store().write_profile(&profile).await.unwrap();
}

#[tokio::test]
async fn registration_splits_combined_name_into_canonical_fields() {
    let ctx = local_context();
    register_specialist(&ctx, "user-1", "ivan@example.com", "Иван Петров").await;

    let profile = ctx.store().profile("user-1", false).await.unwrap().unwrap();
    assert_eq!(profile.first_name, "Иван");
    assert_eq!(profile.last_name, "Петров");
    assert_eq!(profile.full_name().as_deref(), Some("Иван Петров"));
}

#[tokio::test]
async fn resolver_prefers_profile_name_and_survives_profile_updates() {
    let ctx = local_context();
    register_specialist(&ctx, "user-1", "ivan@example.com", "Иван Петров").await;

    let resolver = SessionResolver::new(ctx.store().clone());
    let actor = resolver.resolve(false).await.unwrap();
    assert_eq!(actor.display_name, "Иван Петров");
    assert_eq!(actor.email, "ivan@example.com");

    // Renaming the profile is visible on the next forced resolution.
    let renamed = SpecialistProfile::new("user-1").with_name("Иван", "Сидоров");
    ctx.store().write_profile(&renamed).await.unwrap();
    let actor = resolver.resolve(true).await.unwrap();
    assert_eq!(actor.display_name, "Иван Сидоров");
}

#[tokio::test]
async fn signed_out_event_drops_the_cached_actor() {
    let ctx = local_context();
    register_specialist(&ctx, "user-1", "ivan@example.com", "Иван Петров").await;

    let resolver = Arc::new(SessionResolver::new(ctx.store().clone()));
    let listener = Arc::clone(&resolver).spawn_event_listener(&ctx);

    assert!(resolver.resolve(false).await.is_some());

    // Sign out behind the store's back, then notify via the event channel.
    ctx.store().backend().clear_session().await.unwrap();
    assert!(resolver.resolve(false).await.is_some(), "still cached");
    ctx.emit(AuthEvent::SignedOut);

    let mut signed_out = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if resolver.resolve(false).await.is_none() {
            signed_out = true;
            break;
        }
    }
    assert!(signed_out, "event listener never invalidated the session");
    listener.abort();
}

#[tokio::test]
async fn focus_refresh_bursts_are_served_from_cache() {
    let ctx = local_context();
    register_specialist(&ctx, "user-1", "ivan@example.com", "Иван Петров").await;

    let resolver = SessionResolver::new(ctx.store().clone());
    assert!(resolver.refresh_on_focus().await.is_some());
    let after_first = ctx.store().cache().stats();

    // A burst of focus events within the throttle window.
    for _ in 0..3 {
        assert!(resolver.refresh_on_focus().await.is_some());
    }
    let after_burst = ctx.store().cache().stats();

    assert_eq!(
        after_burst.misses, after_first.misses,
        "throttled refreshes must not reach the backend"
    );
    assert!(after_burst.hits > after_first.hits);
}

#[tokio::test]
async fn project_application_flow_enforces_uniqueness_and_counts() {
    let ctx = local_context();
    register_specialist(&ctx, "spec-1", "ivan@example.com", "Иван Петров").await;

    let deadline = (OffsetDateTime::now_utc() + TimeDuration::days(14)).date();
    let project = Project::new(
        "company-1",
        "Логотип для кофейни",
        "Нужен логотип и фирменный стиль",
        Specialization::Design,
        deadline,
    )
    .unwrap();
    let project = ctx.store().write_project(&project).await.unwrap();

    let application = Application::new(&project.id, "spec-1", "Готов взяться за проект").unwrap();
    ctx.store().submit_application(&application).await.unwrap();

    // Second application from the same specialist to the same project.
    let duplicate = Application::new(&project.id, "spec-1", "А можно ещё раз?").unwrap();
    let result = ctx.store().submit_application(&duplicate).await;
    assert!(matches!(
        result,
        Err(StorageError::DuplicateApplication { .. })
    ));

    let counted = ctx
        .store()
        .project_with_count(&project.id, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counted.application_count, 1);
}
