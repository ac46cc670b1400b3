//! Registration, sign-in and session change delivery.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use marketstall_core::{Email, UserProfile};
use marketstall_integration_tests::{PASSWORD, TestContext, eventually};
use marketstall_storefront::AppError;
use marketstall_storefront::auth::{AuthError, AuthGateway};
use marketstall_storefront::events::StateEvent;
use marketstall_storefront::views::{Resource, UsersView};

#[tokio::test]
async fn test_register_creates_profile_and_signs_in() {
    let ctx = TestContext::new().await;

    let account = ctx.app.register("hana@example.com", PASSWORD).await.unwrap();

    assert_eq!(ctx.app.identity(), Some(account.id.clone()));
    let profile = ctx.app.accounts().profile(&account.id).await.unwrap().unwrap();
    assert_eq!(profile.email, "hana@example.com");
    assert_eq!(profile.id, account.id);
    assert!(profile.name.is_empty());
    assert!(!profile.is_complete());
}

#[tokio::test]
async fn test_weak_password_is_rejected_before_sign_up() {
    let ctx = TestContext::new().await;

    let err = ctx.app.register("ivo@example.com", "password").await.unwrap_err();

    assert!(matches!(err, AppError::Auth(AuthError::WeakPassword(_))));
    assert_eq!(ctx.auth.account_count().await, 0);
    assert_eq!(ctx.app.identity(), None);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.app.register("jo@example.com", PASSWORD).await.unwrap();
    ctx.app.logout().await.unwrap();

    let err = ctx.app.register("jo@example.com", PASSWORD).await.unwrap_err();

    assert_eq!(err.user_message(), "An account with this email already exists.");
    assert_eq!(ctx.auth.account_count().await, 1);
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let ctx = TestContext::new().await;
    ctx.app.register("kai@example.com", PASSWORD).await.unwrap();
    ctx.app.logout().await.unwrap();

    let err = ctx.app.login("kai@example.com", "Wr0ng!pass").await.unwrap_err();

    assert_eq!(err.user_message(), "Invalid email or password.");
    assert_eq!(ctx.app.identity(), None);
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let ctx = TestContext::new().await;

    let err = ctx.app.login("not-an-email", PASSWORD).await.unwrap_err();

    assert_eq!(err.user_message(), "Invalid email address.");
}

#[tokio::test]
async fn test_subscriber_sees_current_session_then_changes() {
    let ctx = TestContext::new().await;
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();

    let sink = Arc::clone(&seen);
    let mut subscription = ctx.app.auth().subscribe(Box::new(move |account| {
        sink.lock()
            .unwrap()
            .push(account.map(|a| a.email.to_string()));
    }));

    ctx.app.register("lee@example.com", PASSWORD).await.unwrap();
    ctx.app.logout().await.unwrap();
    subscription.unsubscribe();
    ctx.app.login("lee@example.com", PASSWORD).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![None, Some("lee@example.com".to_string()), None]
    );
}

#[tokio::test]
async fn test_sign_in_outside_app_switches_cart() {
    let ctx = TestContext::new().await;
    let email = Email::parse("mo@example.com").unwrap();
    let account = ctx.auth.sign_up(&email, PASSWORD).await.unwrap();

    // The session task reloads the cart for the new identity on its own.
    let switched = eventually(|| {
        let app = ctx.app.clone();
        let expected = Some(account.id.clone());
        async move { app.cart().snapshot().await.id == expected }
    })
    .await;
    assert!(switched);
}

#[tokio::test]
async fn test_session_change_is_announced() {
    let ctx = TestContext::new().await;
    let mut events = ctx.app.subscribe();

    let account = ctx.app.register("nia@example.com", PASSWORD).await.unwrap();

    let mut announced = false;
    while let Ok(event) = events.try_recv() {
        if event == StateEvent::SessionChanged(Some(account.id.clone())) {
            announced = true;
        }
    }
    assert!(announced);
}

#[tokio::test]
async fn test_users_view_lists_profiles() {
    let ctx = TestContext::new().await;
    let first = ctx.app.register("oli@example.com", PASSWORD).await.unwrap();
    ctx.app.logout().await.unwrap();
    let second = ctx.app.register("pia@example.com", PASSWORD).await.unwrap();

    let view = UsersView::new(ctx.app.clone());
    let Resource::Succeeded(mut profiles) = view.refresh().await else {
        panic!("users did not load");
    };
    profiles.sort_by(|a, b| a.email.cmp(&b.email));

    let ids: Vec<_> = profiles.iter().map(|p: &UserProfile| p.id.clone()).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}
