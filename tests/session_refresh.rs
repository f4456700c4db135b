//! Session refresh: rotated tokens reach both the app and the browser.

use axum::http::{header, StatusCode};

mod common;
use common::*;

fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_owned))
        .collect()
}

#[tokio::test]
async fn expiring_session_is_refreshed() {
    let harness = Harness::start_with_refresh_user(USER_WITH_NOTE).await;
    let stale = session_cookie_with("valid-stale", "good-refresh", 1);

    let res = harness.get("/notes?noteId=n-42", Some(&stale)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 1, "{cookies:?}");
    assert!(cookies[0].starts_with(&format!("{COOKIE_NAME}=base64-")));

    // The app saw the refreshed cookie, not the stale one.
    let body = res.text().await.unwrap();
    let forwarded = body.split("cookie=").nth(1).unwrap();
    assert_ne!(forwarded, stale);
    assert!(forwarded.starts_with(&format!("{COOKIE_NAME}=base64-")));

    harness.shutdown.trigger();
}

#[tokio::test]
async fn refreshed_session_drives_the_redirect() {
    let harness = Harness::start_with_refresh_user(USER_WITHOUT_NOTE).await;
    let stale = session_cookie_with("valid-stale", "good-refresh", 1);

    let res = harness.get("/notes", Some(&stale)).await;
    assert_eq!(location(&res), format!("/notes?noteId=new-{USER_WITHOUT_NOTE}"));
    assert_eq!(set_cookies(&res).len(), 1);

    harness.shutdown.trigger();
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() {
    let harness = Harness::start().await;
    let stale = session_cookie_with("valid-stale", "revoked", 1);

    let res = harness.get("/notes", Some(&stale)).await;
    assert_eq!(location(&res), "/login?next=%2Fnotes");

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with(&format!("{COOKIE_NAME}=;")));
    assert!(cookies[0].contains("Max-Age=0"));

    harness.shutdown.trigger();
}

#[tokio::test]
async fn auth_outage_during_refresh_keeps_the_cookie() {
    let harness = Harness::start().await;
    let stale = session_cookie_with("valid-stale", "flaky-refresh", 1);

    let res = harness.get("/notes", Some(&stale)).await;
    assert_eq!(location(&res), "/login?next=%2Fnotes");
    assert!(set_cookies(&res).is_empty());

    // The app still gets the cookie exactly as the browser sent it.
    let res = harness.get("/settings", Some(&stale)).await;
    assert!(set_cookies(&res).is_empty());
    assert_eq!(res.text().await.unwrap(), format!("upstream /settings cookie={stale}"));

    harness.shutdown.trigger();
}

#[tokio::test]
async fn unreachable_auth_during_refresh_keeps_the_cookie() {
    let dead = closed_addr().await;
    let harness = Harness::start_with(USER_WITH_NOTE, |config| {
        config.auth.url = format!("http://{dead}");
    })
    .await;
    let stale = session_cookie_with("valid-stale", "good-refresh", 1);

    let res = harness.get("/notes", Some(&stale)).await;
    assert_eq!(location(&res), "/login?next=%2Fnotes");
    assert!(set_cookies(&res).is_empty());

    harness.shutdown.trigger();
}

#[tokio::test]
async fn refresh_keeps_other_cookies_encoded() {
    let harness = Harness::start().await;
    let stale = session_cookie_with("valid-stale", "good-refresh", 1);
    let cookie = format!("pref=a%3Bb%20c; {stale}");

    let res = harness.get("/notes?noteId=n-42", Some(&cookie)).await;
    assert_eq!(set_cookies(&res).len(), 1);

    let body = res.text().await.unwrap();
    let forwarded = body.split("cookie=").nth(1).unwrap();
    assert!(forwarded.starts_with("pref=a%3Bb%20c; "), "{forwarded}");
    assert!(!forwarded.contains("pref=a;b"));

    harness.shutdown.trigger();
}
