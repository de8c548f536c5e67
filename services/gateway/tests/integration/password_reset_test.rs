use std::sync::Arc;
use std::time::Duration;

use portico_gateway::domain::repository::CodeStore;
use portico_gateway::error::GatewayError;
use portico_gateway::infra::rate_limit::TokenBucketRateLimiter;
use portico_gateway::usecase::password_reset::{IssueResetInput, RedeemResetInput};

use crate::helpers::{
    MockCodeStore, MockMailer, MockUserService, TEST_EMAIL, TEST_PASSWORD, TEST_USER_ID,
    TEST_TTL, UpdateFailure, coordinator, wrong_code,
};

fn issue(email: &str) -> IssueResetInput {
    IssueResetInput {
        email: email.to_owned(),
        client_ip: Some("203.0.113.7".to_owned()),
    }
}

fn redeem(email: &str, code: &str, password: &str) -> RedeemResetInput {
    RedeemResetInput {
        email: email.to_owned(),
        code: code.to_owned(),
        new_password: password.to_owned(),
    }
}

#[tokio::test]
async fn should_reset_password_with_mailed_code() {
    let users = MockUserService::alice();
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1, "each issue sends exactly one mail");
    assert_eq!(sent[0].0, TEST_EMAIL);
    assert!(codes.has_record(TEST_EMAIL));

    uc.redeem(redeem(TEST_EMAIL, &sent[0].1, "new-secret"))
        .await
        .unwrap();

    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some("new-secret"));
    assert!(!codes.has_record(TEST_EMAIL), "redeemed code must be removed");
}

#[tokio::test]
async fn should_accept_code_only_once() {
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();
    uc.redeem(redeem(TEST_EMAIL, &code, "first")).await.unwrap();

    let result = uc.redeem(redeem(TEST_EMAIL, &code, "second")).await;
    assert!(
        matches!(result, Err(GatewayError::NoActiveChallenge)),
        "expected NoActiveChallenge, got {result:?}"
    );
}

#[tokio::test]
async fn should_keep_code_after_wrong_guess() {
    let users = MockUserService::alice();
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();

    let result = uc.redeem(redeem(TEST_EMAIL, &wrong_code(&code), "x")).await;
    assert!(
        matches!(result, Err(GatewayError::InvalidCode)),
        "expected InvalidCode, got {result:?}"
    );
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some(TEST_PASSWORD));
    assert!(codes.has_record(TEST_EMAIL));

    uc.redeem(redeem(TEST_EMAIL, &code, "new-secret"))
        .await
        .unwrap();
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some("new-secret"));
}

#[tokio::test(start_paused = true)]
async fn should_honor_code_until_ttl_elapses() {
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    tokio::time::advance(TEST_TTL - Duration::from_secs(1)).await;

    uc.redeem(redeem(TEST_EMAIL, &mailer.last_code(), "new-secret"))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_reject_expired_code() {
    let users = MockUserService::alice();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), MockCodeStore::new(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    tokio::time::advance(TEST_TTL + Duration::from_secs(1)).await;

    let result = uc
        .redeem(redeem(TEST_EMAIL, &mailer.last_code(), "new-secret"))
        .await;
    assert!(
        matches!(result, Err(GatewayError::NoActiveChallenge)),
        "expected NoActiveChallenge, got {result:?}"
    );
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some(TEST_PASSWORD));
}

#[tokio::test]
async fn should_only_honor_latest_code_after_reissue() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    uc.issue(issue(TEST_EMAIL)).await.unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(codes.live_records(), 1);

    let (first, latest) = (&sent[0].1, &sent[1].1);
    if first != latest {
        let result = uc.redeem(redeem(TEST_EMAIL, first, "x")).await;
        assert!(
            matches!(result, Err(GatewayError::InvalidCode)),
            "superseded code must not redeem, got {result:?}"
        );
    }
    uc.redeem(redeem(TEST_EMAIL, latest, "new-secret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_leave_one_live_code_after_concurrent_issues() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), codes.clone(), mailer.clone());

    let (a, b) = tokio::join!(uc.issue(issue(TEST_EMAIL)), uc.issue(issue(TEST_EMAIL)));
    a.unwrap();
    b.unwrap();

    assert_eq!(mailer.sent().len(), 2);
    assert_eq!(codes.live_records(), 1);
}

#[tokio::test]
async fn should_reject_invalid_address_without_side_effects() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), codes.clone(), mailer.clone());

    for bad in ["", "alice", "alice@", "@example.com", "alice@example", "a b@example.com"] {
        let result = uc.issue(issue(bad)).await;
        assert!(
            matches!(result, Err(GatewayError::BadAddress)),
            "expected BadAddress for {bad:?}, got {result:?}"
        );
    }
    assert!(mailer.sent().is_empty());
    assert_eq!(codes.live_records(), 0);
}

#[tokio::test]
async fn should_not_store_code_when_delivery_fails() {
    let codes = MockCodeStore::new();
    let uc = coordinator(MockUserService::alice(), codes.clone(), MockMailer::failing());

    let result = uc.issue(issue(TEST_EMAIL)).await;
    assert!(
        matches!(result, Err(GatewayError::DeliveryFailed(_))),
        "expected DeliveryFailed, got {result:?}"
    );
    assert_eq!(codes.live_records(), 0);

    let result = uc.redeem(redeem(TEST_EMAIL, "123456", "x")).await;
    assert!(matches!(result, Err(GatewayError::NoActiveChallenge)));
}

#[tokio::test]
async fn should_report_store_failure_after_sending() {
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), MockCodeStore::failing_put(), mailer.clone());

    let result = uc.issue(issue(TEST_EMAIL)).await;
    assert!(
        matches!(result, Err(GatewayError::StoreUnavailable(_))),
        "expected StoreUnavailable, got {result:?}"
    );
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn should_issue_for_unknown_address_without_lookup() {
    let users = MockUserService::empty();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), MockCodeStore::new(), mailer.clone());

    uc.issue(issue("nobody@example.com")).await.unwrap();

    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(users.lookups(), 0, "issue must not consult the user directory");
}

#[tokio::test]
async fn should_normalize_address_between_steps() {
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());

    uc.issue(issue("  Alice@Example.COM ")).await.unwrap();
    assert_eq!(mailer.sent()[0].0, TEST_EMAIL);

    uc.redeem(redeem(TEST_EMAIL, &mailer.last_code(), "new-secret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_return_unknown_user_and_keep_code() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::empty(), codes.clone(), mailer.clone());

    uc.issue(issue("ghost@example.com")).await.unwrap();
    let result = uc
        .redeem(redeem("ghost@example.com", &mailer.last_code(), "x"))
        .await;
    assert!(
        matches!(result, Err(GatewayError::UnknownUser)),
        "expected UnknownUser, got {result:?}"
    );
    assert!(codes.has_record("ghost@example.com"));
}

#[tokio::test]
async fn should_keep_code_when_password_is_rejected() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let users = MockUserService::alice().fail_updates(UpdateFailure::Rejected);
    let uc = coordinator(users, codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let result = uc.redeem(redeem(TEST_EMAIL, &mailer.last_code(), "x")).await;
    assert!(
        matches!(result, Err(GatewayError::Rejected(_))),
        "expected Rejected, got {result:?}"
    );
    assert!(codes.has_record(TEST_EMAIL));
    assert!(!codes.is_claimed(TEST_EMAIL), "failed redemption must release its claim");

    let retry = uc.redeem(redeem(TEST_EMAIL, &mailer.last_code(), "x")).await;
    assert!(
        matches!(retry, Err(GatewayError::Rejected(_))),
        "retry should reach the user service again, got {retry:?}"
    );
}

#[tokio::test]
async fn should_report_upstream_failure_on_update() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let users = MockUserService::alice().fail_updates(UpdateFailure::Unavailable);
    let uc = coordinator(users, codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let result = uc
        .redeem(redeem(TEST_EMAIL, &mailer.last_code(), "new-secret"))
        .await;
    assert!(
        matches!(result, Err(GatewayError::UpstreamUnavailable(_))),
        "expected UpstreamUnavailable, got {result:?}"
    );
    assert!(codes.has_record(TEST_EMAIL));
}

#[tokio::test]
async fn should_succeed_when_cleanup_fails_after_update() {
    let users = MockUserService::alice();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), MockCodeStore::failing_delete(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    uc.redeem(redeem(TEST_EMAIL, &mailer.last_code(), "new-secret"))
        .await
        .unwrap();
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some("new-secret"));
}

#[tokio::test]
async fn should_reject_empty_password() {
    let uc = coordinator(MockUserService::alice(), MockCodeStore::new(), MockMailer::new());

    let result = uc.redeem(redeem(TEST_EMAIL, "123456", "")).await;
    assert!(
        matches!(result, Err(GatewayError::BadRequest(_))),
        "expected BadRequest, got {result:?}"
    );
}

#[tokio::test]
async fn should_revoke_code_after_max_failed_attempts() {
    let mailer = MockMailer::new();
    let codes = MockCodeStore::new();
    let mut uc = coordinator(MockUserService::alice(), codes.clone(), mailer.clone());
    uc.max_failed_attempts = 3;

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();
    let wrong = wrong_code(&code);

    for _ in 0..3 {
        let result = uc.redeem(redeem(TEST_EMAIL, &wrong, "x")).await;
        assert!(matches!(result, Err(GatewayError::InvalidCode)));
    }
    assert!(!codes.has_record(TEST_EMAIL));

    let result = uc.redeem(redeem(TEST_EMAIL, &code, "new-secret")).await;
    assert!(
        matches!(result, Err(GatewayError::NoActiveChallenge)),
        "exhausted code must be gone, got {result:?}"
    );
}

#[tokio::test]
async fn should_reset_failure_count_on_reissue() {
    let mailer = MockMailer::new();
    let mut uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());
    uc.max_failed_attempts = 2;

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let wrong = wrong_code(&mailer.last_code());
    let _ = uc.redeem(redeem(TEST_EMAIL, &wrong, "x")).await;

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();
    let result = uc.redeem(redeem(TEST_EMAIL, &wrong_code(&code), "x")).await;
    assert!(matches!(result, Err(GatewayError::InvalidCode)));

    uc.redeem(redeem(TEST_EMAIL, &code, "new-secret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_never_revoke_when_attempt_limit_disabled() {
    let mailer = MockMailer::new();
    let mut uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());
    uc.max_failed_attempts = 0;

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();
    for _ in 0..20 {
        let _ = uc.redeem(redeem(TEST_EMAIL, &wrong_code(&code), "x")).await;
    }
    uc.redeem(redeem(TEST_EMAIL, &code, "new-secret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_rate_limit_per_address() {
    let mailer = MockMailer::new();
    let mut uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());
    uc.limiter = Arc::new(TokenBucketRateLimiter::new(2, 0, Duration::from_secs(60)));

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let result = uc.issue(issue(TEST_EMAIL)).await;
    assert!(
        matches!(result, Err(GatewayError::TooManyRequests)),
        "expected TooManyRequests, got {result:?}"
    );
    assert_eq!(mailer.sent().len(), 2, "limited request must not send mail");

    uc.issue(issue("bob@example.com")).await.unwrap();
}

#[tokio::test]
async fn should_rate_limit_per_client_ip() {
    let mailer = MockMailer::new();
    let mut uc = coordinator(MockUserService::alice(), MockCodeStore::new(), mailer.clone());
    uc.limiter = Arc::new(TokenBucketRateLimiter::new(0, 1, Duration::from_secs(60)));

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let result = uc.issue(issue("bob@example.com")).await;
    assert!(
        matches!(result, Err(GatewayError::TooManyRequests)),
        "expected TooManyRequests, got {result:?}"
    );
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn should_require_exact_code_bytes() {
    let users = MockUserService::alice();
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();

    for padded in [format!(" {code}"), format!("{code} "), format!(" {code} ")] {
        let result = uc.redeem(redeem(TEST_EMAIL, &padded, "new-secret")).await;
        assert!(
            matches!(result, Err(GatewayError::InvalidCode)),
            "expected InvalidCode for {padded:?}, got {result:?}"
        );
    }
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some(TEST_PASSWORD));
}

#[tokio::test]
async fn should_refuse_code_claimed_by_another_redemption() {
    let users = MockUserService::alice();
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(users.clone(), codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    let code = mailer.last_code();

    // A concurrent redemption of the same code is mid-flight.
    assert!(codes.claim(TEST_EMAIL, Duration::from_secs(30)).await.unwrap());

    let result = uc.redeem(redeem(TEST_EMAIL, &code, "second")).await;
    assert!(
        matches!(result, Err(GatewayError::NoActiveChallenge)),
        "expected NoActiveChallenge, got {result:?}"
    );
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some(TEST_PASSWORD));
    assert_eq!(users.lookups(), 0, "claimed code must not reach the user service");

    codes.release(TEST_EMAIL).await.unwrap();
    uc.redeem(redeem(TEST_EMAIL, &code, "first")).await.unwrap();
    assert_eq!(users.password_of(TEST_USER_ID).as_deref(), Some("first"));
}

#[tokio::test]
async fn should_clear_claim_on_reissue() {
    let codes = MockCodeStore::new();
    let mailer = MockMailer::new();
    let uc = coordinator(MockUserService::alice(), codes.clone(), mailer.clone());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    assert!(codes.claim(TEST_EMAIL, Duration::from_secs(30)).await.unwrap());

    uc.issue(issue(TEST_EMAIL)).await.unwrap();
    assert!(!codes.is_claimed(TEST_EMAIL));
    uc.redeem(redeem(TEST_EMAIL, &mailer.last_code(), "new-secret"))
        .await
        .unwrap();
}
