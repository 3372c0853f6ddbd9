use std::sync::Arc;

use auth_identity::totp::{code_at, decode_secret};
use auth_identity::{
    AuthService, IdentityConfig, IdentityStore, InMemoryIdentityStore, LoginOutcome, LoginRequest,
    NewIdentity, PasswordPolicy, TokenConfig,
};
use auth_rbac::Role;
use chrono::Utc;
use error_common::AuthError;

const PASSWORD: &str = "Str0ng-Passw0rd!";

fn config() -> IdentityConfig {
    IdentityConfig {
        tokens: TokenConfig::with_secrets("test-access-secret", "test-refresh-secret"),
        password: PasswordPolicy {
            memory_kib: 1024,
            iterations: 1,
            ..PasswordPolicy::default()
        },
        ..IdentityConfig::default()
    }
}

async fn service_with(role: Role) -> (AuthService, Arc<InMemoryIdentityStore>, uuid::Uuid) {
    let store = Arc::new(InMemoryIdentityStore::new());
    let service = AuthService::new(store.clone(), config()).unwrap();
    let identity = service
        .register(NewIdentity {
            role,
            phone: "+8801911223344".to_string(),
            email: Some("nurse@carenet.example".to_string()),
            name: Some("Ayesha".to_string()),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    (service, store, identity.id)
}

fn expect_authenticated(outcome: LoginOutcome) -> auth_identity::TokenPair {
    match outcome {
        LoginOutcome::Authenticated { tokens, .. } => tokens,
        other => panic!("expected authenticated outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_by_phone_and_email() {
    let (service, store, id) = service_with(Role::Caregiver).await;

    let tokens = expect_authenticated(
        service
            .login(LoginRequest::with_phone("+8801911223344", PASSWORD))
            .await
            .unwrap(),
    );
    let claims = service.authenticate(&tokens.access_token).unwrap();
    assert_eq!(claims.identity_id().unwrap(), id);
    assert_eq!(claims.role, Role::Caregiver);

    let by_email = service
        .login(LoginRequest::with_email("Nurse@CareNet.example", PASSWORD))
        .await
        .unwrap();
    expect_authenticated(by_email);

    assert!(store.find_by_id(id).await.unwrap().unwrap().last_login.is_some());
}

#[tokio::test]
async fn test_failures_are_indistinguishable() {
    let (service, store, id) = service_with(Role::Guardian).await;

    let wrong_password = service
        .login(LoginRequest::with_phone("+8801911223344", "Wrong-Passw0rd!"))
        .await
        .unwrap_err();
    let unknown = service
        .login(LoginRequest::with_phone("+8801000000000", PASSWORD))
        .await
        .unwrap_err();

    store.set_active(id, false).await.unwrap();
    let inactive = service
        .login(LoginRequest::with_phone("+8801911223344", PASSWORD))
        .await
        .unwrap_err();

    for err in [wrong_password, unknown, inactive] {
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.public_message(), "Invalid credentials");
    }
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let (service, _store, _id) = service_with(Role::Guardian).await;

    let duplicate = service
        .register(NewIdentity {
            role: Role::Guardian,
            phone: "+8801911223344".to_string(),
            email: None,
            name: None,
            password: PASSWORD.to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(AuthError::Validation(_))));

    let weak = service
        .register(NewIdentity {
            role: Role::Guardian,
            phone: "+8801911000000".to_string(),
            email: None,
            name: None,
            password: "password".to_string(),
        })
        .await;
    assert!(matches!(weak, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn test_refresh_issues_new_pair_and_rejects_deactivated() {
    let (service, store, id) = service_with(Role::Shop).await;
    let tokens = expect_authenticated(
        service
            .login(LoginRequest::with_phone("+8801911223344", PASSWORD))
            .await
            .unwrap(),
    );

    let refreshed = service.refresh(&tokens.refresh_token).await.unwrap();
    assert!(service.authenticate(&refreshed.access_token).is_ok());

    // An access token is never accepted as a refresh token
    assert!(matches!(
        service.refresh(&tokens.access_token).await,
        Err(AuthError::InvalidToken)
    ));

    store.set_active(id, false).await.unwrap();
    assert!(matches!(
        service.refresh(&tokens.refresh_token).await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_mfa_login_with_totp_and_backup_code() {
    let (service, _store, id) = service_with(Role::Moderator).await;
    let mfa = service.mfa();
    let enrollment = mfa.start_enrollment(id).await.unwrap();
    let secret = decode_secret(&enrollment.secret).unwrap();
    let code = code_at(&secret, Utc::now().timestamp() as u64);
    mfa.confirm_enrollment(id, &code).await.unwrap();

    let challenge = match service
        .login(LoginRequest::with_phone("+8801911223344", PASSWORD))
        .await
        .unwrap()
    {
        LoginOutcome::MfaRequired { challenge_token, expires_in } => {
            assert_eq!(expires_in, 300);
            challenge_token
        }
        other => panic!("expected MFA challenge, got {other:?}"),
    };

    // The challenge is not a session token
    assert!(service.authenticate(&challenge).is_err());

    let code = code_at(&secret, Utc::now().timestamp() as u64);
    let (identity, tokens) = service.complete_mfa_login(&challenge, &code, false).await.unwrap();
    assert_eq!(identity.id, id);
    assert!(service.authenticate(&tokens.access_token).is_ok());

    let backup = &enrollment.backup_codes[0];
    let challenge = mfa_challenge(&service).await;
    assert!(service.complete_mfa_login(&challenge, backup, true).await.is_ok());

    let challenge = mfa_challenge(&service).await;
    assert!(matches!(
        service.complete_mfa_login(&challenge, backup, true).await,
        Err(AuthError::InvalidCode)
    ));
}

async fn mfa_challenge(service: &AuthService) -> String {
    match service
        .login(LoginRequest::with_phone("+8801911223344", PASSWORD))
        .await
        .unwrap()
    {
        LoginOutcome::MfaRequired { challenge_token, .. } => challenge_token,
        other => panic!("expected MFA challenge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mfa_challenge_is_single_use() {
    let (service, _store, id) = service_with(Role::Caregiver).await;
    let mfa = service.mfa();
    let enrollment = mfa.start_enrollment(id).await.unwrap();
    let secret = decode_secret(&enrollment.secret).unwrap();
    mfa.confirm_enrollment(id, &code_at(&secret, Utc::now().timestamp() as u64))
        .await
        .unwrap();

    let challenge = mfa_challenge(&service).await;

    // A wrong code does not burn the challenge
    assert!(matches!(
        service.complete_mfa_login(&challenge, "000000x", false).await,
        Err(AuthError::InvalidCode)
    ));

    let code = code_at(&secret, Utc::now().timestamp() as u64);
    service.complete_mfa_login(&challenge, &code, false).await.unwrap();

    // Replaying the exchanged challenge fails even with valid second factors
    assert!(matches!(
        service.complete_mfa_login(&challenge, &code, false).await,
        Err(AuthError::InvalidToken)
    ));
    assert!(matches!(
        service
            .complete_mfa_login(&challenge, &enrollment.backup_codes[0], true)
            .await,
        Err(AuthError::InvalidToken)
    ));

    // A fresh challenge still works
    let challenge = mfa_challenge(&service).await;
    assert!(service
        .complete_mfa_login(&challenge, &enrollment.backup_codes[0], true)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_change_password() {
    let (service, _store, id) = service_with(Role::Admin).await;

    assert!(matches!(
        service.change_password(id, "Not-The-Passw0rd", "N3w-Passw0rd!").await,
        Err(AuthError::InvalidCredentials)
    ));

    service.change_password(id, PASSWORD, "N3w-Passw0rd!").await.unwrap();
    assert!(service
        .login(LoginRequest::with_phone("+8801911223344", PASSWORD))
        .await
        .is_err());
    assert!(service
        .login(LoginRequest::with_phone("+8801911223344", "N3w-Passw0rd!"))
        .await
        .is_ok());
}
