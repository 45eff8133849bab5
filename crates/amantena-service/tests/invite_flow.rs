//! End-to-end invite flow tests: create-and-mail, verify, register,
//! expiry, resend, cancel, and the mail-failure compensation path.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use amantena_core::{CoreError, InviteStatus, Role, User};
use amantena_db::{Database, DbConfig};
use amantena_service::{
    AuthService, InviteMail, InviteMailer, InviteService, LogMailer, RegisterRequest,
};

/// Captures outgoing mail for assertions.
#[derive(Clone, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<InviteMail>>>,
}

impl InviteMailer for RecordingMailer {
    async fn send_invite(&self, mail: &InviteMail) -> Result<(), String> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

/// Always fails, like an SMTP relay that is down.
#[derive(Clone, Default)]
struct FailingMailer;

impl InviteMailer for FailingMailer {
    async fn send_invite(&self, _mail: &InviteMail) -> Result<(), String> {
        Err("relay unreachable".to_string())
    }
}

async fn setup() -> (Database, User) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        name: "Farm Admin".to_string(),
        email: "admin@amantena.farm".to_string(),
        password_hash: "x".to_string(),
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&admin).await.unwrap();

    (db, admin)
}

fn service<M: InviteMailer>(db: &Database, mailer: M) -> InviteService<M> {
    InviteService::new(db.clone(), mailer, 7, "https://shop.amantena.farm".to_string())
}

#[tokio::test]
async fn create_mails_a_registration_link_with_the_token() {
    let (db, admin) = setup().await;
    let mailer = RecordingMailer::default();
    let invites = service(&db, mailer.clone());

    let invite = invites
        .create_invite("new.staff@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "new.staff@amantena.farm");
    assert_eq!(sent[0].inviter_name, "Farm Admin");
    assert_eq!(
        sent[0].register_url,
        format!("https://shop.amantena.farm/register?token={}", invite.token)
    );
}

#[tokio::test]
async fn full_invite_to_login_flow() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    let invite = invites
        .create_invite("kai@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    let preview = invites.verify(&invite.token).await.unwrap();
    assert_eq!(preview.email, "kai@amantena.farm");
    assert_eq!(preview.role, Role::Staff);

    let user = invites
        .register(
            &invite.token,
            RegisterRequest {
                email: "Kai@Amantena.Farm".to_string(),
                name: "Kai".to_string(),
                password: "orchard-gate-42".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(user.role, Role::Staff);

    // The new credentials work
    let auth = AuthService::new(db.clone());
    let logged_in = auth
        .verify_credentials("kai@amantena.farm", "orchard-gate-42")
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let err = auth
        .verify_credentials("kai@amantena.farm", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidCredentials));
}

#[tokio::test]
async fn duplicate_pending_invite_is_a_conflict() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    invites
        .create_invite("dup@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    let err = invites
        .create_invite("dup@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn expired_invite_is_rejected_even_though_stored_as_pending() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    // Created 8 days "ago": expiry already behind us
    let invite = db
        .invites()
        .create(
            "late@amantena.farm",
            Role::Staff,
            &admin.id,
            "tok-late",
            Utc::now() - Duration::days(1),
        )
        .await
        .unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);

    let err = invites.verify("tok-late").await.unwrap_err();
    assert!(matches!(err, CoreError::InviteExpired));

    let err = invites
        .register(
            "tok-late",
            RegisterRequest {
                email: "late@amantena.farm".to_string(),
                name: "Late".to_string(),
                password: "orchard-gate-42".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InviteExpired));
}

#[tokio::test]
async fn invite_is_consumed_exactly_once() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    let invite = invites
        .create_invite("once@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    let request = RegisterRequest {
        email: "once@amantena.farm".to_string(),
        name: "Once".to_string(),
        password: "orchard-gate-42".to_string(),
    };

    invites.register(&invite.token, request.clone()).await.unwrap();

    let err = invites.register(&invite.token, request).await.unwrap_err();
    assert!(matches!(err, CoreError::InviteAlreadyUsed));
}

#[tokio::test]
async fn registering_with_a_different_email_is_rejected() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    let invite = invites
        .create_invite("right@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    let err = invites
        .register(
            &invite.token,
            RegisterRequest {
                email: "wrong@amantena.farm".to_string(),
                name: "Who".to_string(),
                password: "orchard-gate-42".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::EmailMismatch));

    // The invite survives for the right recipient
    assert!(invites.verify(&invite.token).await.is_ok());
}

#[tokio::test]
async fn weak_password_never_reaches_the_invite() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    let invite = invites
        .create_invite("short@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    let err = invites
        .register(
            &invite.token,
            RegisterRequest {
                email: "short@amantena.farm".to_string(),
                name: "Short".to_string(),
                password: "1234567".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    assert!(invites.verify(&invite.token).await.is_ok());
}

#[tokio::test]
async fn mail_failure_leaves_no_invite_behind() {
    let (db, admin) = setup().await;
    let invites = service(&db, FailingMailer);

    let err = invites
        .create_invite("ghost@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::EmailDeliveryFailed(_)));

    assert!(invites.list(10).await.unwrap().is_empty());

    // The email slot is free for a retry
    let working = service(&db, LogMailer);
    working
        .create_invite("ghost@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn resend_refreshes_expiry_even_when_the_mail_fails() {
    let (db, admin) = setup().await;

    let invite = db
        .invites()
        .create(
            "again@amantena.farm",
            Role::Staff,
            &admin.id,
            "tok-again",
            Utc::now() - Duration::days(1),
        )
        .await
        .unwrap();

    let failing = service(&db, FailingMailer);
    let err = failing.resend(&invite.id).await.unwrap_err();
    assert!(matches!(err, CoreError::EmailDeliveryFailed(_)));

    // The recipient may still hold the original link, and it works again
    assert!(failing.verify("tok-again").await.is_ok());
}

#[tokio::test]
async fn cancelled_invite_is_terminal() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    let invite = invites
        .create_invite("gone@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();

    invites.cancel(&invite.id).await.unwrap();

    // Cancellation spends the token outright
    let err = invites.verify(&invite.token).await.unwrap_err();
    assert!(matches!(err, CoreError::InviteAlreadyUsed));

    let err = invites.resend(&invite.id).await.unwrap_err();
    assert!(matches!(err, CoreError::InviteNotPending { .. }));
}

#[tokio::test]
async fn stats_follow_the_lifecycle() {
    let (db, admin) = setup().await;
    let invites = service(&db, LogMailer);

    invites
        .create_invite("a@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();
    let b = invites
        .create_invite("b@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();
    invites
        .register(
            &b.token,
            RegisterRequest {
                email: "b@amantena.farm".to_string(),
                name: "B".to_string(),
                password: "orchard-gate-42".to_string(),
            },
        )
        .await
        .unwrap();
    let c = invites
        .create_invite("c@amantena.farm", Role::Staff, &admin.id)
        .await
        .unwrap();
    invites.cancel(&c.id).await.unwrap();

    let stats = invites.stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.expired, 1);
}
