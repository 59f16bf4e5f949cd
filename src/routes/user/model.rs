use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::email::Mailer;
use crate::error::ApiError;
use crate::models::{Account, code_expiry, generate_verify_code};
use crate::store::AccountStore;
use crate::utils::{generate_token, hash_password, verify_password};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub username: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUsernameQuery {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    // 用户名或邮箱
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 2 || username.len() > 20 {
        return Err(ApiError::Validation(
            "用户名长度必须在2到20个字符之间".to_string(),
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(
            "用户名只允许使用字母、数字和下划线".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::Validation("邮箱格式无效".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 6 || password.len() > 24 {
        return Err(ApiError::Validation(
            "密码长度必须在6到24个字符之间".to_string(),
        ));
    }
    Ok(())
}

impl Account {
    /// 注册。唯一性只针对已验证账户检查；同邮箱的未验证记录直接被覆盖，
    /// 验证邮件发送失败时回滚刚写入的账户
    pub async fn register(
        store: &dyn AccountStore,
        mailer: &dyn Mailer,
        req: RegisterRequest,
    ) -> Result<(), ApiError> {
        validate_username(&req.username)?;
        validate_email(&req.email)?;
        validate_password(&req.password)?;

        if let Some(existing) = store.find_by_username(&req.username).await? {
            if existing.verified {
                return Err(ApiError::AlreadyTaken("用户名已被占用"));
            }
        }

        let password_hash = hash_password(&req.password).map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::Internal
        })?;

        let now = Utc::now();
        let (owner, code) = match store.find_by_email(&req.email).await? {
            Some(mut existing) => {
                if existing.verified {
                    return Err(ApiError::AlreadyTaken("邮箱已被注册"));
                }
                // 未验证的旧记录：覆盖密码并重新签发验证码，不产生重复账户
                existing.password_hash = password_hash;
                let code = existing.issue_code(now);
                store.upsert(&existing).await?;
                (existing.username, code)
            }
            None => {
                let mut account =
                    Account::new(req.username.clone(), req.email.clone(), password_hash);
                let code = account.issue_code(now);
                store.upsert(&account).await?;
                (account.username, code)
            }
        };

        if let Err(e) = mailer.send_verification_code(&req.email, &owner, &code).await {
            tracing::error!("Failed to send verification email to {}: {}", req.email, e);
            // 邮件没发出去就不算注册成功，把刚写入的账户删掉
            store.delete_by_email(&req.email).await?;
            return Err(ApiError::EmailDelivery);
        }

        Ok(())
    }

    /// 校验验证码并把账户置为已验证。已验证账户重复提交同一有效验证码
    /// 会再次成功（幂等），verified 不会被任何路径改回去
    pub async fn verify(
        store: &dyn AccountStore,
        username: &str,
        code: &str,
    ) -> Result<(), ApiError> {
        let account = store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound("用户不存在"))?;

        account.check_code(code, Utc::now())?;
        store.mark_verified(&account.username).await?;
        Ok(())
    }

    /// 重新签发验证码。可以反复调用，也不要求账户仍处于未验证状态，
    /// 每次签发都会覆盖掉上一个验证码
    pub async fn reissue_code(
        store: &dyn AccountStore,
        mailer: &dyn Mailer,
        username: &str,
    ) -> Result<(), ApiError> {
        let account = store
            .find_by_username(username)
            .await?
            .ok_or(ApiError::NotFound("用户不存在"))?;

        let code = generate_verify_code();
        store
            .set_verify_code(&account.username, &code, code_expiry(Utc::now()))
            .await?;

        mailer
            .send_verification_code(&account.email, &account.username, &code)
            .await
            .map_err(|e| {
                tracing::error!("Failed to resend code to {}: {}", account.email, e);
                ApiError::EmailDelivery
            })?;

        Ok(())
    }

    /// 用户名可用性检查，只有已验证账户会占住名字
    pub async fn check_username(store: &dyn AccountStore, username: &str) -> Result<(), ApiError> {
        validate_username(username)?;

        match store.find_by_username(username).await? {
            Some(existing) if existing.verified => Err(ApiError::AlreadyTaken("用户名已被占用")),
            _ => Ok(()),
        }
    }

    pub async fn login(
        store: &dyn AccountStore,
        config: &Config,
        req: LoginRequest,
    ) -> Result<LoginResponse, ApiError> {
        let account = match store.find_by_username(&req.identifier).await? {
            Some(account) => Some(account),
            None => store.find_by_email(&req.identifier).await?,
        }
        .ok_or(ApiError::NotFound("用户不存在"))?;

        if !account.verified {
            return Err(ApiError::NotVerified);
        }

        let password_ok =
            verify_password(&req.password, &account.password_hash).map_err(|e| {
                tracing::error!("Password verification failed: {}", e);
                ApiError::Internal
            })?;
        if !password_ok {
            return Err(ApiError::AuthFailed);
        }

        let token = generate_token(&account.username, config).map_err(|e| {
            tracing::error!("Failed to generate token: {}", e);
            ApiError::Internal
        })?;

        Ok(LoginResponse {
            username: account.username,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::email::mock::MockMailer;
    use crate::models::code_expiry;
    use crate::store::MemoryStore;
    use crate::utils::verify_token;

    fn register_request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "secret123".into(),
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "test-secret".into(),
            jwt_expiration_secs: 3600,
            server_host: String::new(),
            server_port: 0,
            api_base_uri: "/api".into(),
            mail_api_url: String::new(),
            mail_api_key: String::new(),
            mail_sender: String::new(),
            gemini_api_key: String::new(),
        }
    }

    async fn seed_verified(store: &MemoryStore, username: &str, email: &str) {
        let mut account = Account::new(
            username.into(),
            email.into(),
            hash_password("secret123").unwrap(),
        );
        account.verified = true;
        store.upsert(&account).await.unwrap();
    }

    #[tokio::test]
    async fn register_creates_unverified_account_with_code() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();

        Account::register(&store, &mailer, register_request("alice", "alice@example.com"))
            .await
            .unwrap();

        let account = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(!account.verified);
        assert!(account.accepting_messages);
        let code = account.verify_code.clone().unwrap();
        assert_eq!(code.len(), 6);

        // 邮件里带的就是存下来的那个验证码
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("alice@example.com".into(), "alice".into(), code));
    }

    #[tokio::test]
    async fn register_rejects_verified_username_and_email() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();
        seed_verified(&store, "alice", "alice@example.com").await;

        let by_username =
            Account::register(&store, &mailer, register_request("alice", "new@example.com")).await;
        assert!(matches!(by_username, Err(ApiError::AlreadyTaken(_))));

        let by_email =
            Account::register(&store, &mailer, register_request("bob", "alice@example.com")).await;
        assert!(matches!(by_email, Err(ApiError::AlreadyTaken(_))));
    }

    #[tokio::test]
    async fn register_retry_overwrites_unverified_account() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();

        Account::register(&store, &mailer, register_request("alice", "alice@example.com"))
            .await
            .unwrap();
        let first = store.find_by_username("alice").await.unwrap().unwrap();

        let mut retry = register_request("alice", "alice@example.com");
        retry.password = "newsecret".into();
        Account::register(&store, &mailer, retry).await.unwrap();

        let second = store.find_by_username("alice").await.unwrap().unwrap();
        assert_ne!(first.password_hash, second.password_hash);
        assert!(!second.verified);
        // 没有第二个账户，验证码被重新签发
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
        let last_sent_code = mailer.sent.lock().unwrap().last().unwrap().2.clone();
        assert_eq!(second.verify_code.as_deref(), Some(last_sent_code.as_str()));
    }

    #[tokio::test]
    async fn register_rolls_back_when_email_delivery_fails() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();
        mailer.set_fail(true);

        let result =
            Account::register(&store, &mailer, register_request("bob", "bob@example.com")).await;
        assert!(matches!(result, Err(ApiError::EmailDelivery)));
        assert!(store.find_by_username("bob").await.unwrap().is_none());

        // 故障恢复后重试同一邮箱可以成功
        mailer.set_fail(false);
        Account::register(&store, &mailer, register_request("bob", "bob@example.com"))
            .await
            .unwrap();
        assert!(store.find_by_username("bob").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn verify_scenario_mismatch_then_success() {
        let store = MemoryStore::new();
        let mut alice = Account::new(
            "alice".into(),
            "alice@example.com".into(),
            "$2b$10$hash".into(),
        );
        alice.verify_code = Some("123456".into());
        alice.verify_code_expires_at = Some(code_expiry(Utc::now()));
        store.upsert(&alice).await.unwrap();

        let mismatch = Account::verify(&store, "alice", "654321").await;
        assert!(matches!(mismatch, Err(ApiError::CodeMismatch)));
        assert!(!store.find_by_username("alice").await.unwrap().unwrap().verified);

        Account::verify(&store, "alice", "123456").await.unwrap();
        assert!(store.find_by_username("alice").await.unwrap().unwrap().verified);

        // 已验证账户重复提交同一有效验证码：幂等成功，状态不回退
        Account::verify(&store, "alice", "123456").await.unwrap();
        assert!(store.find_by_username("alice").await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn verify_expired_code_reports_expired() {
        let store = MemoryStore::new();
        let mut alice = Account::new(
            "alice".into(),
            "alice@example.com".into(),
            "$2b$10$hash".into(),
        );
        alice.verify_code = Some("123456".into());
        alice.verify_code_expires_at = Some(Utc::now() - Duration::seconds(1));
        store.upsert(&alice).await.unwrap();

        let result = Account::verify(&store, "alice", "123456").await;
        assert!(matches!(result, Err(ApiError::CodeExpired)));
    }

    #[tokio::test]
    async fn verify_unknown_account_reports_not_found() {
        let store = MemoryStore::new();
        let result = Account::verify(&store, "ghost", "123456").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_code() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();

        Account::register(&store, &mailer, register_request("alice", "alice@example.com"))
            .await
            .unwrap();
        let first_code = store
            .find_by_username("alice")
            .await
            .unwrap()
            .unwrap()
            .verify_code
            .unwrap();

        Account::reissue_code(&store, &mailer, "alice").await.unwrap();

        let account = store.find_by_username("alice").await.unwrap().unwrap();
        let sent_code = mailer.sent.lock().unwrap().last().unwrap().2.clone();
        assert_eq!(account.verify_code.as_deref(), Some(sent_code.as_str()));
        // 旧验证码只有在随机撞号时才还能通过
        if first_code != sent_code {
            assert!(matches!(
                account.check_code(&first_code, Utc::now()),
                Err(ApiError::CodeMismatch)
            ));
        }
    }

    #[tokio::test]
    async fn reissue_for_unknown_account_reports_not_found() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();
        let result = Account::reissue_code(&store, &mailer, "ghost").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn check_username_only_counts_verified_accounts() {
        let store = MemoryStore::new();
        let mailer = MockMailer::new();

        Account::register(&store, &mailer, register_request("alice", "alice@example.com"))
            .await
            .unwrap();
        // 未验证账户不占用用户名
        Account::check_username(&store, "alice").await.unwrap();

        store.mark_verified("alice").await.unwrap();
        let taken = Account::check_username(&store, "alice").await;
        assert!(matches!(taken, Err(ApiError::AlreadyTaken(_))));

        let invalid = Account::check_username(&store, "a!").await;
        assert!(matches!(invalid, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn login_requires_verified_account_and_correct_password() {
        let store = MemoryStore::new();
        let config = test_config();
        let mut account = Account::new(
            "alice".into(),
            "alice@example.com".into(),
            hash_password("secret123").unwrap(),
        );
        store.upsert(&account).await.unwrap();

        let unverified = Account::login(
            &store,
            &config,
            LoginRequest {
                identifier: "alice".into(),
                password: "secret123".into(),
            },
        )
        .await;
        assert!(matches!(unverified, Err(ApiError::NotVerified)));

        account.verified = true;
        store.upsert(&account).await.unwrap();

        let wrong = Account::login(
            &store,
            &config,
            LoginRequest {
                identifier: "alice".into(),
                password: "wrongpass".into(),
            },
        )
        .await;
        assert!(matches!(wrong, Err(ApiError::AuthFailed)));

        // 邮箱也可以作为登录标识
        let login = Account::login(
            &store,
            &config,
            LoginRequest {
                identifier: "alice@example.com".into(),
                password: "secret123".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(login.username, "alice");
        let claims = verify_token(&login.token, &config).unwrap();
        assert_eq!(claims.sub, "alice");
    }
}
