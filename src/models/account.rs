use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;

/// 验证码有效期：10 分钟
const VERIFY_CODE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub verify_code: Option<String>,
    #[serde(skip_serializing)]
    pub verify_code_expires_at: Option<DateTime<Utc>>,
    pub accepting_messages: bool,
    pub created_at: DateTime<Utc>,
}

/// 生成 6 位数字验证码，取值范围保证不会出现前导零被截断成 5 位的情况
pub fn generate_verify_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

pub fn code_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(VERIFY_CODE_TTL_SECS)
}

impl Account {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Account {
            username,
            email,
            password_hash,
            verified: false,
            verify_code: None,
            verify_code_expires_at: None,
            accepting_messages: true,
            created_at: Utc::now(),
        }
    }

    /// 签发新验证码并附着到账户上，旧验证码随之失效
    pub fn issue_code(&mut self, now: DateTime<Utc>) -> String {
        let code = generate_verify_code();
        self.verify_code = Some(code.clone());
        self.verify_code_expires_at = Some(code_expiry(now));
        code
    }

    /// 校验提交的验证码。先比对再查过期：又错又过期的验证码报错误而不是过期
    pub fn check_code(&self, submitted: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
        if self.verify_code.as_deref() != Some(submitted) {
            return Err(ApiError::CodeMismatch);
        }
        match self.verify_code_expires_at {
            Some(expires_at) if now < expires_at => Ok(()),
            _ => Err(ApiError::CodeExpired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_code(code: &str, expires_at: DateTime<Utc>) -> Account {
        let mut account = Account::new(
            "alice".into(),
            "alice@example.com".into(),
            "$2b$10$hash".into(),
        );
        account.verify_code = Some(code.into());
        account.verify_code_expires_at = Some(expires_at);
        account
    }

    #[test]
    fn generated_code_is_always_six_digits() {
        for _ in 0..200 {
            let code = generate_verify_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn code_expiry_is_exactly_ten_minutes() {
        let now = Utc::now();
        assert_eq!(code_expiry(now) - now, Duration::seconds(600));
    }

    #[test]
    fn issue_code_overwrites_previous_code() {
        let now = Utc::now();
        let mut account = account_with_code("123456", now - Duration::seconds(1));

        let code = account.issue_code(now);
        assert_eq!(account.verify_code.as_deref(), Some(code.as_str()));
        assert_eq!(account.verify_code_expires_at, Some(code_expiry(now)));
    }

    #[test]
    fn matching_code_before_expiry_passes() {
        let now = Utc::now();
        let account = account_with_code("123456", code_expiry(now));
        assert!(account.check_code("123456", now).is_ok());
    }

    #[test]
    fn wrong_code_reports_mismatch() {
        let now = Utc::now();
        let account = account_with_code("123456", code_expiry(now));
        assert!(matches!(
            account.check_code("654321", now),
            Err(ApiError::CodeMismatch)
        ));
    }

    #[test]
    fn expired_code_reports_expired() {
        let now = Utc::now();
        let account = account_with_code("123456", now - Duration::seconds(1));
        assert!(matches!(
            account.check_code("123456", now),
            Err(ApiError::CodeExpired)
        ));
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let account = account_with_code("123456", now);
        assert!(matches!(
            account.check_code("123456", now),
            Err(ApiError::CodeExpired)
        ));
    }

    // 又错又过期时报验证码错误，顺序是对外承诺的一部分
    #[test]
    fn wrong_and_expired_code_reports_mismatch() {
        let now = Utc::now();
        let account = account_with_code("123456", now - Duration::seconds(1));
        assert!(matches!(
            account.check_code("654321", now),
            Err(ApiError::CodeMismatch)
        ));
    }

    #[test]
    fn missing_code_reports_mismatch() {
        let account = Account::new(
            "bob".into(),
            "bob@example.com".into(),
            "$2b$10$hash".into(),
        );
        assert!(matches!(
            account.check_code("123456", Utc::now()),
            Err(ApiError::CodeMismatch)
        ));
    }

    #[test]
    fn code_comparison_is_exact_string_equality() {
        let now = Utc::now();
        let account = account_with_code("123456", code_expiry(now));
        assert!(matches!(
            account.check_code(" 123456", now),
            Err(ApiError::CodeMismatch)
        ));
        assert!(matches!(
            account.check_code("1234567", now),
            Err(ApiError::CodeMismatch)
        ));
    }
}
