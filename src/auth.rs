use std::time::Duration;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use crate::error::{AppError, Result};

const AUTH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Outcome of a sign-up. `confirmation_required` is set when the account has
/// no linked identity yet and the user still has to confirm their email.
#[derive(Debug)]
pub struct SignUp {
    pub data: Value,
    pub confirmation_required: bool,
}

/// Password sign-in and sign-up against the hosted auth service (GoTrue).
/// Session payloads are passed through untouched.
pub struct AuthClient {
    http: Client,
    auth_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, api_key: String) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(AUTH_TIMEOUT).build()?;
        Ok(Self {
            http,
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            api_key,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Value> {
        require_credentials(email, password)?;

        let res = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(service)?;

        read_session(res).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        require_credentials(email, password)?;

        let res = self
            .http
            .post(format!("{}/signup", self.auth_url))
            .header("apikey", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(service)?;

        let data = read_session(res).await?;

        // With email confirmation on, the user object comes back bare;
        // otherwise it is nested in a session.
        let user = if data.get("user").is_some_and(Value::is_object) {
            &data["user"]
        } else {
            &data
        };
        if user.get("id").is_none() {
            return Err(AppError::AuthError("sign-up returned no user".to_string()));
        }

        let confirmation_required = user
            .get("identities")
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.is_empty());

        Ok(SignUp { data, confirmation_required })
    }
}

fn require_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput("email and password are required".to_string()));
    }
    Ok(())
}

async fn read_session(res: Response) -> Result<Value> {
    let status = res.status();
    if status.is_success() {
        return res.json().await.map_err(service);
    }

    let body = res.text().await.unwrap_or_default();
    if status.is_client_error() {
        return Err(AppError::AuthError(error_message(&body)));
    }
    Err(AppError::AuthServiceError(format!("{}: {}", status, body)))
}

/// Picks the human readable part of an auth error body. Older servers send
/// `error_description`, newer ones `msg`.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

fn service(err: reqwest::Error) -> AppError {
    AppError::AuthServiceError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_description() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message("  plain failure "), "plain failure");
    }

    #[tokio::test]
    async fn blank_credentials_never_leave_the_process() {
        let auth = AuthClient::new("http://127.0.0.1:9", "key".into()).unwrap();
        assert!(matches!(auth.sign_in("", "secret").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(auth.sign_up("a@example.com", "").await, Err(AppError::InvalidInput(_))));
    }
}
