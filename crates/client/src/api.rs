//! Typed request wrapper over the JewelAI REST API.
//!
//! Every operation attaches the stored bearer token when one is present,
//! serializes bodies as JSON, and classifies failures into [`ApiError`].
//! Auth failures (401/403) unconditionally invalidate the session as a
//! side effect -- this is a global contract, not a per-call opt-in.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use jewelai_core::process::{CurrentUser, DesignProcess, DesignProcessDetails, ProcessStatus};
use jewelai_core::quiz::{normalize_answer_list, QuizQuestion, UserAnswer};
use jewelai_core::types::EntityId;

use crate::error::{ApiError, ApiResult};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /api/auth/login`.
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Body for `POST /api/auth/register`.
#[derive(Debug, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

/// Body for `PATCH /api/processes/{id}/title`.
#[derive(Debug, Serialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 50, message = "Title must be 1-50 characters"))]
    pub title: String,
}

/// Body for `PATCH /api/processes/{id}/comment`. A `null` comment clears it.
#[derive(Debug, Serialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
}

/// Token envelope returned by login and register.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Response of `GET /api/processes/{id}/prompt`.
#[derive(Debug, Deserialize)]
pub struct PromptResponse {
    pub prompt: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the design workflow API.
///
/// Cheaply cloneable; the underlying connection pool and session handle are
/// shared.
#[derive(Clone)]
pub struct DesignApi {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl DesignApi {
    /// Create a client against an API base URL, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: Session,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    /// The session this client attaches tokens from and invalidates on auth
    /// failures.
    pub fn session(&self) -> &Session {
        &self.session
    }

    // -- auth --

    /// `POST /api/auth/login`. On success the token is persisted into the
    /// session, with the email as display-name fallback.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<String> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        validate(&request)?;

        let body = self
            .dispatch(Method::POST, "/api/auth/login", Some(json!(request)))
            .await?;
        let response: TokenResponse = decode(body)?;
        self.session.save_token(&response.token, Some(email));
        Ok(response.token)
    }

    /// `POST /api/auth/register`. A 409 conflict maps to a field-level
    /// "email already exists" error rather than a generic failure.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> ApiResult<String> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(str::to_owned),
        };
        validate(&request)?;

        let result = self
            .dispatch(Method::POST, "/api/auth/register", Some(json!(request)))
            .await;
        let body = match result {
            Err(err) if err.is_conflict() => {
                return Err(ApiError::Field {
                    field: "email",
                    message: "An account with this email already exists".into(),
                });
            }
            other => other?,
        };
        let response: TokenResponse = decode(body)?;
        self.session
            .save_token(&response.token, name.or(Some(email)));
        Ok(response.token)
    }

    /// `GET /api/auth/me`.
    pub async fn current_user(&self) -> ApiResult<CurrentUser> {
        self.get_json("/api/auth/me").await
    }

    // -- processes --

    /// `GET /api/processes`.
    pub async fn list_processes(&self) -> ApiResult<Vec<DesignProcess>> {
        self.get_json("/api/processes").await
    }

    /// `POST /api/processes`. The process is created empty, in the intake
    /// status.
    pub async fn create_process(&self) -> ApiResult<DesignProcess> {
        let body = self
            .dispatch(Method::POST, "/api/processes", Some(json!({})))
            .await?;
        decode(body)
    }

    /// `GET /api/processes/{id}`.
    pub async fn get_process(&self, id: EntityId) -> ApiResult<DesignProcess> {
        self.get_json(&format!("/api/processes/{id}")).await
    }

    /// `GET /api/processes/{id}/details`.
    pub async fn get_process_details(&self, id: EntityId) -> ApiResult<DesignProcessDetails> {
        self.get_json(&format!("/api/processes/{id}/details")).await
    }

    /// `PATCH /api/processes/{id}/title`.
    pub async fn update_title(&self, id: EntityId, title: &str) -> ApiResult<DesignProcess> {
        let request = UpdateTitleRequest {
            title: title.trim().to_string(),
        };
        validate(&request)?;
        let body = self
            .dispatch(
                Method::PATCH,
                &format!("/api/processes/{id}/title"),
                Some(json!(request)),
            )
            .await?;
        decode(body)
    }

    /// `PATCH /api/processes/{id}/comment`. Pass `None` to clear.
    pub async fn update_comment(
        &self,
        id: EntityId,
        comment: Option<&str>,
    ) -> ApiResult<DesignProcessDetails> {
        let request = UpdateCommentRequest {
            comment: comment
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
        };
        validate(&request)?;
        let body = self
            .dispatch(
                Method::PATCH,
                &format!("/api/processes/{id}/comment"),
                Some(json!(request)),
            )
            .await?;
        decode(body)
    }

    /// `POST /api/processes/{id}/start-generation`.
    pub async fn start_generation(&self, id: EntityId) -> ApiResult<()> {
        self.dispatch(
            Method::POST,
            &format!("/api/processes/{id}/start-generation"),
            None,
        )
        .await?;
        Ok(())
    }

    /// `POST /api/processes/{id}/generate-image`.
    pub async fn generate_image(&self, id: EntityId) -> ApiResult<()> {
        self.dispatch(
            Method::POST,
            &format!("/api/processes/{id}/generate-image"),
            None,
        )
        .await?;
        Ok(())
    }

    /// `GET /api/processes/{id}/status` -- the lightweight shape used by
    /// the poller.
    pub async fn get_status(&self, id: EntityId) -> ApiResult<ProcessStatus> {
        self.get_json(&format!("/api/processes/{id}/status")).await
    }

    /// `GET /api/processes/{id}/prompt`.
    pub async fn get_prompt(&self, id: EntityId) -> ApiResult<PromptResponse> {
        self.get_json(&format!("/api/processes/{id}/prompt")).await
    }

    /// `POST /api/processes/{id}/send-to-review`.
    pub async fn send_to_review(&self, id: EntityId) -> ApiResult<DesignProcess> {
        let body = self
            .dispatch(
                Method::POST,
                &format!("/api/processes/{id}/send-to-review"),
                None,
            )
            .await?;
        decode(body)
    }

    /// `DELETE /api/processes/{id}`.
    pub async fn delete_process(&self, id: EntityId) -> ApiResult<()> {
        self.dispatch(Method::DELETE, &format!("/api/processes/{id}"), None)
            .await?;
        Ok(())
    }

    // -- quiz --

    /// `GET /api/quiz/questions`.
    pub async fn list_questions(&self) -> ApiResult<Vec<QuizQuestion>> {
        self.get_json("/api/quiz/questions").await
    }

    /// `GET /api/quiz/processes/{id}/answers`.
    ///
    /// The response is tolerated as either a bare array or an
    /// `{answers: [...]}` envelope.
    pub async fn list_answers(&self, process_id: EntityId) -> ApiResult<Vec<UserAnswer>> {
        let body = self
            .dispatch(
                Method::GET,
                &format!("/api/quiz/processes/{process_id}/answers"),
                None,
            )
            .await?;
        Ok(normalize_answer_list(&body))
    }

    /// `POST /api/quiz/processes/{id}/answers`. Sends the trimmed flat
    /// answer value; re-submitting for the same question overwrites the
    /// previous answer server-side.
    pub async fn submit_answer(
        &self,
        process_id: EntityId,
        question_id: EntityId,
        answer: &str,
    ) -> ApiResult<UserAnswer> {
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation("Answer must not be empty".into()));
        }
        let body = self
            .dispatch(
                Method::POST,
                &format!("/api/quiz/processes/{process_id}/answers"),
                Some(json!({
                    "questionId": question_id,
                    "answerJson": trimmed,
                })),
            )
            .await?;
        decode(body)
    }

    // ---- private helpers ----

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let body = self.dispatch(Method::GET, path, None).await?;
        decode(body)
    }

    /// Send one request and normalize the response into a JSON value.
    ///
    /// - Bearer token attached when the session holds one.
    /// - A response declaring JSON is parsed; a parse failure degrades to a
    ///   `null` body instead of raising. Non-JSON bodies come back as raw
    ///   text.
    /// - Non-2xx responses become [`ApiError::Api`] carrying the body as
    ///   `data`; 401/403 additionally invalidate the session.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let declares_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        let raw = response.text().await?;

        let parsed = if declares_json {
            serde_json::from_str(&raw).unwrap_or(Value::Null)
        } else if raw.is_empty() {
            Value::Null
        } else {
            Value::String(raw)
        };

        if status.is_success() {
            return Ok(parsed);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(%method, path, status = status.as_u16(), "Session invalidated by auth failure");
            self.session.invalidate();
        }

        Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(&parsed, status),
            data: Some(parsed),
        })
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &Value, status: StatusCode) -> String {
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| body.as_str().map(str::to_owned))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("API request failed")
                .to_string()
        })
}

/// Map client-side validation failures onto [`ApiError::Validation`].
fn validate<T: Validate>(request: &T) -> ApiResult<()> {
    request
        .validate()
        .map_err(|errors| ApiError::Validation(errors.to_string()))
}

fn decode<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(body)?)
}
