//! HTTP client for the attendance backend.
//!
//! Every call:
//! 1. Builds the URL from the configured base and query parameters
//! 2. Attaches a correlation id and, for non-public paths, the bearer token
//! 3. Maps non-2xx statuses to [`ApiError::Status`]
//! 4. Unwraps the `{ success, message, data }` envelope

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use super::error::ApiError;
use super::types::*;
use super::{generate_correlation_id, Backend};
use crate::config::ClientConfig;
use crate::schedule::semester::semester_to_year;

/// Paths under this prefix are served without authentication.
const PUBLIC_PREFIX: &str = "/teacher/";

const CORRELATION_HEADER: &str = "X-Correlation-Id";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Client for the attendance REST API.
pub struct RestClient {
    client: Client,
    config: ClientConfig,
}

impl RestClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Url::parse(&config.base_url)?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Joins `path` onto the base URL and appends `query`.
    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path
        ))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &str, url: Url, correlation_id: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(CORRELATION_HEADER, correlation_id);
        if !path.starts_with(PUBLIC_PREFIX) {
            if let Some(token) = &self.config.bearer_token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }
        builder
    }

    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        idempotency_key: Option<&str>,
    ) -> Result<Option<T>, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let correlation_id = generate_correlation_id();
        let url = self.endpoint(path, query)?;
        debug!(
            correlation_id = %correlation_id,
            method = %method,
            url = %url,
            "Sending request"
        );

        let mut builder = self.request(method.clone(), path, url, &correlation_id);
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    correlation_id = %correlation_id,
                    method = %method,
                    path = %path,
                    error = %e,
                    "Request failed"
                );
                return Err(e.into());
            }
        };

        let result = decode_envelope(response).await;
        match &result {
            Ok(_) => info!(
                correlation_id = %correlation_id,
                method = %method,
                path = %path,
                duration_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            ),
            Err(e) => warn!(
                correlation_id = %correlation_id,
                method = %method,
                path = %path,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Backend returned an error"
            ),
        }
        result
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        Ok(self
            .call::<(), Vec<T>>(Method::GET, path, query, None, None)
            .await?
            .unwrap_or_default())
    }

    async fn send_for<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.call(method, path, &[], Some(body), idempotency_key)
            .await?
            .ok_or_else(|| ApiError::Decode {
                message: format!("{path} returned no data"),
            })
    }
}

/// Checks the status code and unwraps the response envelope.
async fn decode_envelope<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        // Error bodies usually still carry an envelope with a useful message
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
            .ok()
            .and_then(|env| env.error.or(Some(env.message)))
            .filter(|m| !m.is_empty())
            .unwrap_or(text);
        return Err(ApiError::status(status, message));
    }

    if text.trim().is_empty() {
        return Ok(None);
    }
    let envelope: Envelope<T> = serde_json::from_str(&text)?;
    envelope.into_result()
}

type Query = Vec<(&'static str, String)>;

/// The staff endpoints select a class by year as well as semester.
fn classes_query(department: &str, semester: u8) -> Query {
    vec![
        ("department", department.to_string()),
        ("semester", semester.to_string()),
        ("year", semester_to_year(semester).to_string()),
    ]
}

fn schedule_query(department: &str, semester: u8, class_name: &str) -> Query {
    let mut query = classes_query(department, semester);
    query.push(("className", class_name.to_string()));
    query
}

fn subjects_query(department: &str, semester: u8) -> Query {
    vec![
        ("department", department.to_string()),
        ("semester", semester.to_string()),
    ]
}

fn roster_query(query: &RosterQuery) -> Query {
    match query {
        RosterQuery::Class(class_id) => vec![("classId", class_id.to_string())],
        RosterQuery::Section {
            department,
            semester,
            section,
        } => vec![
            ("department", department.clone()),
            ("semester", semester.to_string()),
            ("section", section.clone()),
        ],
    }
}

#[async_trait]
impl Backend for RestClient {
    async fn teacher_years(&self, department: &str) -> Result<Vec<u8>, ApiError> {
        self.get_list("/teacher/years", &[("department", department.to_string())])
            .await
    }

    async fn teacher_classes(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<Vec<String>, ApiError> {
        self.get_list("/teacher/classes", &classes_query(department, semester))
            .await
    }

    async fn teacher_schedule(
        &self,
        department: &str,
        semester: u8,
        class_name: &str,
    ) -> Result<Vec<SessionRecord>, ApiError> {
        self.get_list(
            "/teacher/schedule",
            &schedule_query(department, semester, class_name),
        )
        .await
    }

    async fn list_subjects(&self, department: &str, semester: u8) -> Result<Vec<Subject>, ApiError> {
        self.get_list("/admin/subjects", &subjects_query(department, semester))
            .await
    }

    async fn create_subject(&self, draft: &SubjectDraft) -> Result<Subject, ApiError> {
        self.send_for(Method::POST, "/admin/subjects", draft, None).await
    }

    async fn update_subject(&self, id: i64, draft: &SubjectDraft) -> Result<Subject, ApiError> {
        self.send_for(Method::PUT, &format!("/admin/subjects/{id}"), draft, None)
            .await
    }

    async fn delete_subject(&self, id: i64) -> Result<(), ApiError> {
        self.call::<(), serde_json::Value>(
            Method::DELETE,
            &format!("/admin/subjects/{id}"),
            &[],
            None,
            None,
        )
        .await
        .map(|_| ())
    }

    async fn upsert_session(
        &self,
        session: &SessionUpsert,
        idempotency_key: &str,
    ) -> Result<SessionSaved, ApiError> {
        Ok(self
            .call(
                Method::POST,
                "/admin/timetable/session",
                &[],
                Some(session),
                Some(idempotency_key),
            )
            .await?
            .unwrap_or(SessionSaved { session_id: None }))
    }

    async fn list_roster(&self, query: &RosterQuery) -> Result<Vec<RosterStudent>, ApiError> {
        self.get_list("/students", &roster_query(query)).await
    }

    async fn mark_attendance(&self, mark: &AttendanceWrite) -> Result<(), ApiError> {
        self.call::<_, serde_json::Value>(Method::POST, "/attendance/session", &[], Some(mark), None)
            .await
            .map(|_| ())
    }
}
