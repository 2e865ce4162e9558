//! Test utilities and common setup.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use clubgate::api::{ApiClient, ApiRequest, RawResponse, Transport};
use clubgate::error::ApiError;
use clubgate::session::{HttpAuthBackend, MemoryStorage, SessionSnapshot, SessionStore};
use clubgate_protocol::{LOGIN_PATH, REFRESH_PATH, UserRecord};

/// One observed call: method, path, and the bearer the pipeline attached.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
}

#[derive(Default)]
struct MockState {
    /// Fixed responses for specific paths, checked before any other rule.
    scripted: std::collections::HashMap<String, RawResponse>,
    /// Tokens the fake backend currently accepts.
    valid_tokens: HashSet<String>,
    /// Token the refresh endpoint will issue next; `None` makes refresh fail.
    refresh_issues: Option<String>,
    /// Whether the issued refresh token is added to the accepted set.
    refresh_token_accepted: bool,
    /// Artificial latency on the refresh endpoint, to force overlap.
    refresh_delay: Option<Duration>,
    /// Paths answered without any credential check.
    public_paths: HashSet<String>,
    refresh_calls: usize,
}

/// Scripted stand-in for the remote API.
pub struct MockTransport {
    state: Mutex<MockState>,
    log: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                refresh_token_accepted: true,
                ..MockState::default()
            }),
            log: Mutex::new(Vec::new()),
        }
    }

    pub async fn accept_token(&self, token: &str) {
        self.state.lock().await.valid_tokens.insert(token.to_string());
    }

    pub async fn set_refresh_issues(&self, token: Option<&str>) {
        self.state.lock().await.refresh_issues = token.map(str::to_string);
    }

    /// Make refresh succeed but hand out a token the backend still rejects.
    pub async fn set_refresh_token_rejected(&self) {
        self.state.lock().await.refresh_token_accepted = false;
    }

    pub async fn set_refresh_delay(&self, delay: Duration) {
        self.state.lock().await.refresh_delay = Some(delay);
    }

    /// Answer `path` with a fixed response regardless of credentials.
    pub async fn script_response(&self, path: &str, status: u16, body: serde_json::Value) {
        self.state
            .lock()
            .await
            .scripted
            .insert(path.to_string(), RawResponse { status, body });
    }

    pub async fn add_public_path(&self, path: &str) {
        self.state.lock().await.public_paths.insert(path.to_string());
    }

    pub async fn refresh_calls(&self) -> usize {
        self.state.lock().await.refresh_calls
    }

    pub async fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().await.clone()
    }

    /// Calls recorded against one path, oldest first.
    pub async fn recorded_for(&self, path: &str) -> Vec<Recorded> {
        self.recorded()
            .await
            .into_iter()
            .filter(|rec| rec.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        self.log.lock().await.push(Recorded {
            method: request.method.to_string(),
            path: request.path.clone(),
            bearer: request.bearer.clone(),
        });

        if let Some(response) = self.state.lock().await.scripted.get(&request.path) {
            return Ok(response.clone());
        }

        if request.path == REFRESH_PATH {
            let delay = {
                let mut state = self.state.lock().await;
                state.refresh_calls += 1;
                state.refresh_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.state.lock().await;
            return match state.refresh_issues.clone() {
                Some(token) => {
                    if state.refresh_token_accepted {
                        state.valid_tokens.insert(token.clone());
                    }
                    Ok(RawResponse {
                        status: 200,
                        body: json!({"code": 0, "msg": "ok", "data": {"token": token}}),
                    })
                }
                None => Ok(RawResponse {
                    status: 401,
                    body: json!({"code": 1005, "msg": "refresh token invalid"}),
                }),
            };
        }

        if request.path == LOGIN_PATH {
            let mut state = self.state.lock().await;
            state.valid_tokens.insert("tok1".to_string());
            return Ok(RawResponse {
                status: 200,
                body: json!({
                    "code": 0,
                    "msg": "ok",
                    "data": {"user": user_json(2), "token": "tok1"}
                }),
            });
        }

        let state = self.state.lock().await;
        let authorized = state.public_paths.contains(&request.path)
            || request
                .bearer
                .as_ref()
                .is_some_and(|token| state.valid_tokens.contains(token));

        if authorized {
            Ok(RawResponse {
                status: 200,
                body: json!({"code": 0, "msg": "ok", "data": {"path": request.path}}),
            })
        } else {
            Ok(RawResponse {
                status: 401,
                body: json!({"code": 401, "msg": "unauthorized"}),
            })
        }
    }
}

fn user_json(role_id: i64) -> serde_json::Value {
    json!({"userId": 1, "userName": "kai", "name": "Kai", "roleId": role_id})
}

pub fn user_with_role(role_id: i64) -> UserRecord {
    UserRecord {
        user_id: 1,
        user_name: "kai".to_string(),
        name: "Kai".to_string(),
        role_id,
        avatar: None,
    }
}

/// Fully wired test fixture: mock transport, real store and pipeline.
pub struct TestApp {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub session: Arc<SessionStore>,
    pub client: ApiClient,
}

/// Build the fixture, optionally pre-seeding a persisted session.
pub async fn test_app(seed: Option<SessionSnapshot>) -> TestApp {
    let _ = env_logger::builder().is_test(true).try_init();

    let transport = Arc::new(MockTransport::new());
    let storage = Arc::new(MemoryStorage::new());
    if let Some(snapshot) = seed {
        use clubgate::session::SessionStorage;
        storage.store(&snapshot).await.expect("seed snapshot");
    }

    let backend = Arc::new(HttpAuthBackend::new(transport.clone()));
    let session = Arc::new(SessionStore::open(storage.clone(), backend).await);
    let client = ApiClient::new(transport.clone(), session.clone());

    TestApp {
        transport,
        storage,
        session,
        client,
    }
}

/// A persisted session carrying `token` for a user with `role_id`.
pub fn snapshot(token: &str, role_id: i64) -> SessionSnapshot {
    SessionSnapshot {
        user: Some(user_with_role(role_id)),
        token: Some(token.to_string()),
        saved_at: None,
    }
}
