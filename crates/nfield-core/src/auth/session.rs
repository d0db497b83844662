//! Authentication-token lifecycle for the Nfield API.
//!
//! `SessionManager` owns the one live credential set, the cached token and
//! the optional background refresh task. Every authenticated call gets its
//! token through [`SessionManager::ensure_token`], which signs in only when
//! the cached token has gone stale. Concurrent sign-ins are serialized
//! behind a single-flight gate shared with the refresh task.

use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::config::{Credentials, SessionConfig};

/// Minutes a token is trusted after issuance.
/// Nfield tokens expire after 15 minutes; 12 leaves room for clock drift.
pub const TOKEN_VALIDITY_MINUTES: u64 = 12;

/// Period of the background refresh task
pub const REFRESH_INTERVAL_MINUTES: u64 = 12;

const SIGN_IN_SEGMENTS: [&str; 2] = ["v1", "SignIn"];

/// Field of the sign-in response holding the token
const TOKEN_FIELD: &str = "AuthenticationToken";

/// Called with the error when a background refresh fails
pub type RefreshErrorCallback = Arc<dyn Fn(ApiError) + Send + Sync>;

type TransportFactory =
    Arc<dyn Fn(&SessionConfig) -> Result<Arc<dyn Transport>, ApiError> + Send + Sync>;

fn validity_window() -> Duration {
    Duration::from_secs(TOKEN_VALIDITY_MINUTES * 60)
}

fn refresh_interval() -> Duration {
    Duration::from_secs(REFRESH_INTERVAL_MINUTES * 60)
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub authentication_token: String,
    /// `None` until the first successful sign-in
    pub issued_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Value for the `Authorization` header. The service expects the
    /// literal `Basic` scheme in front of its opaque token.
    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.authentication_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.authentication_token.is_empty() {
            "<none>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Token")
            .field("authentication_token", &value)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[derive(Debug, Default)]
struct CachedToken {
    value: String,
    issued_at: Option<DateTime<Utc>>,
    /// Monotonic issue time used for freshness
    issued: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.issued {
            Some(issued) if !self.value.is_empty() => issued.elapsed() < validity_window(),
            _ => false,
        }
    }

    fn to_token(&self) -> Token {
        Token {
            authentication_token: self.value.clone(),
            issued_at: self.issued_at,
        }
    }
}

/// Stops the refresh task when signalled or dropped
struct RefreshHandle {
    shutdown: oneshot::Sender<()>,
}

impl RefreshHandle {
    fn is_running(&self) -> bool {
        !self.shutdown.is_closed()
    }
}

struct SessionState {
    config: RwLock<SessionConfig>,
    transport: RwLock<Arc<dyn Transport>>,
    factory: TransportFactory,
    token: RwLock<CachedToken>,
    sign_in_gate: Mutex<()>,
    refresh_task: StdMutex<Option<RefreshHandle>>,
}

/// Shared handle to one Nfield session.
/// Clone is cheap; all clones share the token cache and the refresh task.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<SessionState>,
}

impl SessionManager {
    /// Create a session that talks HTTP to `config.server`
    pub fn new(config: SessionConfig) -> Result<Self, ApiError> {
        let factory: TransportFactory =
            Arc::new(|config: &SessionConfig| -> Result<Arc<dyn Transport>, ApiError> {
                Ok(Arc::new(HttpTransport::new(config)?))
            });
        Self::from_factory(config, factory)
    }

    /// Create a session over a caller-supplied transport.
    /// Reconfiguring keeps using the same transport.
    pub fn with_transport(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let shared = Arc::clone(&transport);
        let factory: TransportFactory =
            Arc::new(move |_: &SessionConfig| -> Result<Arc<dyn Transport>, ApiError> {
                Ok(Arc::clone(&shared))
            });
        Self::from_parts(config, transport, factory)
    }

    fn from_factory(config: SessionConfig, factory: TransportFactory) -> Result<Self, ApiError> {
        let transport = factory(&config)?;
        Ok(Self::from_parts(config, transport, factory))
    }

    fn from_parts(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        factory: TransportFactory,
    ) -> Self {
        let state = SessionState {
            config: RwLock::new(config),
            transport: RwLock::new(transport),
            factory,
            token: RwLock::new(CachedToken::default()),
            sign_in_gate: Mutex::new(()),
            refresh_task: StdMutex::new(None),
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Replace the configuration and rebuild the transport.
    /// A still-fresh token stays in use.
    pub async fn configure(&self, config: SessionConfig) -> Result<(), ApiError> {
        let transport = (self.state.factory)(&config)?;
        info!(server = %config.server, username = %config.credentials.username, "Reconfiguring Nfield session");
        *self.state.transport.write().await = transport;
        *self.state.config.write().await = config;
        Ok(())
    }

    pub async fn config(&self) -> SessionConfig {
        self.state.config.read().await.clone()
    }

    /// Send a request through the current transport
    pub(crate) async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let transport = Arc::clone(&*self.state.transport.read().await);
        transport.send(request).await
    }

    /// Sign in with the given credentials. Does not touch the cached token.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::POST, SIGN_IN_SEGMENTS).json(credentials)?;
        debug!(domain = %credentials.domain, username = %credentials.username, "Signing in");
        self.send(request).await
    }

    /// Get a token that is valid now, signing in only if the cached one is stale
    pub async fn ensure_token(&self) -> Result<Token, ApiError> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let _gate = self.state.sign_in_gate.lock().await;

        // Another caller may have signed in while we waited
        if let Some(token) = self.fresh_token().await {
            debug!("Reusing token from concurrent sign-in");
            return Ok(token);
        }

        self.sign_in_and_store().await
    }

    /// The cached token, fresh or not, without any network call
    pub async fn current_token(&self) -> Token {
        self.state.token.read().await.to_token()
    }

    async fn fresh_token(&self) -> Option<Token> {
        let cached = self.state.token.read().await;
        if cached.is_fresh() {
            Some(cached.to_token())
        } else {
            None
        }
    }

    /// Sign in with the configured credentials and cache the result.
    /// Callers must hold the sign-in gate.
    async fn sign_in_and_store(&self) -> Result<Token, ApiError> {
        let credentials = self.state.config.read().await.credentials.clone();
        let response = self.sign_in(&credentials).await?;

        if response.status != 200 {
            warn!(status = response.status, username = %credentials.username, "Sign-in rejected");
            return Err(ApiError::AuthenticationFailed(response));
        }

        let value = match response.body.get(TOKEN_FIELD).and_then(Value::as_str) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                return Err(ApiError::InvalidResponse(format!(
                    "Sign-in response has no {}",
                    TOKEN_FIELD
                )))
            }
        };

        let mut cached = self.state.token.write().await;
        *cached = CachedToken {
            value,
            issued_at: Some(Utc::now()),
            issued: Some(Instant::now()),
        };
        info!(username = %credentials.username, "Signed in to Nfield");
        Ok(cached.to_token())
    }

    /// Unconditional sign-in used by the refresh task
    async fn refresh_token(&self) -> Result<Token, ApiError> {
        let _gate = self.state.sign_in_gate.lock().await;
        self.sign_in_and_store().await
    }

    fn refresh_slot(&self) -> MutexGuard<'_, Option<RefreshHandle>> {
        self.state
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start rotating the token every `REFRESH_INTERVAL_MINUTES`.
    ///
    /// Returns `Ok(false)` if a refresh task is already running. Each tick
    /// signs in even when the cached token is still fresh. Failures go to
    /// `on_error` and never stop the task. Must be called from within a
    /// Tokio runtime.
    pub fn start_auto_refresh(
        &self,
        on_error: Option<RefreshErrorCallback>,
    ) -> Result<bool, ApiError> {
        let mut slot = self.refresh_slot();
        if slot.as_ref().is_some_and(RefreshHandle::is_running) {
            info!("Token auto-refresh already running");
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ApiError::Runtime(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = Arc::downgrade(&self.state);
        runtime.spawn(Self::run_refresh(state, shutdown_rx, on_error));
        *slot = Some(RefreshHandle {
            shutdown: shutdown_tx,
        });

        info!(interval_minutes = REFRESH_INTERVAL_MINUTES, "Started token auto-refresh");
        Ok(true)
    }

    /// Stop the refresh task. A sign-in already in flight still completes.
    pub fn stop_auto_refresh(&self) {
        match self.refresh_slot().take() {
            Some(handle) => {
                let _ = handle.shutdown.send(());
                info!("Stopped token auto-refresh");
            }
            None => debug!("No token auto-refresh to stop"),
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh_slot()
            .as_ref()
            .is_some_and(RefreshHandle::is_running)
    }

    /// Ensure a token, optionally keeping it warm in the background
    pub async fn connect(
        &self,
        persistent: bool,
        on_error: Option<RefreshErrorCallback>,
    ) -> Result<Token, ApiError> {
        if persistent {
            self.start_auto_refresh(on_error)?;
        }
        self.ensure_token().await
    }

    pub fn stop_persistent(&self) {
        self.stop_auto_refresh();
    }

    async fn run_refresh(
        state: Weak<SessionState>,
        mut shutdown: oneshot::Receiver<()>,
        on_error: Option<RefreshErrorCallback>,
    ) {
        let period = refresh_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            // Session dropped by every owner
            let Some(strong) = state.upgrade() else { break };
            let session = SessionManager { state: strong };

            match session.refresh_token().await {
                Ok(_) => debug!("Background token refresh succeeded"),
                Err(err) => {
                    warn!(error = %err, "Background token refresh failed");
                    if let Some(ref callback) = on_error {
                        callback(err);
                    }
                }
            }
        }

        debug!("Token auto-refresh task exited");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::{join_all, BoxFuture};
    use serde_json::json;

    use super::*;

    type Responder = Box<dyn Fn(usize) -> Result<ApiResponse, ApiError> + Send + Sync>;

    /// Counts sign-ins and answers each with the scripted response
    struct ScriptedTransport {
        calls: AtomicUsize,
        requests: StdMutex<Vec<ApiRequest>>,
        respond: Responder,
        latency: Option<Duration>,
    }

    impl ScriptedTransport {
        fn new(respond: impl Fn(usize) -> Result<ApiResponse, ApiError> + Send + Sync + 'static) -> Arc<Self> {
            Self::build(respond, None)
        }

        fn build(
            respond: impl Fn(usize) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
            latency: Option<Duration>,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                requests: StdMutex::new(Vec::new()),
                respond: Box::new(respond),
                latency,
            })
        }

        fn issue(n: usize) -> Result<ApiResponse, ApiError> {
            Ok(ApiResponse::new(200, json!({ "AuthenticationToken": format!("token-{}", n) })))
        }

        /// Issues `token-1`, `token-2`, ... on successive sign-ins
        fn issuing() -> Arc<Self> {
            Self::new(Self::issue)
        }

        fn slow_issuing(latency: Duration) -> Arc<Self> {
            Self::build(Self::issue, Some(latency))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> ApiRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
            Box::pin(async move {
                if let Some(latency) = self.latency {
                    tokio::time::sleep(latency).await;
                }
                self.requests.lock().unwrap().push(request);
                let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                (self.respond)(n)
            })
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new(Credentials::new("d", "u", "p"))
    }

    fn session_over(transport: &Arc<ScriptedTransport>) -> SessionManager {
        SessionManager::with_transport(config(), transport.clone())
    }

    /// Sleep on the paused clock so every tick due on the way fires in order
    async fn advance_minutes(minutes: u64) {
        tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
        // Let the refresh task finish whatever the last tick started
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_signs_in_once_while_fresh() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        let token = session.connect(false, None).await.unwrap();
        assert_eq!(token.authentication_token, "token-1");
        assert!(token.issued_at.is_some());

        let again = session.connect(false, None).await.unwrap();
        assert_eq!(again.authentication_token, "token-1");
        assert_eq!(transport.calls(), 1);

        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path(), "v1/SignIn");
        assert_eq!(
            request.body,
            Some(json!({"Domain": "d", "Username": "u", "Password": "p"}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_stays_fresh_inside_window() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.ensure_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(TOKEN_VALIDITY_MINUTES * 60 - 1)).await;

        let token = session.ensure_token().await.unwrap();
        assert_eq!(token.authentication_token, "token-1");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_is_stale_at_exactly_the_validity_window() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.ensure_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(TOKEN_VALIDITY_MINUTES * 60)).await;

        let token = session.ensure_token().await.unwrap();
        assert_eq!(token.authentication_token, "token-2");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_triggers_one_new_sign_in() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.connect(false, None).await.unwrap();
        tokio::time::advance(Duration::from_secs(13 * 60)).await;

        let token = session.connect(false, None).await.unwrap();
        assert_eq!(token.authentication_token, "token-2");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_sign_in_keeps_previous_token() {
        let transport = ScriptedTransport::new(|n| {
            if n == 1 {
                Ok(ApiResponse::new(200, json!({"AuthenticationToken": "abc"})))
            } else {
                Ok(ApiResponse::new(401, json!({"Message": "bad credentials"})))
            }
        });
        let session = session_over(&transport);

        session.ensure_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(13 * 60)).await;

        let err = session.ensure_token().await.unwrap_err();
        match err {
            ApiError::AuthenticationFailed(ref response) => {
                assert_eq!(response.status, 401);
                assert_eq!(response.body["Message"], "bad credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.response().map(|r| r.status), Some(401));
        assert_eq!(session.current_token().await.authentication_token, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sign_in_rejected_leaves_empty_token() {
        let transport = ScriptedTransport::new(|_| Ok(ApiResponse::new(401, Value::Null)));
        let session = session_over(&transport);

        assert!(matches!(
            session.ensure_token().await,
            Err(ApiError::AuthenticationFailed(_))
        ));
        let token = session.current_token().await;
        assert_eq!(token.authentication_token, "");
        assert_eq!(token.issued_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_propagates() {
        let transport = ScriptedTransport::new(|_| {
            Err(ApiError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))))
        });
        let session = session_over(&transport);

        let err = session.ensure_token().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_without_token_is_invalid_response() {
        let transport = ScriptedTransport::new(|_| Ok(ApiResponse::new(200, json!({}))));
        let session = session_over(&transport);

        assert!(matches!(
            session.ensure_token().await,
            Err(ApiError::InvalidResponse(_))
        ));
        assert_eq!(session.current_token().await.authentication_token, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_sign_in() {
        let transport = ScriptedTransport::slow_issuing(Duration::from_millis(200));
        let session = session_over(&transport);

        let tokens = join_all((0..5).map(|_| session.ensure_token())).await;

        assert_eq!(transport.calls(), 1);
        for token in tokens {
            assert_eq!(token.unwrap().authentication_token, "token-1");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_auto_refresh_is_idempotent() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        assert!(session.start_auto_refresh(None).unwrap());
        assert!(!session.start_auto_refresh(None).unwrap());
        assert!(session.is_auto_refreshing());

        advance_minutes(REFRESH_INTERVAL_MINUTES).await;
        assert_eq!(transport.calls(), 1);

        session.stop_auto_refresh();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_rotates_even_a_fresh_token() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.ensure_token().await.unwrap();
        advance_minutes(5).await;
        session.start_auto_refresh(None).unwrap();

        // Foreground sign-in at 13 minutes, tick at 17 clobbers it
        advance_minutes(8).await;
        assert_eq!(session.ensure_token().await.unwrap().authentication_token, "token-2");

        advance_minutes(4).await;
        assert_eq!(transport.calls(), 3);
        assert_eq!(session.current_token().await.authentication_token, "token-3");

        session.stop_auto_refresh();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_goes_to_callback() {
        let transport = ScriptedTransport::new(|n| {
            if n == 1 {
                Ok(ApiResponse::new(200, json!({"AuthenticationToken": "first"})))
            } else {
                Ok(ApiResponse::new(500, json!("boom")))
            }
        });
        let session = session_over(&transport);

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let on_error: RefreshErrorCallback = Arc::new(move |err: ApiError| {
            let status = err.response().map(|r| r.status);
            sink.lock().unwrap().push(status);
        });

        session.connect(true, Some(on_error)).await.unwrap();
        advance_minutes(REFRESH_INTERVAL_MINUTES).await;

        assert_eq!(*seen.lock().unwrap(), vec![Some(500)]);
        assert_eq!(session.current_token().await.authentication_token, "first");
        assert!(session.is_auto_refreshing());

        session.stop_persistent();
    }

    /// Collects every error handed to the refresh callback
    fn error_sink() -> (RefreshErrorCallback, Arc<StdMutex<Vec<ApiError>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let on_error: RefreshErrorCallback = Arc::new(move |err: ApiError| {
            sink.lock().unwrap().push(err);
        });
        (on_error, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_transport_failure_goes_to_callback() {
        let transport = ScriptedTransport::new(|n| {
            if n == 1 {
                Ok(ApiResponse::new(200, json!({"AuthenticationToken": "first"})))
            } else {
                Err(ApiError::Transport(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "timed out",
                ))))
            }
        });
        let session = session_over(&transport);
        let (on_error, seen) = error_sink();

        session.connect(true, Some(on_error)).await.unwrap();
        advance_minutes(REFRESH_INTERVAL_MINUTES).await;

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(matches!(seen[0], ApiError::Transport(_)));
        }
        assert_eq!(session.current_token().await.authentication_token, "first");
        assert!(session.is_auto_refreshing());

        session.stop_persistent();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_without_token_goes_to_callback() {
        let transport = ScriptedTransport::new(|n| {
            if n == 1 {
                Ok(ApiResponse::new(200, json!({"AuthenticationToken": "first"})))
            } else {
                Ok(ApiResponse::new(200, json!({"Message": "ok"})))
            }
        });
        let session = session_over(&transport);
        let (on_error, seen) = error_sink();

        session.connect(true, Some(on_error)).await.unwrap();
        advance_minutes(REFRESH_INTERVAL_MINUTES).await;

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(matches!(seen[0], ApiError::InvalidResponse(_)));
        }
        assert_eq!(session.current_token().await.authentication_token, "first");

        session.stop_persistent();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_ticks_every_interval() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.start_auto_refresh(None).unwrap();
        advance_minutes(3 * REFRESH_INTERVAL_MINUTES).await;

        assert_eq!(transport.calls(), 3);
        assert_eq!(session.current_token().await.authentication_token, "token-3");

        session.stop_auto_refresh();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.start_auto_refresh(None).unwrap();
        session.stop_auto_refresh();
        assert!(!session.is_auto_refreshing());

        advance_minutes(30).await;
        assert_eq!(transport.calls(), 0);

        // Stopping again is harmless
        session.stop_auto_refresh();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.start_auto_refresh(None).unwrap();
        session.stop_auto_refresh();
        assert!(session.start_auto_refresh(None).unwrap());

        advance_minutes(REFRESH_INTERVAL_MINUTES).await;
        assert_eq!(transport.calls(), 1);

        session.stop_auto_refresh();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_session_ends_refresh_task() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.start_auto_refresh(None).unwrap();
        drop(session);

        advance_minutes(30).await;
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_stop_without_task_outside_runtime() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);
        session.stop_auto_refresh();
        assert!(!session.is_auto_refreshing());
    }

    #[test]
    fn test_start_outside_runtime_is_error() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);
        assert!(matches!(
            session.start_auto_refresh(None),
            Err(ApiError::Runtime(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_keeps_fresh_token_and_uses_new_credentials() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        session.ensure_token().await.unwrap();

        let updated = SessionConfig::new(Credentials::new("d2", "u2", "p2"));
        session.configure(updated).await.unwrap();
        assert_eq!(session.config().await.credentials.username, "u2");

        assert_eq!(session.ensure_token().await.unwrap().authentication_token, "token-1");
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(13 * 60)).await;
        assert_eq!(session.ensure_token().await.unwrap().authentication_token, "token-2");
        assert_eq!(transport.last_request().body.unwrap()["Username"], "u2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_is_passthrough() {
        let transport = ScriptedTransport::issuing();
        let session = session_over(&transport);

        let response = session
            .sign_in(&Credentials::new("x", "y", "z"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(session.current_token().await.authentication_token, "");
    }

    #[test]
    fn test_authorization_header_uses_basic_scheme() {
        let token = Token {
            authentication_token: "abc".to_string(),
            issued_at: None,
        };
        assert_eq!(token.authorization_header(), "Basic abc");
    }

    #[test]
    fn test_token_debug_hides_value() {
        let token = Token {
            authentication_token: "secret-token".to_string(),
            issued_at: None,
        };
        let printed = format!("{:?}", token);
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("secret-token"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_token_is_never_fresh() {
        let cached = CachedToken {
            value: String::new(),
            issued_at: Some(Utc::now()),
            issued: Some(Instant::now()),
        };
        assert!(!cached.is_fresh());
        assert!(!CachedToken::default().is_fresh());
    }
}
