//! Asynchronous request dispatch over a `Transport`.
//!
//! # Design
//! `ApiClient` pairs the I/O-free `FlippedClient` with a `Transport` and a
//! tokio runtime handle. Every operation exists twice:
//!
//! - `login(..).await` resolves to `Result<Session, ApiError>`.
//! - `login_with(.., Callbacks)` returns immediately. Input is validated on
//!   the caller's thread; a validation failure runs `on_failure` before the
//!   method returns and nothing is spawned. Otherwise the exchange runs on
//!   the runtime and exactly one callback fires on a worker thread.
//!
//! The client holds no per-call state, so clones can be used from any number
//! of threads and concurrent calls never observe each other.

use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, debug_span, warn, Instrument};

use crate::client::{FlippedClient, Payload};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{
    AccountSummary, CollectAck, CollectRecord, CollectRequest, FriendRecord, ImageUpload,
    LoginRequest, Profile, ProfileSummary, ProfileUpdate, RegisterRequest, Session, UploadedImage,
};

type Parser<R> = fn(&FlippedClient, HttpResponse) -> Result<R, ApiError>;

type SuccessFn<R> = Box<dyn FnOnce(R) + Send>;
type FailureFn = Box<dyn FnOnce(ApiError) + Send>;

/// Success and failure continuations for one call.
///
/// `complete` consumes the value, so at most one arm can ever run. A
/// `Callbacks` dropped without completing (for example because the runtime
/// shut down with the task still queued) reports a transport failure, so the
/// caller always hears back exactly once.
pub struct Callbacks<R> {
    arms: Option<(SuccessFn<R>, FailureFn)>,
}

impl<R> Callbacks<R> {
    pub fn new(
        on_success: impl FnOnce(R) + Send + 'static,
        on_failure: impl FnOnce(ApiError) + Send + 'static,
    ) -> Self {
        Self {
            arms: Some((Box::new(on_success), Box::new(on_failure))),
        }
    }

    pub fn complete(mut self, result: Result<R, ApiError>) {
        if let Some((on_success, on_failure)) = self.arms.take() {
            match result {
                Ok(value) => on_success(value),
                Err(err) => on_failure(err),
            }
        }
    }
}

impl<R> Drop for Callbacks<R> {
    fn drop(&mut self) {
        if let Some((_, on_failure)) = self.arms.take() {
            on_failure(ApiError::connection("request abandoned before completion"));
        }
    }
}

/// Shared client handle. Construct once and clone freely.
pub struct ApiClient<T> {
    core: FlippedClient,
    transport: Arc<T>,
    runtime: Handle,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            transport: Arc::clone(&self.transport),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: Transport + 'static> ApiClient<T> {
    /// Callback-style operations spawn onto `runtime`.
    pub fn new(config: ClientConfig, transport: T, runtime: Handle) -> Self {
        Self {
            core: FlippedClient::new(config),
            transport: Arc::new(transport),
            runtime,
        }
    }

    pub fn core(&self) -> &FlippedClient {
        &self.core
    }

    /// Generic exchange. `is_refresh` marks pull-to-refresh calls in traces
    /// and has no other effect.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Payload,
        is_refresh: bool,
    ) -> Result<Value, ApiError> {
        let request = self.core.build_request(method, path, payload)?;
        self.execute(request, is_refresh, FlippedClient::parse_json).await
    }

    pub fn request_with(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Payload,
        is_refresh: bool,
        callbacks: Callbacks<Value>,
    ) {
        let request = self.core.build_request(method, path, payload);
        self.submit(request, is_refresh, FlippedClient::parse_json, callbacks);
    }

    pub async fn register(&self, input: &RegisterRequest) -> Result<AccountSummary, ApiError> {
        let request = self.core.build_register(input)?;
        self.execute(request, false, FlippedClient::parse_register).await
    }

    pub fn register_with(&self, input: &RegisterRequest, callbacks: Callbacks<AccountSummary>) {
        let request = self.core.build_register(input);
        self.submit(request, false, FlippedClient::parse_register, callbacks);
    }

    pub async fn login(&self, input: &LoginRequest) -> Result<Session, ApiError> {
        let request = self.core.build_login(input)?;
        self.execute(request, false, FlippedClient::parse_login).await
    }

    pub fn login_with(&self, input: &LoginRequest, callbacks: Callbacks<Session>) {
        let request = self.core.build_login(input);
        self.submit(request, false, FlippedClient::parse_login, callbacks);
    }

    pub async fn upload_image(&self, image: &ImageUpload) -> Result<UploadedImage, ApiError> {
        let request = self.core.build_upload_image(image)?;
        self.execute(request, false, FlippedClient::parse_upload_image).await
    }

    pub fn upload_image_with(&self, image: &ImageUpload, callbacks: Callbacks<UploadedImage>) {
        let request = self.core.build_upload_image(image);
        self.submit(request, false, FlippedClient::parse_upload_image, callbacks);
    }

    pub async fn fetch_profile(&self, token: &str, user_id: &str) -> Result<Profile, ApiError> {
        let request = self.core.build_fetch_profile(token, user_id)?;
        self.execute(request, false, FlippedClient::parse_fetch_profile).await
    }

    pub fn fetch_profile_with(&self, token: &str, user_id: &str, callbacks: Callbacks<Profile>) {
        let request = self.core.build_fetch_profile(token, user_id);
        self.submit(request, false, FlippedClient::parse_fetch_profile, callbacks);
    }

    pub async fn fetch_feed(
        &self,
        token: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ProfileSummary>, ApiError> {
        let request = self.core.build_fetch_feed(token, page, page_size)?;
        self.execute(request, false, FlippedClient::parse_fetch_feed).await
    }

    pub fn fetch_feed_with(
        &self,
        token: &str,
        page: u32,
        page_size: u32,
        callbacks: Callbacks<Vec<ProfileSummary>>,
    ) {
        let request = self.core.build_fetch_feed(token, page, page_size);
        self.submit(request, false, FlippedClient::parse_fetch_feed, callbacks);
    }

    pub async fn toggle_collect(
        &self,
        token: &str,
        input: &CollectRequest,
    ) -> Result<CollectAck, ApiError> {
        let request = self.core.build_toggle_collect(token, input)?;
        self.execute(request, false, FlippedClient::parse_toggle_collect).await
    }

    pub fn toggle_collect_with(
        &self,
        token: &str,
        input: &CollectRequest,
        callbacks: Callbacks<CollectAck>,
    ) {
        let request = self.core.build_toggle_collect(token, input);
        self.submit(request, false, FlippedClient::parse_toggle_collect, callbacks);
    }

    pub async fn fetch_own_profile(&self, token: &str) -> Result<Profile, ApiError> {
        let request = self.core.build_fetch_own_profile(token)?;
        self.execute(request, false, FlippedClient::parse_fetch_own_profile).await
    }

    pub fn fetch_own_profile_with(&self, token: &str, callbacks: Callbacks<Profile>) {
        let request = self.core.build_fetch_own_profile(token);
        self.submit(request, false, FlippedClient::parse_fetch_own_profile, callbacks);
    }

    pub async fn save_profile(&self, token: &str, input: &ProfileUpdate) -> Result<Profile, ApiError> {
        let request = self.core.build_save_profile(token, input)?;
        self.execute(request, false, FlippedClient::parse_save_profile).await
    }

    pub fn save_profile_with(&self, token: &str, input: &ProfileUpdate, callbacks: Callbacks<Profile>) {
        let request = self.core.build_save_profile(token, input);
        self.submit(request, false, FlippedClient::parse_save_profile, callbacks);
    }

    pub async fn fetch_friends(&self, token: &str) -> Result<Vec<FriendRecord>, ApiError> {
        let request = self.core.build_fetch_friends(token)?;
        self.execute(request, false, FlippedClient::parse_fetch_friends).await
    }

    pub fn fetch_friends_with(&self, token: &str, callbacks: Callbacks<Vec<FriendRecord>>) {
        let request = self.core.build_fetch_friends(token);
        self.submit(request, false, FlippedClient::parse_fetch_friends, callbacks);
    }

    pub async fn fetch_favorites(&self, token: &str) -> Result<Vec<CollectRecord>, ApiError> {
        let request = self.core.build_fetch_favorites(token)?;
        self.execute(request, false, FlippedClient::parse_fetch_favorites).await
    }

    pub fn fetch_favorites_with(&self, token: &str, callbacks: Callbacks<Vec<CollectRecord>>) {
        let request = self.core.build_fetch_favorites(token);
        self.submit(request, false, FlippedClient::parse_fetch_favorites, callbacks);
    }

    async fn execute<R>(
        &self,
        request: HttpRequest,
        is_refresh: bool,
        parse: Parser<R>,
    ) -> Result<R, ApiError> {
        let span = debug_span!(
            "request",
            method = request.method.as_str(),
            url = %request.url,
            is_refresh,
        );
        async move {
            debug!("sending");
            let result = self
                .transport
                .execute(request)
                .await
                .and_then(|response| parse(&self.core, response));
            match &result {
                Ok(_) => debug!("completed"),
                Err(err) => warn!(error = %err, "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn submit<R: Send + 'static>(
        &self,
        request: Result<HttpRequest, ApiError>,
        is_refresh: bool,
        parse: Parser<R>,
        callbacks: Callbacks<R>,
    ) {
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "rejected before sending");
                callbacks.complete(Err(err));
                return;
            }
        };
        let client = self.clone();
        self.runtime.spawn(async move {
            let result = client.execute(request, is_refresh, parse).await;
            callbacks.complete(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn complete_runs_only_the_success_arm() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let (s, f) = (hits.clone(), hits.clone());
        let callbacks = Callbacks::new(
            move |v: u32| s.lock().unwrap().push(format!("ok {v}")),
            move |e: ApiError| f.lock().unwrap().push(format!("err {e}")),
        );
        callbacks.complete(Ok(7));
        assert_eq!(*hits.lock().unwrap(), vec!["ok 7".to_string()]);
    }

    #[test]
    fn complete_runs_only_the_failure_arm() {
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let (s, f) = (successes.clone(), failures.clone());
        let callbacks = Callbacks::new(
            move |_: ()| {
                s.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
        );
        callbacks.complete(Err(ApiError::validation("email")));
        assert_eq!(successes.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_callbacks_report_failure_once() {
        let failures = Arc::new(AtomicUsize::new(0));
        let f = failures.clone();
        let callbacks = Callbacks::new(
            |_: ()| panic!("success must not run"),
            move |err| {
                assert_eq!(err.status(), None);
                f.fetch_add(1, Ordering::SeqCst);
            },
        );
        drop(callbacks);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }
}
