//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Results never leave Rust as owned heap data. Success payloads are handed
//! to `on_success` as a JSON C string and failures to `on_failure` as a
//! borrowed `FfiError`; both pointers die when the callback returns, so the
//! C side has nothing to free.

use std::ffi::CString;
use std::os::raw::{c_char, c_void};

use flipped_core::{ApiClient, ApiError, Callbacks, ErrorKind, ReqwestTransport};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::warn;

/// Opaque handle. Owns the runtime that callback-style calls run on.
pub struct FfiFlippedClient {
    pub(crate) runtime: Runtime,
    pub(crate) api: ApiClient<ReqwestTransport>,
}

/// Failure category reported in `FfiError::kind`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorKind {
    Validation = 1,
    Transport = 2,
    Decode = 3,
    NullArg = 4,
    Panic = 5,
}

impl From<ErrorKind> for FfiErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => FfiErrorKind::Validation,
            ErrorKind::Transport => FfiErrorKind::Transport,
            ErrorKind::Decode => FfiErrorKind::Decode,
        }
    }
}

/// Failure details, borrowed for the duration of `on_failure`.
///
/// `http_status` is 0 when no response was received. `field` is null unless
/// the kind is `Validation` or `NullArg`; `code` is null unless the server
/// sent one.
#[repr(C)]
pub struct FfiError {
    pub kind: FfiErrorKind,
    pub http_status: u16,
    pub field: *const c_char,
    pub code: *const c_char,
    pub message: *const c_char,
}

pub type FfiSuccessFn = extern "C" fn(context: *mut c_void, json: *const c_char);
pub type FfiFailureFn = extern "C" fn(context: *mut c_void, error: *const FfiError);

/// Completion pair for one call. Exactly one function is invoked, exactly
/// once, either before the FFI call returns (local failures) or later on a
/// runtime worker thread. `context` is passed through untouched and must be
/// usable from any thread.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiCallbacks {
    pub context: *mut c_void,
    pub on_success: Option<FfiSuccessFn>,
    pub on_failure: Option<FfiFailureFn>,
}

// The caller promises `context` may be used from a worker thread.
unsafe impl Send for FfiCallbacks {}

/// Lossy conversion; interior NULs are dropped rather than failing.
pub(crate) fn c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

impl FfiCallbacks {
    pub(crate) fn succeed(&self, json: &str) {
        let json = c_string(json);
        if let Some(on_success) = self.on_success {
            on_success(self.context, json.as_ptr());
        }
    }

    pub(crate) fn fail(&self, kind: FfiErrorKind, http_status: u16, field: Option<&str>, code: Option<&str>, message: &str) {
        let field = field.map(c_string);
        let code = code.map(c_string);
        let message = c_string(message);
        let error = FfiError {
            kind,
            http_status,
            field: field.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
            code: code.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
            message: message.as_ptr(),
        };
        if let Some(on_failure) = self.on_failure {
            on_failure(self.context, &error);
        }
    }

    pub(crate) fn fail_with(&self, err: &ApiError) {
        let field = match err {
            ApiError::Validation { field } => Some(field.as_str()),
            _ => None,
        };
        let code = match err {
            ApiError::Transport { code, .. } => code.as_deref(),
            _ => None,
        };
        self.fail(
            err.kind().into(),
            err.status().unwrap_or(0),
            field,
            code,
            &err.to_string(),
        );
    }

    pub(crate) fn null_arg(&self, name: &str) {
        self.fail(FfiErrorKind::NullArg, 0, Some(name), None, &format!("{name} is null"));
    }

    pub(crate) fn panicked(&self) {
        warn!("panic caught at FFI boundary");
        self.fail(FfiErrorKind::Panic, 0, None, None, "internal panic");
    }

    /// Adapt to core callbacks that serialize the success value to JSON.
    pub(crate) fn into_core<R: Serialize + Send + 'static>(self) -> Callbacks<R> {
        let on_failure = self;
        Callbacks::new(
            move |value: R| match serde_json::to_string(&value) {
                Ok(json) => self.succeed(&json),
                Err(e) => self.fail_with(&ApiError::Decode(e.to_string())),
            },
            move |err: ApiError| on_failure.fail_with(&err),
        )
    }
}
