//! C-ABI wrapper around `flipped-core`.
//!
//! # Overview
//! Exposes every Flipped API operation through `extern "C"` functions so a
//! mobile or desktop host can drive the client without linking Rust's async
//! runtime or serde. The handle owns a multi-thread tokio runtime; each
//! operation returns immediately and reports through an `FfiCallbacks` pair.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary; a caught panic is reported as
//!   `FfiErrorKind::Panic`.
//! - Null pointers are reported through `on_failure` as `NullArg` with the
//!   argument name in `field`. Strings that are not UTF-8 are reported as
//!   validation failures of that argument.
//! - Local validation failures fire `on_failure` before the call returns.
//!   Everything else completes later on a runtime worker thread.
//! - Freeing the handle shuts the runtime down; calls still in flight fire
//!   `on_failure` as they are dropped, all before `flipped_client_free`
//!   returns. After that no callback touches any `context`.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use flipped_core::{
    ApiClient, ApiError, ClientConfig, CollectAction, CollectRequest, ImageUpload, LoginRequest,
    PasswordPolicy, ProfileUpdate, RegisterRequest, ReqwestTransport, UserType,
};
use tracing::debug;

use types::*;

enum ArgError {
    Null(&'static str),
    Invalid(&'static str),
}

/// Borrow a required C string argument.
unsafe fn arg_str<'a>(ptr: *const c_char, name: &'static str) -> Result<&'a str, ArgError> {
    if ptr.is_null() {
        return Err(ArgError::Null(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| ArgError::Invalid(name))
}

/// Borrow an optional C string argument; null means absent.
unsafe fn opt_str<'a>(ptr: *const c_char, name: &'static str) -> Result<Option<&'a str>, ArgError> {
    if ptr.is_null() {
        Ok(None)
    } else {
        unsafe { arg_str(ptr, name) }.map(Some)
    }
}

unsafe fn client_ref<'a>(client: *const FfiFlippedClient) -> Result<&'a FfiFlippedClient, ArgError> {
    if client.is_null() {
        Err(ArgError::Null("client"))
    } else {
        Ok(unsafe { &*client })
    }
}

fn user_type_arg(raw: u8) -> Result<UserType, ArgError> {
    UserType::try_from(raw).map_err(|_| ArgError::Invalid("user_type"))
}

/// Run one operation body, routing argument errors and panics to
/// `on_failure`.
fn call(callbacks: FfiCallbacks, body: impl FnOnce() -> Result<(), ArgError>) {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => {}
        Ok(Err(ArgError::Null(name))) => callbacks.null_arg(name),
        Ok(Err(ArgError::Invalid(name))) => callbacks.fail_with(&ApiError::validation(name)),
        Err(_) => callbacks.panicked(),
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`. `timeout_secs` of 0 keeps the
/// default request timeout.
///
/// Returns null if `base_url` is null or not UTF-8, or if the runtime or
/// HTTP client cannot be built. Free with `flipped_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_client_new(base_url: *const c_char, timeout_secs: u64) -> *mut FfiFlippedClient {
    catch_unwind(|| {
        let Ok(url) = (unsafe { arg_str(base_url, "base_url") }) else {
            return std::ptr::null_mut();
        };
        let mut config = ClientConfig::new(url);
        if timeout_secs > 0 {
            config = config.with_timeout_secs(timeout_secs);
        }
        let Ok(runtime) = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("flipped-worker")
            .build()
        else {
            return std::ptr::null_mut();
        };
        let Ok(transport) = ReqwestTransport::new(&config) else {
            return std::ptr::null_mut();
        };
        debug!(base_url = %config.base_url, "client created");
        let api = ApiClient::new(config, transport, runtime.handle().clone());
        Box::into_raw(Box::new(FfiFlippedClient { runtime, api }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `flipped_client_new`. Safe to call with null.
/// Must not be called from inside a callback.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_client_free(client: *mut FfiFlippedClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let client = unsafe { Box::from_raw(client) };
            let FfiFlippedClient { runtime, api } = *client;
            drop(api);
            // Blocks until every worker has stopped, so abandoned calls have
            // fired `on_failure` by the time this returns.
            drop(runtime);
        }));
    }
}

// ---------------------------------------------------------------------------
// Form validators
// ---------------------------------------------------------------------------

/// False for null or non-UTF-8 input.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_is_valid_name(name: *const c_char) -> bool {
    catch_unwind(|| {
        unsafe { arg_str(name, "name") }.is_ok_and(flipped_core::is_valid_name)
    })
    .unwrap_or(false)
}

#[unsafe(no_mangle)]
pub extern "C" fn flipped_is_valid_email(email: *const c_char) -> bool {
    catch_unwind(|| {
        unsafe { arg_str(email, "email") }.is_ok_and(flipped_core::is_valid_email)
    })
    .unwrap_or(false)
}

/// Checks against the client's password policy, or the default policy when
/// `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_is_valid_password(client: *const FfiFlippedClient, password: *const c_char) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Ok(password) = (unsafe { arg_str(password, "password") }) else {
            return false;
        };
        match unsafe { client_ref(client) } {
            Ok(client) => client.api.core().config().password_policy.is_satisfied_by(password),
            Err(_) => PasswordPolicy::default().is_satisfied_by(password),
        }
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Register an account. `photo` may be null. Success JSON is an account
/// summary.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_register(
    client: *const FfiFlippedClient,
    user_type: u8,
    name: *const c_char,
    email: *const c_char,
    photo: *const c_char,
    password: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let input = RegisterRequest {
            user_type: user_type_arg(user_type)?,
            name: unsafe { arg_str(name, "name") }?.to_string(),
            email: unsafe { arg_str(email, "email") }?.to_string(),
            photo: unsafe { opt_str(photo, "photo") }?.map(str::to_string),
            password: unsafe { arg_str(password, "password") }?.to_string(),
        };
        client.api.register_with(&input, callbacks.into_core());
        Ok(())
    })
}

/// Log in. Success JSON carries `token` and `user_id`.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_login(
    client: *const FfiFlippedClient,
    user_type: u8,
    email: *const c_char,
    password: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let input = LoginRequest {
            user_type: user_type_arg(user_type)?,
            email: unsafe { arg_str(email, "email") }?.to_string(),
            password: unsafe { arg_str(password, "password") }?.to_string(),
        };
        client.api.login_with(&input, callbacks.into_core());
        Ok(())
    })
}

/// Upload `len` bytes at `data` as one image. `content_type` defaults to
/// JPEG and `file_name` is generated when null. Success JSON carries `url`.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_upload_image(
    client: *const FfiFlippedClient,
    data: *const u8,
    len: usize,
    content_type: *const c_char,
    file_name: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let bytes = if len == 0 {
            Vec::new()
        } else if data.is_null() {
            return Err(ArgError::Null("data"));
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
        };
        let mut image = ImageUpload::jpeg(bytes);
        if let Some(content_type) = unsafe { opt_str(content_type, "content_type") }? {
            image.content_type = content_type.to_string();
        }
        image.file_name = unsafe { opt_str(file_name, "file_name") }?.map(str::to_string);
        client.api.upload_image_with(&image, callbacks.into_core());
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn flipped_fetch_profile(
    client: *const FfiFlippedClient,
    token: *const c_char,
    user_id: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        let user_id = unsafe { arg_str(user_id, "user_id") }?;
        client.api.fetch_profile_with(token, user_id, callbacks.into_core());
        Ok(())
    })
}

/// Success JSON is an array of profile summaries in server order.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_fetch_feed(
    client: *const FfiFlippedClient,
    token: *const c_char,
    page: u32,
    page_size: u32,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        client.api.fetch_feed_with(token, page, page_size, callbacks.into_core());
        Ok(())
    })
}

/// Collect `user_id` when `collect` is true, cancel the collect otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn flipped_toggle_collect(
    client: *const FfiFlippedClient,
    token: *const c_char,
    user_id: *const c_char,
    collect: bool,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        let input = CollectRequest {
            user_id: unsafe { arg_str(user_id, "user_id") }?.to_string(),
            action: if collect {
                CollectAction::Collect
            } else {
                CollectAction::Cancel
            },
        };
        client.api.toggle_collect_with(token, &input, callbacks.into_core());
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn flipped_fetch_own_profile(
    client: *const FfiFlippedClient,
    token: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        client.api.fetch_own_profile_with(token, callbacks.into_core());
        Ok(())
    })
}

/// `photos` points at `photos_len` C strings, primary photo first.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn flipped_save_profile(
    client: *const FfiFlippedClient,
    token: *const c_char,
    photos: *const *const c_char,
    photos_len: usize,
    name: *const c_char,
    age: u32,
    work: *const c_char,
    bio: *const c_char,
    age_min: u32,
    age_max: u32,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        let photo_ptrs: &[*const c_char] = if photos_len == 0 {
            &[]
        } else if photos.is_null() {
            return Err(ArgError::Null("photos"));
        } else {
            unsafe { std::slice::from_raw_parts(photos, photos_len) }
        };
        let photos = photo_ptrs
            .iter()
            .map(|&p| unsafe { arg_str(p, "photos") }.map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        let input = ProfileUpdate {
            photos,
            name: unsafe { arg_str(name, "name") }?.to_string(),
            age,
            work: unsafe { arg_str(work, "work") }?.to_string(),
            bio: unsafe { arg_str(bio, "bio") }?.to_string(),
            age_min,
            age_max,
        };
        client.api.save_profile_with(token, &input, callbacks.into_core());
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn flipped_fetch_friends(
    client: *const FfiFlippedClient,
    token: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        client.api.fetch_friends_with(token, callbacks.into_core());
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn flipped_fetch_favorites(
    client: *const FfiFlippedClient,
    token: *const c_char,
    callbacks: FfiCallbacks,
) {
    call(callbacks, || {
        let client = unsafe { client_ref(client) }?;
        let token = unsafe { arg_str(token, "token") }?;
        client.api.fetch_favorites_with(token, callbacks.into_core());
        Ok(())
    })
}
