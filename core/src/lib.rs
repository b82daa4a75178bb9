//! API client core for the Flipped dating app.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern), and layers an asynchronous
//! dispatcher on top that runs the exchange over a pluggable `Transport` and
//! reports back through a future or a success/failure callback pair.
//!
//! # Design
//! - `FlippedClient` is stateless: it holds only a `ClientConfig`.
//! - Each domain operation is split into `build_*` (validates input, produces
//!   a request) and `parse_*` (consumes a response), so the I/O boundary is
//!   explicit and local validation never reaches the network.
//! - `ApiClient` owns the transport and a runtime handle; callback-style
//!   calls fire exactly one of their two arms, exactly once.
//! - `validate` holds the pure form checks used by the sign-up and login
//!   screens.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::{FlippedClient, Payload};
pub use config::{ClientConfig, ConfigError, Routes};
pub use dispatch::{ApiClient, Callbacks};
pub use error::{ApiError, ErrorKind};
pub use http::{FilePart, HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AccountSummary, CollectAck, CollectAction, CollectRecord, CollectRequest, FriendRecord,
    ImageUpload, LoginRequest, Profile, ProfileSummary, ProfileUpdate, RegisterRequest, Session,
    UploadedImage, UserType,
};
pub use validate::{is_valid_email, is_valid_name, is_valid_password, PasswordPolicy};
