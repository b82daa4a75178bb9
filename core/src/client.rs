//! Stateless HTTP request builder and response parser for the Flipped API.
//!
//! # Design
//! `FlippedClient` holds only a `ClientConfig` and carries no mutable state
//! between calls. Each domain operation is split into a `build_*` method that
//! validates its input and produces an `HttpRequest`, and a `parse_*` method
//! that consumes an `HttpResponse`. A validation failure in `build_*` means no
//! request exists, so nothing can reach the network.
//!
//! Successful bodies may arrive wrapped as `{"message": .., "data": ..}`;
//! `data` is unwrapped before decoding when the wrapper carries nothing
//! else (`code` aside).

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{FilePart, HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
use crate::types::{
    AccountSummary, CollectAck, CollectRecord, CollectRequest, FriendRecord, ImageUpload,
    LoginRequest, Profile, ProfileSummary, ProfileUpdate, RegisterRequest, Session, UploadedImage,
};
use crate::validate::{require_non_empty, require_present};

/// Form field the server reads the uploaded image from.
const UPLOAD_FIELD: &str = "file";

/// Primary photo plus three more.
pub const MAX_PHOTOS: usize = 4;

/// Parameters of a generic request.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Query string for GET, JSON body for POST, text parts for UPLOAD.
    Fields(Map<String, Value>),
    /// Image file for UPLOAD.
    Image(ImageUpload),
}

impl Payload {
    pub fn empty() -> Self {
        Payload::Fields(Map::new())
    }
}

/// Synchronous, stateless client for the Flipped API.
#[derive(Debug, Clone)]
pub struct FlippedClient {
    config: ClientConfig,
}

impl FlippedClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a request against an arbitrary path. Authenticated routes should
    /// go through the domain builders, which attach the token.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Payload,
    ) -> Result<HttpRequest, ApiError> {
        self.build(method, path, None, payload)
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        require_non_empty("name", &input.name)?;
        require_non_empty("email", &input.email)?;
        require_non_empty("password", &input.password)?;
        if let Some(photo) = &input.photo {
            require_non_empty("photo", photo)?;
        }
        let fields = to_fields(input)?;
        self.build(HttpMethod::Post, &self.config.routes.register, None, fields)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        require_non_empty("email", &input.email)?;
        require_non_empty("password", &input.password)?;
        let fields = to_fields(input)?;
        self.build(HttpMethod::Post, &self.config.routes.login, None, fields)
    }

    pub fn build_upload_image(&self, image: &ImageUpload) -> Result<HttpRequest, ApiError> {
        self.build(
            HttpMethod::Upload,
            &self.config.routes.upload,
            None,
            Payload::Image(image.clone()),
        )
    }

    pub fn build_fetch_profile(&self, token: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        require_non_empty("user_id", user_id)?;
        let path = self
            .config
            .routes
            .profile
            .replace("{user_id}", &urlencoding::encode(user_id));
        self.build(HttpMethod::Get, &path, Some(token), Payload::empty())
    }

    pub fn build_fetch_feed(
        &self,
        token: &str,
        page: u32,
        page_size: u32,
    ) -> Result<HttpRequest, ApiError> {
        if page_size == 0 {
            return Err(ApiError::validation("page_size"));
        }
        let mut fields = Map::new();
        fields.insert("page".to_string(), Value::from(page));
        fields.insert("page_size".to_string(), Value::from(page_size));
        self.build(
            HttpMethod::Get,
            &self.config.routes.feed,
            Some(token),
            Payload::Fields(fields),
        )
    }

    pub fn build_toggle_collect(
        &self,
        token: &str,
        input: &CollectRequest,
    ) -> Result<HttpRequest, ApiError> {
        require_non_empty("user_id", &input.user_id)?;
        let fields = to_fields(input)?;
        self.build(HttpMethod::Post, &self.config.routes.collect, Some(token), fields)
    }

    pub fn build_fetch_own_profile(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.build(HttpMethod::Get, &self.config.routes.me, Some(token), Payload::empty())
    }

    pub fn build_save_profile(
        &self,
        token: &str,
        input: &ProfileUpdate,
    ) -> Result<HttpRequest, ApiError> {
        if input.photos.is_empty() || input.photos.len() > MAX_PHOTOS {
            return Err(ApiError::validation("photos"));
        }
        for photo in &input.photos {
            require_non_empty("photos", photo)?;
        }
        require_non_empty("name", &input.name)?;
        if input.age_min > input.age_max {
            return Err(ApiError::validation("age_range"));
        }
        let fields = to_fields(input)?;
        self.build(
            HttpMethod::Post,
            &self.config.routes.save_profile,
            Some(token),
            fields,
        )
    }

    pub fn build_fetch_friends(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.build(HttpMethod::Get, &self.config.routes.friends, Some(token), Payload::empty())
    }

    pub fn build_fetch_favorites(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.build(
            HttpMethod::Get,
            &self.config.routes.favorites,
            Some(token),
            Payload::empty(),
        )
    }

    /// Parse any successful response into JSON. An empty 2xx body is `null`.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Value, ApiError> {
        if response.is_success() && response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        decode(response)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<AccountSummary, ApiError> {
        decode(response)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<Session, ApiError> {
        let session: Session = decode(response)?;
        if session.token.is_empty() {
            return Err(ApiError::Decode("login response carried an empty token".to_string()));
        }
        Ok(session)
    }

    pub fn parse_upload_image(&self, response: HttpResponse) -> Result<UploadedImage, ApiError> {
        decode(response)
    }

    pub fn parse_fetch_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        decode(response)
    }

    /// Feed entries are returned in server order.
    pub fn parse_fetch_feed(&self, response: HttpResponse) -> Result<Vec<ProfileSummary>, ApiError> {
        decode(response)
    }

    pub fn parse_toggle_collect(&self, response: HttpResponse) -> Result<CollectAck, ApiError> {
        decode(response)
    }

    pub fn parse_fetch_own_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        decode(response)
    }

    pub fn parse_save_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        decode(response)
    }

    pub fn parse_fetch_friends(&self, response: HttpResponse) -> Result<Vec<FriendRecord>, ApiError> {
        decode(response)
    }

    pub fn parse_fetch_favorites(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<CollectRecord>, ApiError> {
        decode(response)
    }

    fn build(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&str>,
        payload: Payload,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = self.config.default_headers.clone();
        if let Some(token) = token {
            require_present("token", token)?;
            headers.push((self.config.token_header.clone(), token.to_string()));
        }
        let mut url = self.url(path);

        let body = match (method, payload) {
            (HttpMethod::Get, Payload::Fields(fields)) => {
                let query = query_string(&fields);
                if !query.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(&query);
                }
                HttpBody::Empty
            }
            (HttpMethod::Post, Payload::Fields(fields)) => {
                let body = serde_json::to_string(&fields)
                    .map_err(|_| ApiError::validation("payload"))?;
                headers.push(("content-type".to_string(), "application/json".to_string()));
                HttpBody::Json(body)
            }
            (HttpMethod::Upload, Payload::Fields(fields)) => HttpBody::Multipart(MultipartForm {
                fields: form_fields(&fields),
                file: None,
            }),
            (HttpMethod::Upload, Payload::Image(image)) => {
                HttpBody::Multipart(MultipartForm {
                    fields: Vec::new(),
                    file: Some(file_part(image)?),
                })
            }
            (HttpMethod::Get | HttpMethod::Post, Payload::Image(_)) => {
                return Err(ApiError::validation("payload"));
            }
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.config.base_url)
        } else {
            format!("{}/{path}", self.config.base_url)
        }
    }
}

fn to_fields<T: Serialize>(input: &T) -> Result<Payload, ApiError> {
    match serde_json::to_value(input) {
        Ok(Value::Object(map)) => Ok(Payload::Fields(map)),
        _ => Err(ApiError::validation("payload")),
    }
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn query_string(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .filter_map(|(k, v)| field_text(v).map(|v| (k, v)))
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_fields(fields: &Map<String, Value>) -> Vec<(String, String)> {
    fields
        .iter()
        .filter_map(|(k, v)| field_text(v).map(|v| (k.clone(), v)))
        .collect()
}

fn file_part(image: ImageUpload) -> Result<FilePart, ApiError> {
    if image.bytes.is_empty() {
        return Err(ApiError::validation("image"));
    }
    require_non_empty("content_type", &image.content_type)?;
    let file_name = match image.file_name {
        Some(name) => {
            require_non_empty("file_name", &name)?;
            name
        }
        None => format!("{}.{}", Uuid::new_v4(), extension_for(&image.content_type)),
    };
    Ok(FilePart {
        field_name: UPLOAD_FIELD.to_string(),
        file_name,
        content_type: image.content_type,
        bytes: image.bytes,
    })
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        _ => "jpg",
    }
}

/// Map a response to `T`: non-2xx becomes `Transport`, anything unreadable
/// becomes `Decode`.
fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(ApiError::from_status(response.status, &response.body));
    }
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    serde_json::from_value(unwrap_envelope(value)).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Keys the server's `{message, data}` wrapper may carry. An object with any
/// other key is a payload in its own right and is returned whole.
const ENVELOPE_KEYS: [&str; 3] = ["message", "data", "code"];

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("data")
                && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str())) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollectAction, UserType};

    fn client() -> FlippedClient {
        FlippedClient::new(ClientConfig::new("http://localhost:8081"))
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn json_body(req: &HttpRequest) -> Value {
        match &req.body {
            HttpBody::Json(body) => serde_json::from_str(body).unwrap(),
            other => panic!("expected json body, got {other:?}"),
        }
    }

    fn login_input(email: &str) -> LoginRequest {
        LoginRequest {
            user_type: UserType::Standard,
            email: email.to_string(),
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn build_login_produces_json_post() {
        let req = client().build_login(&login_input("ann@example.com")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8081/login");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert!(req.header("token").is_none());
        let body = json_body(&req);
        assert_eq!(body["email"], "ann@example.com");
        assert_eq!(body["password"], "secret1");
        assert_eq!(body["user_type"], 0);
    }

    #[test]
    fn build_login_rejects_empty_email() {
        let err = client().build_login(&login_input("")).unwrap_err();
        assert_eq!(err, ApiError::validation("email"));
    }

    #[test]
    fn build_register_includes_photo() {
        let input = RegisterRequest {
            user_type: UserType::Premium,
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            photo: Some("/images/a.jpg".to_string()),
            password: "secret1".to_string(),
        };
        let req = client().build_register(&input).unwrap();
        assert_eq!(req.url, "http://localhost:8081/register");
        let body = json_body(&req);
        assert_eq!(body["photo"], "/images/a.jpg");
        assert_eq!(body["name"], "Ann");
        assert_eq!(body["user_type"], 1);
    }

    #[test]
    fn build_register_rejects_blank_name() {
        let input = RegisterRequest {
            user_type: UserType::Standard,
            name: "  ".to_string(),
            email: "ann@example.com".to_string(),
            photo: None,
            password: "secret1".to_string(),
        };
        assert_eq!(client().build_register(&input).unwrap_err(), ApiError::validation("name"));
    }

    #[test]
    fn build_fetch_feed_puts_paging_in_query() {
        let req = client().build_fetch_feed("tok", 2, 10).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8081/feed?page=2&page_size=10");
        assert_eq!(req.header("token"), Some("tok"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn build_fetch_feed_rejects_zero_page_size() {
        let err = client().build_fetch_feed("tok", 0, 0).unwrap_err();
        assert_eq!(err, ApiError::validation("page_size"));
    }

    #[test]
    fn authenticated_builders_reject_empty_token() {
        let c = client();
        assert_eq!(c.build_fetch_own_profile("").unwrap_err(), ApiError::validation("token"));
        assert_eq!(c.build_fetch_friends("").unwrap_err(), ApiError::validation("token"));
        assert_eq!(c.build_fetch_favorites("").unwrap_err(), ApiError::validation("token"));
        assert_eq!(c.build_fetch_feed("", 0, 10).unwrap_err(), ApiError::validation("token"));
    }

    #[test]
    fn token_is_forwarded_verbatim() {
        let req = client().build_fetch_friends(" t 1 ").unwrap();
        assert_eq!(req.header("token"), Some(" t 1 "));
    }

    #[test]
    fn build_fetch_profile_encodes_user_id() {
        let req = client().build_fetch_profile("tok", "a b/c").unwrap();
        assert_eq!(req.url, "http://localhost:8081/profile/a%20b%2Fc");
    }

    #[test]
    fn build_fetch_profile_rejects_empty_user_id() {
        let err = client().build_fetch_profile("tok", "").unwrap_err();
        assert_eq!(err, ApiError::validation("user_id"));
    }

    #[test]
    fn build_toggle_collect_sends_type() {
        let input = CollectRequest {
            user_id: "u2".to_string(),
            action: CollectAction::Collect,
        };
        let req = client().build_toggle_collect("tok", &input).unwrap();
        assert_eq!(req.url, "http://localhost:8081/collect");
        let body = json_body(&req);
        assert_eq!(body, serde_json::json!({"user_id": "u2", "type": "collect"}));
    }

    fn update(photos: &[&str], age_min: u32, age_max: u32) -> ProfileUpdate {
        ProfileUpdate {
            photos: photos.iter().map(|p| p.to_string()).collect(),
            name: "Ann".to_string(),
            age: 25,
            work: "Nurse".to_string(),
            bio: "Hi".to_string(),
            age_min,
            age_max,
        }
    }

    #[test]
    fn build_save_profile_sends_all_fields() {
        let req = client()
            .build_save_profile("tok", &update(&["/p0", "/p1"], 20, 30))
            .unwrap();
        assert_eq!(req.url, "http://localhost:8081/profile");
        let body = json_body(&req);
        assert_eq!(body["photos"], serde_json::json!(["/p0", "/p1"]));
        assert_eq!(body["age_min"], 20);
        assert_eq!(body["age_max"], 30);
        assert_eq!(body["work"], "Nurse");
    }

    #[test]
    fn build_save_profile_validates_photos_and_range() {
        let c = client();
        assert_eq!(
            c.build_save_profile("tok", &update(&[], 20, 30)).unwrap_err(),
            ApiError::validation("photos")
        );
        assert_eq!(
            c.build_save_profile("tok", &update(&["a", "b", "c", "d", "e"], 20, 30))
                .unwrap_err(),
            ApiError::validation("photos")
        );
        assert_eq!(
            c.build_save_profile("tok", &update(&["a", ""], 20, 30)).unwrap_err(),
            ApiError::validation("photos")
        );
        assert_eq!(
            c.build_save_profile("tok", &update(&["a"], 40, 30)).unwrap_err(),
            ApiError::validation("age_range")
        );
    }

    #[test]
    fn build_upload_image_is_multipart() {
        let req = client()
            .build_upload_image(&ImageUpload::jpeg(vec![0xff, 0xd8, 0xff]))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Upload);
        assert_eq!(req.method.as_str(), "POST");
        assert_eq!(req.url, "http://localhost:8081/upload");
        assert!(req.header("content-type").is_none());
        match req.body {
            HttpBody::Multipart(form) => {
                let file = form.file.unwrap();
                assert_eq!(file.field_name, "file");
                assert_eq!(file.content_type, "image/jpeg");
                assert!(file.file_name.ends_with(".jpg"));
                assert_eq!(file.bytes, vec![0xff, 0xd8, 0xff]);
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn build_upload_image_rejects_empty_bytes() {
        let err = client().build_upload_image(&ImageUpload::jpeg(Vec::new())).unwrap_err();
        assert_eq!(err, ApiError::validation("image"));
    }

    #[test]
    fn build_request_rejects_image_on_get() {
        let err = client()
            .build_request(HttpMethod::Get, "/x", Payload::Image(ImageUpload::jpeg(vec![1])))
            .unwrap_err();
        assert_eq!(err, ApiError::validation("payload"));
    }

    #[test]
    fn build_request_upload_with_fields_has_text_parts() {
        let mut fields = Map::new();
        fields.insert("album".to_string(), Value::from("main"));
        fields.insert("skip".to_string(), Value::Null);
        let req = client()
            .build_request(HttpMethod::Upload, "upload", Payload::Fields(fields))
            .unwrap();
        assert_eq!(req.url, "http://localhost:8081/upload");
        match req.body {
            HttpBody::Multipart(form) => {
                assert_eq!(form.fields, vec![("album".to_string(), "main".to_string())]);
                assert!(form.file.is_none());
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn build_request_appends_to_existing_query() {
        let mut fields = Map::new();
        fields.insert("q".to_string(), Value::from("a&b"));
        let req = client()
            .build_request(HttpMethod::Get, "/search?v=1", Payload::Fields(fields))
            .unwrap();
        assert_eq!(req.url, "http://localhost:8081/search?v=1&q=a%26b");
    }

    #[test]
    fn routes_follow_config() {
        let mut config = ClientConfig::new("http://h");
        config.routes.feed = "/recommendUser".to_string();
        config.token_header = "x-token".to_string();
        let req = FlippedClient::new(config).build_fetch_feed("tok", 0, 5).unwrap();
        assert_eq!(req.url, "http://h/recommendUser?page=0&page_size=5");
        assert_eq!(req.header("x-token"), Some("tok"));
    }

    #[test]
    fn parse_fetch_feed_preserves_order() {
        let feed = client()
            .parse_fetch_feed(ok(r#"[{"user_id":"b"},{"user_id":"a"},{"user_id":"c"}]"#))
            .unwrap();
        let ids: Vec<_> = feed.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn parse_unwraps_envelope() {
        let session = client()
            .parse_login(ok(r#"{"message":"ok","data":{"token":"t1","user_id":"u1"}}"#))
            .unwrap();
        assert_eq!(session.token, "t1");
        assert_eq!(session.user_id, "u1");
    }

    #[test]
    fn parse_json_keeps_data_with_sibling_keys() {
        let body = r#"{"data":[1,2],"total":42,"message":"ok"}"#;
        let value = client().parse_json(ok(body)).unwrap();
        assert_eq!(value, serde_json::json!({"data": [1, 2], "total": 42, "message": "ok"}));
    }

    #[test]
    fn parse_json_unwraps_plain_envelope() {
        let value = client()
            .parse_json(ok(r#"{"message":"ok","code":0,"data":{"online":3}}"#))
            .unwrap();
        assert_eq!(value, serde_json::json!({"online": 3}));
    }

    #[test]
    fn parse_login_rejects_empty_token() {
        let err = client()
            .parse_login(ok(r#"{"token":"","user_id":"u1"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_missing_key_is_decode_error() {
        let err = client().parse_upload_image(ok(r#"{"path":"/x"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_bad_json_is_decode_error() {
        let err = client().parse_fetch_friends(ok("not json")).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_non_2xx_is_transport_error() {
        let response = HttpResponse {
            status: 401,
            headers: Vec::new(),
            body: r#"{"message":"token expired"}"#.to_string(),
        };
        let err = client().parse_fetch_own_profile(response).unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "HTTP 401: token expired");
    }

    #[test]
    fn parse_json_accepts_empty_success() {
        let response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        assert_eq!(client().parse_json(response).unwrap(), Value::Null);
    }

    #[test]
    fn parse_fetch_favorites_success() {
        let favorites = client()
            .parse_fetch_favorites(ok(r#"{"data":[{"user_id":"u3","name":"Kim"}]}"#))
            .unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].name, "Kim");
        assert!(favorites[0].collected);
    }
}
