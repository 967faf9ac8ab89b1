use crate::{LoginRequest, LoginResponse, TokenPair, UserInfo};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize + DeserializeOwned {
    /// The `data` payload type inside the response envelope.
    type Response: Serialize + DeserializeOwned;
    /// The URL path, relative to the API base URL.
    const PATH: &'static str;
    const METHOD: HttpMethod;
    /// Whether the request carries the bearer token.
    const AUTHENTICATED: bool = true;
}

// =========================================================
// Request Definitions
// =========================================================

impl ApiRequest for LoginRequest {
    type Response = LoginResponse;
    const PATH: &'static str = "/auth/login";
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTHENTICATED: bool = false;
}

/// Invalidate the current token on the server
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogoutRequest {}

impl ApiRequest for LogoutRequest {
    type Response = ();
    const PATH: &'static str = "/auth/logout";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Exchange a refresh token for a new token pair
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl ApiRequest for RefreshTokenRequest {
    type Response = TokenPair;
    const PATH: &'static str = "/auth/refresh";
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTHENTICATED: bool = false;
}

/// Fetch the profile of the current user
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CurrentUserRequest {}

impl ApiRequest for CurrentUserRequest {
    type Response = UserInfo;
    const PATH: &'static str = "/auth/user";
    const METHOD: HttpMethod = HttpMethod::Get;
}
