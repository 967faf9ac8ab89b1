//! 认证接口客户端
//!
//! `HttpAuthApi` 访问真实服务端；`ConsoleAuth` 根据配置在它与内置演示后端之间选择。

use admin_console_engine::{AuthApi, ConsoleConfig, ConsoleError, ConsoleResult, MockAuthApi};
use admin_console_shared::protocol::{
    ApiRequest, CurrentUserRequest, HttpMethod, LogoutRequest, RefreshTokenRequest,
};
use admin_console_shared::{ApiResponse, LoginRequest, LoginResponse, TokenPair, UserInfo};
use async_trait::async_trait;

use crate::web::http::{self, ApiCall};

const HTTP_UNAUTHORIZED: u16 = 401;
const CODE_OK: i32 = 200;
const CODE_UNAUTHORIZED: i32 = 401;

#[derive(Clone, Debug, PartialEq)]
pub struct HttpAuthApi {
    pub base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 发送请求并拆开 `{ code, message, data, success }` 包装
    async fn call<R: ApiRequest>(&self, request: &R, token: Option<&str>) -> ConsoleResult<R::Response> {
        let body = if R::METHOD == HttpMethod::Post {
            let json = serde_json_wasm::to_string(request)
                .map_err(|e| ConsoleError::serialization(e.to_string()))?;
            Some(json)
        } else {
            None
        };

        let url = self.url(R::PATH);
        let reply = http::fetch(ApiCall {
            method: R::METHOD,
            url: &url,
            bearer: token.filter(|_| R::AUTHENTICATED),
            body,
        })
        .await?;
        let (status, http_ok, text) = (reply.status, reply.ok, reply.text);

        let envelope: ApiResponse<R::Response> = serde_json_wasm::from_str(&text).map_err(|e| {
            ConsoleError::serialization(format!("unexpected response ({}): {}", status, e))
        })?;

        if status == HTTP_UNAUTHORIZED || envelope.code == CODE_UNAUTHORIZED {
            return Err(ConsoleError::auth(non_empty(envelope.message, "登录已过期")));
        }

        let succeeded = http_ok && (envelope.success || envelope.code == CODE_OK);
        if !succeeded {
            let message = non_empty(envelope.message, "请求失败");
            // 未携带令牌的认证接口失败即视为凭据被拒绝
            return Err(if R::AUTHENTICATED {
                ConsoleError::network(format!("{} ({})", message, status))
            } else {
                ConsoleError::auth(message)
            });
        }

        match envelope.data {
            Some(data) => Ok(data),
            // `data` 为 null 只对空载荷的接口合法
            None => serde_json_wasm::from_str("null")
                .map_err(|_| ConsoleError::serialization(format!("{} returned no data", R::PATH))),
        }
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[async_trait(?Send)]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> ConsoleResult<LoginResponse> {
        self.call(request, None).await.map_err(|e| e.in_op("api.login"))
    }

    async fn logout(&self, token: &str) -> ConsoleResult<()> {
        self.call(&LogoutRequest::default(), Some(token))
            .await
            .map_err(|e| e.in_op("api.logout"))
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConsoleResult<TokenPair> {
        let request = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.call(&request, None)
            .await
            .map_err(|e| e.in_op("api.refresh_token"))
    }

    async fn current_user(&self, token: &str) -> ConsoleResult<UserInfo> {
        self.call(&CurrentUserRequest::default(), Some(token))
            .await
            .map_err(|e| e.in_op("api.current_user"))
    }
}

// =========================================================
// 后端选择
// =========================================================

pub enum ConsoleAuth {
    Http(HttpAuthApi),
    Mock(MockAuthApi),
}

impl ConsoleAuth {
    pub fn from_config(config: &ConsoleConfig) -> Self {
        if config.use_mock_api {
            ConsoleAuth::Mock(MockAuthApi::new())
        } else {
            ConsoleAuth::Http(HttpAuthApi::new(&config.api_base_url))
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, ConsoleAuth::Mock(_))
    }
}

#[async_trait(?Send)]
impl AuthApi for ConsoleAuth {
    async fn login(&self, request: &LoginRequest) -> ConsoleResult<LoginResponse> {
        match self {
            ConsoleAuth::Http(api) => api.login(request).await,
            ConsoleAuth::Mock(api) => api.login(request).await,
        }
    }

    async fn logout(&self, token: &str) -> ConsoleResult<()> {
        match self {
            ConsoleAuth::Http(api) => api.logout(token).await,
            ConsoleAuth::Mock(api) => api.logout(token).await,
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConsoleResult<TokenPair> {
        match self {
            ConsoleAuth::Http(api) => api.refresh_token(refresh_token).await,
            ConsoleAuth::Mock(api) => api.refresh_token(refresh_token).await,
        }
    }

    async fn current_user(&self, token: &str) -> ConsoleResult<UserInfo> {
        match self {
            ConsoleAuth::Http(api) => api.current_user(token).await,
            ConsoleAuth::Mock(api) => api.current_user(token).await,
        }
    }
}
