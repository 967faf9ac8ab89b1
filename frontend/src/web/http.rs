//! 基于 `fetch` 的接口调用
//!
//! 只承载认证接口需要的形态：JSON 请求体、可选的 Bearer 令牌、完整读取响应文本。

use admin_console_engine::ConsoleError;
use admin_console_shared::HEADER_AUTHORIZATION;
use admin_console_shared::protocol::HttpMethod;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

#[derive(Debug)]
pub enum HttpError {
    /// 请求未能发出（构建失败或无 window）
    Request(String),
    /// 已发出但没有拿到可读的响应
    Response(String),
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HttpError::Request(msg) => write!(f, "请求失败: {}", msg),
            HttpError::Response(msg) => write!(f, "响应读取失败: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

impl From<HttpError> for ConsoleError {
    fn from(e: HttpError) -> Self {
        ConsoleError::network(e.to_string()).with_source(e)
    }
}

/// 一次接口调用
pub struct ApiCall<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub bearer: Option<&'a str>,
    /// JSON 请求体
    pub body: Option<String>,
}

/// 已读完的响应
pub struct ApiReply {
    pub status: u16,
    /// 2xx
    pub ok: bool,
    pub text: String,
}

fn js_detail(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn build_request(call: &ApiCall<'_>) -> Result<Request, JsValue> {
    let headers = Headers::new()?;
    headers.set("Content-Type", "application/json")?;
    if let Some(token) = call.bearer {
        headers.set(HEADER_AUTHORIZATION, &format!("Bearer {}", token))?;
    }

    let init = RequestInit::new();
    init.set_method(call.method.as_str());
    init.set_headers(&headers.into());
    if let Some(body) = &call.body {
        init.set_body(&JsValue::from_str(body));
    }

    Request::new_with_str_and_init(call.url, &init)
}

pub async fn fetch(call: ApiCall<'_>) -> Result<ApiReply, HttpError> {
    let request = build_request(&call).map_err(|e| HttpError::Request(js_detail(e)))?;
    let window = web_sys::window().ok_or_else(|| HttpError::Request("no window".to_string()))?;

    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| HttpError::Request(js_detail(e)))?
        .dyn_into()
        .map_err(|e| HttpError::Response(js_detail(e)))?;

    let promise = response.text().map_err(|e| HttpError::Response(js_detail(e)))?;
    let text = JsFuture::from(promise)
        .await
        .map_err(|e| HttpError::Response(js_detail(e)))?
        .as_string()
        .ok_or_else(|| HttpError::Response("body is not text".to_string()))?;

    Ok(ApiReply {
        status: response.status(),
        ok: response.ok(),
        text,
    })
}
