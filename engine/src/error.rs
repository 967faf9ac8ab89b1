use std::fmt;

use serde::{Deserialize, Serialize};

// =========================================================
// 错误状态枚举
// =========================================================

/// 错误状态枚举
/// 决定错误的处理策略（展示给用户 / 强制登出 / 静默恢复）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleErrorStatus {
    /// 凭据无效或令牌被拒绝，展示给登录调用方，不自动重试
    Auth,
    /// 动态路由安装失败（无可用路由 / 注册表拒绝），对会话致命
    RouteInstall,
    /// 持久化快照损坏，本地丢弃后以空会话继续
    Restore,
    /// 持久化存储读写失败
    Storage,
    /// JSON 解析或序列化错误
    Serialization,
    /// 网络请求失败
    Network,
    /// 调用参数校验失败
    InvalidInput,
}

impl ConsoleErrorStatus {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConsoleErrorStatus::Auth => "AUTH_FAILED",
            ConsoleErrorStatus::RouteInstall => "ROUTE_INSTALL_FAILED",
            ConsoleErrorStatus::Restore => "RESTORE_FAILED",
            ConsoleErrorStatus::Storage => "STORAGE_ERROR",
            ConsoleErrorStatus::Serialization => "SERIALIZATION_ERROR",
            ConsoleErrorStatus::Network => "NETWORK_ERROR",
            ConsoleErrorStatus::InvalidInput => "INVALID_INPUT",
        }
    }

    /// 发生后必须清空会话并回到登录页
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, ConsoleErrorStatus::RouteInstall)
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSpan {
    /// 操作名称，如 "session.login", "installer.add_route"
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 引擎错误
///
/// - status: 错误类型/语义
/// - message: 错误消息
/// - source: 原始错误（可选，用于错误链）
/// - spans: 结构化的调用追踪栈
#[derive(Debug)]
pub struct ConsoleError {
    pub status: ConsoleErrorStatus,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl ConsoleError {
    pub fn new(status: ConsoleErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::Auth, message)
    }

    pub fn route_install(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::RouteInstall, message)
    }

    pub fn restore(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::Restore, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::Storage, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::Serialization, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::Network, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorStatus::InvalidInput, message)
    }

    // --- Context builders ---

    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // --- Accessors ---

    pub fn error_code(&self) -> &'static str {
        self.status.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }

    pub fn is_auth(&self) -> bool {
        self.status == ConsoleErrorStatus::Auth
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::serialization(e.to_string()).with_source(e)
    }
}
