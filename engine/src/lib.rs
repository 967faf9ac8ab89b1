//! 管理后台的会话与动态路由引擎
//!
//! 纯 Rust 实现，不依赖 DOM：所有外部协作者（存储、认证 API、路由注册表、
//! 进度条）都通过 trait 注入，浏览器实现位于 frontend crate。
//!
//! - `session`: 会话存储（登录、恢复、登出、权限判断）
//! - `route`: 路由树、物化、菜单投影、动态安装
//! - `routing`: 会话级别的安装状态
//! - `guard`: 导航守卫状态机

// =========================================================
// 跨平台日志宏
// =========================================================

#[cfg(target_arch = "wasm32")]
macro_rules! log_info {
    ($($t:tt)*) => (web_sys::console::log_1(&format!($($t)*).into()))
}

#[cfg(not(target_arch = "wasm32"))]
macro_rules! log_info {
    ($($t:tt)*) => (println!($($t)*))
}

#[cfg(target_arch = "wasm32")]
macro_rules! log_warn {
    ($($t:tt)*) => (web_sys::console::warn_1(&format!($($t)*).into()))
}

#[cfg(not(target_arch = "wasm32"))]
macro_rules! log_warn {
    ($($t:tt)*) => (eprintln!($($t)*))
}

#[cfg(target_arch = "wasm32")]
macro_rules! log_error {
    ($($t:tt)*) => (web_sys::console::error_1(&format!($($t)*).into()))
}

#[cfg(not(target_arch = "wasm32"))]
macro_rules! log_error {
    ($($t:tt)*) => (eprintln!($($t)*))
}

pub mod config;
pub mod error;
pub mod guard;
pub mod route;
pub mod routing;
pub mod session;

pub use config::{ConsoleConfig, EnvAdapter};
pub use error::{ConsoleError, ConsoleErrorStatus, ConsoleResult};
pub use guard::{
    Evaluation, GuardConfig, GuardState, GuardStep, Location, NavigationAttempt,
    NavigationDecision, NavigationGuard, NoProgress, ProgressSink, Resolution, evaluate,
    post_login_target,
};
pub use route::installer::{DynamicRouterInstaller, InstalledRouteRegistry, NavigationRegistry};
pub use route::materializer::{Materialization, Materializer, ResolutionWarning, ViewRegistry};
pub use route::menu::{MenuEntry, find as find_menu_entry, open_keys, project};
pub use route::{ComponentRef, MaterializedRoute, RawRoute, RouteNode};
pub use routing::{InstallStatus, RouteLoadState, RoutingSession};
pub use session::adapter::{AuthApi, MemoryStorage, SnapshotStorage};
pub use session::mock::MockAuthApi;
pub use session::{Session, SessionListener, SessionStore};
