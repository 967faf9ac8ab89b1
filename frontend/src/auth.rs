//! 认证模块
//!
//! 会话本身由引擎的 `SessionStore` 管理，这里只把它的状态镜像为响应式信号，
//! 供路由服务与界面订阅。

use std::rc::Rc;

use admin_console_shared::{LoginRequest, UserInfo};
use leptos::prelude::*;

use crate::runtime::ConsoleRuntime;

/// 界面可见的会话状态
#[derive(Clone, Default, PartialEq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user_info: Option<UserInfo>,
    /// 启动时恢复会话之前为 true
    pub is_loading: bool,
}

/// 会话上下文
///
/// 包含读写信号，通过 Context 在组件间共享。
#[derive(Clone, Copy)]
pub struct SessionContext {
    pub state: ReadSignal<SessionState>,
    set_state: WriteSignal<SessionState>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (state, set_state) = signal(SessionState {
            is_loading: true,
            ..Default::default()
        });
        Self { state, set_state }
    }

    /// 认证状态信号（用于路由服务注入）
    pub fn is_authenticated_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.get().is_authenticated)
    }

    /// 从会话存储重新读取状态
    pub fn sync(&self, runtime: &ConsoleRuntime) {
        let next = SessionState {
            is_authenticated: runtime.session.is_valid(),
            user_info: runtime.session.user_info(),
            is_loading: false,
        };
        if self.state.get_untracked() != next {
            self.set_state.set(next);
        }
    }
}

/// 从 Context 获取会话上下文
pub fn use_session() -> SessionContext {
    use_context::<SessionContext>().expect("SessionContext should be provided")
}

/// 启动时从 LocalStorage 恢复会话
pub fn init_session(ctx: &SessionContext, runtime: &ConsoleRuntime) {
    runtime.session.restore();
    ctx.sync(runtime);
}

/// 登录；成功后的跳转由路由服务监听认证状态完成
pub async fn login(
    ctx: SessionContext,
    runtime: Rc<ConsoleRuntime>,
    username: String,
    password: String,
) -> Result<(), String> {
    let result = runtime
        .session
        .login(&LoginRequest::new(username, password))
        .await;
    ctx.sync(&runtime);

    result.map(|_| ()).map_err(|e| {
        web_sys::console::warn_1(&format!("[Auth] Login failed: {}", e).into());
        e.message().to_string()
    })
}

/// 注销；服务端失败不影响本地清理
pub async fn logout(ctx: SessionContext, runtime: Rc<ConsoleRuntime>) {
    if let Err(e) = runtime.session.logout().await {
        web_sys::console::warn_1(&format!("[Auth] {}", e).into());
    }
    // 注意：不需要手动导航，路由服务会监听认证状态变化并自动重定向
    ctx.sync(&runtime);
}

/// 用服务端资料覆盖本地用户信息
pub async fn reload_profile(ctx: SessionContext, runtime: Rc<ConsoleRuntime>) -> Result<(), String> {
    let result = runtime.session.reload_user_info().await;
    ctx.sync(&runtime);
    result.map(|_| ()).map_err(|e| e.message().to_string())
}
