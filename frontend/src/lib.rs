//! 管理后台前端外壳
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `runtime`: 装配引擎（会话存储、路由会话、路由表）
//! - `web::route`: 动态路由表（领域模型）
//! - `web::router`: 路由服务，驱动引擎的导航守卫
//! - `auth`: 会话状态的响应式镜像
//! - `components`: UI 组件层

mod api;
mod auth;
mod components {
    pub mod layout;
    pub mod login;
}
mod config;
mod runtime;
mod views;

use std::rc::Rc;

use crate::auth::{SessionContext, init_session};
use crate::components::layout::Layout;
use crate::runtime::{ConsoleRuntime, use_runtime};

use admin_console_engine::Location;
use leptos::prelude::*;

// 原生 Web API 封装模块
// 此模块提供对浏览器原生 API 的轻量级封装（fetch、LocalStorage、History）。
pub(crate) mod web {
    pub mod http;
    pub mod route;
    pub mod router;
    mod storage;

    pub use storage::BrowserStorage;
}

use web::router::{Router, RouterOutlet};

/// 路由匹配函数
///
/// 静态页面直接渲染，其余地址在动态路由表中查找。
fn route_matcher(location: &Location) -> AnyView {
    let runtime = use_runtime();
    let guard_config = &runtime.guard_config;

    // 首次导航尚未完成
    if location.path.is_empty() {
        return ().into_any();
    }
    if guard_config.is_login(&location.path) {
        return views::login_view();
    }

    match runtime
        .routes
        .match_path(&location.path)
        .and_then(|m| m.view)
    {
        Some(view) => view! { <Layout>{view()}</Layout> }.into_any(),
        None => views::not_found_view(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 装配引擎
    let runtime: Rc<ConsoleRuntime> = ConsoleRuntime::new(config::load());

    // 2. 创建会话上下文并从 LocalStorage 恢复
    let session = SessionContext::new();
    provide_context(session);
    init_session(&session, &runtime);

    let runtime = StoredValue::new_local(runtime);
    provide_context(runtime);

    view! {
        // 3. 路由器组件：首次导航经过守卫
        <Router runtime=runtime session=session>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
