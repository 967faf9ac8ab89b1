//! 视图注册表
//!
//! 服务端下发的 `component` 引用在这里对应到具体视图。
//! 业务页面不在本仓库范围内，大部分条目是占位视图。

use admin_console_engine::ViewRegistry;
use admin_console_shared::UserInfo;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::{reload_profile, use_session};
use crate::components::login::LoginPage;
use crate::runtime::use_runtime_handle;
use crate::web::router::use_router;

/// 视图加载器
pub type ViewFn = fn() -> AnyView;

pub const LOGIN_TITLE: &str = "登录";
pub const NOT_FOUND_TITLE: &str = "页面未找到";

pub fn registry() -> ViewRegistry<ViewFn> {
    let entries: [(&str, ViewFn); 15] = [
        ("dashboard/DashboardView", dashboard_view),
        ("users/UserListView", placeholder_view),
        ("users/UserRolesView", placeholder_view),
        ("system/MenuManagementView", placeholder_view),
        ("template/form/BasicFormView", placeholder_view),
        ("template/form/AdvancedFormView", placeholder_view),
        ("template/table/BasicTableView", placeholder_view),
        ("template/table/AdvancedTableView", placeholder_view),
        ("template/charts/BarChartView", placeholder_view),
        ("template/charts/LineChartView", placeholder_view),
        ("template/message/MessageExample", placeholder_view),
        ("settings/SettingsView", placeholder_view),
        ("profile/ProfileView", profile_view),
        ("auth/LoginView", login_view),
        ("error/NotFoundView", not_found_view),
    ];

    let mut views = ViewRegistry::new();
    for (key, view) in entries {
        views.register(key, view);
    }
    views
}

pub fn login_view() -> AnyView {
    view! { <LoginPage /> }.into_any()
}

pub fn not_found_view() -> AnyView {
    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center">
                <h1 class="text-6xl font-bold text-error">"404"</h1>
                <p class="text-xl mt-4">{NOT_FOUND_TITLE}</p>
            </div>
        </div>
    }
    .into_any()
}

fn dashboard_view() -> AnyView {
    view! { <DashboardPage /> }.into_any()
}

fn profile_view() -> AnyView {
    view! { <ProfilePage /> }.into_any()
}

fn placeholder_view() -> AnyView {
    view! { <PlaceholderPage /> }.into_any()
}

#[component]
fn DashboardPage() -> impl IntoView {
    let session = use_session();

    let nickname = move || {
        session
            .state
            .get()
            .user_info
            .map(|u| u.nickname)
            .unwrap_or_default()
    };
    let roles = move || {
        session
            .state
            .get()
            .user_info
            .map(|u| u.roles.join(", "))
            .unwrap_or_default()
    };
    let permissions = move || {
        session
            .state
            .get()
            .user_info
            .map(|u| u.permissions)
            .unwrap_or_default()
    };

    view! {
        <div class="space-y-6">
            <h2 class="text-2xl font-bold">"欢迎回来，" {nickname}</h2>
            <div class="stats shadow bg-base-100">
                <div class="stat">
                    <div class="stat-title">"角色"</div>
                    <div class="stat-value text-lg">{roles}</div>
                </div>
            </div>
            <div class="card bg-base-100 shadow">
                <div class="card-body">
                    <h3 class="card-title">"权限"</h3>
                    <div class="flex flex-wrap gap-2">
                        {move || {
                            permissions()
                                .into_iter()
                                .map(|p| view! { <span class="badge badge-outline">{p}</span> })
                                .collect_view()
                        }}
                    </div>
                </div>
            </div>
        </div>
    }
}

#[component]
fn ProfilePage() -> impl IntoView {
    let session = use_session();
    let runtime = use_runtime_handle();
    let (is_loading, set_is_loading) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_reload = move |_| {
        set_is_loading.set(true);
        set_error_msg.set(None);
        let runtime = runtime.get_value();
        spawn_local(async move {
            if let Err(e) = reload_profile(session, runtime).await {
                set_error_msg.set(Some(e));
            }
            set_is_loading.set(false);
        });
    };

    let field = move |f: fn(&UserInfo) -> String| {
        move || session.state.get().user_info.as_ref().map(f).unwrap_or_default()
    };

    view! {
        <div class="card bg-base-100 shadow max-w-xl">
            <div class="card-body">
                <h2 class="card-title">"个人中心"</h2>
                <p>"用户名：" {field(|u| u.username.clone())}</p>
                <p>"昵称：" {field(|u| u.nickname.clone())}</p>
                <p>"邮箱：" {field(|u| u.email.clone().unwrap_or_default())}</p>
                <Show when=move || error_msg.get().is_some()>
                    <div role="alert" class="alert alert-error text-sm py-2">
                        <span>{move || error_msg.get().unwrap_or_default()}</span>
                    </div>
                </Show>
                <div class="card-actions justify-end">
                    <button class="btn btn-primary btn-sm" disabled=move || is_loading.get() on:click=on_reload>
                        "从服务端刷新"
                    </button>
                </div>
            </div>
        </div>
    }
}

#[component]
fn PlaceholderPage() -> impl IntoView {
    let router = use_router();
    let runtime = use_runtime_handle();

    let title = move || {
        let path = router.current().get().path;
        runtime
            .get_value()
            .routes
            .match_path(&path)
            .and_then(|m| m.title)
            .unwrap_or(path)
    };

    view! {
        <div class="card bg-base-100 shadow">
            <div class="card-body">
                <h2 class="card-title">{title}</h2>
                <p class="text-base-content/70">"此页面内容由业务模块提供。"</p>
            </div>
        </div>
    }
}
