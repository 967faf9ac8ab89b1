//! 主布局：顶栏、侧边菜单与内容区

use admin_console_engine::{MenuEntry, open_keys};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::{logout, use_session};
use crate::runtime::use_runtime_handle;
use crate::web::router::{Link, use_router};

#[component]
pub fn Layout(children: Children) -> impl IntoView {
    let session = use_session();
    let router = use_router();
    let runtime = use_runtime_handle();
    let app_title = runtime.get_value().guard_config.app_title.clone();
    let loading = runtime.get_value().progress.loading;

    let nickname = move || {
        session
            .state
            .get()
            .user_info
            .map(|u| u.nickname)
            .unwrap_or_default()
    };

    let on_logout = move |_| {
        let runtime = runtime.get_value();
        spawn_local(logout(session, runtime));
    };

    view! {
        <div class="min-h-screen bg-base-200 flex flex-col">
            <Show when=move || loading.get()>
                <progress class="progress progress-primary w-full h-1 fixed top-0 z-50"></progress>
            </Show>
            <div class="navbar bg-base-100 shadow-sm">
                <div class="flex-1">
                    <span class="text-xl font-bold px-4">{app_title}</span>
                </div>
                <div class="flex-none gap-2">
                    <Link to="/profile" class="btn btn-ghost btn-sm">{nickname}</Link>
                    <button class="btn btn-outline btn-sm" on:click=on_logout>"退出登录"</button>
                </div>
            </div>
            <div class="flex flex-1">
                <aside class="w-60 bg-base-100 border-r border-base-300">
                    {move || {
                        let entries = router.menu().get();
                        let path = router.current().get().path;
                        let open = open_keys(&entries, &path);
                        menu_list(entries, path, open)
                    }}
                </aside>
                <main class="flex-1 p-4 md:p-8">{children()}</main>
            </div>
        </div>
    }
}

/// 递归渲染菜单，`open` 为需要展开的分组
fn menu_list(entries: Vec<MenuEntry>, active: String, open: Vec<String>) -> AnyView {
    view! {
        <ul class="menu w-full">
            {entries
                .into_iter()
                .map(|entry| menu_item(entry, active.clone(), open.clone()))
                .collect_view()}
        </ul>
    }
    .into_any()
}

fn menu_item(entry: MenuEntry, active: String, open: Vec<String>) -> AnyView {
    match entry.children {
        Some(children) => {
            let is_open = open.contains(&entry.key);
            view! {
                <li>
                    <details open=is_open>
                        <summary>{entry.label}</summary>
                        {menu_list(children, active, open)}
                    </details>
                </li>
            }
            .into_any()
        }
        None => {
            let class = if entry.key == active { "active" } else { "" };
            view! {
                <li>
                    <Link to=entry.key class=class>{entry.label}</Link>
                </li>
            }
            .into_any()
        }
    }
}
