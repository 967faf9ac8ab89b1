use crate::auth::{login, use_session};
use crate::runtime::{use_runtime, use_runtime_handle};
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn LoginPage() -> impl IntoView {
    let session = use_session();
    let runtime = use_runtime_handle();
    let app_title = use_runtime().guard_config.app_title.clone();

    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    // 守卫安装路由失败时留下的提示
    let notice = runtime.get_value().progress.notice;

    let is_loading = move || session.state.get().is_loading;

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        if username.get().trim().is_empty() || password.get().is_empty() {
            set_error_msg.set(Some("请输入用户名和密码".to_string()));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);
        notice.set(None);

        let runtime = runtime.get_value();
        spawn_local(async move {
            // 成功后由路由服务监听认证状态并跳转
            if let Err(message) = login(session, runtime, username.get_untracked(), password.get_untracked()).await {
                set_error_msg.set(Some(message));
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <Show when=move || !is_loading() fallback=|| view! { <div class="flex items-center justify-center min-h-screen"><span class="loading loading-spinner loading-lg text-primary"></span></div> }>
            <div class="hero min-h-screen bg-base-200">
                <div class="hero-content flex-col w-full max-w-md">
                    <div class="text-center mb-4">
                        <h1 class="text-3xl font-bold">{app_title.clone()}</h1>
                        <p class="text-base-content/70">"请登录后继续"</p>
                    </div>

                    <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                        <form class="card-body" on:submit=on_submit>
                            <Show when=move || error_msg.get().or(notice.get()).is_some()>
                                <div role="alert" class="alert alert-error text-sm py-2">
                                    <span>{move || error_msg.get().or(notice.get()).unwrap_or_default()}</span>
                                </div>
                            </Show>

                            <div class="form-control">
                                <label class="label" for="username">
                                    <span class="label-text">"用户名"</span>
                                </label>
                                <input
                                    id="username"
                                    type="text"
                                    placeholder="admin"
                                    on:input=move |ev| set_username.set(event_target_value(&ev))
                                    prop:value=username
                                    class="input input-bordered"
                                    required
                                />
                            </div>
                            <div class="form-control">
                                <label class="label" for="password">
                                    <span class="label-text">"密码"</span>
                                </label>
                                <input
                                    id="password"
                                    type="password"
                                    placeholder="••••••••"
                                    on:input=move |ev| set_password.set(event_target_value(&ev))
                                    prop:value=password
                                    class="input input-bordered"
                                    required
                                />
                            </div>
                            <div class="form-control mt-6">
                                <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                    {move || if is_submitting.get() {
                                        view! { <span class="loading loading-spinner"></span> "登录中..." }.into_any()
                                    } else {
                                        "登录".into_any()
                                    }}
                                </button>
                            </div>
                            <p class="text-xs text-base-content/60 text-center">
                                "演示账号：admin / admin123，user / user123，test / test123"
                            </p>
                        </form>
                    </div>
                </div>
            </div>
        </Show>
    }
}
