//! 守卫驱动
//!
//! 在每次导航前执行 `evaluate` 给出的步骤。任何失败都转换为重定向，
//! `before_each` 本身从不返回错误。

use admin_console_shared::{RouteDescriptor, Timestamp};

use super::{
    GuardConfig, GuardState, GuardStep, Location, NavigationAttempt, NavigationDecision, evaluate,
};
use crate::route::installer::NavigationRegistry;
use crate::routing::{InstallTicket, RoutingSession};
use crate::session::SessionStore;
use crate::session::adapter::{AuthApi, SnapshotStorage};

/// 进度条 / 通知（即发即忘）
pub trait ProgressSink {
    fn start(&self) {}
    fn finish(&self) {}
    fn error(&self) {}
    /// 面向用户的错误提示
    fn notify_error(&self, _message: &str) {}
}

/// 不做任何展示
pub struct NoProgress;

impl ProgressSink for NoProgress {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// 应设置的页面标题
    pub title: String,
    pub decision: NavigationDecision,
    pub trail: Vec<GuardState>,
}

impl Resolution {
    pub fn state(&self) -> GuardState {
        self.trail.last().copied().unwrap_or(GuardState::Idle)
    }
}

pub struct NavigationGuard<'a, S, A, R>
where
    S: SnapshotStorage,
    A: AuthApi,
    R: NavigationRegistry,
{
    session: &'a SessionStore<S, A>,
    routing: &'a RoutingSession<R>,
    progress: &'a dyn ProgressSink,
    config: &'a GuardConfig,
}

impl<'a, S, A, R> NavigationGuard<'a, S, A, R>
where
    S: SnapshotStorage,
    A: AuthApi,
    R: NavigationRegistry,
{
    pub fn new(
        session: &'a SessionStore<S, A>,
        routing: &'a RoutingSession<R>,
        progress: &'a dyn ProgressSink,
        config: &'a GuardConfig,
    ) -> Self {
        Self {
            session,
            routing,
            progress,
            config,
        }
    }

    pub async fn before_each(&self, attempt: &NavigationAttempt) -> Resolution {
        self.progress.start();
        self.session.refresh_if_expired(Timestamp::now()).await;

        loop {
            let evaluation = evaluate(
                attempt,
                self.session.is_valid(),
                self.routing.status(),
                self.config,
            );
            let mut trail = evaluation.trail;

            match evaluation.step {
                GuardStep::Decided(decision) => {
                    return self.resolve(evaluation.title, decision, trail);
                }
                GuardStep::InstallRoutes => {
                    // 阶段已不是 Pending 时重新评估
                    let Some(ticket) = self.routing.begin() else {
                        continue;
                    };
                    let decision = self.install(ticket, &attempt.to).await;
                    trail.push(if decision.is_redirect() {
                        GuardState::Redirecting
                    } else {
                        GuardState::Resolved
                    });
                    return self.resolve(evaluation.title, decision, trail);
                }
                GuardStep::AwaitInstallation => {
                    if self.routing.wait_installed().await == Some(true) {
                        trail.push(GuardState::Resolved);
                        let decision = NavigationDecision::Replace(attempt.to.clone());
                        return self.resolve(evaluation.title, decision, trail);
                    }
                    log_info!("[Guard] Awaited installation did not complete, re-evaluating");
                }
            }
        }
    }

    async fn install(&self, ticket: InstallTicket<'_>, to: &Location) -> NavigationDecision {
        let raw_routes: Vec<RouteDescriptor> = self.session.raw_routes();
        let result = self
            .routing
            .install_routes(ticket, &raw_routes, |tag| self.session.has_permission(tag))
            .await;

        match result {
            Ok(_) => NavigationDecision::Replace(to.clone()),
            Err(e) => {
                let e = e.in_op_with("guard.before_each", to.path.as_str());
                log_error!("[Guard] Route installation failed: {}", e);
                self.progress.error();
                self.progress.notify_error(e.message());

                if e.status.is_fatal_to_session() {
                    self.session.clear().await;
                }
                self.routing.reset().await;
                NavigationDecision::Redirect(Location::new(&self.config.login_path))
            }
        }
    }

    fn resolve(
        &self,
        title: String,
        decision: NavigationDecision,
        trail: Vec<GuardState>,
    ) -> Resolution {
        self.progress.finish();
        Resolution {
            title,
            decision,
            trail,
        }
    }

    /// 解析阶段观察者：会话在外部失效而路由仍标记为已安装时，
    /// 让下一次导航重新进入安装流程。返回是否做了标记。
    pub fn after_each(&self) -> bool {
        if !self.session.is_valid() && self.routing.is_installed() {
            self.routing.mark_stale()
        } else {
            false
        }
    }
}
