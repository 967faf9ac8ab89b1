//! 动态路由安装
//!
//! 把物化后的路由合并进实时导航注册表，并记录安装过的顶层路由名称，
//! 以便登出时精确卸载。

use std::cell::RefCell;
use std::collections::HashSet;

use async_trait::async_trait;

use super::{MaterializedRoute, normalize_path};
use crate::error::{ConsoleError, ConsoleResult};

// =========================================================
// 实时导航注册表接口
// =========================================================

/// 实时导航注册表（例如浏览器端的路由表）
#[async_trait(?Send)]
pub trait NavigationRegistry {
    type View: Clone;

    /// 注册一个顶层路由及其整棵子树
    async fn add_route(&self, route: &MaterializedRoute<Self::View>) -> ConsoleResult<()>;
    /// 按名称移除路由，返回是否存在
    async fn remove_route(&self, name: &str) -> ConsoleResult<bool>;
    /// 同步移除路由，用于撤销被中断或失败的安装尝试
    fn discard_route(&self, name: &str) -> bool;
    fn has_route(&self, name: &str) -> bool;
}

// =========================================================
// 安装记录
// =========================================================

/// 当前已合并进注册表的顶层路由名称（保持安装顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledRouteRegistry {
    names: Vec<String>,
}

impl InstalledRouteRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn record(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
    }

    fn forget(&mut self, name: &str) {
        self.names.retain(|n| n != name);
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// =========================================================
// 单次安装尝试
// =========================================================

/// 本次尝试已添加的路由
///
/// 未 `commit` 就被丢弃时（出错或所在的 future 被取消）同步撤销全部添加。
struct InstallBatch<'a, R: NavigationRegistry> {
    installer: &'a DynamicRouterInstaller<R>,
    added: Vec<String>,
    committed: bool,
}

impl<R: NavigationRegistry> InstallBatch<'_, R> {
    fn push(&mut self, name: &str) {
        self.installer.installed.borrow_mut().record(name);
        self.added.push(name.to_string());
    }

    fn commit(mut self) -> Vec<String> {
        self.committed = true;
        std::mem::take(&mut self.added)
    }
}

impl<R: NavigationRegistry> Drop for InstallBatch<'_, R> {
    fn drop(&mut self) {
        if self.committed || self.added.is_empty() {
            return;
        }
        log_warn!("[Installer] Discarding {} route(s) from unfinished attempt", self.added.len());
        for name in self.added.iter().rev() {
            self.installer.installed.borrow_mut().forget(name);
            self.installer.registry.discard_route(name);
        }
    }
}

// =========================================================
// 安装器
// =========================================================

pub struct DynamicRouterInstaller<R: NavigationRegistry> {
    registry: R,
    installed: RefCell<InstalledRouteRegistry>,
    /// 预先注册的静态路由路径（已规范化）
    static_paths: Vec<String>,
}

impl<R: NavigationRegistry> DynamicRouterInstaller<R> {
    pub fn new(registry: R, static_paths: &[String]) -> Self {
        Self {
            registry,
            installed: RefCell::new(InstalledRouteRegistry::default()),
            static_paths: static_paths.iter().map(|p| normalize_path(p)).collect(),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn installed(&self) -> InstalledRouteRegistry {
        self.installed.borrow().clone()
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.borrow().contains(name)
    }

    fn is_static(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.static_paths.iter().any(|p| *p == path)
    }

    /// 合并路由，返回本次新增的顶层路由名称
    ///
    /// 要么全部成功，要么回滚本次已添加的路由并返回 `RouteInstall` 错误。
    /// future 在中途被丢弃时同样回滚。
    pub async fn install(
        &self,
        routes: &[MaterializedRoute<R::View>],
    ) -> ConsoleResult<Vec<String>> {
        ensure_unique_names(routes).map_err(|e| e.in_op("installer.install"))?;

        let mut batch = InstallBatch {
            installer: self,
            added: Vec::new(),
            committed: false,
        };

        for route in routes {
            if self.is_static(&route.path) {
                log_warn!(
                    "[Installer] Skipping '{}': path '{}' is a static route",
                    route.name,
                    route.path
                );
                continue;
            }

            if self.is_installed(&route.name) || self.registry.has_route(&route.name) {
                log_info!("[Installer] Route '{}' already present, skipped", route.name);
                continue;
            }

            match self.registry.add_route(route).await {
                Ok(()) => batch.push(&route.name),
                Err(e) => {
                    log_error!("[Installer] Registry rejected '{}': {}", route.name, e);
                    drop(batch);
                    return Err(ConsoleError::route_install(format!(
                        "registry rejected route '{}'",
                        route.name
                    ))
                    .with_source(e)
                    .in_op_with("installer.add_route", route.name.as_str())
                    .in_op("installer.install"));
                }
            }
        }

        let added = batch.commit();
        log_info!("[Installer] Installed {} route(s)", added.len());
        Ok(added)
    }

    /// 按逆序移除指定的已安装路由，返回实际移除的数量
    pub async fn remove(&self, names: &[String]) -> usize {
        let mut removed = 0;
        for name in names.iter().rev() {
            self.installed.borrow_mut().forget(name);
            match self.registry.remove_route(name).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => log_error!("[Installer] Failed to remove '{}': {}", name, e),
            }
        }
        removed
    }

    /// 移除所有已记录的路由并清空记录，返回实际移除的数量
    pub async fn uninstall(&self) -> usize {
        // 复制记录再 await，避免跨 await 持有借用；中途取消时未处理的名称仍留在记录里
        let names = self.installed.borrow().names.clone();
        let mut removed = 0;

        for name in &names {
            match self.registry.remove_route(name).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => log_error!("[Installer] Failed to remove '{}': {}", name, e),
            }
            self.installed.borrow_mut().forget(name);
        }

        if !names.is_empty() {
            log_info!("[Installer] Uninstalled {} route(s)", removed);
        }
        removed
    }
}

/// 整棵树内路由名称必须唯一
fn ensure_unique_names<V>(routes: &[MaterializedRoute<V>]) -> ConsoleResult<()> {
    let mut seen = HashSet::new();
    for route in routes {
        for name in route.names() {
            if !seen.insert(name) {
                return Err(ConsoleError::route_install(format!(
                    "duplicate route name '{}'",
                    name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ConsoleErrorStatus;
    use crate::route::RouteNode;
    use std::cell::Cell;
    use std::rc::Rc;

    // =========================================================
    // Shared Mock Components
    // =========================================================

    #[derive(Default)]
    pub(crate) struct RegistryContext {
        /// Operation log to verify calling order
        pub log: RefCell<Vec<String>>,
        pub routes: RefCell<Vec<String>>,
        /// Names that the registry refuses to add
        pub fail_on: RefCell<HashSet<String>>,
        /// Suspend inside add_route so other futures can interleave
        pub yield_on_add: Cell<bool>,
    }

    impl RegistryContext {
        fn push_log(&self, msg: String) {
            self.log.borrow_mut().push(msg);
        }

        pub fn adds(&self) -> Vec<String> {
            self.log
                .borrow()
                .iter()
                .filter(|l| l.starts_with("add:"))
                .cloned()
                .collect()
        }
    }

    pub(crate) struct MockRegistry {
        pub ctx: Rc<RegistryContext>,
    }

    #[async_trait(?Send)]
    impl NavigationRegistry for MockRegistry {
        type View = u8;

        async fn add_route(&self, route: &MaterializedRoute<u8>) -> ConsoleResult<()> {
            self.ctx.push_log(format!("add:{}", route.name));
            if self.ctx.yield_on_add.get() {
                tokio::task::yield_now().await;
            }
            if self.ctx.fail_on.borrow().contains(&route.name) {
                return Err(ConsoleError::invalid_input("Simulated rejection"));
            }
            if self.ctx.routes.borrow().contains(&route.name) {
                return Err(ConsoleError::invalid_input("Duplicate route in registry"));
            }
            self.ctx.routes.borrow_mut().push(route.name.clone());
            Ok(())
        }

        async fn remove_route(&self, name: &str) -> ConsoleResult<bool> {
            self.ctx.push_log(format!("remove:{}", name));
            let mut routes = self.ctx.routes.borrow_mut();
            let before = routes.len();
            routes.retain(|n| n != name);
            Ok(routes.len() != before)
        }

        fn discard_route(&self, name: &str) -> bool {
            self.ctx.push_log(format!("discard:{}", name));
            let mut routes = self.ctx.routes.borrow_mut();
            let before = routes.len();
            routes.retain(|n| n != name);
            routes.len() != before
        }

        fn has_route(&self, name: &str) -> bool {
            self.ctx.routes.borrow().iter().any(|n| n == name)
        }
    }

    pub(crate) fn route(path: &str, name: &str, children: Vec<MaterializedRoute<u8>>) -> MaterializedRoute<u8> {
        RouteNode {
            path: path.to_string(),
            name: name.to_string(),
            component: Some(1),
            meta: Default::default(),
            children,
        }
    }

    fn setup() -> (Rc<RegistryContext>, DynamicRouterInstaller<MockRegistry>) {
        let ctx = Rc::new(RegistryContext::default());
        let installer = DynamicRouterInstaller::new(
            MockRegistry { ctx: ctx.clone() },
            &["/".to_string(), "/login".to_string(), "/404".to_string()],
        );
        (ctx, installer)
    }

    // =========================================================
    // Tests
    // =========================================================

    #[tokio::test]
    async fn test_install_records_top_level_names() {
        let (ctx, installer) = setup();
        let routes = vec![
            route("/dashboard", "Dashboard", vec![]),
            route("/system", "System", vec![route("list", "UserList", vec![])]),
        ];

        let added = installer.install(&routes).await.unwrap();

        assert_eq!(added, vec!["Dashboard", "System"]);
        assert_eq!(installer.installed().names(), &["Dashboard", "System"]);
        assert_eq!(*ctx.log.borrow(), vec!["add:Dashboard", "add:System"]);
    }

    #[tokio::test]
    async fn test_second_install_is_noop() {
        let (ctx, installer) = setup();
        let routes = vec![route("/dashboard", "Dashboard", vec![])];

        installer.install(&routes).await.unwrap();
        let added = installer.install(&routes).await.unwrap();

        assert!(added.is_empty());
        assert_eq!(ctx.adds().len(), 1);
        assert_eq!(installer.installed().len(), 1);
    }

    #[tokio::test]
    async fn test_route_already_in_registry_is_skipped() {
        let (ctx, installer) = setup();
        ctx.routes.borrow_mut().push("Dashboard".to_string());

        let added = installer
            .install(&[route("/dashboard", "Dashboard", vec![])])
            .await
            .unwrap();

        assert!(added.is_empty());
        assert!(ctx.adds().is_empty());
        // 不是本安装器添加的，卸载时也不移除
        assert!(!installer.is_installed("Dashboard"));
    }

    #[tokio::test]
    async fn test_static_paths_filtered() {
        let (ctx, installer) = setup();
        let routes = vec![
            route("login/", "Login", vec![]),
            route("/404", "NotFound", vec![]),
            route("/", "Root", vec![]),
            route("/dashboard", "Dashboard", vec![]),
        ];

        let added = installer.install(&routes).await.unwrap();

        assert_eq!(added, vec!["Dashboard"]);
        assert_eq!(*ctx.log.borrow(), vec!["add:Dashboard"]);
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected_before_touching_registry() {
        let (ctx, installer) = setup();
        let routes = vec![
            route("/system", "System", vec![route("list", "List", vec![])]),
            route("/content", "Content", vec![route("list", "List", vec![])]),
        ];

        let err = installer.install(&routes).await.unwrap_err();

        assert_eq!(err.status, ConsoleErrorStatus::RouteInstall);
        assert!(err.message().contains("List"));
        assert!(ctx.log.borrow().is_empty());
        assert!(installer.installed().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_add_rolls_back_attempt() {
        let (ctx, installer) = setup();
        ctx.fail_on.borrow_mut().insert("Template".to_string());
        let routes = vec![
            route("/dashboard", "Dashboard", vec![]),
            route("/system", "System", vec![]),
            route("/template", "Template", vec![]),
        ];

        let err = installer.install(&routes).await.unwrap_err();

        assert_eq!(err.status, ConsoleErrorStatus::RouteInstall);
        assert!(std::error::Error::source(&err).is_some());
        assert!(installer.installed().is_empty());
        assert!(ctx.routes.borrow().is_empty());
        assert_eq!(
            *ctx.log.borrow(),
            vec![
                "add:Dashboard",
                "add:System",
                "add:Template",
                "discard:System",
                "discard:Dashboard"
            ]
        );
    }

    #[tokio::test]
    async fn test_rollback_keeps_routes_from_earlier_attempts() {
        let (ctx, installer) = setup();
        installer
            .install(&[route("/dashboard", "Dashboard", vec![])])
            .await
            .unwrap();

        ctx.fail_on.borrow_mut().insert("Broken".to_string());
        let result = installer
            .install(&[
                route("/dashboard", "Dashboard", vec![]),
                route("/system", "System", vec![]),
                route("/broken", "Broken", vec![]),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(installer.installed().names(), &["Dashboard"]);
        assert_eq!(*ctx.routes.borrow(), vec!["Dashboard"]);
    }

    #[tokio::test]
    async fn test_dropped_install_discards_partial_batch() {
        let (ctx, installer) = setup();
        ctx.yield_on_add.set(true);
        let routes = vec![
            route("/dashboard", "Dashboard", vec![]),
            route("/system", "System", vec![]),
            route("/content", "Content", vec![]),
        ];

        {
            let mut pending = Box::pin(installer.install(&routes));
            for _ in 0..3 {
                assert!(futures::poll!(&mut pending).is_pending());
            }
            assert_eq!(installer.installed().names(), &["Dashboard", "System"]);
        }

        assert!(installer.installed().is_empty());
        assert!(ctx.routes.borrow().is_empty());
        assert_eq!(
            *ctx.log.borrow(),
            vec![
                "add:Dashboard",
                "add:System",
                "add:Content",
                "discard:System",
                "discard:Dashboard"
            ]
        );
    }

    #[tokio::test]
    async fn test_uninstall_removes_recorded_routes() {
        let (ctx, installer) = setup();
        installer
            .install(&[
                route("/dashboard", "Dashboard", vec![]),
                route("/system", "System", vec![]),
            ])
            .await
            .unwrap();

        let removed = installer.uninstall().await;

        assert_eq!(removed, 2);
        assert!(installer.installed().is_empty());
        assert!(ctx.routes.borrow().is_empty());

        // 重复卸载为空操作
        assert_eq!(installer.uninstall().await, 0);
    }

    #[tokio::test]
    async fn test_reinstall_after_uninstall() {
        let (ctx, installer) = setup();
        let routes = vec![route("/dashboard", "Dashboard", vec![])];

        installer.install(&routes).await.unwrap();
        installer.uninstall().await;
        let added = installer.install(&routes).await.unwrap();

        assert_eq!(added.len(), 1);
        assert_eq!(ctx.adds().len(), 2);
    }
}
