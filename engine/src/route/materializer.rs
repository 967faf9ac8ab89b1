//! 路由物化
//!
//! 将符号组件引用解析为视图加载器，修剪无效节点并对同级节点排序。
//! 解析失败不会中断物化，只会记录一条 `ResolutionWarning`。

use std::collections::BTreeMap;
use std::fmt;

use admin_console_shared::RouteDescriptor;

use super::{ComponentRef, MaterializedRoute, RawRoute, RouteNode};
use crate::config::DEFAULT_ROUTE_SORT;

/// 规范化视图引用：按 `/` 或 `\` 切分，丢弃空段与 `.` 段，再以 `/` 连接
///
/// `"/dashboard//DashboardView/"` -> `"dashboard/DashboardView"`
pub fn normalize_view_key(reference: &str) -> String {
    reference
        .trim()
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// =========================================================
// 视图注册表
// =========================================================

/// 构建期生成的视图加载器注册表（规范化键 -> 加载器）
#[derive(Debug, Clone)]
pub struct ViewRegistry<V> {
    views: BTreeMap<String, V>,
}

impl<V> Default for ViewRegistry<V> {
    fn default() -> Self {
        Self {
            views: BTreeMap::new(),
        }
    }
}

impl<V> ViewRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, loader: V) -> Self {
        self.register(key, loader);
        self
    }

    /// 注册加载器，返回被覆盖的旧值
    pub fn register(&mut self, key: &str, loader: V) -> Option<V> {
        self.views.insert(normalize_view_key(key), loader)
    }

    pub fn resolve(&self, reference: &str) -> Option<&V> {
        self.views.get(&normalize_view_key(reference))
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.resolve(reference).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

// =========================================================
// 物化结果
// =========================================================

/// 单个路由的组件引用未能解析
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionWarning {
    pub route: String,
    pub reference: String,
    pub key: String,
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route '{}': view '{}' not found (key '{}')",
            self.route, self.reference, self.key
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Materialization<V> {
    pub routes: Vec<MaterializedRoute<V>>,
    pub warnings: Vec<ResolutionWarning>,
}

impl<V> Materialization<V> {
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// =========================================================
// 物化器
// =========================================================

pub struct Materializer<V> {
    views: ViewRegistry<V>,
    default_sort: i32,
}

impl<V: Clone> Materializer<V> {
    pub fn new(views: ViewRegistry<V>) -> Self {
        Self {
            views,
            default_sort: DEFAULT_ROUTE_SORT,
        }
    }

    pub fn with_default_sort(mut self, default_sort: i32) -> Self {
        self.default_sort = default_sort;
        self
    }

    pub fn views(&self) -> &ViewRegistry<V> {
        &self.views
    }

    /// 物化服务端下发的原始路由描述
    pub fn materialize_descriptors(&self, tree: &[RouteDescriptor]) -> Materialization<V> {
        let raw: Vec<RawRoute<V>> = tree.iter().map(RawRoute::from).collect();
        self.materialize(&raw)
    }

    pub fn materialize(&self, tree: &[RawRoute<V>]) -> Materialization<V> {
        let mut warnings = Vec::new();
        let routes = self.materialize_level(tree, &mut warnings);

        for warning in &warnings {
            log_warn!("[Materializer] {}", warning);
        }

        Materialization { routes, warnings }
    }

    fn materialize_level(
        &self,
        level: &[RawRoute<V>],
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Vec<MaterializedRoute<V>> {
        let mut routes: Vec<MaterializedRoute<V>> = level
            .iter()
            .filter_map(|node| self.materialize_node(node, warnings))
            .collect();

        // sort_by_key 是稳定排序，相同键保持原始顺序
        routes.sort_by_key(|r| r.meta.sort.unwrap_or(self.default_sort));
        routes
    }

    fn materialize_node(
        &self,
        node: &RawRoute<V>,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Option<MaterializedRoute<V>> {
        let children = self.materialize_level(&node.children, warnings);

        let component = match &node.component {
            Some(ComponentRef::Loader(loader)) => Some(loader.clone()),
            Some(ComponentRef::Symbolic(reference)) => match self.views.resolve(reference) {
                Some(loader) => Some(loader.clone()),
                None => {
                    warnings.push(ResolutionWarning {
                        route: node.name.clone(),
                        reference: reference.clone(),
                        key: normalize_view_key(reference),
                    });
                    None
                }
            },
            None => None,
        };

        if component.is_none() && children.is_empty() {
            return None;
        }

        Some(RouteNode {
            path: node.path.clone(),
            name: node.name.clone(),
            component,
            meta: node.meta.clone(),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ViewId(&'static str);

    fn registry() -> ViewRegistry<ViewId> {
        ViewRegistry::new()
            .with("dashboard/DashboardView", ViewId("dashboard"))
            .with("users/UserListView", ViewId("user-list"))
            .with("/users/UserRolesView/", ViewId("user-roles"))
            .with("template/form/BasicFormView", ViewId("basic-form"))
    }

    fn names(routes: &[MaterializedRoute<ViewId>]) -> Vec<&str> {
        routes.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_normalize_view_key() {
        assert_eq!(
            normalize_view_key(" /dashboard//DashboardView/ "),
            "dashboard/DashboardView"
        );
        assert_eq!(normalize_view_key("./users\\UserListView"), "users/UserListView");
        assert!(registry().contains("users/UserRolesView"));
    }

    #[test]
    fn test_sort_missing_keys_last_and_stable() {
        let tree = vec![
            RouteDescriptor::new("a", "a").component("dashboard/DashboardView").sort(2),
            RouteDescriptor::new("b", "b").component("dashboard/DashboardView"),
            RouteDescriptor::new("c", "c").component("dashboard/DashboardView").sort(1),
        ];
        let result = Materializer::new(registry()).materialize_descriptors(&tree);
        assert_eq!(names(&result.routes), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_stable_among_equal_and_absent_keys() {
        let tree = vec![
            RouteDescriptor::new("x1", "x1").component("dashboard/DashboardView"),
            RouteDescriptor::new("s1", "s1").component("dashboard/DashboardView").sort(5),
            RouteDescriptor::new("x2", "x2").component("dashboard/DashboardView"),
            RouteDescriptor::new("s2", "s2").component("dashboard/DashboardView").sort(5),
            RouteDescriptor::new("x3", "x3").component("dashboard/DashboardView"),
        ];
        let result = Materializer::new(registry()).materialize_descriptors(&tree);
        assert_eq!(names(&result.routes), vec!["s1", "s2", "x1", "x2", "x3"]);
    }

    #[test]
    fn test_unresolved_leaf_pruned_with_warning() {
        let tree = vec![
            RouteDescriptor::new("/dashboard", "Dashboard").component("dashboard/DashboardView"),
            RouteDescriptor::new("/ghost", "Ghost").component("missing/GhostView"),
        ];
        let result = Materializer::new(registry()).materialize_descriptors(&tree);

        assert_eq!(names(&result.routes), vec!["Dashboard"]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].route, "Ghost");
        assert_eq!(result.warnings[0].key, "missing/GhostView");
    }

    #[test]
    fn test_group_kept_only_with_surviving_children() {
        let tree = vec![
            RouteDescriptor::new("/system", "System").children(vec![
                RouteDescriptor::new("list", "UserList").component("users/UserListView"),
                RouteDescriptor::new("menu", "MenuManagement").component("system/MenuView"),
            ]),
            RouteDescriptor::new("/reports", "Reports").children(vec![
                RouteDescriptor::new("daily", "Daily").component("reports/DailyView"),
            ]),
            RouteDescriptor::new("/empty", "EmptyGroup").children(vec![]),
        ];
        let result = Materializer::new(registry()).materialize_descriptors(&tree);

        assert_eq!(names(&result.routes), vec!["System"]);
        assert_eq!(names(&result.routes[0].children), vec!["UserList"]);
        assert!(result.routes[0].component.is_none());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_node_with_failed_component_survives_through_children() {
        let tree = vec![
            RouteDescriptor::new("/users", "Users")
                .component("missing/UsersLayout")
                .children(vec![
                    RouteDescriptor::new("roles", "UserRoles").component("users/UserRolesView"),
                ]),
        ];
        let result = Materializer::new(registry()).materialize_descriptors(&tree);

        assert_eq!(names(&result.routes), vec!["Users"]);
        assert!(result.routes[0].component.is_none());
        assert_eq!(result.routes[0].children[0].component, Some(ViewId("user-roles")));
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let tree = vec![
            RouteDescriptor::new("/template", "Template").sort(4).children(vec![
                RouteDescriptor::new("form", "Form").children(vec![
                    RouteDescriptor::new("basic", "BasicForm")
                        .component("template/form/BasicFormView"),
                    RouteDescriptor::new("advanced", "AdvancedForm")
                        .component("template/form/AdvancedFormView"),
                ]),
            ]),
            RouteDescriptor::new("/dashboard", "Dashboard")
                .component("dashboard/DashboardView")
                .sort(1),
            RouteDescriptor::new("/system", "System").children(vec![
                RouteDescriptor::new("roles", "UserRoles").component("users/UserRolesView"),
                RouteDescriptor::new("list", "UserList").component("users/UserListView"),
            ]),
        ];
        let materializer = Materializer::new(registry());
        let first = materializer.materialize_descriptors(&tree);
        let raw: Vec<RawRoute<ViewId>> = first.routes.iter().map(|r| r.to_raw()).collect();
        let second = materializer.materialize(&raw);

        assert_eq!(first.routes, second.routes);
        assert!(second.warnings.is_empty());
        assert_eq!(names(&first.routes), vec!["Dashboard", "Template", "System"]);
    }

    #[test]
    fn test_preresolved_loader_kept_without_registry_lookup() {
        let raw = vec![RouteNode {
            path: "/inline".to_string(),
            name: "Inline".to_string(),
            component: Some(ComponentRef::Loader(ViewId("inline"))),
            meta: Default::default(),
            children: vec![],
        }];
        let result = Materializer::new(ViewRegistry::new()).materialize(&raw);
        assert_eq!(result.routes[0].component, Some(ViewId("inline")));
    }

    #[test]
    fn test_custom_default_sort() {
        let tree = vec![
            RouteDescriptor::new("a", "a").component("dashboard/DashboardView"),
            RouteDescriptor::new("b", "b").component("dashboard/DashboardView").sort(5000),
        ];
        let default = Materializer::new(registry()).materialize_descriptors(&tree);
        assert_eq!(names(&default.routes), vec!["a", "b"]);

        let widened = Materializer::new(registry())
            .with_default_sort(i32::MAX)
            .materialize_descriptors(&tree);
        assert_eq!(names(&widened.routes), vec!["b", "a"]);
    }
}
