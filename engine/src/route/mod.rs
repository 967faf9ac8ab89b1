//! 路由树模型 - 领域模型
//!
//! 路由树是不可变的递归值类型：子节点不持有父节点引用，
//! 完整路径只在投影时自顶向下计算，不存储在节点上。

pub mod installer;
pub mod materializer;
pub mod menu;

use admin_console_shared::{RouteDescriptor, RouteMeta};

/// 组件引用：待解析的符号路径，或已解析的视图加载器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRef<V> {
    Symbolic(String),
    Loader(V),
}

/// 路由树节点，`C` 为组件的表示形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNode<C> {
    pub path: String,
    pub name: String,
    pub component: Option<C>,
    pub meta: RouteMeta,
    pub children: Vec<RouteNode<C>>,
}

/// 物化前的路由节点
pub type RawRoute<V> = RouteNode<ComponentRef<V>>;

/// 物化后的路由节点：组件已解析为加载器，或为仅含子路由的分组节点
pub type MaterializedRoute<V> = RouteNode<V>;

impl<C> RouteNode<C> {
    pub fn is_hidden(&self) -> bool {
        self.meta.hidden
    }

    /// 按深度优先顺序访问整棵子树的名称
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.name);
        for child in &self.children {
            child.collect_names(out);
        }
    }
}

impl<V> From<&RouteDescriptor> for RawRoute<V> {
    fn from(route: &RouteDescriptor) -> Self {
        RouteNode {
            path: route.path.clone(),
            name: route.name.clone(),
            component: route.component.clone().map(ComponentRef::Symbolic),
            meta: route.meta.clone(),
            children: route.child_routes().iter().map(RawRoute::from).collect(),
        }
    }
}

impl<V: Clone> MaterializedRoute<V> {
    /// 转回物化前的形式，组件以已解析的加载器表示
    pub fn to_raw(&self) -> RawRoute<V> {
        RouteNode {
            path: self.path.clone(),
            name: self.name.clone(),
            component: self.component.clone().map(ComponentRef::Loader),
            meta: self.meta.clone(),
            children: self.children.iter().map(MaterializedRoute::to_raw).collect(),
        }
    }
}

// =========================================================
// 路径工具
// =========================================================

/// 规范化为以单个 `/` 开头、无尾部 `/`、无空段的绝对路径
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// 拼接父路径与子路径，两者之间恰好一个 `/`，与输入的首尾斜杠无关
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    normalize_path(&format!("{}/{}", parent, child))
}

// =========================================================
// 权限过滤
// =========================================================

/// 移除 `meta.permission` 未被授予的节点（连同其整棵子树）
pub fn filter_permitted<F>(routes: &[RouteDescriptor], granted: &F) -> Vec<RouteDescriptor>
where
    F: Fn(&str) -> bool,
{
    routes
        .iter()
        .filter(|route| {
            route
                .meta
                .permission
                .as_deref()
                .is_none_or(|tag| granted(tag))
        })
        .map(|route| {
            let mut route = route.clone();
            if let Some(children) = route.children.take() {
                route.children = Some(filter_permitted(&children, granted));
            }
            route
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path_single_separator() {
        assert_eq!(join_path("/system", "list"), "/system/list");
        assert_eq!(join_path("/system/", "/list"), "/system/list");
        assert_eq!(join_path("system", "list/"), "/system/list");
        assert_eq!(join_path("/template/form", "basic"), "/template/form/basic");
        assert_eq!(join_path("/", "dashboard"), "/dashboard");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("dashboard"), "/dashboard");
        assert_eq!(normalize_path("//a//b/"), "/a/b");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_filter_permitted_drops_subtree() {
        let routes = vec![
            RouteDescriptor::new("/dashboard", "Dashboard").component("dashboard/DashboardView"),
            RouteDescriptor::new("/system", "System")
                .permission("system:view")
                .children(vec![
                    RouteDescriptor::new("list", "UserList").component("users/UserListView"),
                ]),
            RouteDescriptor::new("/content", "Content").children(vec![
                RouteDescriptor::new("list", "ContentList")
                    .component("content/ListView")
                    .permission("content:view"),
                RouteDescriptor::new("audit", "ContentAudit")
                    .component("content/AuditView")
                    .permission("content:audit"),
            ]),
        ];

        let granted = |tag: &str| tag == "content:view";
        let filtered = filter_permitted(&routes, &granted);

        let names: Vec<&str> = filtered.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Dashboard", "Content"]);
        let content_children: Vec<&str> = filtered[1]
            .child_routes()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(content_children, vec!["ContentList"]);
    }

    #[test]
    fn test_names_depth_first() {
        let raw: RawRoute<()> = RawRoute::from(
            &RouteDescriptor::new("/a", "A").children(vec![
                RouteDescriptor::new("b", "B").children(vec![RouteDescriptor::new("c", "C")]),
                RouteDescriptor::new("d", "D"),
            ]),
        );
        assert_eq!(raw.names(), vec!["A", "B", "C", "D"]);
    }
}
