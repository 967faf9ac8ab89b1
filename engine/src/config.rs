//! 运行时配置
//!
//! 默认值以常量给出，部署时可通过环境变量覆盖（浏览器端在构建期注入）。

use admin_console_shared::SESSION_STORAGE_KEY;

use crate::guard::GuardConfig;

const DEFAULT_APP_TITLE: &str = "Admin UI";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_LANDING_PATH: &str = "/dashboard";
/// 未设置 `meta.sort` 的路由排在所有显式排序之后
pub const DEFAULT_ROUTE_SORT: i32 = 999;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const NOT_FOUND_PATH: &str = "/404";

/// 抽象环境变量接口
pub trait EnvAdapter {
    fn var(&self, name: &str) -> Option<String>;
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub app_title: String,
    pub api_base_url: String,
    pub storage_key: String,
    /// 已登录用户的默认落地页
    pub landing_path: String,
    /// 使用内置的模拟认证后端
    pub use_mock_api: bool,
    pub default_route_sort: i32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            app_title: DEFAULT_APP_TITLE.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_key: SESSION_STORAGE_KEY.to_string(),
            landing_path: DEFAULT_LANDING_PATH.to_string(),
            use_mock_api: true,
            default_route_sort: DEFAULT_ROUTE_SORT,
        }
    }
}

impl ConsoleConfig {
    pub fn from_env(env: &impl EnvAdapter) -> Self {
        let defaults = Self::default();
        Self {
            app_title: env.var("CONSOLE_APP_TITLE").unwrap_or(defaults.app_title),
            api_base_url: env
                .var("CONSOLE_API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            storage_key: env
                .var("CONSOLE_STORAGE_KEY")
                .unwrap_or(defaults.storage_key),
            landing_path: env
                .var("CONSOLE_LANDING_PATH")
                .filter(|p| p.starts_with('/'))
                .unwrap_or(defaults.landing_path),
            use_mock_api: env
                .var("CONSOLE_USE_MOCK_API")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(defaults.use_mock_api),
            default_route_sort: env
                .var("CONSOLE_DEFAULT_ROUTE_SORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.default_route_sort),
        }
    }

    /// 预先注册的静态路由路径，动态路由不得覆盖
    pub fn static_paths(&self) -> Vec<String> {
        vec![
            ROOT_PATH.to_string(),
            LOGIN_PATH.to_string(),
            NOT_FOUND_PATH.to_string(),
        ]
    }

    pub fn guard(&self) -> GuardConfig {
        GuardConfig {
            app_title: self.app_title.clone(),
            login_path: LOGIN_PATH.to_string(),
            not_found_path: NOT_FOUND_PATH.to_string(),
            landing_path: self.landing_path.clone(),
            allow_list: vec![LOGIN_PATH.to_string(), NOT_FOUND_PATH.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockEnv(HashMap<String, String>);

    impl MockEnv {
        fn new(vars: &[(&str, &str)]) -> Self {
            Self(
                vars.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        }
    }

    impl EnvAdapter for MockEnv {
        fn var(&self, name: &str) -> Option<String> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ConsoleConfig::from_env(&MockEnv::new(&[]));
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.storage_key, "user-store");
        assert_eq!(config.guard().app_title, "Admin UI");
    }

    #[test]
    fn test_env_overrides() {
        let config = ConsoleConfig::from_env(&MockEnv::new(&[
            ("CONSOLE_API_BASE_URL", "https://api.example.com/v1/"),
            ("CONSOLE_USE_MOCK_API", "false"),
            ("CONSOLE_LANDING_PATH", "home"),
            ("CONSOLE_DEFAULT_ROUTE_SORT", "10000"),
        ]));
        assert_eq!(config.api_base_url, "https://api.example.com/v1");
        assert!(!config.use_mock_api);
        // 非绝对路径被忽略
        assert_eq!(config.landing_path, "/dashboard");
        assert_eq!(config.default_route_sort, 10000);
    }
}
