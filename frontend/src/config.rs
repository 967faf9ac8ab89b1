//! 构建期配置
//!
//! 浏览器端没有进程环境变量，`CONSOLE_*` 在编译时通过 `option_env!` 注入。

use admin_console_engine::{ConsoleConfig, EnvAdapter};

pub struct BuildEnv;

impl EnvAdapter for BuildEnv {
    fn var(&self, name: &str) -> Option<String> {
        let value = match name {
            "CONSOLE_APP_TITLE" => option_env!("CONSOLE_APP_TITLE"),
            "CONSOLE_API_BASE_URL" => option_env!("CONSOLE_API_BASE_URL"),
            "CONSOLE_STORAGE_KEY" => option_env!("CONSOLE_STORAGE_KEY"),
            "CONSOLE_LANDING_PATH" => option_env!("CONSOLE_LANDING_PATH"),
            "CONSOLE_USE_MOCK_API" => option_env!("CONSOLE_USE_MOCK_API"),
            "CONSOLE_DEFAULT_ROUTE_SORT" => option_env!("CONSOLE_DEFAULT_ROUTE_SORT"),
            _ => None,
        };
        value.map(str::to_string)
    }
}

pub fn load() -> ConsoleConfig {
    ConsoleConfig::from_env(&BuildEnv)
}
