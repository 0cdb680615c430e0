//! 观测性初始化。

pub mod events;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::ClientConfig;

const LOG_FILE_PREFIX: &str = "interview-room.log";

/// 安装全局订阅者：控制台 fmt 输出，外加可选的按天滚动 JSON 文件日志。
///
/// 返回的 guard 需要在进程生命周期内持有，否则文件日志会丢失尾部记录。
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer);

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set global subscriber: {err}");
    }

    guard
}

/// 按客户端配置初始化，`INTERVIEW_LOG_DIR` 存在时开启文件日志。
pub fn init_tracing_from_config(config: &ClientConfig) -> Option<WorkerGuard> {
    init_tracing(config.log_dir.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_logging_returns_guard() {
        let dir = tempdir().expect("temp dir");
        let guard = init_tracing(Some(dir.path()));
        assert!(guard.is_some());

        // 重复初始化只会打印警告，不会 panic。
        assert!(init_tracing(None).is_none());
    }

    #[test]
    fn client_config_log_dir_enables_file_logging() {
        let dir = tempdir().expect("temp dir");
        let mut config = ClientConfig::new("https://api.example.com");
        config.log_dir = Some(dir.path().to_path_buf());

        assert!(init_tracing_from_config(&config).is_some());

        config.log_dir = None;
        assert!(init_tracing_from_config(&config).is_none());
    }
}
