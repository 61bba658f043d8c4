use chrono::Local;
use directories::ProjectDirs;
use fern::Dispatch;
use log::LevelFilter;
use once_cell::sync::OnceCell;
use std::fs;
use std::path::PathBuf;

use crate::app_settings::LogSettings;

static LOG_FILE_PATH: OnceCell<Option<PathBuf>> = OnceCell::new();

fn get_log_file_path() -> Result<PathBuf, String> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "qmlrc", "qmlrc") {
        let log_dir = proj_dirs.data_local_dir();
        if !log_dir.exists() {
            fs::create_dir_all(log_dir)
                .map_err(|e| format!("无法创建日志目录 {log_dir:?}: {e}"))?;
        }
        Ok(log_dir.join("qmlrc.log"))
    } else {
        let current_dir_log_path = PathBuf::from("qmlrc.log");
        eprintln!("无法获取项目日志目录，将尝试在当前目录创建日志: {current_dir_log_path:?}");
        Ok(current_dir_log_path)
    }
}

/// 当前生效的日志文件路径；未启用文件日志或尚未初始化时为 `None`。
pub fn log_file_path() -> Option<&'static PathBuf> {
    LOG_FILE_PATH.get().and_then(Option::as_ref)
}

/// 初始化全局日志，只有第一次调用生效。
///
/// 控制台输出到 stderr，`verbose` 为真时控制台级别提升到 `Debug`。
pub fn init_logger(settings: &LogSettings, verbose: bool) {
    if LOG_FILE_PATH.get().is_some() {
        return;
    }

    let console_level = if verbose {
        settings.console_log_level.max(LevelFilter::Debug)
    } else {
        settings.console_log_level
    };

    let console_dispatch = Dispatch::new()
        .level(console_level)
        .chain(std::io::stderr());

    let mut final_dispatch = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
                record.level(),
                message
            ))
        })
        .level(LevelFilter::Trace)
        .chain(console_dispatch);

    let mut active_log_file = None;
    if settings.enable_file_log {
        match get_log_file_path().and_then(|path| {
            fern::log_file(&path)
                .map(|file| (path.clone(), file))
                .map_err(|e| format!("无法打开日志文件 {path:?}: {e}"))
        }) {
            Ok((path, log_file)) => {
                final_dispatch = final_dispatch.chain(
                    Dispatch::new()
                        .level(settings.file_log_level)
                        .chain(log_file),
                );
                active_log_file = Some(path);
            }
            Err(e) => {
                eprintln!("{e}。文件日志将被禁用。");
            }
        }
    }

    if LOG_FILE_PATH.set(active_log_file).is_err() {
        return;
    }

    if let Err(e) = final_dispatch.apply() {
        eprintln!("日志记录器初始化失败: {e}");
    } else if let Some(path) = log_file_path() {
        log::debug!("日志记录器已初始化。日志路径: {path:?}");
    } else {
        log::debug!("日志记录器已初始化 (文件日志已禁用)。");
    }
}
