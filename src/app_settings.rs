use directories::ProjectDirs;
use ini::Ini;
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOGGING_SECTION: &str = "Logging";
const OUTPUT_SECTION: &str = "Output";
const CONFIG_FILE_NAME: &str = "qmlrc.ini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub enable_file_log: bool,
    pub file_log_level: LevelFilter,
    pub console_log_level: LevelFilter,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            enable_file_log: false,
            file_log_level: LevelFilter::Info,
            console_log_level: LevelFilter::Info,
        }
    }
}

/// 输出相关的设置，命令行参数可以在单次运行中覆盖它们。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub include_romanization: bool,
    pub include_translation: bool,
    pub output_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            include_romanization: true,
            include_translation: true,
            output_dir: PathBuf::from("lrc_output"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSettings {
    pub log_settings: LogSettings,
    pub output_settings: OutputSettings,
}

/// 加载配置时产生的一条日志消息。
///
/// 配置需要在日志初始化之前读取，这些消息先被收集起来，日志就绪后再调用 [`SettingsNotice::emit`] 输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsNotice {
    pub level: log::Level,
    pub message: String,
}

impl SettingsNotice {
    fn new(level: log::Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn emit(&self) {
        log::log!(self.level, "{}", self.message);
    }
}

fn emit_all(notices: &[SettingsNotice]) {
    notices.iter().for_each(SettingsNotice::emit);
}

impl AppSettings {
    pub fn config_path() -> Option<PathBuf> {
        let mut notices = Vec::new();
        let path = resolve_config_path(&mut notices);
        emit_all(&notices);
        path
    }

    /// 从默认位置加载配置。文件不存在时写出一份默认配置。
    pub fn load() -> Self {
        let (settings, notices) = Self::load_deferred();
        emit_all(&notices);
        settings
    }

    /// 与 [`AppSettings::load`] 相同，但不直接写日志，而是把消息返回给调用方。
    pub fn load_deferred() -> (Self, Vec<SettingsNotice>) {
        let mut notices = Vec::new();
        let settings = match resolve_config_path(&mut notices) {
            Some(path) => Self::read_or_create(&path, &mut notices),
            None => {
                notices.push(SettingsNotice::new(
                    log::Level::Warn,
                    "无法确定配置文件路径。将使用运行时默认配置。",
                ));
                AppSettings::default()
            }
        };
        (settings, notices)
    }

    pub fn load_from_path(path: &Path) -> Self {
        let (settings, notices) = Self::load_from_path_deferred(path);
        emit_all(&notices);
        settings
    }

    pub fn load_from_path_deferred(path: &Path) -> (Self, Vec<SettingsNotice>) {
        let mut notices = Vec::new();
        let settings = Self::read_or_create(path, &mut notices);
        (settings, notices)
    }

    fn read_or_create(path: &Path, notices: &mut Vec<SettingsNotice>) -> Self {
        if !path.exists() {
            notices.push(SettingsNotice::new(
                log::Level::Info,
                format!("配置文件 {path:?} 未找到。将创建并使用默认配置。"),
            ));
            let default_settings = AppSettings::default();
            if let Err(e) = default_settings.write_ini(path) {
                notices.push(SettingsNotice::new(
                    log::Level::Error,
                    format!("无法保存初始默认配置文件到 {path:?}: {e}"),
                ));
            }
            return default_settings;
        }

        match Ini::load_from_file(path) {
            Ok(conf) => {
                let settings = Self::from_ini(&conf, notices);
                notices.push(SettingsNotice::new(
                    log::Level::Debug,
                    format!("从 {path:?} 加载配置成功。"),
                ));
                settings
            }
            Err(e) => {
                notices.push(SettingsNotice::new(
                    log::Level::Error,
                    format!("加载配置文件 {path:?} 失败: {e}。将使用默认配置。"),
                ));
                AppSettings::default()
            }
        }
    }

    fn from_ini(conf: &Ini, notices: &mut Vec<SettingsNotice>) -> Self {
        let log_defaults = LogSettings::default();
        let output_defaults = OutputSettings::default();
        let log_section = conf.section(Some(LOGGING_SECTION));
        let output_section = conf.section(Some(OUTPUT_SECTION));

        let log_settings = LogSettings {
            enable_file_log: read_value(log_section, "EnableFileLog", bool::from_str, notices)
                .unwrap_or(log_defaults.enable_file_log),
            file_log_level: read_value(log_section, "FileLogLevel", LevelFilter::from_str, notices)
                .unwrap_or(log_defaults.file_log_level),
            console_log_level: read_value(
                log_section,
                "ConsoleLogLevel",
                LevelFilter::from_str,
                notices,
            )
            .unwrap_or(log_defaults.console_log_level),
        };

        let output_settings = OutputSettings {
            include_romanization: read_value(
                output_section,
                "IncludeRomanization",
                bool::from_str,
                notices,
            )
            .unwrap_or(output_defaults.include_romanization),
            include_translation: read_value(
                output_section,
                "IncludeTranslation",
                bool::from_str,
                notices,
            )
            .unwrap_or(output_defaults.include_translation),
            output_dir: output_section
                .and_then(|s| s.get("OutputDir"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or(output_defaults.output_dir, PathBuf::from),
        };

        AppSettings {
            log_settings,
            output_settings,
        }
    }

    pub fn save(&self) -> Result<(), ini::Error> {
        if let Some(path) = Self::config_path() {
            self.save_to_path(&path)
        } else {
            let err_msg = "无法确定配置文件路径，保存失败。".to_string();
            log::error!("{err_msg}");
            Err(ini::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                err_msg,
            )))
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ini::Error> {
        match self.write_ini(path) {
            Ok(()) => {
                log::debug!("配置已保存到 {path:?}。");
                Ok(())
            }
            Err(write_error) => {
                log::error!("保存配置到 {path:?} 失败: {write_error}");
                Err(ini::Error::Io(write_error))
            }
        }
    }

    fn write_ini(&self, path: &Path) -> std::io::Result<()> {
        let mut conf = Ini::new();
        conf.with_section(Some(LOGGING_SECTION))
            .set(
                "EnableFileLog",
                self.log_settings.enable_file_log.to_string(),
            )
            .set("FileLogLevel", self.log_settings.file_log_level.to_string())
            .set(
                "ConsoleLogLevel",
                self.log_settings.console_log_level.to_string(),
            );
        conf.with_section(Some(OUTPUT_SECTION))
            .set(
                "IncludeRomanization",
                self.output_settings.include_romanization.to_string(),
            )
            .set(
                "IncludeTranslation",
                self.output_settings.include_translation.to_string(),
            )
            .set(
                "OutputDir",
                self.output_settings.output_dir.to_string_lossy(),
            );
        conf.write_to_file(path)
    }
}

fn resolve_config_path(notices: &mut Vec<SettingsNotice>) -> Option<PathBuf> {
    let Some(proj_dirs) = ProjectDirs::from("com", "qmlrc", "qmlrc") else {
        notices.push(SettingsNotice::new(
            log::Level::Error,
            "无法获取项目配置目录路径。",
        ));
        return None;
    };

    let config_dir = proj_dirs.config_dir();
    if !config_dir.exists()
        && let Err(e) = fs::create_dir_all(config_dir)
    {
        notices.push(SettingsNotice::new(
            log::Level::Error,
            format!("无法创建配置目录 {config_dir:?}: {e}"),
        ));
        return None;
    }
    Some(config_dir.join(CONFIG_FILE_NAME))
}

/// 读取并解析一个键；解析失败时记下一条警告并返回 `None`，由调用方使用默认值。
fn read_value<T, E>(
    section: Option<&ini::Properties>,
    key: &str,
    parse: impl Fn(&str) -> Result<T, E>,
    notices: &mut Vec<SettingsNotice>,
) -> Option<T> {
    let raw = section?.get(key)?;
    match parse(raw.trim()) {
        Ok(value) => Some(value),
        Err(_) => {
            notices.push(SettingsNotice::new(
                log::Level::Warn,
                format!("配置项 {key} 的值 '{raw}' 无效，将使用默认值。"),
            ));
            None
        }
    }
}
