// 项目内部通用的数据结构与错误类型。
use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// 转换过程中无法在局部恢复的错误。
///
/// 单行或单个轨道的问题不会走到这里，它们以 [`TrackIssue`] 的形式记录下来并被跳过。
/// 只有当整份文档无法生成时才会返回 `ConvertError`，此时不会写出任何 LRC 文件。
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    #[error("JSON 解析错误: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("JSON 结构无效: {0}")]
    InvalidJsonStructure(String),
    #[error("QQ音乐API返回错误: {0}")]
    QQMusicApi(String),
    #[error("格式错误: {0}")]
    Format(#[from] fmt::Error),
    #[error("Base64 解码错误: {0}")]
    Base64Decode(#[from] base64::DecodeError),
    #[error("无效的十六进制字符串: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("UTF-8 转换错误: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),
    #[error("歌词解密失败: {0}")]
    Decryption(String),
    #[error("所有轨道均没有可输出的歌词行")]
    NoLyrics,
    #[error("无效的输出路径: {0}")]
    InvalidPath(String),
}

/// 歌词轨道的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum TrackKind {
    #[strum(to_string = "original", serialize = "lyric")]
    Original,
    #[strum(to_string = "roma")]
    Romanization,
    #[strum(to_string = "trans")]
    Translation,
}

/// 同一时间戳下多条歌词行的输出顺序：罗马音、原文、翻译。
///
/// 合并逻辑只通过 [`TrackKind::precedence`] 读取这个顺序。
pub const TRACK_PRECEDENCE: [TrackKind; 3] = [
    TrackKind::Romanization,
    TrackKind::Original,
    TrackKind::Translation,
];

impl TrackKind {
    /// 在 [`TRACK_PRECEDENCE`] 中的位置，数值越小越靠前。
    pub fn precedence(self) -> usize {
        TRACK_PRECEDENCE
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(TRACK_PRECEDENCE.len())
    }
}

/// 一个逐字音节（或一个单词）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedWord {
    pub text: String,
    pub start_ms: u64,
}

/// 一行带时间的歌词，来自三种轨道中的某一种。
///
/// 逐字行的 `words` 按开始时间排列；普通 LRC 行只有一个元素，其 `start_ms` 等于行开始时间。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub start_ms: u64,
    pub end_ms: u64,
    pub track: TrackKind,
    pub words: Vec<TimedWord>,
}

impl LyricLine {
    /// 构造一行只有一段文本的普通歌词。
    pub fn plain(track: TrackKind, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms: end_ms.max(start_ms),
            track,
            words: vec![TimedWord {
                text: text.into(),
                start_ms,
            }],
        }
    }

    /// 所有音节拼接后的文本。
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }

    /// 这一行是否还有可以输出的内容。
    ///
    /// 没有音节、去除空白后为空、或以 `//` 开头（注释约定）的行都不会被输出。
    pub fn has_renderable_content(&self) -> bool {
        if self.words.is_empty() {
            return false;
        }
        let text = self.text();
        let trimmed = text.trim();
        !trimmed.is_empty() && !trimmed.starts_with("//")
    }
}

/// 原文轨道中逐字保留的元数据行，例如 `[ti:歌名]`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine(pub String);

impl HeaderLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeaderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 输入中没有这条轨道时记录的原因。大多数歌曲没有罗马音，这不算异常。
pub const EMPTY_TRACK_REASON: &str = "轨道内容为空";

/// 解析单个轨道时遇到、但已经在局部处理掉的问题。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackIssue {
    /// 轨道缺失、解密失败或 XML 外壳中找不到歌词内容，整条轨道按空处理。
    TrackUnavailable { track: TrackKind, reason: String },
    /// 某一行与任何一种时间戳格式都不匹配，已跳过。
    MalformedLine { line_num: usize, text: String },
    /// 某一行匹配成功但没有可显示的文本，已丢弃。
    EmptyContent { line_num: usize },
}

impl TrackIssue {
    /// 记录这条问题时使用的日志级别。
    pub fn severity(&self) -> log::Level {
        match self {
            Self::TrackUnavailable { reason, .. } if reason == EMPTY_TRACK_REASON => {
                log::Level::Debug
            }
            Self::TrackUnavailable { .. } => log::Level::Warn,
            Self::MalformedLine { .. } => log::Level::Debug,
            Self::EmptyContent { .. } => log::Level::Trace,
        }
    }
}

/// 单个轨道的解析结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTrack {
    pub lines: Vec<LyricLine>,
    /// 只有原文轨道会收集元数据行。
    pub headers: Vec<HeaderLine>,
    pub issues: Vec<TrackIssue>,
}

impl DecodedTrack {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// 合并排序完成后的整份歌词，构建之后不再修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricDocument {
    pub(crate) headers: Vec<HeaderLine>,
    pub(crate) lines: Vec<LyricLine>,
}

impl LyricDocument {
    pub fn headers(&self) -> &[HeaderLine] {
        &self.headers
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }
}

/// 合成 LRC 时选择包含哪些附加轨道。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub include_romanization: bool,
    pub include_translation: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            include_romanization: true,
            include_translation: true,
        }
    }
}

/// 从歌词接口拿到（并已解密）的三条原始轨道文本。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLyricRecord {
    #[serde(default)]
    pub lyric: String,
    #[serde(default)]
    pub trans: String,
    #[serde(default)]
    pub roma: String,
}

impl RawLyricRecord {
    pub fn get(&self, track: TrackKind) -> &str {
        match track {
            TrackKind::Original => &self.lyric,
            TrackKind::Romanization => &self.roma,
            TrackKind::Translation => &self.trans,
        }
    }
}
