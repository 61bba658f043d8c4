// 单个轨道的解码入口：判断时间戳格式，分派给对应的解析器，并把轨道级问题降级为空轨道。
use crate::lrc_parser;
use crate::qrc_parser;
use crate::types::{DecodedTrack, EMPTY_TRACK_REASON, TrackIssue, TrackKind};

/// 轨道文本采用的时间戳格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// 带 XML 外壳的逐字格式，需要先取出 `LyricContent`。
    WrappedWordLevel,
    /// 没有外壳、但每行以 `[开始,时长]` 开头的逐字格式。
    BareWordLevel,
    /// `[mm:ss.cc]文本` 形式的普通 LRC。
    Plain,
}

/// 根据原始文本判断格式。
pub fn detect_dialect(raw: &str) -> Dialect {
    if qrc_parser::is_xml_wrapped(raw) {
        Dialect::WrappedWordLevel
    } else if qrc_parser::looks_like_word_level(raw) {
        Dialect::BareWordLevel
    } else {
        Dialect::Plain
    }
}

/// 解码一条轨道。
///
/// 空输入、XML 外壳中缺少歌词内容等情况不会报错，只会得到一条空轨道，
/// 并在 `issues` 中留下一条 [`TrackIssue::TrackUnavailable`]。
///
/// # Arguments
/// * `raw` - 解密后的轨道文本，可以为空。
/// * `track` - 轨道种类，决定是否收集元数据行以及输出行的归属。
pub fn decode_track(raw: &str, track: TrackKind) -> DecodedTrack {
    if raw.trim().is_empty() {
        log::debug!("[轨道解码] {track} 轨道为空");
        return unavailable(track, EMPTY_TRACK_REASON);
    }

    let decoded = match detect_dialect(raw) {
        Dialect::WrappedWordLevel => match qrc_parser::unwrap_lyric_content(raw) {
            Some(content) => qrc_parser::parse_word_level(&content, track),
            None => {
                log::warn!("[轨道解码] 无法从 {track} 轨道的 XML 中提取歌词内容，按空轨道处理");
                return unavailable(track, "XML 中缺少 LyricContent 属性");
            }
        },
        Dialect::BareWordLevel => qrc_parser::parse_word_level(raw, track),
        Dialect::Plain => lrc_parser::parse_plain(raw, track),
    };

    let skipped = decoded
        .issues
        .iter()
        .filter(|issue| !matches!(issue, TrackIssue::TrackUnavailable { .. }))
        .count();
    log::debug!(
        "[轨道解码] {track} 轨道: {} 行歌词, {} 行元数据, 跳过 {skipped} 行",
        decoded.lines.len(),
        decoded.headers.len(),
    );

    decoded
}

/// 解密或获取轨道失败时使用，得到一条空轨道。
pub fn unavailable(track: TrackKind, reason: impl Into<String>) -> DecodedTrack {
    DecodedTrack {
        issues: vec![TrackIssue::TrackUnavailable {
            track,
            reason: reason.into(),
        }],
        ..Default::default()
    }
}
