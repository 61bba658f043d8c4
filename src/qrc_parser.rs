// QRC 逐字歌词的解析。
//
// 解密后的 QRC 通常是一段 XML，歌词正文放在 `LyricContent` 属性里，换行被写成字面量 `\n`。
// 正文中每一行形如 `[行开始,行时长]音节(开始,时长)音节(开始,时长)...`，
// 元数据行形如 `[ti:标题]`。
//
// 解析分两步：先把正文切成行级记号 (`QrcToken`)，再从行体中提取音节 (`extract_words`)。

use std::borrow::Cow;

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::{Captures, Regex};

use crate::types::{DecodedTrack, HeaderLine, LyricLine, TimedWord, TrackIssue, TrackKind};

// '&' 及其后可能跟随的实体，捕获组 1 不存在时说明是未转义的 '&'
static AMPERSAND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7};|#x[0-9a-fA-F]{1,6};|[a-zA-Z]{2,8};)?")
        .expect("未能编译 AMPERSAND_REGEX")
});

// 行级时间戳 "[12345,5000]"，其后为行体
static QRC_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?P<start>\d+),(?P<duration>\d+)\](?P<body>.*)$")
        .expect("未能编译 QRC_LINE_REGEX")
});

// 音节 "文本(开始,时长)"，文本中不能含有半角括号
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<text>[^()]+)\((?P<start>\d+),(?P<duration>\d+)\)")
        .expect("未能编译 WORD_REGEX")
});

// 需要原样保留的元数据标签
static HEADER_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:ti|ar|al|by|offset):").expect("未能编译 HEADER_TAG_REGEX")
});

static HEADER_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?:ti|ar|al|by|offset):").expect("未能编译 HEADER_LINE_REGEX")
});

/// 解密后 QRC 外壳的前缀。
const XML_DECLARATION_PREFIX: &str = "<?xml";
const QRC_INFOS_PREFIX: &str = "<QrcInfos";

const LYRIC_CONTENT_ATTR: &str = "LyricContent";
const LYRIC_CONTENT_OPEN: &str = "LyricContent=\"";

/// 从行体中提取出的单个音节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrcWord {
    pub text: String,
    pub start_ms: u64,
    pub duration_ms: u64,
}

/// 歌词正文切分后的行级记号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrcToken<'a> {
    /// `[ti:...]` 之类的元数据行，保存去掉行尾换行符后的原文。
    Header(&'a str),
    /// 带行时间戳的歌词行。
    Timed {
        line_num: usize,
        start_ms: u64,
        duration_ms: u64,
        body: Cow<'a, str>,
    },
    /// 无法识别的行。
    Unrecognized { line_num: usize, text: &'a str },
}

/// 判断原始文本是否带有 QRC 的 XML 外壳。
pub fn is_xml_wrapped(raw: &str) -> bool {
    let trimmed = raw.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with(XML_DECLARATION_PREFIX) || trimmed.starts_with(QRC_INFOS_PREFIX)
}

/// 从 XML 外壳中取出 `LyricContent` 属性的内容。
///
/// 字面量 `\r\n` 与 `\n` 会被还原成真正的换行，XML 实体会被反转义。
/// 歌词中未转义的 `"` 与 `&` 会先被修复，因此不会截断正文。
/// 找不到该属性或属性为空时返回 `None`。
pub fn unwrap_lyric_content(raw: &str) -> Option<String> {
    let repaired = repair_lyric_attribute(raw.trim_start_matches('\u{feff}'));
    let content = read_lyric_attribute(&repaired).or_else(|| slice_lyric_attribute(&repaired))?;
    if content.is_empty() {
        return None;
    }
    Some(content.replace("\\r\\n", "\n").replace("\\n", "\n"))
}

/// 转义游离的 `&`，并把 `LyricContent` 属性值内部的 `"` 改写为 `&quot;`。
///
/// 属性值的结尾取最后一个紧跟着标签结束符 (`>` 或 `/>`) 的引号。
fn repair_lyric_attribute(raw: &str) -> String {
    let text = AMPERSAND_REGEX.replace_all(raw, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            "&amp;".to_string()
        }
    });

    let Some(open) = text.find(LYRIC_CONTENT_OPEN) else {
        return text.into_owned();
    };
    let content_start = open + LYRIC_CONTENT_OPEN.len();
    let rest = &text[content_start..];
    let Some(close) = rest.rmatch_indices('"').map(|(i, _)| i).find(|&i| {
        let after = rest[i + 1..].trim_start();
        after.starts_with("/>") || after.starts_with('>')
    }) else {
        return text.into_owned();
    };

    let content = &rest[..close];
    if !content.contains('"') {
        return text.into_owned();
    }
    log::debug!("[QRC 解析] LyricContent 中含有未转义的引号，已修复");
    format!(
        "{}{}{}",
        &text[..content_start],
        content.replace('"', "&quot;"),
        &rest[close..]
    )
}

/// 用 quick-xml 读取第一个带 `LyricContent` 属性的元素。
fn read_lyric_attribute(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                if let Ok(Some(attr)) = e.try_get_attribute(LYRIC_CONTENT_ATTR)
                    && let Ok(value) = attr.decode_and_unescape_value(reader.decoder())
                {
                    return Some(value.into_owned());
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::debug!("[QRC 解析] quick-xml 解析失败，改为直接截取属性: {e}");
                return None;
            }
            _ => {}
        }
    }
}

/// XML 无法解析时，直接截取属性值并尽量反转义。
fn slice_lyric_attribute(xml: &str) -> Option<String> {
    let start = xml.find(LYRIC_CONTENT_OPEN)? + LYRIC_CONTENT_OPEN.len();
    let len = xml[start..].find('"')?;
    let content = &xml[start..start + len];

    // 个别来源的正文里含有不合法的实体，此时保留原文
    match quick_xml::escape::unescape(content) {
        Ok(unescaped) => Some(unescaped.into_owned()),
        Err(e) => {
            log::debug!("[QRC 解析] LyricContent 反转义失败，保留原文: {e}");
            Some(content.to_string())
        }
    }
}

/// 判断一段没有 XML 外壳的文本是否仍是逐字格式（存在 `[开始,时长]` 行）。
pub fn looks_like_word_level(content: &str) -> bool {
    content
        .lines()
        .any(|line| QRC_LINE_REGEX.is_match(line.trim()))
}

/// 判断一行文本是否为需要保留的元数据行。
pub fn is_header_line(line: &str) -> bool {
    HEADER_LINE_REGEX.is_match(line.trim_start())
}

/// 把歌词正文切分成行级记号。
///
/// 不以 `[` 开头的非空行视为上一行歌词的延续，直接拼接到上一行的行体后面。
pub fn tokenize(content: &str) -> Vec<QrcToken<'_>> {
    let mut tokens: Vec<QrcToken<'_>> = Vec::new();

    for (i, raw_line) in content.split('\n').enumerate() {
        let line_num = i + 1;
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_header_line(trimmed) {
            tokens.push(QrcToken::Header(trimmed));
            continue;
        }

        if let Some(caps) = QRC_LINE_REGEX.captures(trimmed) {
            let start = caps.name("start").map_or("", |m| m.as_str()).parse::<u64>();
            let duration = caps
                .name("duration")
                .map_or("", |m| m.as_str())
                .parse::<u64>();
            match (start, duration) {
                (Ok(start_ms), Ok(duration_ms)) => {
                    let body = caps.name("body").map_or("", |m| m.as_str());
                    tokens.push(QrcToken::Timed {
                        line_num,
                        start_ms,
                        duration_ms,
                        body: Cow::Borrowed(body),
                    });
                }
                _ => tokens.push(QrcToken::Unrecognized {
                    line_num,
                    text: trimmed,
                }),
            }
            continue;
        }

        if !trimmed.starts_with('[')
            && let Some(QrcToken::Timed { body, .. }) = tokens.last_mut()
        {
            body.to_mut().push_str(trimmed);
            continue;
        }

        tokens.push(QrcToken::Unrecognized {
            line_num,
            text: trimmed,
        });
    }

    tokens
}

/// 从行体中依次提取 `文本(开始,时长)` 形式的音节。
///
/// 不符合格式的片段会被跳过；时间数值溢出的音节同样被跳过。
pub fn extract_words(body: &str) -> Vec<QrcWord> {
    WORD_REGEX
        .captures_iter(body)
        .filter_map(|caps| {
            let text = caps.name("text")?.as_str();
            let start_ms = caps.name("start")?.as_str().parse().ok()?;
            let duration_ms = caps.name("duration")?.as_str().parse().ok()?;
            Some(QrcWord {
                text: text.to_string(),
                start_ms,
                duration_ms,
            })
        })
        .collect()
}

/// 解析逐字格式的歌词正文（已去掉 XML 外壳）。
///
/// 只有原文轨道会收集元数据行，其他轨道的元数据行直接忽略。
pub fn parse_word_level(content: &str, track: TrackKind) -> DecodedTrack {
    let mut decoded = DecodedTrack::default();

    for token in tokenize(content) {
        match token {
            QrcToken::Header(text) => {
                if track == TrackKind::Original {
                    decoded.headers.push(HeaderLine(text.to_string()));
                }
            }
            QrcToken::Timed {
                line_num,
                start_ms,
                duration_ms,
                body,
            } => {
                if let Some(m) = HEADER_TAG_REGEX.find(&body) {
                    if track == TrackKind::Original {
                        decoded
                            .headers
                            .push(HeaderLine(body[m.start()..].trim().to_string()));
                    }
                    continue;
                }

                let words = extract_words(&body);
                if words.is_empty() {
                    log::debug!("[QRC 解析] 行 {line_num}: 没有解析出任何音节，已丢弃");
                    decoded.issues.push(TrackIssue::EmptyContent { line_num });
                    continue;
                }

                decoded.lines.push(LyricLine {
                    start_ms,
                    end_ms: start_ms.saturating_add(duration_ms),
                    track,
                    words: words
                        .into_iter()
                        .map(|w| TimedWord {
                            text: w.text,
                            start_ms: w.start_ms,
                        })
                        .collect(),
                });
            }
            QrcToken::Unrecognized { line_num, text } => {
                log::debug!("[QRC 解析] 行 {line_num}: 无法识别的行 '{text}'，已跳过");
                decoded.issues.push(TrackIssue::MalformedLine {
                    line_num,
                    text: text.to_string(),
                });
            }
        }
    }

    decoded
}
