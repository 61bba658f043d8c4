use crate::qrc_parser::is_header_line;
use crate::types::{DecodedTrack, HeaderLine, LyricLine, TrackIssue, TrackKind};
use crate::utils::try_timestamp_to_ms;
use once_cell::sync::Lazy;
use regex::Regex;

/// 最后一行普通歌词没有后继行可参考时使用的时长。
///
/// 这是一个固定的策略值，并非从歌词数据中推算得出。
pub const TRAILING_LINE_DURATION_MS: u64 = 5000;

static LRC_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?P<time>\d{2,}:\d{2}(?:\.\d{1,3})?)\](?P<text>.*)$")
        .expect("未能编译 LRC_LINE_REGEX")
});

/// 一条匹配到时间戳的原始行，尚未过滤空行与注释。
struct TimedEntry {
    line_num: usize,
    start_ms: u64,
    text: String,
}

/// 解析 `[mm:ss.cc]文本` 形式的普通 LRC 轨道。
///
/// 每一行的结束时间取同一轨道中下一条时间戳行的开始时间（即使那一行随后因为为空或是注释被丢弃），
/// 最后一行使用 [`TRAILING_LINE_DURATION_MS`]。
/// 内容为空或以 `//` 开头的行不会出现在结果中。
pub fn parse_plain(content: &str, track: TrackKind) -> DecodedTrack {
    let mut decoded = DecodedTrack::default();
    let mut entries: Vec<TimedEntry> = Vec::new();

    for (i, raw_line) in content.split('\n').enumerate() {
        let line_num = i + 1;
        let line_str = raw_line.trim();
        if line_str.is_empty() {
            continue;
        }

        if let Some(caps) = LRC_LINE_REGEX.captures(line_str) {
            let time_str = caps.name("time").map_or("", |m| m.as_str());
            match try_timestamp_to_ms(time_str) {
                Some(start_ms) => entries.push(TimedEntry {
                    line_num,
                    start_ms,
                    text: caps.name("text").map_or("", |m| m.as_str()).to_string(),
                }),
                None => {
                    log::debug!("[LRC 解析] 行 {line_num}: 无效的时间戳 '{time_str}'");
                    decoded.issues.push(TrackIssue::MalformedLine {
                        line_num,
                        text: line_str.to_string(),
                    });
                }
            }
            continue;
        }

        if is_header_line(line_str) {
            if track == TrackKind::Original {
                decoded.headers.push(HeaderLine(line_str.to_string()));
            }
            continue;
        }

        // 不以 '[' 开头的行属于上一行歌词
        if !line_str.starts_with('[')
            && let Some(last) = entries.last_mut()
        {
            last.text.push(' ');
            last.text.push_str(line_str);
            continue;
        }

        log::debug!("[LRC 解析] 行 {line_num}: 跳过未识别的行: '{line_str}'");
        decoded.issues.push(TrackIssue::MalformedLine {
            line_num,
            text: line_str.to_string(),
        });
    }

    for (idx, entry) in entries.iter().enumerate() {
        let content = entry.text.trim();
        if content.is_empty() || content.starts_with("//") {
            decoded.issues.push(TrackIssue::EmptyContent {
                line_num: entry.line_num,
            });
            continue;
        }

        let end_ms = entries.get(idx + 1).map_or_else(
            || entry.start_ms.saturating_add(TRAILING_LINE_DURATION_MS),
            |next| next.start_ms,
        );

        decoded
            .lines
            .push(LyricLine::plain(track, entry.start_ms, end_ms, content));
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_times_come_from_next_line_or_trailer() {
        let decoded = parse_plain(
            "[00:00.00]line one\n[00:05.00]line two",
            TrackKind::Translation,
        );
        assert_eq!(decoded.lines.len(), 2);
        assert_eq!(decoded.lines[0].start_ms, 0);
        assert_eq!(decoded.lines[0].end_ms, 5000);
        assert_eq!(decoded.lines[0].text(), "line one");
        assert_eq!(decoded.lines[1].start_ms, 5000);
        assert_eq!(decoded.lines[1].end_ms, 10_000);
        assert!(decoded.headers.is_empty());
    }

    #[test]
    fn empty_and_comment_lines_are_dropped_but_still_bound_end_times() {
        let content = "[00:01.00]第一行\n[00:02.00]   \n[00:03.00]//\n[00:04.50]最后";
        let decoded = parse_plain(content, TrackKind::Translation);

        let texts: Vec<String> = decoded.lines.iter().map(LyricLine::text).collect();
        assert_eq!(texts, vec!["第一行", "最后"]);
        // 第一行的结束时间取紧随其后的（被丢弃的）空行
        assert_eq!(decoded.lines[0].end_ms, 2000);
        assert_eq!(decoded.lines[1].end_ms, 9500);
        assert_eq!(
            decoded.issues,
            vec![
                TrackIssue::EmptyContent { line_num: 2 },
                TrackIssue::EmptyContent { line_num: 3 },
            ]
        );
    }

    #[test]
    fn accepts_three_digit_fraction_and_trims_content() {
        let decoded = parse_plain("[01:02.345]  hi  \r\n", TrackKind::Romanization);
        assert_eq!(decoded.lines.len(), 1);
        assert_eq!(decoded.lines[0].start_ms, 62_345);
        assert_eq!(decoded.lines[0].text(), "hi");
        assert_eq!(decoded.lines[0].track, TrackKind::Romanization);
    }

    #[test]
    fn headers_collected_only_for_original() {
        let content = "[ti:歌名]\n[ar:歌手]\n[00:01.00]a";
        let original = parse_plain(content, TrackKind::Original);
        assert_eq!(original.headers.len(), 2);
        assert_eq!(original.headers[0].as_str(), "[ti:歌名]");

        let translation = parse_plain(content, TrackKind::Translation);
        assert!(translation.headers.is_empty());
        assert_eq!(translation.lines.len(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let decoded = parse_plain(
            "[xx:yy]bad\n[00:01.00]good\n[kana:abc]",
            TrackKind::Translation,
        );
        assert_eq!(decoded.lines.len(), 1);
        assert_eq!(decoded.issues.len(), 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let decoded = parse_plain("", TrackKind::Translation);
        assert!(decoded.is_empty());
        assert!(decoded.issues.is_empty());
    }
}
