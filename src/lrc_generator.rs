use crate::lyrics_merger::merge_tracks;
use crate::types::{ConvertError, HeaderLine, LyricDocument, LyricLine, SynthesisOptions};
use crate::utils::format_lrc_time_ms;
use std::fmt::Write as FmtWrite; // 用于向 String 写入格式化文本

impl LyricDocument {
    /// 合并各轨道并构建最终文档，构建之后不再修改。
    ///
    /// 合并结果中没有可输出内容的行会在这里被过滤掉。
    pub fn build(
        headers: &[HeaderLine],
        original: &[LyricLine],
        romanization: Option<&[LyricLine]>,
        translation: Option<&[LyricLine]>,
        options: &SynthesisOptions,
    ) -> Self {
        let lines = merge_tracks(original, romanization, translation, options)
            .into_iter()
            .filter(LyricLine::has_renderable_content)
            .collect();

        Self {
            headers: headers.to_vec(),
            lines,
        }
    }

    /// 是否没有任何可输出的歌词行（元数据行不算）。
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 序列化为 LRC 文本。元数据行在前，每一行都以换行符结尾。
    pub fn to_lrc_string(&self) -> Result<String, ConvertError> {
        let mut lrc_output = String::new();

        for header in &self.headers {
            // 无论原来以何种换行结尾，都统一为一个 '\n'
            let text = header.as_str().trim_end_matches(['\r', '\n']);
            writeln!(lrc_output, "{text}")?;
        }

        for line in &self.lines {
            // 输出前再检查一次，防止不同路径构造的文档带入空行
            if !line.has_renderable_content() {
                continue;
            }
            writeln!(lrc_output, "{}", render_line(line))?;
        }

        Ok(lrc_output)
    }
}

/// 将一行歌词渲染为 LRC 文本（不含换行符）。
///
/// 逐字行输出为 `[开始]第一个字[时间]第二个字...[结束]`，第一个字不带自己的时间标签；
/// 普通行只有一个音节，输出为 `[开始]内容[结束]`。
pub fn render_line(line: &LyricLine) -> String {
    let mut out = format_lrc_time_ms(line.start_ms);

    for (idx, word) in line.words.iter().enumerate() {
        if idx > 0 {
            out.push_str(&format_lrc_time_ms(word.start_ms));
        }
        out.push_str(&word.text);
    }

    out.push_str(&format_lrc_time_ms(line.end_ms));
    out
}

/// 将解码后的各轨道合成为一份 LRC 文本。
///
/// # Arguments
/// * `original` - 原文轨道的歌词行。
/// * `headers` - 原文轨道中的元数据行，按原顺序输出在最前面。
/// * `romanization` - 罗马音轨道，可以缺失。
/// * `translation` - 翻译轨道，可以缺失。
/// * `include_roma` - 是否输出罗马音。
/// * `include_trans` - 是否输出翻译。
///
/// # Returns
/// 任何一条轨道的数据问题都不会导致失败；只有写入缓冲区出错时才返回 `Err`。
pub fn synthesize(
    original: &[LyricLine],
    headers: &[HeaderLine],
    romanization: Option<&[LyricLine]>,
    translation: Option<&[LyricLine]>,
    include_roma: bool,
    include_trans: bool,
) -> Result<String, ConvertError> {
    let options = SynthesisOptions {
        include_romanization: include_roma,
        include_translation: include_trans,
    };
    LyricDocument::build(headers, original, romanization, translation, &options).to_lrc_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TimedWord, TrackKind};

    fn word_line(start_ms: u64, end_ms: u64, words: &[(&str, u64)]) -> LyricLine {
        LyricLine {
            start_ms,
            end_ms,
            track: TrackKind::Original,
            words: words
                .iter()
                .map(|(text, start)| TimedWord {
                    text: (*text).to_string(),
                    start_ms: *start,
                })
                .collect(),
        }
    }

    #[test]
    fn renders_word_level_line() {
        let line = word_line(0, 500, &[("Hello", 0), ("World", 300)]);
        assert_eq!(render_line(&line), "[00:00.000]Hello[00:00.300]World[00:00.500]");
    }

    #[test]
    fn renders_plain_line() {
        let line = LyricLine::plain(TrackKind::Translation, 5000, 10_000, "line two");
        assert_eq!(render_line(&line), "[00:05.000]line two[00:10.000]");
    }

    #[test]
    fn headers_come_first_with_single_newline() {
        let headers = vec![
            HeaderLine("[ti:TestSong]".to_string()),
            HeaderLine("[ar:Someone]\r\n".to_string()),
        ];
        let original = vec![word_line(0, 500, &[("Hello", 0), ("World", 300)])];

        let output = synthesize(&original, &headers, None, None, true, true).unwrap();
        assert_eq!(
            output,
            "[ti:TestSong]\n[ar:Someone]\n[00:00.000]Hello[00:00.300]World[00:00.500]\n"
        );
    }

    #[test]
    fn excluded_tracks_do_not_appear() {
        let original = vec![LyricLine::plain(TrackKind::Original, 0, 1000, "o")];
        let roma = vec![LyricLine::plain(TrackKind::Romanization, 0, 1000, "r")];
        let trans = vec![LyricLine::plain(TrackKind::Translation, 0, 1000, "t")];

        let output = synthesize(&original, &[], Some(&roma), Some(&trans), false, false).unwrap();
        assert_eq!(output, "[00:00.000]o[00:01.000]\n");

        let output = synthesize(&original, &[], Some(&roma), Some(&trans), true, true).unwrap();
        assert_eq!(
            output,
            "[00:00.000]r[00:01.000]\n[00:00.000]o[00:01.000]\n[00:00.000]t[00:01.000]\n"
        );
    }

    #[test]
    fn unrenderable_lines_are_filtered_at_build_and_render() {
        let original = vec![
            LyricLine::plain(TrackKind::Original, 0, 1000, "   "),
            LyricLine::plain(TrackKind::Original, 1000, 2000, "// 注释"),
            LyricLine::plain(TrackKind::Original, 2000, 3000, "ok"),
        ];
        let doc = LyricDocument::build(&[], &original, None, None, &SynthesisOptions::default());
        assert_eq!(doc.lines().len(), 1);

        // 直接构造的文档同样不会输出空行
        let raw_doc = LyricDocument {
            headers: Vec::new(),
            lines: original,
        };
        assert_eq!(raw_doc.to_lrc_string().unwrap(), "[00:02.000]ok[00:03.000]\n");
    }

    #[test]
    fn empty_document_renders_empty_string() {
        let doc = LyricDocument::build(&[], &[], None, None, &SynthesisOptions::default());
        assert!(doc.is_empty());
        assert_eq!(doc.to_lrc_string().unwrap(), "");
    }
}
