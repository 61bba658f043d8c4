//! 转换流程的最外层：读取输入，解码各轨道，合成 LRC，并写入 `.lrc` 文件。
//!
//! 这里是唯一会返回 [`ConvertError`] 的地方。任何错误都会让整份文档放弃输出，
//! 输出先写入目标目录中的临时文件，成功后才改名为最终文件，因此不会留下写了一半的 LRC。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::lrc_generator;
use crate::qq_lyrics_fetcher::decrypto::{QrcVariant, decrypt_qrc};
use crate::qq_lyrics_fetcher::{self, DecryptedLyrics};
use crate::track_decoder::decode_track;
use crate::types::{
    ConvertError, DecodedTrack, LyricDocument, RawLyricRecord, SynthesisOptions, TrackIssue,
    TrackKind,
};

/// 一条记录解码后的三条轨道。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedLyrics {
    pub original: DecodedTrack,
    pub romanization: DecodedTrack,
    pub translation: DecodedTrack,
}

impl DecodedLyrics {
    /// 所有轨道在解码时记录的问题。
    pub fn issues(&self) -> impl Iterator<Item = &TrackIssue> {
        self.original
            .issues
            .iter()
            .chain(&self.romanization.issues)
            .chain(&self.translation.issues)
    }
}

/// 分别解码记录中的三条轨道，彼此互不影响。
pub fn decode_record(record: &RawLyricRecord) -> DecodedLyrics {
    DecodedLyrics {
        original: decode_track(record.get(TrackKind::Original), TrackKind::Original),
        romanization: decode_track(record.get(TrackKind::Romanization), TrackKind::Romanization),
        translation: decode_track(record.get(TrackKind::Translation), TrackKind::Translation),
    }
}

/// 由解码结果构建文档。
pub fn build_document(decoded: &DecodedLyrics, options: &SynthesisOptions) -> LyricDocument {
    LyricDocument::build(
        &decoded.original.headers,
        &decoded.original.lines,
        Some(&decoded.romanization.lines),
        Some(&decoded.translation.lines),
        options,
    )
}

/// 将一条记录转换为 LRC 文本。
///
/// 只要有任意一条被选中的轨道产生了可输出的行就算成功；
/// 一行都没有时返回 [`ConvertError::NoLyrics`]。
pub fn convert_record(
    record: &RawLyricRecord,
    options: &SynthesisOptions,
) -> Result<String, ConvertError> {
    let decoded = decode_record(record);
    log_issues(&decoded);

    let document = build_document(&decoded, options);
    if document.is_empty() {
        return Err(ConvertError::NoLyrics);
    }
    document.to_lrc_string()
}

/// 从 JSON 中取出歌词记录。
///
/// 支持三种形式：
/// * 逐字歌词接口的响应，三条轨道为加密的十六进制文本；
/// * 普通歌词接口的响应，歌词与翻译为 Base64 编码；
/// * 已经解密好的 `{lyric, trans, roma}` 记录。
pub fn load_record(json: &Value) -> Result<DecryptedLyrics, ConvertError> {
    if qq_lyrics_fetcher::is_word_by_word_response(json) {
        log::debug!("[转换] 输入为逐字歌词接口响应");
        return qq_lyrics_fetcher::parse_word_by_word_lyrics(json);
    }

    let lyric_field = json.get("lyric").and_then(Value::as_str).unwrap_or_default();
    if qq_lyrics_fetcher::looks_like_base64(lyric_field) {
        log::debug!("[转换] 输入为 Base64 编码的普通歌词响应");
        return Ok(DecryptedLyrics {
            record: qq_lyrics_fetcher::parse_plain_lyrics(json)?,
            issues: Vec::new(),
        });
    }

    if !json.is_object() {
        return Err(ConvertError::InvalidJsonStructure(
            "顶层必须是 JSON 对象".to_string(),
        ));
    }
    Ok(DecryptedLyrics {
        record: serde_json::from_value(json.clone())?,
        issues: Vec::new(),
    })
}

/// 将 JSON 文本转换为 LRC 文本。
pub fn convert_json_str(json_text: &str, options: &SynthesisOptions) -> Result<String, ConvertError> {
    let json: Value = serde_json::from_str(json_text)?;
    let loaded = load_record(&json)?;
    for issue in &loaded.issues {
        log_issue(issue);
    }
    convert_record(&loaded.record, options)
}

/// 读取 JSON 文件，转换后写入 `output_dir/<文件名>.lrc`，返回输出路径。
pub fn convert_json_file(
    input: &Path,
    output_dir: &Path,
    options: &SynthesisOptions,
) -> Result<PathBuf, ConvertError> {
    let output_path = output_path_for(input, output_dir)?;
    let json_text = fs::read_to_string(input)?;
    let lrc = convert_json_str(&json_text, options)?;

    write_lrc_atomically(&output_path, &lrc)?;
    log::info!(
        "[转换] {} -> {}",
        input.display(),
        output_path.display()
    );
    Ok(output_path)
}

/// 读取加密的歌词文件（本地 `.qrc` 或云端十六进制文本），解密后作为原文轨道转换。
pub fn convert_encrypted_file(
    input: &Path,
    variant: QrcVariant,
    output_dir: &Path,
    options: &SynthesisOptions,
) -> Result<PathBuf, ConvertError> {
    let output_path = output_path_for(input, output_dir)?;
    let data = fs::read(input)?;
    let lyric = decrypt_qrc(&data, variant)?;

    let record = RawLyricRecord {
        lyric,
        ..Default::default()
    };
    let lrc = convert_record(&record, options)?;

    write_lrc_atomically(&output_path, &lrc)?;
    log::info!(
        "[转换] {} ({variant}) -> {}",
        input.display(),
        output_path.display()
    );
    Ok(output_path)
}

/// 输出文件路径：输出目录下与输入同名、扩展名为 `.lrc` 的文件。
pub fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError> {
    let stem = input
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| ConvertError::InvalidPath(input.display().to_string()))?;

    let mut path = output_dir.join(stem);
    path.set_extension("lrc");
    Ok(path)
}

/// 先写入同目录下的临时文件，全部写完后再替换为目标文件。
fn write_lrc_atomically(path: &Path, content: &str) -> Result<(), ConvertError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| ConvertError::Io(e.error))?;
    Ok(())
}

fn log_issues(decoded: &DecodedLyrics) {
    for issue in decoded.issues() {
        log_issue(issue);
    }
}

fn log_issue(issue: &TrackIssue) {
    let level = issue.severity();
    match issue {
        TrackIssue::TrackUnavailable { track, reason } => {
            log::log!(level, "[转换] {track} 轨道不可用: {reason}");
        }
        TrackIssue::MalformedLine { line_num, text } => {
            log::log!(level, "[转换] 跳过格式错误的行 {line_num}: '{text}'");
        }
        TrackIssue::EmptyContent { line_num } => {
            log::log!(level, "[转换] 丢弃空行 {line_num}");
        }
    }
}

/// 直接合成，不经过记录与文件。
pub fn synthesize_decoded(
    decoded: &DecodedLyrics,
    options: &SynthesisOptions,
) -> Result<String, ConvertError> {
    lrc_generator::synthesize(
        &decoded.original.lines,
        &decoded.original.headers,
        Some(&decoded.romanization.lines),
        Some(&decoded.translation.lines),
        options.include_romanization,
        options.include_translation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qq_lyrics_fetcher::decrypto::encrypt_qrc;

    const ORIGINAL_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?><QrcInfos><LyricInfo LyricCount="1"><Lyric_1 LyricType="1" LyricContent="[ti:TestSong]\n[0,500]Hello(0,200)World(300,200)\n"/></LyricInfo></QrcInfos>"#;

    fn record() -> RawLyricRecord {
        RawLyricRecord {
            lyric: ORIGINAL_XML.to_string(),
            trans: "[00:00.00]你好世界".to_string(),
            roma: String::new(),
        }
    }

    #[test]
    fn converts_record_with_translation() {
        let lrc = convert_record(&record(), &SynthesisOptions::default()).unwrap();
        assert_eq!(
            lrc,
            "[ti:TestSong]\n[00:00.000]Hello[00:00.300]World[00:00.500]\n[00:00.000]你好世界[00:05.000]\n"
        );
    }

    #[test]
    fn synthesize_decoded_matches_convert_record() {
        let options = SynthesisOptions {
            include_romanization: true,
            include_translation: false,
        };
        let decoded = decode_record(&record());
        assert_eq!(
            synthesize_decoded(&decoded, &options).unwrap(),
            convert_record(&record(), &options).unwrap()
        );
    }

    #[test]
    fn broken_original_still_converts_other_tracks() {
        let record = RawLyricRecord {
            lyric: r#"<?xml version="1.0"?><QrcInfos/>"#.to_string(),
            trans: "[00:01.00]只有翻译".to_string(),
            roma: String::new(),
        };
        let lrc = convert_record(&record, &SynthesisOptions::default()).unwrap();
        assert_eq!(lrc, "[00:01.000]只有翻译[00:06.000]\n");
    }

    #[test]
    fn nothing_renderable_is_fatal() {
        let record = RawLyricRecord::default();
        assert!(matches!(
            convert_record(&record, &SynthesisOptions::default()),
            Err(ConvertError::NoLyrics)
        ));

        // 只有翻译，但翻译没有被选中
        let record = RawLyricRecord {
            trans: "[00:01.00]x".to_string(),
            ..Default::default()
        };
        let options = SynthesisOptions {
            include_romanization: true,
            include_translation: false,
        };
        assert!(matches!(
            convert_record(&record, &options),
            Err(ConvertError::NoLyrics)
        ));
    }

    #[test]
    fn loads_all_json_shapes() {
        let plain_record = serde_json::json!({ "lyric": "[00:01.00]a" });
        assert_eq!(load_record(&plain_record).unwrap().record.lyric, "[00:01.00]a");

        let base64_response = serde_json::json!({ "code": 0, "lyric": "WzAwOjAxLjAwXWE=" });
        assert_eq!(
            load_record(&base64_response).unwrap().record.lyric,
            "[00:01.00]a"
        );

        let hex = String::from_utf8(encrypt_qrc("[0,100]a(0,100)", QrcVariant::Cloud).unwrap())
            .unwrap();
        let api_response = serde_json::json!({
            (qq_lyrics_fetcher::qqmodel::PLAY_LYRIC_INFO_KEY): { "code": 0, "data": { "lyric": hex } }
        });
        assert_eq!(
            load_record(&api_response).unwrap().record.lyric,
            "[0,100]a(0,100)"
        );

        assert!(load_record(&serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn output_path_uses_input_stem() {
        let path = output_path_for(Path::new("/in/歌曲 - 歌手.json"), Path::new("out")).unwrap();
        assert_eq!(path, Path::new("out").join("歌曲 - 歌手.lrc"));
        assert!(output_path_for(Path::new("/"), Path::new("out")).is_err());
    }

    #[test]
    fn file_conversion_writes_lrc() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.json");
        fs::write(&input, serde_json::to_string(&record()).unwrap()).unwrap();
        let out_dir = dir.path().join("lrc_output");

        let output = convert_json_file(&input, &out_dir, &SynthesisOptions::default()).unwrap();
        assert_eq!(output, out_dir.join("song.lrc"));
        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("[ti:TestSong]\n"));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn failed_conversion_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.json");
        fs::write(&input, r#"{"lyric":"","trans":"","roma":""}"#).unwrap();

        let result = convert_json_file(&input, dir.path(), &SynthesisOptions::default());
        assert!(matches!(result, Err(ConvertError::NoLyrics)));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("empty.json")]);
    }

    #[test]
    fn encrypted_local_file_is_converted() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("local.qrc");
        fs::write(&input, encrypt_qrc(ORIGINAL_XML, QrcVariant::Local).unwrap()).unwrap();

        let output =
            convert_encrypted_file(&input, QrcVariant::Local, dir.path(), &SynthesisOptions::default())
                .unwrap();
        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "[ti:TestSong]\n[00:00.000]Hello[00:00.300]World[00:00.500]\n"
        );
    }

    #[test]
    fn corrupt_encrypted_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.qrc");
        fs::write(&input, b"definitely not encrypted").unwrap();

        let result = convert_encrypted_file(
            &input,
            QrcVariant::Cloud,
            dir.path(),
            &SynthesisOptions::default(),
        );
        assert!(result.is_err());
        assert!(!dir.path().join("bad.lrc").exists());
    }
}
