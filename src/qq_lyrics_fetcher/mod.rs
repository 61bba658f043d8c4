pub mod decrypto;
pub mod qqmodel;

use base64::Engine;
use serde_json::Value;

use crate::qq_lyrics_fetcher::decrypto::{QrcVariant, decrypt_qrc};
use crate::qq_lyrics_fetcher::qqmodel::{MusicuResponse, PLAY_LYRIC_INFO_KEY, PlainLyricResponse};
use crate::types::{ConvertError, RawLyricRecord, TrackIssue, TrackKind};

/// 解密后的三条轨道，以及解密过程中被降级为空轨道的问题。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptedLyrics {
    pub record: RawLyricRecord,
    pub issues: Vec<TrackIssue>,
}

/// 响应中是否包含逐字歌词接口的结果。
pub fn is_word_by_word_response(json: &Value) -> bool {
    json.get(PLAY_LYRIC_INFO_KEY).is_some()
}

/// 从逐字歌词接口的响应中取出并解密三条轨道。
///
/// 任意一条轨道解密失败都只会让该轨道变为空，并记录一条 [`TrackIssue::TrackUnavailable`]；
/// 只有响应本身结构不对或接口返回错误码时才返回 `Err`。
pub fn parse_word_by_word_lyrics(json: &Value) -> Result<DecryptedLyrics, ConvertError> {
    let response: MusicuResponse = serde_json::from_value(json.clone())?;
    let info = response.play_lyric_info.ok_or_else(|| {
        ConvertError::InvalidJsonStructure(format!("缺少 '{PLAY_LYRIC_INFO_KEY}' 字段"))
    })?;

    if info.code != 0 {
        return Err(ConvertError::QQMusicApi(format!(
            "歌词接口返回代码 {}",
            info.code
        )));
    }
    let data = info
        .data
        .ok_or_else(|| ConvertError::InvalidJsonStructure("缺少 'data' 字段".to_string()))?;

    if let Some(song_id) = data.song_id {
        log::debug!("[QQ 歌词] 解析歌曲 {song_id} 的逐字歌词");
    }

    let encrypted = RawLyricRecord {
        lyric: data.lyric,
        trans: data.trans,
        roma: data.roma,
    };
    Ok(decrypt_record(&encrypted, QrcVariant::Cloud))
}

/// 逐条解密记录中的三条轨道。空字段原样保留为空。
pub fn decrypt_record(encrypted: &RawLyricRecord, variant: QrcVariant) -> DecryptedLyrics {
    let mut result = DecryptedLyrics::default();

    for track in [
        TrackKind::Original,
        TrackKind::Translation,
        TrackKind::Romanization,
    ] {
        let payload = encrypted.get(track).trim();
        if payload.is_empty() {
            continue;
        }

        let text = match decrypt_qrc(payload.as_bytes(), variant) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("[QQ 歌词] {track} 轨道解密失败，按空轨道处理: {e}");
                result.issues.push(TrackIssue::TrackUnavailable {
                    track,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match track {
            TrackKind::Original => result.record.lyric = text,
            TrackKind::Translation => result.record.trans = text,
            TrackKind::Romanization => result.record.roma = text,
        }
    }

    result
}

/// 解析普通歌词接口的响应，歌词与翻译为 Base64 编码的 LRC 文本。
pub fn parse_plain_lyrics(json: &Value) -> Result<RawLyricRecord, ConvertError> {
    let response: PlainLyricResponse = serde_json::from_value(json.clone())?;
    if response.code != 0 {
        return Err(ConvertError::QQMusicApi(format!(
            "歌词接口返回代码 {}",
            response.code
        )));
    }

    Ok(RawLyricRecord {
        lyric: decode_base64_text(&response.lyric)?,
        trans: decode_base64_text(&response.trans)?,
        roma: String::new(),
    })
}

/// 字段是否看起来是 Base64 编码的内容，而不是明文歌词。
///
/// 明文 LRC 与 QRC 总会包含 `[` 或 `<`，二者都不在 Base64 字母表中。
pub fn looks_like_base64(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=' | b'\r' | b'\n'))
}

fn decode_base64_text(encoded: &str) -> Result<String, ConvertError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(String::new());
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qq_lyrics_fetcher::decrypto::encrypt_qrc;
    use serde_json::json;

    fn hex(text: &str) -> String {
        String::from_utf8(encrypt_qrc(text, QrcVariant::Cloud).unwrap()).unwrap()
    }

    #[test]
    fn word_by_word_response_is_decrypted() {
        let response = json!({
            "code": 0,
            PLAY_LYRIC_INFO_KEY: {
                "code": 0,
                "data": {
                    "songID": 12345,
                    "lyric": hex("[0,500]Hello(0,200)World(300,200)"),
                    "trans": hex("[00:00.00]你好世界"),
                    "roma": ""
                }
            }
        });

        assert!(is_word_by_word_response(&response));
        let decrypted = parse_word_by_word_lyrics(&response).unwrap();
        assert_eq!(decrypted.record.lyric, "[0,500]Hello(0,200)World(300,200)");
        assert_eq!(decrypted.record.trans, "[00:00.00]你好世界");
        assert!(decrypted.record.roma.is_empty());
        assert!(decrypted.issues.is_empty());
    }

    #[test]
    fn broken_track_degrades_to_empty() {
        let response = json!({
            PLAY_LYRIC_INFO_KEY: {
                "data": {
                    "lyric": hex("[0,100]a(0,100)"),
                    "trans": "ZZZZ",
                    "roma": "00112233"
                }
            }
        });

        let decrypted = parse_word_by_word_lyrics(&response).unwrap();
        assert_eq!(decrypted.record.lyric, "[0,100]a(0,100)");
        assert!(decrypted.record.trans.is_empty());
        assert!(decrypted.record.roma.is_empty());
        assert_eq!(decrypted.issues.len(), 2);
        assert!(decrypted.issues.iter().all(|issue| matches!(
            issue,
            TrackIssue::TrackUnavailable { .. }
        )));
    }

    #[test]
    fn api_error_code_is_reported() {
        let response = json!({ PLAY_LYRIC_INFO_KEY: { "code": 2001 } });
        assert!(matches!(
            parse_word_by_word_lyrics(&response),
            Err(ConvertError::QQMusicApi(_))
        ));

        let missing = json!({ "code": 0 });
        assert!(!is_word_by_word_response(&missing));
        assert!(matches!(
            parse_word_by_word_lyrics(&missing),
            Err(ConvertError::InvalidJsonStructure(_))
        ));
    }

    #[test]
    fn plain_response_is_base64_decoded() {
        let engine = base64::engine::general_purpose::STANDARD;
        let response = json!({
            "code": 0,
            "lyric": engine.encode("[ti:歌]\n[00:01.00]第一行"),
            "trans": ""
        });

        let record = parse_plain_lyrics(&response).unwrap();
        assert_eq!(record.lyric, "[ti:歌]\n[00:01.00]第一行");
        assert!(record.trans.is_empty());

        let bad = json!({ "code": 0, "lyric": "!!!" });
        assert!(matches!(
            parse_plain_lyrics(&bad),
            Err(ConvertError::Base64Decode(_))
        ));
    }

    #[test]
    fn base64_detection() {
        assert!(looks_like_base64("W3RpOnRlc3Rd"));
        assert!(!looks_like_base64("[00:01.00]abc"));
        assert!(!looks_like_base64(r#"<?xml version="1.0"?>"#));
        assert!(!looks_like_base64("   "));
    }
}
