use std::fs;

use qmlrc::converter::{convert_encrypted_file, convert_json_file};
use qmlrc::qq_lyrics_fetcher::qqmodel::PLAY_LYRIC_INFO_KEY;
use qmlrc::{ConvertError, QrcVariant, SynthesisOptions, encrypt_qrc};

fn hex(text: &str) -> String {
    String::from_utf8(encrypt_qrc(text, QrcVariant::Cloud).unwrap()).unwrap()
}

const ORIGINAL: &str = r#"<?xml version="1.0" encoding="utf-8"?><QrcInfos><LyricInfo LyricCount="1"><Lyric_1 LyricType="1" LyricContent="[ti:歌名]\n[ar:歌手]\n[0,800]こ(0,400)こ(400,400)\n[800,700]ろ(800,700)"/></LyricInfo></QrcInfos>"#;
const ROMA: &str = r#"<?xml version="1.0" encoding="utf-8"?><QrcInfos><LyricInfo LyricCount="1"><Lyric_1 LyricType="1" LyricContent="[ti:x]\n[0,800]ko (0,400)ko(400,400)\n[800,700]ro(800,700)"/></LyricInfo></QrcInfos>"#;

#[test]
fn api_response_file_is_decrypted_and_merged() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("心.json");
    let response = serde_json::json!({
        "code": 0,
        (PLAY_LYRIC_INFO_KEY): {
            "code": 0,
            "data": {
                "lyric": hex(ORIGINAL),
                "trans": hex("[00:00.00]心\n[00:00.80]//"),
                "roma": hex(ROMA)
            }
        }
    });
    fs::write(&input, response.to_string()).unwrap();

    let output = convert_json_file(&input, dir.path(), &SynthesisOptions::default()).unwrap();
    assert_eq!(output.file_name().unwrap(), "心.lrc");
    assert_eq!(
        fs::read_to_string(output).unwrap(),
        "[ti:歌名]\n\
         [ar:歌手]\n\
         [00:00.000]ko [00:00.400]ko[00:00.800]\n\
         [00:00.000]こ[00:00.400]こ[00:00.800]\n\
         [00:00.000]心[00:00.800]\n\
         [00:00.800]ro[00:01.500]\n\
         [00:00.800]ろ[00:01.500]\n"
    );
}

#[test]
fn selection_options_drop_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("record.json");
    let record = serde_json::json!({ "lyric": ORIGINAL, "roma": ROMA, "trans": "[00:00.00]心" });
    fs::write(&input, record.to_string()).unwrap();

    let options = SynthesisOptions {
        include_romanization: false,
        include_translation: false,
    };
    let output = convert_json_file(&input, &dir.path().join("out"), &options).unwrap();
    let content = fs::read_to_string(output).unwrap();
    assert_eq!(
        content,
        "[ti:歌名]\n[ar:歌手]\n[00:00.000]こ[00:00.400]こ[00:00.800]\n[00:00.800]ろ[00:01.500]\n"
    );
}

#[test]
fn invalid_json_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, "{ not json").unwrap();
    let out_dir = dir.path().join("out");

    let result = convert_json_file(&input, &out_dir, &SynthesisOptions::default());
    assert!(matches!(result, Err(ConvertError::JsonParse(_))));
    assert!(!out_dir.join("broken.lrc").exists());
}

#[test]
fn cloud_hex_file_is_converted() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cloud.txt");
    fs::write(&input, hex(ORIGINAL)).unwrap();

    let output = convert_encrypted_file(
        &input,
        QrcVariant::Cloud,
        dir.path(),
        &SynthesisOptions::default(),
    )
    .unwrap();
    let content = fs::read_to_string(output).unwrap();
    assert!(content.starts_with("[ti:歌名]\n[ar:歌手]\n[00:00.000]こ"));
}
