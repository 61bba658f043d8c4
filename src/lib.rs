//! 将 QQ 音乐的逐字歌词 (QRC) 与翻译、罗马音轨道合并为一份 LRC。
//!
//! 处理流程是单向的：原始文本 -> 逐轨道解码 -> 合并排序 -> LRC 文本。
//! 解码与合成均为纯函数，不持有任何全局可变状态，可以在多个线程中同时调用。

pub mod app_settings;
pub mod converter;
pub mod error;
pub mod logger;
pub mod lrc_generator;
pub mod lrc_parser;
pub mod lyrics_merger;
pub mod qq_lyrics_fetcher;
pub mod qrc_parser;
pub mod track_decoder;
pub mod types;
pub mod utils;

pub use lrc_generator::{render_line, synthesize};
pub use qq_lyrics_fetcher::decrypto::{QrcVariant, decrypt_qrc, encrypt_qrc};
pub use track_decoder::decode_track;
pub use types::{
    ConvertError, DecodedTrack, HeaderLine, LyricDocument, LyricLine, RawLyricRecord,
    SynthesisOptions, TRACK_PRECEDENCE, TimedWord, TrackIssue, TrackKind,
};
pub use utils::{ms_to_timestamp, timestamp_to_ms};
