use serde::Deserialize;

/// 逐字歌词接口在 `musicu.fcg` 合并请求中的键名。
pub const PLAY_LYRIC_INFO_KEY: &str = "music.musichallSong.PlayLyricInfo.GetPlayLyricInfo";

/// `musicu.fcg` 的顶层响应，只关心歌词部分。
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MusicuResponse {
    #[serde(default)]
    pub code: i32,
    #[serde(rename = "music.musichallSong.PlayLyricInfo.GetPlayLyricInfo", default)]
    pub play_lyric_info: Option<PlayLyricInfoResponse>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlayLyricInfoResponse {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub data: Option<PlayLyricInfoData>,
}

/// 三条轨道均为十六进制的加密文本，缺失时为空字符串。
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlayLyricInfoData {
    #[serde(default)]
    pub lyric: String,
    #[serde(default)]
    pub trans: String,
    #[serde(default)]
    pub roma: String,
    #[serde(alias = "songID", default)]
    pub song_id: Option<u64>,
}

/// 普通歌词接口的响应，歌词与翻译为 Base64 编码的 LRC。
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlainLyricResponse {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub lyric: String,
    #[serde(default)]
    pub trans: String,
}
