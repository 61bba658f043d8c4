// Copyright (c) 2025 [WXRIW]
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! QQ 音乐 QRC 歌词的解密与加密。
//!
//! **注意**：这里的 DES 并非标准实现，只是结构类似 DES 的私有分组密码，
//! 仅用于 QRC 歌词，不应用于任何安全用途。
//!
//! 云端歌词：十六进制文本 -> 三重 DES 解密 -> Zlib 解压 -> UTF-8。
//! 本地 `.qrc` 文件：跳过 11 字节文件头 -> QMC1 异或 -> 与云端相同的流程（输入是原始字节而非十六进制）。

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use once_cell::sync::Lazy;
use strum_macros::{Display, EnumString};

use crate::types::ConvertError;

/// 加密歌词的来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QrcVariant {
    /// 客户端缓存在本地的 `.qrc` 文件。
    Local,
    /// 歌词接口返回的十六进制字符串。
    #[default]
    Cloud,
}

const DES_BLOCK_SIZE: usize = 8;

/// 本地 `.qrc` 文件固定的文件头，不参与解密。
const LOCAL_HEADER: &[u8; 11] = b"[offset:0]\n";

/// QMC1 异或密钥。
#[rustfmt::skip]
const QMC1_KEY: [u8; 128] = [
    0xc3, 0x4a, 0xd6, 0xca, 0x90, 0x67, 0xf7, 0x52, 0xd8, 0xa1, 0x66, 0x62, 0x9f, 0x5b, 0x09, 0x00,
    0xc3, 0x5e, 0x95, 0x23, 0x9f, 0x13, 0x11, 0x7e, 0xd8, 0x92, 0x3f, 0xbc, 0x90, 0xbb, 0x74, 0x0e,
    0xc3, 0x47, 0x74, 0x3d, 0x90, 0xaa, 0x3f, 0x51, 0xd8, 0xf4, 0x11, 0x84, 0x9f, 0xde, 0x95, 0x1d,
    0xc3, 0xc6, 0x09, 0xd5, 0x9f, 0xfa, 0x66, 0xf9, 0xd8, 0xf0, 0xf7, 0xa0, 0x90, 0xa1, 0xd6, 0xf3,
    0xc3, 0xf3, 0xd6, 0xa1, 0x90, 0xa0, 0xf7, 0xf0, 0xd8, 0xf9, 0x66, 0xfa, 0x9f, 0xd5, 0x09, 0xc6,
    0xc3, 0x1d, 0x95, 0xde, 0x9f, 0x84, 0x11, 0xf4, 0xd8, 0x51, 0x3f, 0xaa, 0x90, 0x3d, 0x74, 0x47,
    0xc3, 0x0e, 0x74, 0xbb, 0x90, 0xbc, 0x3f, 0x92, 0xd8, 0x7e, 0x11, 0x13, 0x9f, 0x23, 0x95, 0x5e,
    0xc3, 0x00, 0x09, 0x5b, 0x9f, 0x62, 0x66, 0xa1, 0xd8, 0x52, 0xf7, 0x67, 0x90, 0xca, 0xd6, 0x4a,
];

static CODEC: Lazy<QrcCodec> = Lazy::new(QrcCodec::new);

/// 解密一段 QRC 歌词。
///
/// # Arguments
/// * `data` - `Cloud` 时为十六进制文本的字节；`Local` 时为 `.qrc` 文件的完整内容。
/// * `variant` - 数据来源。
///
/// # Returns
/// 解密、解压并去除 BOM 后的歌词文本。数据损坏时返回错误，调用方应将该轨道视为不可用。
pub fn decrypt_qrc(data: &[u8], variant: QrcVariant) -> Result<String, ConvertError> {
    let cipher = match variant {
        QrcVariant::Cloud => {
            let hex_text = std::str::from_utf8(data)
                .map_err(|e| ConvertError::Decryption(format!("十六进制文本不是有效的 UTF-8: {e}")))?;
            hex::decode(hex_text.trim())?
        }
        QrcVariant::Local => {
            if data.len() <= LOCAL_HEADER.len() {
                return Err(ConvertError::Decryption(format!(
                    "本地 QRC 数据过短: {} 字节",
                    data.len()
                )));
            }
            let mut body = data[LOCAL_HEADER.len()..].to_vec();
            qmc1_xor(&mut body);
            body
        }
    };

    if cipher.is_empty() || cipher.len() % DES_BLOCK_SIZE != 0 {
        return Err(ConvertError::Decryption(format!(
            "加密数据长度 {} 不是 {DES_BLOCK_SIZE} 的倍数",
            cipher.len()
        )));
    }

    let mut plain = vec![0u8; cipher.len()];
    for (out_block, in_block) in plain
        .chunks_exact_mut(DES_BLOCK_SIZE)
        .zip(cipher.chunks_exact(DES_BLOCK_SIZE))
    {
        CODEC.decrypt_block(in_block, out_block);
    }

    let decompressed = decompress(&plain)?;
    let text = String::from_utf8(decompressed)?;
    log::trace!("[QRC 解密] {variant} 歌词解密完成，长度 {}", text.len());
    Ok(text)
}

/// 加密歌词文本，输出格式与 [`decrypt_qrc`] 的输入一致。
///
/// `Cloud` 输出十六进制文本的字节，`Local` 输出带文件头的 `.qrc` 文件内容。
pub fn encrypt_qrc(plaintext: &str, variant: QrcVariant) -> Result<Vec<u8>, ConvertError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plaintext.as_bytes())?;
    let compressed = encoder.finish()?;

    let padded = zero_pad(compressed);
    let mut cipher = vec![0u8; padded.len()];
    for (out_block, in_block) in cipher
        .chunks_exact_mut(DES_BLOCK_SIZE)
        .zip(padded.chunks_exact(DES_BLOCK_SIZE))
    {
        CODEC.encrypt_block(in_block, out_block);
    }

    Ok(match variant {
        QrcVariant::Cloud => hex::encode_upper(cipher).into_bytes(),
        QrcVariant::Local => {
            qmc1_xor(&mut cipher);
            let mut file = Vec::with_capacity(LOCAL_HEADER.len() + cipher.len());
            file.extend_from_slice(LOCAL_HEADER);
            file.extend_from_slice(&cipher);
            file
        }
    })
}

/// QMC1 异或，加密与解密是同一个操作。
fn qmc1_xor(data: &mut [u8]) {
    for (i, byte) in data.iter_mut().enumerate() {
        let index = if i > 0x7FFF { i % 0x7FFF } else { i };
        *byte ^= QMC1_KEY[index & 0x7F];
    }
}

/// Zlib 解压，并去掉开头可能存在的 UTF-8 BOM。
fn decompress(data: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| ConvertError::Decryption(format!("Zlib 解压缩失败: {e}")))?;

    if decompressed.starts_with(&[0xEF, 0xBB, 0xBF]) {
        decompressed.drain(..3);
    }
    Ok(decompressed)
}

/// QQ 音乐使用零字节填充到块大小的整数倍。
fn zero_pad(mut data: Vec<u8>) -> Vec<u8> {
    let remainder = data.len() % DES_BLOCK_SIZE;
    if remainder != 0 {
        data.resize(data.len() + DES_BLOCK_SIZE - remainder, 0);
    }
    data
}

/// 三重 DES，每一级各有一套 16 轮的轮密钥。
struct QrcCodec {
    encrypt_stages: [des::KeySchedule; 3],
    decrypt_stages: [des::KeySchedule; 3],
}

impl QrcCodec {
    fn new() -> Self {
        use des::Mode::{Decrypt, Encrypt};

        Self {
            encrypt_stages: [
                des::key_schedule(des::KEY_1, Encrypt),
                des::key_schedule(des::KEY_2, Decrypt),
                des::key_schedule(des::KEY_3, Encrypt),
            ],
            decrypt_stages: [
                des::key_schedule(des::KEY_3, Decrypt),
                des::key_schedule(des::KEY_2, Encrypt),
                des::key_schedule(des::KEY_1, Decrypt),
            ],
        }
    }

    fn encrypt_block(&self, input: &[u8], output: &mut [u8]) {
        Self::run_stages(&self.encrypt_stages, input, output);
    }

    fn decrypt_block(&self, input: &[u8], output: &mut [u8]) {
        Self::run_stages(&self.decrypt_stages, input, output);
    }

    fn run_stages(stages: &[des::KeySchedule; 3], input: &[u8], output: &mut [u8]) {
        let mut block = [0u8; DES_BLOCK_SIZE];
        block.copy_from_slice(input);
        for schedule in stages {
            block = des::crypt_block(block, schedule);
        }
        output.copy_from_slice(&block);
    }
}

/// 非标准 DES 的全部细节。
mod des {
    use once_cell::sync::Lazy;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(super) enum Mode {
        Encrypt,
        Decrypt,
    }

    pub(super) type KeySchedule = [[u8; 6]; 16];

    pub(super) const KEY_1: &[u8; 8] = b"!@#)(*$%";
    pub(super) const KEY_2: &[u8; 8] = b"123ZXC!@";
    pub(super) const KEY_3: &[u8; 8] = b"!@#)(NHL";

    // SBOX2 第二行有两个 15，SBOX4 最后一行有两个 10，与标准 DES 不同
    #[rustfmt::skip]
    const S_BOXES: [[u8; 64]; 8] = [
        [
            14,  4, 13,  1,  2, 15, 11,  8,  3, 10,  6, 12,  5,  9,  0,  7,
             0, 15,  7,  4, 14,  2, 13,  1, 10,  6, 12, 11,  9,  5,  3,  8,
             4,  1, 14,  8, 13,  6,  2, 11, 15, 12,  9,  7,  3, 10,  5,  0,
            15, 12,  8,  2,  4,  9,  1,  7,  5, 11,  3, 14, 10,  0,  6, 13,
        ],
        [
            15,  1,  8, 14,  6, 11,  3,  4,  9,  7,  2, 13, 12,  0,  5, 10,
             3, 13,  4,  7, 15,  2,  8, 15, 12,  0,  1, 10,  6,  9, 11,  5,
             0, 14,  7, 11, 10,  4, 13,  1,  5,  8, 12,  6,  9,  3,  2, 15,
            13,  8, 10,  1,  3, 15,  4,  2, 11,  6,  7, 12,  0,  5, 14,  9,
        ],
        [
            10,  0,  9, 14,  6,  3, 15,  5,  1, 13, 12,  7, 11,  4,  2,  8,
            13,  7,  0,  9,  3,  4,  6, 10,  2,  8,  5, 14, 12, 11, 15,  1,
            13,  6,  4,  9,  8, 15,  3,  0, 11,  1,  2, 12,  5, 10, 14,  7,
             1, 10, 13,  0,  6,  9,  8,  7,  4, 15, 14,  3, 11,  5,  2, 12,
        ],
        [
             7, 13, 14,  3,  0,  6,  9, 10,  1,  2,  8,  5, 11, 12,  4, 15,
            13,  8, 11,  5,  6, 15,  0,  3,  4,  7,  2, 12,  1, 10, 14,  9,
            10,  6,  9,  0, 12, 11,  7, 13, 15,  1,  3, 14,  5,  2,  8,  4,
             3, 15,  0,  6, 10, 10, 13,  8,  9,  4,  5, 11, 12,  7,  2, 14,
        ],
        [
             2, 12,  4,  1,  7, 10, 11,  6,  8,  5,  3, 15, 13,  0, 14,  9,
            14, 11,  2, 12,  4,  7, 13,  1,  5,  0, 15, 10,  3,  9,  8,  6,
             4,  2,  1, 11, 10, 13,  7,  8, 15,  9, 12,  5,  6,  3,  0, 14,
            11,  8, 12,  7,  1, 14,  2, 13,  6, 15,  0,  9, 10,  4,  5,  3,
        ],
        [
            12,  1, 10, 15,  9,  2,  6,  8,  0, 13,  3,  4, 14,  7,  5, 11,
            10, 15,  4,  2,  7, 12,  9,  5,  6,  1, 13, 14,  0, 11,  3,  8,
             9, 14, 15,  5,  2,  8, 12,  3,  7,  0,  4, 10,  1, 13, 11,  6,
             4,  3,  2, 12,  9,  5, 15, 10, 11, 14,  1,  7,  6,  0,  8, 13,
        ],
        [
             4, 11,  2, 14, 15,  0,  8, 13,  3, 12,  9,  7,  5, 10,  6,  1,
            13,  0, 11,  7,  4,  9,  1, 10, 14,  3,  5, 12,  2, 15,  8,  6,
             1,  4, 11, 13, 12,  3,  7, 14, 10, 15,  6,  8,  0,  5,  9,  2,
             6, 11, 13,  8,  1,  4, 10,  7,  9,  5,  0, 15, 14,  2,  3, 12,
        ],
        [
            13,  2,  8,  4,  6, 15, 11,  1, 10,  9,  3, 14,  5,  0, 12,  7,
             1, 15, 13,  8, 10,  3,  7,  4, 12,  5,  6, 11,  0, 14,  9,  2,
             7, 11,  4,  1,  9, 12, 14,  2,  0,  6, 10, 13, 15,  3,  5,  8,
             2,  1, 14,  7,  4, 10,  8, 13, 15, 12,  9,  0,  3,  5,  6, 11,
        ],
    ];

    #[rustfmt::skip]
    const P_BOX: [u8; 32] = [
        16,  7, 20, 21, 29, 12, 28, 17,
         1, 15, 23, 26,  5, 18, 31, 10,
         2,  8, 24, 14, 32, 27,  3,  9,
        19, 13, 30,  6, 22, 11,  4, 25,
    ];

    #[rustfmt::skip]
    const E_BOX: [u8; 48] = [
        32,  1,  2,  3,  4,  5,
         4,  5,  6,  7,  8,  9,
         8,  9, 10, 11, 12, 13,
        12, 13, 14, 15, 16, 17,
        16, 17, 18, 19, 20, 21,
        20, 21, 22, 23, 24, 25,
        24, 25, 26, 27, 28, 29,
        28, 29, 30, 31, 32,  1,
    ];

    #[rustfmt::skip]
    const IP_RULE: [u8; 64] = [
        34, 42, 50, 58, 2, 10, 18, 26,
        36, 44, 52, 60, 4, 12, 20, 28,
        38, 46, 54, 62, 6, 14, 22, 30,
        40, 48, 56, 64, 8, 16, 24, 32,
        33, 41, 49, 57, 1,  9, 17, 25,
        35, 43, 51, 59, 3, 11, 19, 27,
        37, 45, 53, 61, 5, 13, 21, 29,
        39, 47, 55, 63, 7, 15, 23, 31,
    ];

    #[rustfmt::skip]
    const INV_IP_RULE: [u8; 64] = [
        37, 5, 45, 13, 53, 21, 61, 29,
        38, 6, 46, 14, 54, 22, 62, 30,
        39, 7, 47, 15, 55, 23, 63, 31,
        40, 8, 48, 16, 56, 24, 64, 32,
        33, 1, 41,  9, 49, 17, 57, 25,
        34, 2, 42, 10, 50, 18, 58, 26,
        35, 3, 43, 11, 51, 19, 59, 27,
        36, 4, 44, 12, 52, 20, 60, 28,
    ];

    const KEY_RND_SHIFT: [u32; 16] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

    // 置换选择 1，C、D 两部分
    #[rustfmt::skip]
    const PC1_C: [usize; 28] = [
        56, 48, 40, 32, 24, 16,  8,
         0, 57, 49, 41, 33, 25, 17,
         9,  1, 58, 50, 42, 34, 26,
        18, 10,  2, 59, 51, 43, 35,
    ];
    #[rustfmt::skip]
    const PC1_D: [usize; 28] = [
        62, 54, 46, 38, 30, 22, 14,
         6, 61, 53, 45, 37, 29, 21,
        13,  5, 60, 52, 44, 36, 28,
        20, 12,  4, 27, 19, 11,  3,
    ];

    // 置换选择 2
    #[rustfmt::skip]
    const PC2: [usize; 48] = [
        13, 16, 10, 23,  0,  4,  2, 27,
        14,  5, 20,  9, 22, 18, 11,  3,
        25,  7, 15,  6, 26, 19, 12,  1,
        40, 51, 30, 36, 46, 54, 29, 39,
        50, 44, 32, 47, 43, 48, 38, 55,
        33, 52, 45, 41, 49, 35, 28, 31,
    ];

    /// S 盒与 P 盒合并后的查找表。
    static SP_TABLES: Lazy<[[u32; 64]; 8]> = Lazy::new(|| {
        let mut tables = [[0u32; 64]; 8];
        for (box_idx, table) in tables.iter_mut().enumerate() {
            for (input, entry) in table.iter_mut().enumerate() {
                let output = S_BOXES[box_idx][sbox_index(input as u8)];
                *entry = permute_u32(u32::from(output) << (28 - box_idx * 4), &P_BOX);
            }
        }
        tables
    });

    /// 6 位输入 `b5 b4 b3 b2 b1 b0` 重排为 `b5 b0 b4 b3 b2 b1`。
    const fn sbox_index(a: u8) -> usize {
        ((a & 0x20) | ((a & 0x1f) >> 1) | ((a & 0x01) << 4)) as usize
    }

    /// 按 1 起始、高位在前的置换表重排 64 位。
    fn permute_u64(input: u64, rule: &[u8; 64]) -> u64 {
        rule.iter().enumerate().fold(0u64, |acc, (i, &src)| {
            acc | (((input >> (64 - u32::from(src))) & 1) << (63 - i))
        })
    }

    fn permute_u32(input: u32, rule: &[u8; 32]) -> u32 {
        rule.iter().enumerate().fold(0u32, |acc, (i, &src)| {
            acc | (((input >> (32 - u32::from(src))) & 1) << (31 - i))
        })
    }

    /// E 盒扩展，结果位于返回值的低 48 位。
    fn expand(input: u32) -> u64 {
        E_BOX.iter().enumerate().fold(0u64, |acc, (i, &src)| {
            acc | (u64::from((input >> (32 - u32::from(src))) & 1) << (47 - i))
        })
    }

    /// 按 PC-1 取位。密钥按两个小端序 u32 读取，这是该算法的特殊之处。
    fn permute_key_bits(key: &[u8; 8], table: &[usize; 28]) -> u32 {
        let high = u32::from_le_bytes([key[0], key[1], key[2], key[3]]);
        let low = u32::from_le_bytes([key[4], key[5], key[6], key[7]]);
        let key = (u64::from(high) << 32) | u64::from(low);

        table.iter().enumerate().fold(0u32, |acc, (i, &pos)| {
            acc | ((((key >> (63 - pos)) & 1) as u32) << (27 - i))
        })
    }

    /// 对存放在 u32 高 28 位的半密钥做循环左移。
    const fn rotate_28(value: u32, amount: u32) -> u32 {
        ((value << amount) | (value >> (28 - amount))) & 0xFFFF_FFF0
    }

    /// 生成 16 轮轮密钥，解密模式下顺序相反。
    pub(super) fn key_schedule(key: &[u8; 8], mode: Mode) -> KeySchedule {
        let mut c = permute_key_bits(key, &PC1_C) << 4;
        let mut d = permute_key_bits(key, &PC1_D) << 4;
        let mut schedule = [[0u8; 6]; 16];

        for (round, &shift) in KEY_RND_SHIFT.iter().enumerate() {
            c = rotate_28(c, shift);
            d = rotate_28(d, shift);

            let mut subkey = 0u64;
            for (k, &pos) in PC2.iter().enumerate() {
                // D 部分的下标按 pos - 27 计算
                let bit = if pos < 28 {
                    (c >> (31 - pos)) & 1
                } else {
                    (d >> (31 - (pos - 27))) & 1
                };
                subkey |= u64::from(bit) << (47 - k);
            }

            let slot = match mode {
                Mode::Encrypt => round,
                Mode::Decrypt => 15 - round,
            };
            schedule[slot].copy_from_slice(&subkey.to_be_bytes()[2..]);
        }

        schedule
    }

    fn feistel(state: u32, subkey: &[u8; 6]) -> u32 {
        let key = u64::from_be_bytes([
            0, 0, subkey[0], subkey[1], subkey[2], subkey[3], subkey[4], subkey[5],
        ]);
        let mixed = expand(state) ^ key;

        SP_TABLES
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, table)| {
                acc | table[((mixed >> (42 - i * 6)) & 0x3F) as usize]
            })
    }

    /// 处理一个 8 字节块。最后一轮不交换左右两半。
    pub(super) fn crypt_block(input: [u8; 8], schedule: &KeySchedule) -> [u8; 8] {
        let permuted = permute_u64(u64::from_be_bytes(input), &IP_RULE);
        let mut left = (permuted >> 32) as u32;
        let mut right = permuted as u32;

        for subkey in &schedule[..15] {
            let next_right = left ^ feistel(right, subkey);
            left = right;
            right = next_right;
        }
        left ^= feistel(right, &schedule[15]);

        let joined = (u64::from(left) << 32) | u64::from(right);
        permute_u64(joined, &INV_IP_RULE).to_be_bytes()
    }

}
