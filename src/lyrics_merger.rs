//! 把原文、罗马音、翻译三条独立计时的轨道合并为一条有序的歌词行序列。

use crate::types::{LyricLine, SynthesisOptions, TrackKind};

/// 按开始时间合并多条轨道。
///
/// 1. 按 `start_ms` 稳定排序。
/// 2. 开始时间完全相同的相邻行构成一个分组，组内按 [`crate::types::TRACK_PRECEDENCE`] 重新排列。
///
/// 同一轨道在同一时间点上出现多行时全部保留，保持它们在该轨道中的先后顺序。
pub fn merge_lines(mut lines: Vec<LyricLine>) -> Vec<LyricLine> {
    lines.sort_by_key(|line| line.start_ms);

    for bucket in lines.chunk_by_mut(|a, b| a.start_ms == b.start_ms) {
        if bucket.len() > 1 {
            bucket.sort_by_key(|line| line.track.precedence());
        }
    }

    lines
}

/// 根据选项收集需要输出的轨道，然后调用 [`merge_lines`]。
///
/// 原文轨道总是参与合并；未被选中或缺失的附加轨道直接忽略。
pub fn merge_tracks(
    original: &[LyricLine],
    romanization: Option<&[LyricLine]>,
    translation: Option<&[LyricLine]>,
    options: &SynthesisOptions,
) -> Vec<LyricLine> {
    let mut working: Vec<LyricLine> = original.to_vec();

    if options.include_romanization
        && let Some(roma) = romanization
    {
        working.extend_from_slice(roma);
    }
    if options.include_translation
        && let Some(trans) = translation
    {
        working.extend_from_slice(trans);
    }

    let merged = merge_lines(working);
    log::trace!(
        "[轨道合并] 合并后共 {} 行 (原文 {}, 罗马音 {}, 翻译 {})",
        merged.len(),
        count(&merged, TrackKind::Original),
        count(&merged, TrackKind::Romanization),
        count(&merged, TrackKind::Translation),
    );
    merged
}

fn count(lines: &[LyricLine], track: TrackKind) -> usize {
    lines.iter().filter(|line| line.track == track).count()
}
