//! 文本清洗工具

/// 合并连续空白为单个空格并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按字符数截断，只有超过上限时才截断
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// 小写并合并空白，用于宽松比较
pub fn normalize(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}
