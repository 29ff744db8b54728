// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 发现阶段直接跳过的文件扩展名
pub const SKIPPED_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif",
    // audio / video
    "mp3", "mp4", "wav", "ogg", "webm", "mov", "avi", "mkv", "m4a", "flac",
    // archives
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv", "txt",
    // assets
    "css", "js", "mjs", "json", "map", "woff", "woff2", "ttf", "otf", "eot",
    // feeds and xml
    "xml", "rss", "atom",
    // binaries
    "exe", "dmg", "apk", "iso", "bin",
];

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 规范化用户输入的根URL
///
/// 缺少协议时补全 `https://`，只保留 `scheme://host[:port]`
///
/// # 返回值
///
/// * `Some(Url)` - 根URL，路径为 `/`
/// * `None` - 无法解析、缺少主机或协议不是 http(s)
pub fn normalize_root(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }

    let root = match parsed.port() {
        Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
        None => format!("{}://{}/", parsed.scheme(), host),
    };
    Url::parse(&root).ok()
}

/// 去掉末尾斜杠的根URL字符串，便于拼接路径
pub fn root_origin(root: &Url) -> String {
    root.as_str().trim_end_matches('/').to_string()
}

/// 两个URL的主机和端口是否一致
///
/// 主机按忽略大小写精确比较，`www.` 子域视为不同主机
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => {
            ha.eq_ignore_ascii_case(hb) && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

/// 路径是否以跳过列表中的扩展名结尾
pub fn has_skipped_extension(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            SKIPPED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// 用于去重的键
///
/// 去掉片段，非根路径忽略末尾斜杠
pub fn dedupe_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    let s = url.to_string();
    if url.path() == "/" && url.query().is_none() {
        s
    } else {
        s.trim_end_matches('/').to_string()
    }
}
