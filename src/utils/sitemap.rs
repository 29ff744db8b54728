// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use thiserror::Error;

/// 站点地图解析错误
#[derive(Error, Debug)]
pub enum SitemapError {
    /// XML格式错误
    #[error("Malformed sitemap XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// 解析后的站点地图文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset><url><loc>`
    UrlSet(Vec<String>),
    /// `<sitemapindex><sitemap><loc>`
    Index(Vec<String>),
    /// 其他XML结构，视为零个URL
    Unknown,
}

impl SitemapDocument {
    pub fn is_empty(&self) -> bool {
        match self {
            SitemapDocument::UrlSet(urls) | SitemapDocument::Index(urls) => urls.is_empty(),
            SitemapDocument::Unknown => true,
        }
    }
}

/// 解析站点地图
///
/// 只收集 `<url>` 或 `<sitemap>` 直接子元素中的 `<loc>`，忽略命名空间前缀，
/// 因此 `<image:loc>` 之类的扩展不会混入结果
pub fn parse_sitemap(xml: &[u8]) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut root: Option<Vec<u8>> = None;
    let mut locs: Vec<String> = Vec::new();
    let mut current = String::new();

    let in_loc = |stack: &[Vec<u8>]| -> bool {
        let n = stack.len();
        n >= 2
            && stack[n - 1] == b"loc"
            && (stack[n - 2] == b"url" || stack[n - 2] == b"sitemap")
    };

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if root.is_none() {
                    root = Some(name.clone());
                }
                stack.push(name);
                if in_loc(&stack) {
                    current.clear();
                }
            }
            XmlEvent::End(_) => {
                if in_loc(&stack) {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                    current.clear();
                }
                stack.pop();
            }
            XmlEvent::Text(t) => {
                if in_loc(&stack) {
                    current.push_str(&t.unescape()?);
                }
            }
            XmlEvent::CData(c) => {
                if in_loc(&stack) {
                    current.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(match root.as_deref() {
        Some(b"urlset") => SitemapDocument::UrlSet(locs),
        Some(b"sitemapindex") => SitemapDocument::Index(locs),
        _ => SitemapDocument::Unknown,
    })
}
