// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{mount_site, serve, site_url, sitemap_index, test_settings, urlset};
use seocrawl::domain::models::discovery::DiscoveryStrategy;
use seocrawl::domain::services::discovery_service::{DiscoveryError, DiscoveryService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn discovery() -> DiscoveryService {
    DiscoveryService::new(&test_settings().crawl).unwrap()
}

/// 站点地图中的页面按优先级排序
#[tokio::test]
async fn test_discover_from_sitemap() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let result = discovery().discover(&server.uri(), 10).await.unwrap();

    assert_eq!(result.strategy, DiscoveryStrategy::Sitemap);
    assert_eq!(
        result.urls,
        vec![
            site_url(&server, "/"),
            site_url(&server, "/about"),
            site_url(&server, "/services"),
            site_url(&server, "/blog/news"),
        ]
    );
    assert!(result.errors.is_empty());
}

/// 结果截断到请求的页面数
#[tokio::test]
async fn test_discover_respects_max_pages() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let result = discovery().discover(&server.uri(), 2).await.unwrap();

    assert_eq!(
        result.urls,
        vec![site_url(&server, "/"), site_url(&server, "/about")]
    );
}

/// 缺少 /sitemap.xml 时使用 robots.txt 中声明的站点地图
#[tokio::test]
async fn test_discover_from_robots_sitemap() {
    let server = MockServer::start().await;
    let robots = format!(
        "User-agent: *\nDisallow: /admin\n# marketing pages\nSitemap: {}\n",
        site_url(&server, "/pages-sitemap.xml")
    );
    serve(&server, "/robots.txt", robots).await;
    serve(
        &server,
        "/pages-sitemap.xml",
        urlset(&[site_url(&server, "/contact"), site_url(&server, "/pricing")]),
    )
    .await;

    let result = discovery().discover(&server.uri(), 10).await.unwrap();

    assert_eq!(result.strategy, DiscoveryStrategy::RobotsSitemap);
    assert_eq!(
        result.urls,
        vec![site_url(&server, "/contact"), site_url(&server, "/pricing")]
    );
    // The missing /sitemap.xml is recorded but not fatal
    assert!(result
        .errors
        .iter()
        .any(|e| e.source.ends_with("/sitemap.xml")));
}

/// 没有可用站点地图时回退到首页链接
#[tokio::test]
async fn test_discover_from_homepage_links() {
    let server = MockServer::start().await;
    // An unrelated XML document at /sitemap.xml yields no pages
    serve(&server, "/sitemap.xml", "<rss><channel></channel></rss>").await;
    let homepage = format!(
        r#"<html><body>
            <a href="/services">Services</a>
            <a href="/about#team">About</a>
            <a href="/logo.png">Logo</a>
            <a href="https://elsewhere.example/partner">Partner</a>
            <a href="mailto:office@acme.test">Mail</a>
            <a href="{}">Home</a>
        </body></html>"#,
        site_url(&server, "/")
    );
    serve(&server, "/", homepage).await;

    let result = discovery().discover(&server.uri(), 10).await.unwrap();

    assert_eq!(result.strategy, DiscoveryStrategy::HomepageLinks);
    assert_eq!(
        result.urls,
        vec![
            site_url(&server, "/"),
            site_url(&server, "/about"),
            site_url(&server, "/services"),
        ]
    );
}

/// 站点地图索引中的循环引用不会导致重复请求
#[tokio::test]
async fn test_sitemap_index_cycle_terminates() {
    let server = MockServer::start().await;
    let index = sitemap_index(&[
        site_url(&server, "/sitemap.xml"),
        site_url(&server, "/sitemap-pages.xml"),
        site_url(&server, "/sitemap-pages.xml"),
    ]);
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index))
        .expect(1)
        .mount(&server)
        .await;
    serve(
        &server,
        "/sitemap-pages.xml",
        urlset(&[site_url(&server, "/services/drains")]),
    )
    .await;

    let result = discovery().discover(&server.uri(), 10).await.unwrap();

    assert_eq!(result.strategy, DiscoveryStrategy::Sitemap);
    assert_eq!(result.urls, vec![site_url(&server, "/services/drains")]);
    server.verify().await;
}

/// robots.txt 指向其他主机上的站点地图时照常读取，只保留本站页面
#[tokio::test]
async fn test_discover_from_sitemap_on_other_host() {
    let server = MockServer::start().await;
    let cdn = MockServer::start().await;
    let robots = format!("User-agent: *\nSitemap: {}\n", site_url(&cdn, "/acme/sitemap.xml"));
    serve(&server, "/robots.txt", robots).await;
    serve(
        &cdn,
        "/acme/sitemap.xml",
        urlset(&[
            site_url(&server, "/services"),
            site_url(&server, "/"),
            site_url(&cdn, "/assets/landing"),
        ]),
    )
    .await;

    let result = discovery().discover(&server.uri(), 10).await.unwrap();

    assert_eq!(result.strategy, DiscoveryStrategy::RobotsSitemap);
    assert_eq!(
        result.urls,
        vec![site_url(&server, "/"), site_url(&server, "/services")]
    );
}

/// 所有策略都没有结果时返回错误
#[tokio::test]
async fn test_discover_no_pages_found() {
    let server = MockServer::start().await;

    let result = discovery().discover(&server.uri(), 10).await;

    assert!(matches!(result, Err(DiscoveryError::NoPagesFound(_))));
}

#[tokio::test]
async fn test_discover_rejects_invalid_input() {
    let result = discovery().discover("   ", 10).await;
    assert!(matches!(result, Err(DiscoveryError::InvalidInput(_))));
}
