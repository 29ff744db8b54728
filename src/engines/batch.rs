// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::engines::traits::{ProviderError, ScrapeOutcome};

/// 并发抓取一组URL
///
/// 并发数由信号量限制，每个页面在拿到许可后单独计时超时。
/// 返回结果按输入顺序排列，与完成顺序无关
///
/// # 参数
///
/// * `urls` - 按优先级排序的URL
/// * `concurrency` - 最大并发数
/// * `page_timeout` - 单页超时
/// * `fetch` - 单页抓取函数
pub async fn scrape_concurrently<F, Fut>(
    urls: &[String],
    concurrency: usize,
    page_timeout: Duration,
    fetch: F,
) -> Vec<ScrapeOutcome>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, ProviderError>>,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let tasks = urls.iter().enumerate().map(|(index, url)| {
        let semaphore = semaphore.clone();
        let url = url.clone();
        let fut = fetch(url.clone());
        async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => match tokio::time::timeout(page_timeout, fut).await {
                    Ok(Ok(content)) => ScrapeOutcome::ok(url, content),
                    Ok(Err(e)) => {
                        debug!("Page scrape failed for {}: {}", url, e);
                        ScrapeOutcome::failed(url, e.to_string())
                    }
                    Err(_) => {
                        debug!("Page scrape timed out for {}", url);
                        ScrapeOutcome::failed(url, ProviderError::Timeout.to_string())
                    }
                },
                Err(e) => ScrapeOutcome::failed(url, e.to_string()),
            };
            (index, outcome)
        }
    });

    let mut results = join_all(tasks).await;
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, outcome)| outcome).collect()
}
