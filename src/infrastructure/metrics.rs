// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;
use crate::domain::models::workflow::StepName;

/// 初始化指标系统
///
/// 未启用时不安装导出器，指标宏调用为空操作
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!("crawl_runs_started_total", "Total number of crawl runs started");
    describe_counter!(
        "crawl_runs_completed_total",
        "Total number of crawl runs completed successfully"
    );
    describe_counter!(
        "crawl_runs_failed_total",
        "Total number of crawl runs failed, labelled by stage"
    );
    describe_counter!("crawl_pages_scraped_total", "Total number of pages scraped");
    describe_counter!(
        "crawl_pages_failed_total",
        "Total number of pages that failed to scrape"
    );
    describe_histogram!(
        "crawl_run_duration_seconds",
        "Wall-clock duration of crawl runs in seconds"
    );
}

pub fn record_run_started() {
    counter!("crawl_runs_started_total").increment(1);
}

pub fn record_run_completed(duration: Duration) {
    counter!("crawl_runs_completed_total").increment(1);
    histogram!("crawl_run_duration_seconds").record(duration.as_secs_f64());
}

/// `stage` 为空表示失败发生在步骤之外，例如整体超时
pub fn record_run_failed(stage: Option<StepName>, duration: Duration) {
    let stage = stage.map(|s| s.to_string()).unwrap_or_else(|| "run".to_string());
    counter!("crawl_runs_failed_total", "stage" => stage).increment(1);
    histogram!("crawl_run_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_pages(scraped: usize, failed: usize) {
    counter!("crawl_pages_scraped_total").increment(scraped as u64);
    counter!("crawl_pages_failed_total").increment(failed as u64);
}
