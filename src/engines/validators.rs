// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::net::IpAddr;
use thiserror::Error;
use tokio::net::lookup_host;
use tracing::warn;
use url::{Host, Url};

/// URL安全校验错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlGuardError {
    /// URL缺少主机
    #[error("URL has no host")]
    MissingHost,
    /// 目标为本地或私有地址
    #[error("SSRF protection: private or loopback address is not allowed: {0}")]
    PrivateAddress(String),
}

/// 验证 URL 是否安全 (防止 SSRF)
///
/// 检查主机及其解析后的 IP 是否为私有地址或环回地址。
/// DNS解析失败不视为违规，由后续抓取阶段处理
pub async fn validate_url(url: &Url) -> Result<(), UrlGuardError> {
    let host = url.host().ok_or(UrlGuardError::MissingHost)?;

    match host {
        Host::Ipv4(ip) => check_ip(IpAddr::V4(ip)),
        Host::Ipv6(ip) => check_ip(IpAddr::V6(ip)),
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return Err(UrlGuardError::PrivateAddress(domain));
            }

            let port = url.port_or_known_default().unwrap_or(80);
            let checked: Result<(), UrlGuardError> = match lookup_host((domain.as_str(), port)).await {
                Ok(addrs) => addrs.map(|addr| check_ip(addr.ip())).collect(),
                Err(e) => {
                    warn!("DNS lookup failed for {}: {}", domain, e);
                    Ok(())
                }
            };
            checked
        }
    }
}

fn check_ip(ip: IpAddr) -> Result<(), UrlGuardError> {
    if is_private_ip(ip) {
        Err(UrlGuardError::PrivateAddress(ip.to_string()))
    } else {
        Ok(())
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_unspecified()
                || ipv4.is_broadcast()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
                // 224.0.0.0/4 (Multicast)
                || (224..=239).contains(&octets[0])
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(mapped));
            }
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique Local Address (fc00::/7)
                || (first & 0xfe00) == 0xfc00
                // Link-local (fe80::/10)
                || (first & 0xffc0) == 0xfe80
                // Multicast (ff00::/8)
                || (first & 0xff00) == 0xff00
        }
    }
}
