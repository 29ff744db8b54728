// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 行业分类
///
/// 封闭集合，模型返回的未知值一律归为 `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Restaurant,
    Retail,
    Ecommerce,
    Healthcare,
    Dental,
    Fitness,
    Beauty,
    RealEstate,
    Legal,
    Finance,
    Insurance,
    Technology,
    Education,
    Construction,
    HomeServices,
    Automotive,
    Hospitality,
    Travel,
    ProfessionalServices,
    Marketing,
    Nonprofit,
    Entertainment,
    Manufacturing,
    Agriculture,
    #[default]
    Other,
}

impl Industry {
    /// 全部行业，按提示词中的顺序
    pub const ALL: [Industry; 25] = [
        Industry::Restaurant,
        Industry::Retail,
        Industry::Ecommerce,
        Industry::Healthcare,
        Industry::Dental,
        Industry::Fitness,
        Industry::Beauty,
        Industry::RealEstate,
        Industry::Legal,
        Industry::Finance,
        Industry::Insurance,
        Industry::Technology,
        Industry::Education,
        Industry::Construction,
        Industry::HomeServices,
        Industry::Automotive,
        Industry::Hospitality,
        Industry::Travel,
        Industry::ProfessionalServices,
        Industry::Marketing,
        Industry::Nonprofit,
        Industry::Entertainment,
        Industry::Manufacturing,
        Industry::Agriculture,
        Industry::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Restaurant => "restaurant",
            Industry::Retail => "retail",
            Industry::Ecommerce => "ecommerce",
            Industry::Healthcare => "healthcare",
            Industry::Dental => "dental",
            Industry::Fitness => "fitness",
            Industry::Beauty => "beauty",
            Industry::RealEstate => "real_estate",
            Industry::Legal => "legal",
            Industry::Finance => "finance",
            Industry::Insurance => "insurance",
            Industry::Technology => "technology",
            Industry::Education => "education",
            Industry::Construction => "construction",
            Industry::HomeServices => "home_services",
            Industry::Automotive => "automotive",
            Industry::Hospitality => "hospitality",
            Industry::Travel => "travel",
            Industry::ProfessionalServices => "professional_services",
            Industry::Marketing => "marketing",
            Industry::Nonprofit => "nonprofit",
            Industry::Entertainment => "entertainment",
            Industry::Manufacturing => "manufacturing",
            Industry::Agriculture => "agriculture",
            Industry::Other => "other",
        }
    }

    /// 宽松解析模型输出的行业值
    ///
    /// 忽略大小写，空格和连字符视为下划线，无法识别时返回 `Other`
    pub fn coerce(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        normalized.parse().unwrap_or_default()
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Industry {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Industry::ALL
            .iter()
            .copied()
            .find(|industry| industry.as_str() == s)
            .ok_or(())
    }
}

/// 结构化SEO提取结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysisResult {
    /// 关键词
    pub keywords: Vec<String>,
    /// 地理位置
    pub location: Option<String>,
    /// 行业
    pub industry: Industry,
    /// Meta标题（不超过60个字符）
    pub meta_title: Option<String>,
    /// Meta描述（不超过160个字符）
    pub meta_description: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 持久化到客户设置中的SEO字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoSettings {
    /// 客户标识
    pub client_id: String,
    pub keywords: Vec<String>,
    pub location: Option<String>,
    pub industry: Industry,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    /// 分析来源站点
    pub source_url: String,
    pub updated_at: DateTime<Utc>,
}

impl SeoSettings {
    pub fn from_analysis(client_id: &str, source_url: &str, analysis: &SeoAnalysisResult) -> Self {
        Self {
            client_id: client_id.to_string(),
            keywords: analysis.keywords.clone(),
            location: analysis.location.clone(),
            industry: analysis.industry,
            meta_title: analysis.meta_title.clone(),
            meta_description: analysis.meta_description.clone(),
            source_url: source_url.to_string(),
            updated_at: Utc::now(),
        }
    }
}
