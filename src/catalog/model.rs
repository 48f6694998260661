use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Field the search query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    #[default]
    Keyword,
    Title,
    Author,
    Publisher,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "Keyword",
            Self::Title => "Title",
            Self::Author => "Author",
            Self::Publisher => "Publisher",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "publisher" => Ok(Self::Publisher),
            other => Err(format!(
                "unknown query type '{other}' (expected Keyword, Title, Author or Publisher)"
            )),
        }
    }
}

/// One catalog entry. Missing fields decode to empty values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    pub title: String,
    pub author: String,
    pub publisher: String,
    #[serde(alias = "pubDate")]
    pub pub_date: String,
    pub description: String,
    pub isbn: String,
    pub isbn13: String,
    /// Cover image URL.
    pub cover: String,
    /// Product page URL.
    pub link: String,
    #[serde(alias = "categoryName")]
    pub category_name: String,
    #[serde(alias = "priceStandard")]
    pub price_standard: i64,
    #[serde(alias = "priceSales")]
    pub price_sales: i64,
}

/// A page of catalog entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSearchResponse {
    pub version: String,
    pub title: String,
    #[serde(alias = "totalResults")]
    pub total_results: i64,
    #[serde(alias = "startIndex")]
    pub start_index: i64,
    #[serde(alias = "itemsPerPage")]
    pub items_per_page: i64,
    #[serde(alias = "item")]
    pub items: Vec<CatalogItem>,
}
