pub mod parse;

use crate::config::toml_config::GitHubConfig;
use crate::domain::model::{
    Contribution, ContributionCalendar, ContributionDays, ContributionFormat, ContributionQuery,
    NestedContributions, Year,
};
use crate::utils::error::{FolioError, Result};
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use reqwest::{Client, StatusCode};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;

/// One year's worth of calendar cells plus its headline total.
#[derive(Debug, Clone, PartialEq)]
pub struct YearContributions {
    pub year: Year,
    pub total: u64,
    pub days: Vec<Contribution>,
}

#[derive(Debug, Clone)]
pub struct GitHubScraper {
    client: Client,
    base_url: String,
}

impl GitHubScraper {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_html(&self, url: &str, username: &str) -> Result<(StatusCode, String)> {
        let response = self
            .client
            .get(url)
            .header("referer", format!("{}/{}", self.base_url, username))
            .header("x-requested-with", "XMLHttpRequest")
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }

    /// Years offered on the profile, filtered by `query`.
    pub async fn scrape_year_links(
        &self,
        username: &str,
        query: &ContributionQuery,
    ) -> Result<Vec<i32>> {
        let url = format!(
            "{}/{}?action=show&controller=profiles&tab=contributions&user_id={}",
            self.base_url, username, username
        );
        let not_found = || FolioError::UserNotFound {
            username: username.to_string(),
        };

        let (status, html) = match self.get_html(&url, username).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Error scraping GitHub profile for user \"{}\": {}", username, e);
                return Err(not_found());
            }
        };
        if status == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        if !status.is_success() {
            return Err(FolioError::UpstreamStatus {
                service: "GitHub".to_string(),
                status: status.as_u16(),
            });
        }

        let years = parse::parse_year_links(&html);
        if years.is_empty() {
            return Err(not_found());
        }

        Ok(years
            .into_iter()
            .filter(|y| query.fetch_all || query.years.contains(y))
            .collect())
    }

    pub async fn scrape_year(&self, username: &str, year: Year) -> Result<YearContributions> {
        let url = match year {
            Year::LastYear => format!("{}/users/{}/contributions", self.base_url, username),
            Year::Calendar(y) => format!(
                "{}/users/{}/contributions?tab=overview&from={}-12-01&to={}-12-31",
                self.base_url, username, y, y
            ),
        };
        tracing::debug!("Scraping {} contributions for {}", year.key(), username);

        let (status, html) = self.get_html(&url, username).await?;
        if !status.is_success() {
            return Err(FolioError::UpstreamStatus {
                service: "GitHub".to_string(),
                status: status.as_u16(),
            });
        }

        Ok(YearContributions {
            year,
            total: parse::parse_total(&html)?,
            days: parse::parse_days(&html)?,
        })
    }

    /// Scrapes every requested year concurrently and merges the results.
    pub async fn scrape(
        &self,
        username: &str,
        query: &ContributionQuery,
    ) -> Result<ContributionCalendar> {
        let mut years: Vec<Year> = self
            .scrape_year_links(username, query)
            .await?
            .into_iter()
            .map(Year::Calendar)
            .collect();
        if query.last_year {
            years.push(Year::LastYear);
        }

        let results =
            try_join_all(years.into_iter().map(|year| self.scrape_year(username, year))).await?;
        merge(results, query.format)
    }
}

/// Unions the totals and combines the days. Nested output is merged down to
/// the day, so overlapping ranges (a calendar year and `lastYear`) keep every
/// month from both. Flat output keeps each year's days in request order.
pub fn merge(results: Vec<YearContributions>, format: ContributionFormat) -> Result<ContributionCalendar> {
    let total: BTreeMap<String, u64> = results.iter().map(|r| (r.year.key(), r.total)).collect();

    let contributions = match format {
        ContributionFormat::Flat => {
            ContributionDays::Flat(results.into_iter().flat_map(|r| r.days).collect())
        }
        ContributionFormat::Nested => {
            let mut nested = NestedContributions::new();
            for day in results.into_iter().flat_map(|r| r.days) {
                let (y, m, d) = parse::split_date(&day.date)?;
                nested.entry(y).or_default().entry(m).or_default().insert(d, day);
            }
            ContributionDays::Nested(nested)
        }
    };

    Ok(ContributionCalendar {
        total,
        contributions,
    })
}

struct HourlyEntry {
    bucket: i64,
    calendar: ContributionCalendar,
}

/// Contribution calendar for the configured user, cached per clock window
/// (one hour by default) and per output format.
pub struct ContributionService {
    scraper: GitHubScraper,
    username: String,
    window_seconds: u64,
    cache: Mutex<HashMap<ContributionFormat, HourlyEntry>>,
}

impl ContributionService {
    pub fn new(scraper: GitHubScraper, username: String, window_seconds: u64) -> Self {
        Self {
            scraper,
            username,
            window_seconds: window_seconds.max(1),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.window_seconds)
    }

    pub async fn calendar(&self, format: ContributionFormat) -> Result<ContributionCalendar> {
        self.calendar_at(format, Utc::now()).await
    }

    pub async fn calendar_at(
        &self,
        format: ContributionFormat,
        now: DateTime<Utc>,
    ) -> Result<ContributionCalendar> {
        let bucket = now.timestamp().div_euclid(self.window_seconds as i64);

        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.get(&format) {
            if entry.bucket == bucket {
                return Ok(entry.calendar.clone());
            }
        }

        let calendar = self
            .scraper
            .scrape(&self.username, &ContributionQuery::everything(format))
            .await?;
        tracing::info!(
            "Scraped {} contribution ranges for {}",
            calendar.total.len(),
            self.username
        );
        cache.insert(
            format,
            HourlyEntry {
                bucket,
                calendar: calendar.clone(),
            },
        );
        Ok(calendar)
    }
}
