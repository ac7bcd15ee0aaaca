//! Markup extraction for the contribution calendar fragments.
//!
//! The fragments are small and regular, so a handful of regexes over the raw
//! HTML is enough: year links, calendar day cells, their tooltips and the
//! yearly total heading.

use crate::domain::model::Contribution;
use crate::utils::error::{FolioError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<a\b([^>]*)>(.*?)</a>").expect("valid regex"));
static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z][\w-]*\b([^>]*)>").expect("valid regex"));
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));
static TOOLTIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tool-tip\b([^>]*)>(.*?)</tool-tip>").expect("valid regex"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+").expect("valid regex"));
static TOTAL_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h2\b[^>]*>(.*?)</h2>").expect("valid regex"));
static TOTAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9,]+)\s").expect("valid regex"));

fn attributes(raw: &str) -> HashMap<&str, &str> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect()
}

fn has_class(attrs: &HashMap<&str, &str>, class: &str) -> bool {
    attrs
        .get("class")
        .is_some_and(|value| value.split_whitespace().any(|c| c == class))
}

fn text_of(fragment: &str) -> String {
    TAGS.replace_all(fragment, "").trim().to_string()
}

/// Slice of `html` starting at the first element carrying `class`, up to the
/// closing tag named `until`.
fn section<'a>(html: &'a str, class: &str, until: &str) -> Option<&'a str> {
    let start = OPEN_TAG
        .captures_iter(html)
        .find(|c| c.get(1).is_some_and(|a| has_class(&attributes(a.as_str()), class)))?
        .get(0)?
        .start();
    let rest = &html[start..];
    let end = rest.find(until).map(|i| i + until.len()).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Years listed in the profile's year selector.
pub fn parse_year_links(html: &str) -> Vec<i32> {
    ANCHOR
        .captures_iter(html)
        .filter(|c| {
            c.get(1)
                .is_some_and(|a| has_class(&attributes(a.as_str()), "js-year-link"))
        })
        .filter_map(|c| text_of(c.get(2)?.as_str()).parse().ok())
        .collect()
}

/// Leading contribution count per day cell id, e.g. `"3 contributions on ..."`.
/// Tooltips without a number (`No contributions ...`) count as zero.
pub fn parse_tooltips(html: &str) -> HashMap<String, u32> {
    TOOLTIP
        .captures_iter(html)
        .filter_map(|c| {
            let attrs = attributes(c.get(1)?.as_str());
            let target = attrs.get("for")?.to_string();
            let text = text_of(c.get(2)?.as_str());
            let count = LEADING_DIGITS
                .find(&text)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            Some((target, count))
        })
        .collect()
}

/// Day cells of the calendar table, sorted by date.
pub fn parse_days(html: &str) -> Result<Vec<Contribution>> {
    let Some(table) = section(html, "js-calendar-graph-table", "</table>") else {
        return Ok(Vec::new());
    };
    let tooltips = parse_tooltips(html);

    let mut days = Vec::new();
    for cap in OPEN_TAG.captures_iter(table) {
        let Some(raw) = cap.get(1) else { continue };
        let attrs = attributes(raw.as_str());
        if !has_class(&attrs, "ContributionCalendar-day") {
            continue;
        }

        let date = attrs
            .get("data-date")
            .ok_or_else(|| scrape_error("Unable to parse contribution date attribute."))?;
        let level = attrs
            .get("data-level")
            .ok_or_else(|| scrape_error("Unable to parse contribution level attribute."))?
            .parse::<u8>()
            .map_err(|_| scrape_error("Unable to parse contribution level."))?;
        let count = attrs
            .get("id")
            .and_then(|id| tooltips.get(*id))
            .copied()
            .unwrap_or(0);

        days.push(Contribution {
            date: date.to_string(),
            count,
            level,
        });
    }

    days.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(days)
}

/// Total from the `js-yearly-contributions` heading, e.g. `"1,234 contributions in 2024"`.
pub fn parse_total(html: &str) -> Result<u64> {
    section(html, "js-yearly-contributions", "</h2>")
        .and_then(|s| TOTAL_HEADING.captures(s))
        .map(|c| text_of(&c[1]))
        .and_then(|heading| {
            TOTAL_COUNT
                .captures(&heading)
                .and_then(|c| c[1].replace(',', "").parse().ok())
        })
        .ok_or_else(|| scrape_error("Unable to parse total contributions count."))
}

/// Splits `YYYY-MM-DD` into its numeric parts.
pub fn split_date(date: &str) -> Result<(i32, u32, u32)> {
    let parsed = match date.splitn(3, '-').collect::<Vec<_>>()[..] {
        [y, m, d] => match (y.parse(), m.parse(), d.parse()) {
            (Ok(y), Ok(m), Ok(d)) => Some((y, m, d)),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| scrape_error(&format!("Unable to parse contribution date {}.", date)))
}

fn scrape_error(message: &str) -> FolioError {
    FolioError::ScrapeError {
        message: message.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const YEAR_LINKS: &str = r#"
        <div class="js-profile-timeline-year-list">
          <ul class="filter-list small">
            <li><a class="js-year-link filter-item px-3 mb-2 py-2 selected" href="/owner?tab=overview&amp;from=2024-12-01&amp;to=2024-12-31">2024</a></li>
            <li><a class="js-year-link filter-item px-3 mb-2 py-2" href="/owner?tab=overview&amp;from=2023-12-01&amp;to=2023-12-31">
              2023
            </a></li>
            <li><a class="filter-item" href="/owner?tab=repositories">Repositories</a></li>
          </ul>
        </div>"#;

    pub fn calendar(total_heading: &str, cells: &[(&str, &str, u8, Option<&str>)]) -> String {
        let mut tds = String::new();
        let mut tips = String::new();
        for (date, id, level, tip) in cells {
            tds.push_str(&format!(
                r#"<td tabindex="0" data-ix="0" style="width: 10px" data-date="{}" id="{}" data-level="{}" role="gridcell" class="ContributionCalendar-day"></td>"#,
                date, id, level
            ));
            if let Some(tip) = tip {
                tips.push_str(&format!(
                    r#"<tool-tip id="tooltip-{}" for="{}" popover="manual" data-direction="n" class="sr-only position-absolute">{}</tool-tip>"#,
                    id, id, tip
                ));
            }
        }
        format!(
            r#"<div class="js-yearly-contributions">
                 <h2 class="f4 text-normal mb-2">
                   {}
                 </h2>
                 <div class="js-calendar-graph">
                   <table class="ContributionCalendar-grid js-calendar-graph-table">
                     <tbody><tr>{}</tr></tbody>
                   </table>
                   {}
                   <div class="ContributionCalendar-day" data-level="0"></div>
                 </div>
               </div>"#,
            total_heading, tds, tips
        )
    }
}
