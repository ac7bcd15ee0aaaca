//! Profile card template.

use crate::config::toml_config::ProfileConfig;
use crate::domain::model::{Activity, PresenceSnapshot};
use chrono::{DateTime, NaiveTime, Utc};
use std::borrow::Cow;

pub const CARD_WIDTH: u32 = 800;
pub const CARD_HEIGHT: u32 = 400;
pub const MAX_LANGUAGES: usize = 3;
pub const MAX_SKILLS: usize = 8;

const FONT: &str = "'Segoe UI', system-ui, sans-serif";
const PROGRESS_WIDTH: f64 = 230.0;

/// Catppuccin Mocha.
pub mod palette {
    pub const BASE: &str = "#1e1e2e";
    pub const MANTLE: &str = "#181825";
    pub const CRUST: &str = "#11111b";
    pub const SURFACE0: &str = "#313244";
    pub const SURFACE1: &str = "#45475a";
    pub const TEXT: &str = "#cdd6f4";
    pub const SUBTEXT0: &str = "#a6adc8";
    pub const SUBTEXT1: &str = "#bac2de";
    pub const BLUE: &str = "#89b4fa";
    pub const SAPPHIRE: &str = "#74c7ec";
    pub const GREEN: &str = "#a6e3a1";
    pub const RED: &str = "#f38ba8";
    pub const MAUVE: &str = "#cba6f7";
    pub const PEACH: &str = "#fab387";
    pub const YELLOW: &str = "#f9e2af";
}

/// Everything the template needs, with remote images already inlined.
#[derive(Debug, Clone)]
pub struct CardContent<'a> {
    pub profile: &'a ProfileConfig,
    pub snapshot: &'a PresenceSnapshot,
    pub avatar_uri: &'a str,
    pub activity_image: Option<&'a str>,
    pub skill_icons: &'a [String],
    pub now: DateTime<Utc>,
}

pub fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub fn status_color(status: &str) -> &'static str {
    match status {
        "online" => palette::GREEN,
        "idle" => palette::YELLOW,
        "dnd" => palette::RED,
        _ => palette::SURFACE1,
    }
}

/// Percentage of `[start, end]` elapsed at `now`, floored and clamped to 0..=100.
pub fn progress_percent(start: i64, end: i64, now: i64) -> u32 {
    let total = end - start;
    if total <= 0 {
        return 0;
    }
    let elapsed = (now - start).min(total);
    let pct = (elapsed as f64 / total as f64 * 100.0).floor();
    pct.clamp(0.0, 100.0) as u32
}

/// Age in years with two decimals, using 365.25-day years.
pub fn age_years(birthday: chrono::NaiveDate, now: DateTime<Utc>) -> String {
    let born = birthday.and_time(NaiveTime::MIN).and_utc();
    let millis = (now - born).num_milliseconds() as f64;
    format!("{:.2}", millis / (1000.0 * 60.0 * 60.0 * 24.0 * 365.25))
}

pub fn render_profile_card(content: &CardContent<'_>) -> String {
    let snapshot = content.snapshot;
    let profile = content.profile;

    format!(
        r##"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
  {defs}
  <rect width="{w}" height="{h}" rx="20" fill="url(#cardGradient)" filter="url(#shadow)" />
  <circle cx="720" cy="80" r="180" fill="{blue}" opacity="0.08" />
  <circle cx="100" cy="320" r="120" fill="{mauve}" opacity="0.06" />
  <circle cx="650" cy="350" r="80" fill="{peach}" opacity="0.04" />
  {header}
  {skills}
  {activity}
</svg>"##,
        w = CARD_WIDTH,
        h = CARD_HEIGHT,
        defs = defs(),
        blue = palette::BLUE,
        mauve = palette::MAUVE,
        peach = palette::PEACH,
        header = header_section(content),
        skills = skills_section(profile, content.skill_icons),
        activity = activity_section(
            snapshot.regular_activities().next(),
            content.activity_image,
            content.now.timestamp_millis()
        ),
    )
}

fn defs() -> String {
    format!(
        r##"<defs>
    <linearGradient id="cardGradient" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="{crust}" />
      <stop offset="50%" stop-color="{mantle}" />
      <stop offset="100%" stop-color="{base}" />
    </linearGradient>
    <linearGradient id="accentGradient" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" stop-color="{blue}" />
      <stop offset="50%" stop-color="{sapphire}" />
      <stop offset="100%" stop-color="{mauve}" />
    </linearGradient>
    <linearGradient id="textGradient" x1="0%" y1="0%" x2="100%" y2="0%">
      <stop offset="0%" stop-color="{text}" />
      <stop offset="100%" stop-color="{subtext1}" />
    </linearGradient>
    <filter id="shadow" x="-20%" y="-20%" width="140%" height="140%">
      <feDropShadow dx="0" dy="6" stdDeviation="12" flood-color="#000000" flood-opacity="0.3" />
    </filter>
    <filter id="textShadow" x="-10%" y="-10%" width="120%" height="120%">
      <feDropShadow dx="0" dy="2" stdDeviation="2" flood-color="#000000" flood-opacity="0.4" />
    </filter>
    <filter id="glow" x="-50%" y="-50%" width="200%" height="200%">
      <feGaussianBlur stdDeviation="3" result="coloredBlur" />
      <feMerge>
        <feMergeNode in="coloredBlur" />
        <feMergeNode in="SourceGraphic" />
      </feMerge>
    </filter>
    <clipPath id="avatarClip">
      <circle cx="50" cy="50" r="50" />
    </clipPath>
    <clipPath id="activityClip">
      <rect width="50" height="50" rx="8" ry="8" />
    </clipPath>
  </defs>"##,
        crust = palette::CRUST,
        mantle = palette::MANTLE,
        base = palette::BASE,
        blue = palette::BLUE,
        sapphire = palette::SAPPHIRE,
        mauve = palette::MAUVE,
        text = palette::TEXT,
        subtext1 = palette::SUBTEXT1,
    )
}

fn header_section(content: &CardContent<'_>) -> String {
    let custom_status = content
        .snapshot
        .custom_status()
        .and_then(|a| a.state.as_deref())
        .filter(|s| !s.is_empty())
        .map(|state| {
            format!(
                r#"<text y="60" font-family="{FONT}" font-size="16" fill="{}" filter="url(#glow)">{}</text>"#,
                palette::MAUVE,
                escape_xml(state)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<g transform="translate(40, 40)" filter="url(#shadow)">
    <circle cx="50" cy="50" r="54" fill="url(#accentGradient)" filter="url(#glow)" />
    <circle cx="50" cy="50" r="51" fill="{crust}" opacity="0.9" />
    <image href="{avatar}" x="0" y="0" width="100" height="100" clip-path="url(#avatarClip)" />
    <circle cx="88" cy="83" r="14" fill="{crust}" stroke="url(#accentGradient)" stroke-width="3" />
    <circle cx="88" cy="83" r="9" fill="{status}" filter="url(#glow)" />
    <g transform="translate(120, 30)">
      <text font-family="{FONT}" font-size="32" font-weight="bold" fill="url(#textGradient)" filter="url(#textShadow)">{name}</text>
      <text y="35" font-family="{FONT}" font-size="18" fill="{subtext1}" filter="url(#textShadow)">{age} years old</text>
      {custom_status}
    </g>
  </g>"#,
        crust = palette::CRUST,
        avatar = escape_xml(content.avatar_uri),
        status = status_color(&content.snapshot.discord_status),
        name = escape_xml(&content.profile.display_name),
        subtext1 = palette::SUBTEXT1,
        age = age_years(content.profile.birthday, content.now),
    )
}

fn skills_section(profile: &ProfileConfig, skill_icons: &[String]) -> String {
    let languages: String = profile
        .languages
        .iter()
        .take(MAX_LANGUAGES)
        .enumerate()
        .map(|(i, lang)| {
            let bar = u32::from(lang.proficiency.min(100)) * 2;
            format!(
                r#"
      <g transform="translate(0, {y})">
        <text x="0" y="16" font-family="{FONT}" font-size="14" fill="{text}">{name}</text>
        <rect x="100" y="8" width="200" height="10" rx="5" fill="{track}" opacity="0.4" />
        <rect x="100" y="8" width="{bar}" height="10" rx="5" fill="{color}" />
        <text x="310" y="16" font-family="{FONT}" font-size="12" fill="{text}">{pct}%</text>
      </g>"#,
                y = i * 36,
                text = palette::TEXT,
                name = escape_xml(&lang.name),
                track = palette::SURFACE1,
                color = escape_xml(&lang.color),
                pct = lang.proficiency,
            )
        })
        .collect();

    let icons: String = skill_icons
        .iter()
        .take(MAX_SKILLS)
        .enumerate()
        .map(|(i, icon)| {
            format!(
                r#"
        <g transform="translate({x}, 0)">
          <circle cx="16" cy="16" r="18" fill="url(#accentGradient)" opacity="0.3" filter="url(#glow)" />
          <circle cx="16" cy="16" r="16" fill="{accent}" opacity="0.8" />
          <image href="{icon}" x="4" y="4" height="24" width="24" />
        </g>"#,
                x = i * 44,
                accent = palette::SURFACE0,
                icon = escape_xml(icon),
            )
        })
        .collect();

    let skills_offset = 140 + MAX_LANGUAGES.saturating_sub(profile.languages.len()) * 12;

    format!(
        r#"<g transform="translate(40, 180)">
    <text font-family="{FONT}" font-size="16" font-weight="bold" fill="{mauve}" filter="url(#textShadow)">Languages</text>
    <g transform="translate(0, 30)">{languages}
    </g>
    <g transform="translate(0, {skills_offset})">
      <text font-family="{FONT}" font-size="14" font-weight="bold" fill="{subtext1}" filter="url(#textShadow)">Skills</text>
      <g transform="translate(0, 30)">{icons}
      </g>
    </g>
  </g>"#,
        mauve = palette::MAUVE,
        subtext1 = palette::SUBTEXT1,
    )
}

fn activity_section(activity: Option<&Activity>, image: Option<&str>, now_ms: i64) -> String {
    let body = match activity {
        Some(activity) => activity_panel(activity, image, now_ms),
        None => format!(
            r#"<g transform="translate(0, 35)">
      <rect width="340" height="70" rx="15" fill="{surface}" opacity="0.2" stroke="url(#accentGradient)" stroke-width="1" />
      <g transform="translate(20, 35)">
        <text font-family="{FONT}" font-size="16" fill="{subtext1}" filter="url(#textShadow)">Not doing anything special right now</text>
      </g>
    </g>"#,
            surface = palette::SURFACE1,
            subtext1 = palette::SUBTEXT1,
        ),
    };

    format!(
        r#"<g transform="translate(420, 40)">
    <text font-family="{FONT}" font-size="20" font-weight="bold" fill="{peach}" filter="url(#textShadow)">Current Activity</text>
    {body}
  </g>"#,
        peach = palette::PEACH,
    )
}

fn activity_panel(activity: &Activity, image: Option<&str>, now_ms: i64) -> String {
    let progress = activity
        .bounds()
        .map(|(start, end)| progress_percent(start, end, now_ms));

    let image_block = image
        .map(|uri| {
            format!(
                r#"
      <g transform="translate(20, 20)">
        <rect width="50" height="50" rx="8" fill="{surface}" />
        <image href="{uri}" x="0" y="0" width="50" height="50" preserveAspectRatio="xMidYMid slice" clip-path="url(#activityClip)" />
      </g>"#,
                surface = palette::SURFACE1,
                uri = escape_xml(uri),
            )
        })
        .unwrap_or_default();

    let details = optional_line(activity.details.as_deref(), 25, 14, palette::SUBTEXT1);
    let state = optional_line(activity.state.as_deref(), 45, 12, palette::SUBTEXT0);

    let progress_block = progress
        .map(|pct| {
            let filled = f64::from(pct) / 100.0 * PROGRESS_WIDTH;
            format!(
                r#"
        <g transform="translate(0, 60)">
          <rect width="{PROGRESS_WIDTH}" height="8" rx="4" fill="{track}" opacity="0.4" />
          <rect width="{filled}" height="8" rx="4" fill="{peach}" />
          <text x="{label_x}" y="8" font-family="{FONT}" font-size="10" fill="{text}">{pct}%</text>
        </g>"#,
                track = palette::SURFACE1,
                peach = palette::PEACH,
                label_x = filled + 10.0,
                text = palette::TEXT,
            )
        })
        .unwrap_or_default();

    format!(
        r#"<g transform="translate(0, 35)" filter="url(#shadow)">
      <rect width="340" height="{height}" rx="15" fill="{surface}" opacity="0.2" stroke="url(#accentGradient)" stroke-width="1" />{image_block}
      <g transform="translate({text_x}, 20)">
        <text font-family="{FONT}" font-size="16" font-weight="bold" fill="{text}">{name}</text>{details}{state}{progress_block}
      </g>
    </g>"#,
        height = if progress.is_some() { 110 } else { 90 },
        surface = palette::SURFACE1,
        text_x = if image.is_some() { 85 } else { 20 },
        text = palette::TEXT,
        name = escape_xml(&activity.name),
    )
}

fn optional_line(value: Option<&str>, y: u32, size: u32, fill: &str) -> String {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => format!(
            r#"
        <text y="{y}" font-family="{FONT}" font-size="{size}" fill="{fill}">{}</text>"#,
            escape_xml(v)
        ),
        None => String::new(),
    }
}
