use std::fmt::Write as _;

use anyhow::{Result, bail};
use hovercard_api::HttpProfileApi;
use hovercard_app::{HovercardConfig, ProfileFetcher, ProfileSource, RateLimiter, TimeBoundedCache};
use hovercard_core::{ProfileRecord, UserId};
use time::macros::format_description;

use crate::Command;

/// Build a fetcher talking to the configured API.
pub fn build_fetcher(config: &HovercardConfig) -> Result<ProfileFetcher<HttpProfileApi>> {
    let api = HttpProfileApi::new(&config.api.base_url, &config.api.user_info_path, config.api.timeout())?;
    Ok(ProfileFetcher::with_parts(
        api,
        TimeBoundedCache::new(config.cache.ttl(), config.cache.capacity),
        RateLimiter::new(config.rate_limit.min_gap()),
    ))
}

pub async fn run(command: Command, config: &HovercardConfig, viewer: Option<UserId>) -> Result<()> {
    let fetcher = build_fetcher(config)?;
    let output = execute(command, &fetcher, viewer).await?;
    print!("{output}");
    Ok(())
}

async fn execute<S: ProfileSource>(
    command: Command,
    fetcher: &ProfileFetcher<S>,
    viewer: Option<UserId>,
) -> Result<String> {
    match command {
        Command::Show {
            username,
            refresh,
            json,
        } => {
            let record = fetcher.fetch(&username, refresh).await;
            if json {
                Ok(format!("{}\n", serde_json::to_string_pretty(&record)?))
            } else {
                Ok(render_profile(&record, viewer))
            }
        }
        Command::Tui { .. } => bail!("tui is not a one-shot command"),
    }
}

/// Plain-text card used by `show`.
pub fn render_profile(record: &ProfileRecord, viewer: Option<UserId>) -> String {
    let mut out = String::new();
    match record.id {
        Some(id) if record.is_viewer(viewer) => {
            let _ = writeln!(out, "{} (#{id}, you)", record.username);
        }
        Some(id) => {
            let _ = writeln!(out, "{} (#{id})", record.username);
        }
        None => {
            let _ = writeln!(out, "{} [degraded: profile unavailable]", record.username);
            return out;
        }
    }

    let roles = if record.roles.is_empty() {
        "-".to_owned()
    } else {
        record.roles.join(", ")
    };
    let level = record.level.as_ref().map_or_else(
        || "-".to_owned(),
        |level| match &level.color {
            Some(color) => format!("{} ({color})", level.name),
            None => level.name.clone(),
        },
    );
    let joined = record
        .joined_at
        .and_then(|ts| ts.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| "-".to_owned());

    let _ = writeln!(out, "  roles:  {roles}");
    let _ = writeln!(out, "  level:  {level}");
    let _ = writeln!(out, "  points: {}", record.points);
    let _ = writeln!(out, "  joined: {joined}");
    if let Some(avatar) = &record.avatar {
        let _ = writeln!(out, "  avatar: {avatar}");
    }
    out
}
