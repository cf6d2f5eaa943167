//! Commands that reach the network: the status widgets, `weather` and `repos`.

use super::{AsyncContext, CommandRegistry, asynchronous};
use crate::date::format_display_time;
use crate::output::OutputLine;
use crate::widgets::spotify::SpotifyView;
use crate::widgets::{WidgetKind, WidgetSnapshot, count_field, str_at, str_field};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};

const DEFAULT_CITY: &str = "Katowice";
const REPO_LIMIT: usize = 10;
const FEED_PREVIEW: usize = 5;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(asynchronous(
        "github",
        "github",
        "Recent GitHub activity",
        "fa-github",
        github,
    ));
    registry.register(asynchronous("steam", "steam", "Steam presence", "fa-steam", steam));
    registry.register(asynchronous(
        "discord",
        "discord",
        "Discord presence",
        "fa-discord",
        discord,
    ));
    registry.register(asynchronous(
        "spotify",
        "spotify",
        "What is playing right now",
        "fa-spotify",
        spotify,
    ));
    registry.register(asynchronous("roblox", "roblox", "Roblox presence", "fa-cubes", roblox));
    registry.register(asynchronous(
        "status",
        "status",
        "Summary of every status widget",
        "fa-signal",
        status,
    ));
    registry.register(asynchronous(
        "weather",
        "weather [city]",
        "Current weather from wttr.in",
        "fa-cloud-sun",
        weather,
    ));
    registry.register(asynchronous(
        "repos",
        "repos",
        "Public GitHub repositories",
        "fa-code-branch",
        repos,
    ));
}

/// Loads one widget on demand; the error side is the line to print instead.
async fn load(ctx: &AsyncContext, kind: WidgetKind) -> Result<WidgetSnapshot, Vec<OutputLine>> {
    let Some(board) = ctx.services.widgets.as_ref() else {
        return Err(vec![OutputLine::warning(format!(
            "{}: status widgets are disabled",
            kind.as_str()
        ))]);
    };
    let snapshot = board.ensure(kind).await;
    if snapshot.has(kind) {
        Ok(snapshot)
    } else {
        Err(vec![OutputLine::error(format!(
            "{}: could not fetch data right now",
            kind.as_str()
        ))])
    }
}

fn github(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let snapshot = match load(&ctx, WidgetKind::GitHub).await {
            Ok(snapshot) => snapshot,
            Err(lines) => return lines,
        };
        let Some(view) = snapshot.github else {
            return vec![];
        };
        let summary = &view.summary;
        let mut lines = vec![OutputLine::accent(format!(
            "GitHub · {} projects · {} starred · {} commits",
            summary.projects, summary.starred_count, summary.commits
        ))];
        if !view.recent_commits.is_empty() {
            lines.push(OutputLine::info("Recent commits:"));
            lines.extend(view.recent_commits.iter().take(FEED_PREVIEW).map(|commit| {
                OutputLine::plain(format!(
                    "  • {} ({}, {})",
                    commit.message, commit.repo, commit.date
                ))
            }));
        }
        if !view.starred.is_empty() {
            lines.push(OutputLine::info("Recently starred:"));
            lines.extend(view.starred.iter().take(FEED_PREVIEW).map(|repo| {
                OutputLine::plain(format!(
                    "  ★ {}/{} ({}, {} stars)",
                    repo.owner, repo.name, repo.language, repo.stars
                ))
            }));
        }
        if let Some(updated) = view.last_update {
            lines.push(OutputLine::muted(format!("Last update: {updated}")));
        }
        lines
    }
    .boxed()
}

fn steam(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let view = match load(&ctx, WidgetKind::Steam).await {
            Ok(WidgetSnapshot { steam: Some(view), .. }) => view,
            Ok(_) => return vec![],
            Err(lines) => return lines,
        };
        let mut lines = vec![OutputLine::accent(format!(
            "Steam · {} · {}",
            view.persona, view.status
        ))];
        if let Some(game) = view.game {
            lines.push(OutputLine::success(format!("Playing {game}")));
        }
        if let Some(url) = view.profile_url {
            lines.push(OutputLine::link("Steam profile", &url));
        }
        lines
    }
    .boxed()
}

fn discord(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let view = match load(&ctx, WidgetKind::Discord).await {
            Ok(WidgetSnapshot { discord: Some(view), .. }) => view,
            Ok(_) => return vec![],
            Err(lines) => return lines,
        };
        let mut lines = vec![OutputLine::accent(format!(
            "Discord · {} · {}",
            view.username, view.status
        ))];
        if let Some(custom) = view.custom_status {
            lines.push(OutputLine::plain(format!("  \"{custom}\"")));
        }
        if let Some(activity) = view.activity {
            lines.push(OutputLine::plain(format!("  {activity}")));
        }
        if let Some(track) = view.spotify.filter(|track| track.is_playing) {
            lines.extend(track_lines(&track));
        }
        lines
    }
    .boxed()
}

fn track_lines(track: &SpotifyView) -> Vec<OutputLine> {
    let mut lines = vec![OutputLine::success(format!("♪ {} - {}", track.title, track.artist))];
    if let Some(album) = &track.album {
        lines.push(OutputLine::muted(format!("  on {album}")));
    }
    if let Some(bar) = track.progress_bar(24) {
        lines.push(OutputLine::plain(format!("  {bar}")));
    }
    if let Some(url) = &track.url {
        lines.push(OutputLine::link("Open in Spotify", url));
    }
    lines
}

fn spotify(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let snapshot = match load(&ctx, WidgetKind::Spotify).await {
            Ok(snapshot) => snapshot,
            Err(lines) => return lines,
        };
        let playing = snapshot
            .spotify
            .filter(|track| track.is_playing)
            .or_else(|| {
                snapshot
                    .discord
                    .and_then(|view| view.spotify)
                    .filter(|track| track.is_playing)
            });
        match playing {
            Some(track) => track_lines(&track),
            None => vec![OutputLine::muted("Nothing playing right now.")],
        }
    }
    .boxed()
}

fn roblox(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let view = match load(&ctx, WidgetKind::Roblox).await {
            Ok(WidgetSnapshot { roblox: Some(view), .. }) => view,
            Ok(_) => return vec![],
            Err(lines) => return lines,
        };
        let mut lines = vec![OutputLine::accent(format!(
            "Roblox · {} (@{}) · {}",
            view.display_name, view.username, view.presence
        ))];
        if let Some(location) = view.location {
            lines.push(OutputLine::success(format!("In {location}")));
        }
        lines
    }
    .boxed()
}

fn status(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let Some(board) = ctx.services.widgets.as_ref() else {
            return vec![OutputLine::warning("status: status widgets are disabled")];
        };
        let snapshot = board.snapshot().await;
        let offset = ctx.services.offset;
        WidgetKind::ALL
            .into_iter()
            .map(|kind| {
                let name = kind.as_str();
                if let Some(error) = snapshot.last_errors.get(name) {
                    return OutputLine::error(format!("{name:<8} failing: {error}"));
                }
                match snapshot.refreshed_at.get(name) {
                    Some(stamp) => OutputLine::success(format!(
                        "{name:<8} ok (updated {})",
                        format_display_time(stamp, true, offset)
                    )),
                    None => OutputLine::muted(format!("{name:<8} not loaded yet")),
                }
            })
            .collect()
    }
    .boxed()
}

pub(crate) fn weather_url(base: &str, city: &str) -> Option<String> {
    let mut url = url::Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(city);
    url.set_query(Some("format=j1"));
    Some(url.to_string())
}

fn first_value(value: &Value, key: &str) -> Option<String> {
    str_at(value.get(key)?.get(0)?, &["value"])
}

pub(crate) fn weather_lines(city: &str, value: &Value) -> Option<Vec<OutputLine>> {
    let current = value.get("current_condition")?.get(0)?;
    let area = value.pointer("/nearest_area/0");
    let place = area
        .and_then(|area| first_value(area, "areaName"))
        .unwrap_or_else(|| city.to_string());
    let country = area.and_then(|area| first_value(area, "country"));
    let description = first_value(current, "weatherDesc").unwrap_or_else(|| "Unknown".to_string());
    let heading = match country {
        Some(country) => format!("Weather for {place}, {country}"),
        None => format!("Weather for {place}"),
    };
    Some(vec![
        OutputLine::accent(heading),
        OutputLine::plain(format!("  {description}")),
        OutputLine::plain(format!(
            "  Temperature: {}°C (feels like {}°C)",
            count_field(current, "temp_C"),
            count_field(current, "FeelsLikeC")
        )),
        OutputLine::plain(format!("  Humidity: {}%", count_field(current, "humidity"))),
        OutputLine::plain(format!("  Wind: {} km/h", count_field(current, "windspeedKmph"))),
    ])
}

fn weather(ctx: AsyncContext, args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let city = if args.is_empty() {
            DEFAULT_CITY.to_string()
        } else {
            args.join(" ")
        };
        let Some(url) = weather_url(&ctx.services.config.weather_base_url, &city) else {
            return vec![OutputLine::error("weather: invalid weather service URL")];
        };
        ctx.print(OutputLine::muted(format!("Fetching weather for {city}...")));
        let result = ctx.services.source.get_json(&url).await;
        match result {
            Ok(value) => weather_lines(&city, &value).unwrap_or_else(|| {
                vec![OutputLine::error(format!("weather: no data for '{city}'"))]
            }),
            Err(error) => {
                ctx.services.logger.warn(
                    "weather.fetch_failed",
                    json!({ "city": city, "error": error.to_string() }),
                );
                vec![OutputLine::error(format!(
                    "weather: could not fetch weather for '{city}'"
                ))]
            }
        }
    }
    .boxed()
}

pub(crate) fn repo_lines(value: &Value) -> Vec<OutputLine> {
    let Some(repos) = value.as_array() else {
        return vec![OutputLine::error("repos: unexpected response")];
    };
    if repos.is_empty() {
        return vec![OutputLine::muted("No public repositories.")];
    }
    let mut lines = Vec::new();
    for repo in repos.iter().take(REPO_LIMIT) {
        let name = str_field(repo, "name").unwrap_or_else(|| "—".to_string());
        let language = str_field(repo, "language").unwrap_or_else(|| "—".to_string());
        let stars = count_field(repo, "stargazers_count");
        lines.push(OutputLine::plain(format!("  ★ {stars:>3}  {name:<24} {language}")));
        if let Some(description) = str_field(repo, "description") {
            lines.push(OutputLine::muted(format!("         {description}")));
        }
    }
    lines
}

fn repos(ctx: AsyncContext, _args: Vec<String>) -> BoxFuture<'static, Vec<OutputLine>> {
    async move {
        let config = &ctx.services.config;
        let url = format!(
            "{}/users/{}/repos?sort=updated&per_page={REPO_LIMIT}",
            config.github_api_base_url.trim_end_matches('/'),
            config.github_username
        );
        ctx.print(OutputLine::muted("Fetching repositories..."));
        match ctx.services.source.get_json(&url).await {
            Ok(value) => {
                let mut lines = vec![OutputLine::accent(format!(
                    "Repositories of {}",
                    config.github_username
                ))];
                lines.extend(repo_lines(&value));
                lines
            }
            Err(error) => {
                ctx.services.logger.warn(
                    "repos.fetch_failed",
                    json!({ "error": error.to_string() }),
                );
                vec![OutputLine::error("repos: could not fetch repositories")]
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn weather_urls_encode_the_city() {
        assert_eq!(
            weather_url("https://wttr.in", "New York").as_deref(),
            Some("https://wttr.in/New%20York?format=j1")
        );
        assert!(weather_url("not a url", "x").is_none());
    }

    #[test]
    fn weather_maps_the_j1_document() {
        let value = json!({
            "current_condition": [{
                "temp_C": "3", "FeelsLikeC": "-1", "humidity": "80",
                "windspeedKmph": "12", "weatherDesc": [{ "value": "Light snow" }]
            }],
            "nearest_area": [{ "areaName": [{ "value": "Katowice" }], "country": [{ "value": "Poland" }] }]
        });
        let lines = weather_lines("katowice", &value).unwrap();
        assert_eq!(lines[0].text, "Weather for Katowice, Poland");
        assert_eq!(lines[1].text, "  Light snow");
        assert_eq!(lines[2].text, "  Temperature: 3°C (feels like -1°C)");
        assert!(weather_lines("x", &json!({})).is_none());
    }

    #[test]
    fn now_playing_shows_each_time_once() {
        let track = SpotifyView {
            is_playing: true,
            title: "Song".to_string(),
            artist: "Band".to_string(),
            album: None,
            album_art: None,
            url: None,
            progress_ms: Some(62_000),
            duration_ms: Some(210_000),
        };
        let lines = track_lines(&track);
        assert_eq!(lines[0].text, "♪ Song - Band");
        assert_eq!(lines[1].text, "  [#######-----------------] 1:02 / 3:30");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn repos_tolerate_missing_fields() {
        let lines = repo_lines(&json!([{ "name": "bio", "stargazers_count": 4 }, {}]));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].text.contains("bio"));
        assert!(lines[1].text.contains("—"));
        assert!(repo_lines(&json!({ "message": "rate limited" }))[0].is_error());
    }
}
