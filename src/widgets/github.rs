use super::{count_field, str_at, str_field};
use crate::date::format_display_time;
use serde::Serialize;
use serde_json::Value;
use time::UtcOffset;

/// Both activity feeds are capped at this many rows.
pub const FEED_LIMIT: usize = 20;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSummary {
    pub projects: String,
    pub starred_count: String,
    pub commits: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarredRepo {
    pub name: String,
    pub owner: String,
    pub stars: String,
    pub language: String,
    pub description: String,
    pub starred_at: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEntry {
    pub message: String,
    pub repo: String,
    pub author: String,
    pub date: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubView {
    pub summary: GitHubSummary,
    pub starred: Vec<StarredRepo>,
    pub recent_commits: Vec<CommitEntry>,
    pub last_update: Option<String>,
}

pub fn map_github(value: &Value, offset: UtcOffset, default_author: &str) -> GitHubView {
    let summary = value.get("summary").unwrap_or(&Value::Null);
    let starred = value
        .get("starred")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(FEED_LIMIT)
                .map(|star| map_starred(star, offset))
                .collect()
        })
        .unwrap_or_default();
    let recent_commits = value
        .get("recentCommits")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(FEED_LIMIT)
                .map(|commit| map_commit(commit, offset, default_author))
                .collect()
        })
        .unwrap_or_default();

    GitHubView {
        summary: GitHubSummary {
            projects: count_field(summary, "projects"),
            starred_count: count_field(summary, "starredCount"),
            commits: count_field(summary, "commits"),
        },
        starred,
        recent_commits,
        last_update: str_field(value, "lastUpdate")
            .map(|raw| format_display_time(&raw, false, offset))
            .filter(|formatted| !formatted.is_empty()),
    }
}

fn map_starred(star: &Value, offset: UtcOffset) -> StarredRepo {
    StarredRepo {
        name: str_field(star, "name").unwrap_or_else(|| "Unknown Repo".to_string()),
        owner: str_field(star, "owner")
            .or_else(|| str_at(star, &["owner", "login"]))
            .unwrap_or_else(|| "Unknown".to_string()),
        stars: count_field(star, "stars"),
        language: str_field(star, "language").unwrap_or_else(|| "N/A".to_string()),
        description: str_field(star, "description")
            .unwrap_or_else(|| "No description provided.".to_string()),
        starred_at: str_field(star, "starredAt")
            .map(|raw| format_display_time(&raw, true, offset))
            .unwrap_or_default(),
        url: str_field(star, "url").unwrap_or_else(|| "#".to_string()),
    }
}

/// Accepts both the flat worker shape and the nested REST `commit.author` shape.
fn map_commit(commit: &Value, offset: UtcOffset, default_author: &str) -> CommitEntry {
    let message = str_field(commit, "message")
        .or_else(|| str_at(commit, &["commit", "message"]))
        .unwrap_or_else(|| "No message".to_string());
    let first_line = message.lines().next().unwrap_or("").to_string();
    CommitEntry {
        message: first_line,
        repo: str_field(commit, "repo")
            .or_else(|| str_at(commit, &["repository", "name"]))
            .unwrap_or_else(|| "Unknown".to_string()),
        author: str_field(commit, "author")
            .or_else(|| str_at(commit, &["commit", "author", "name"]))
            .or_else(|| str_at(commit, &["author", "login"]))
            .unwrap_or_else(|| default_author.to_string()),
        date: str_field(commit, "date")
            .or_else(|| str_at(commit, &["commit", "author", "date"]))
            .map(|raw| format_display_time(&raw, true, offset))
            .unwrap_or_default(),
        url: str_field(commit, "url")
            .or_else(|| str_field(commit, "html_url"))
            .unwrap_or_else(|| "#".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn maps_summary_and_feeds_with_fallbacks() {
        let value = json!({
            "summary": { "projects": 12, "starredCount": "40" },
            "starred": [{ "name": "ripgrep", "owner": "BurntSushi", "stars": 50000 }, {}],
            "recentCommits": [{ "message": "fix: things\n\nlong body", "repo": "bio" }],
            "lastUpdate": "2024-01-01T10:00:00Z"
        });
        let view = map_github(&value, UtcOffset::UTC, "Piotrunius");
        assert_eq!(view.summary.projects, "12");
        assert_eq!(view.summary.starred_count, "40");
        assert_eq!(view.summary.commits, "0");
        assert_eq!(view.starred[0].stars, "50000");
        assert_eq!(view.starred[1].name, "Unknown Repo");
        assert_eq!(view.starred[1].language, "N/A");
        assert_eq!(view.recent_commits[0].message, "fix: things");
        assert_eq!(view.recent_commits[0].author, "Piotrunius");
        assert_eq!(view.last_update.as_deref(), Some("01/01/2024, 10:00"));
    }

    #[test]
    fn accepts_nested_commit_author() {
        let value = json!({
            "recentCommits": [{
                "commit": { "message": "init", "author": { "name": "octocat", "date": "2024-02-03T04:05:00Z" } },
                "html_url": "https://github.com/x/y/commit/1"
            }]
        });
        let commit = &map_github(&value, UtcOffset::UTC, "me").recent_commits[0];
        assert_eq!(commit.author, "octocat");
        assert_eq!(commit.message, "init");
        assert_eq!(commit.date, "03/02 04:05");
        assert_eq!(commit.url, "https://github.com/x/y/commit/1");
    }

    #[test]
    fn feeds_are_capped() {
        let starred: Vec<Value> = (0..30).map(|i| json!({ "name": format!("r{i}") })).collect();
        let view = map_github(&json!({ "starred": starred }), UtcOffset::UTC, "me");
        assert_eq!(view.starred.len(), FEED_LIMIT);
    }
}
