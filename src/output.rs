use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Plain,
    Info,
    Success,
    Warning,
    Error,
    Accent,
    Muted,
    Prompt,
}

/// One row of terminal scrollback.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OutputLine {
    pub text: String,
    #[serde(rename = "styleClass")]
    pub style: LineStyle,
    #[serde(rename = "isHtml")]
    pub is_html: bool,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
            is_html: false,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Plain)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Info)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Success)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Warning)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Error)
    }

    pub fn accent(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Accent)
    }

    pub fn muted(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Muted)
    }

    /// Link row; the text is escaped before it is embedded.
    pub fn link(label: &str, url: &str) -> Self {
        Self {
            text: format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">{}</a>",
                escape_html(url),
                escape_html(label)
            ),
            style: LineStyle::Accent,
            is_html: true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.style == LineStyle::Error
    }
}

/// Splits text into one plain line per newline-delimited segment.
pub fn lines_of(text: &str) -> Vec<OutputLine> {
    split_lines(text).into_iter().map(OutputLine::plain).collect()
}

pub fn split_lines(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return vec![];
    }
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(|line| line.to_string())
        .collect()
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Side effects a command asks the frontend to perform.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    Clear,
    OpenUrl { url: String },
    Theme { theme: String },
    Opacity { value: f32 },
    Audio { playing: bool, src: String, volume: f32 },
    Konami,
    Matrix { seconds: u64 },
    CloseTerminal,
}
