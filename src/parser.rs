use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\s"]+|"[^"]*""#).expect("token regex should compile")
});

/// Splits a line into tokens; a double-quoted run is one token without its quotes.
pub fn tokenize(input: &str) -> Vec<String> {
    TOKEN_REGEX
        .find_iter(input)
        .map(|found| strip_quotes(found.as_str()).to_string())
        .collect()
}

pub fn strip_quotes(token: &str) -> &str {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
    pub alias: Option<String>,
}

/// Tokenizes a line and applies a single level of alias expansion.
pub fn parse_invocation(input: &str, aliases: &BTreeMap<String, String>) -> Option<Invocation> {
    let mut tokens = tokenize(input).into_iter();
    let name = tokens.next()?.to_lowercase();
    let args: Vec<String> = tokens.collect();

    let Some(expansion) = aliases.get(&name) else {
        return Some(Invocation {
            name,
            args,
            alias: None,
        });
    };
    let mut expanded = tokenize(expansion).into_iter();
    let Some(target) = expanded.next() else {
        return Some(Invocation {
            name,
            args,
            alias: None,
        });
    };
    let mut combined: Vec<String> = expanded.collect();
    combined.extend(args);
    Some(Invocation {
        name: target.to_lowercase(),
        args: combined,
        alias: Some(name),
    })
}

/// Parses `name=value` alias/export arguments as produced by the tokenizer.
///
/// `alias ll="ls -la"` tokenizes to `["ll=", "ls -la"]`, so the value is the
/// remainder of the first token joined with every following token.
pub fn parse_assignment(args: &[String]) -> Option<(String, String)> {
    let (first, rest) = args.split_first()?;
    let (name, head) = first.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut parts: Vec<&str> = Vec::new();
    if !head.is_empty() {
        parts.push(strip_quotes(head));
    }
    parts.extend(rest.iter().map(|part| part.as_str()));
    Some((name.to_string(), parts.join(" ").trim().to_string()))
}
