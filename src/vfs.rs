//! Read-only virtual filesystem behind `cd`, `ls`, `cat` and `tree`.
//!
//! Paths are `~`-rooted and `/`-delimited. The tree is built once at startup
//! and never mutated, so resolution is a pure walk over borrowed nodes.

use crate::profile::Profile;
use std::collections::BTreeMap;

pub const HOME: &str = "~";

const STATIC_FILES: &[(&str, &[&str])] = &[
    (
        "contact.txt",
        &[
            "Best way to reach me: Discord (see `socials`).",
            "Business inquiries: open an issue on GitHub.",
        ],
    ),
    (
        ".secret",
        &[
            "You found the hidden file.",
            "Try the Konami code somewhere on this page...",
        ],
    ),
    (
        "projects/README.md",
        &[
            "# Projects",
            "",
            "- bio: this very page",
            "- dotfiles: Bazzite + Hyprland configuration",
            "- stats-worker: Cloudflare Worker feeding the GitHub widget",
        ],
    ),
    (
        "projects/bio.txt",
        &[
            "Personal bio-link page.",
            "Profile card, socials, live status widgets and this terminal.",
        ],
    ),
    (
        "projects/dotfiles.txt",
        &["Bazzite, Hyprland, a lot of green accents."],
    ),
    (
        "projects/.wip",
        &["Nothing to see here yet."],
    ),
];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FsNode {
    Dir(BTreeMap<String, FsNode>),
    File(String),
}

impl FsNode {
    pub fn is_dir(&self) -> bool {
        matches!(self, FsNode::Dir(_))
    }

    pub fn children(&self) -> Option<&BTreeMap<String, FsNode>> {
        match self {
            FsNode::Dir(children) => Some(children),
            FsNode::File(_) => None,
        }
    }

    /// Fabricated byte size for `ls -l`.
    pub fn size(&self) -> usize {
        match self {
            FsNode::Dir(_) => 4096,
            FsNode::File(content) => content.len(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VirtualFs {
    root: FsNode,
}

impl VirtualFs {
    /// Seeds the tree from the profile data and the static files.
    pub fn seeded(profile: &Profile) -> Self {
        let mut root = BTreeMap::new();
        insert_file(&mut root, "about.txt", about_text(profile));
        for (path, lines) in STATIC_FILES {
            insert_file(&mut root, path, lines.join("\n"));
        }
        insert_file(
            &mut root,
            "music/now-playing.txt",
            format!(
                "{} - {}\n{}",
                profile.music.title, profile.music.artist, profile.music.url
            ),
        );
        insert_file(&mut root, "setup/pc.txt", setup_text(&profile.pc));
        insert_file(&mut root, "setup/gear.txt", setup_text(&profile.gear));
        for social in &profile.socials {
            insert_file(
                &mut root,
                &format!("socials/{}.url", social.label.to_ascii_lowercase()),
                social.url.to_string(),
            );
        }
        Self {
            root: FsNode::Dir(root),
        }
    }

    /// Walks the tree; `None` when a segment is missing or a file is indexed into.
    pub fn resolve(&self, path: &str) -> Option<&FsNode> {
        let mut node = &self.root;
        for segment in path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != HOME)
        {
            node = node.children()?.get(segment)?;
        }
        Some(node)
    }
}

/// Joins an argument onto the current path at string level.
///
/// `..` pops one segment (never above `~`) and `.` is skipped. Arguments
/// starting with `~` or `/` are taken from the root.
pub fn join_path(current: &str, input: &str) -> String {
    let input = input.trim();
    let mut path = if input.starts_with(HOME) || input.starts_with('/') {
        HOME.to_string()
    } else {
        current.to_string()
    };
    for segment in input.split('/') {
        match segment {
            "" | "." | HOME => {}
            ".." => path = parent_path(&path),
            other => {
                path.push('/');
                path.push_str(other);
            }
        }
    }
    path
}

/// Pops the last segment of a `~`-rooted path, floored at `~`.
pub fn parent_path(current: &str) -> String {
    match current.rfind('/') {
        Some(index) if index > 0 => current[..index].to_string(),
        _ => HOME.to_string(),
    }
}

fn insert_file(root: &mut BTreeMap<String, FsNode>, path: &str, content: String) {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(file_name) = segments.pop() else {
        return;
    };
    let mut dir = root;
    for segment in segments {
        let entry = dir
            .entry(segment.to_string())
            .or_insert_with(|| FsNode::Dir(BTreeMap::new()));
        dir = match entry {
            FsNode::Dir(children) => children,
            FsNode::File(_) => return,
        };
    }
    dir.insert(file_name.to_string(), FsNode::File(content));
}

fn about_text(profile: &Profile) -> String {
    [
        format!("Name: {}", profile.name),
        format!("Location: {}", profile.location),
        format!("Bio: {}", profile.bio),
        String::new(),
        "Type `socials` for links or `setup` for hardware.".to_string(),
    ]
    .join("\n")
}

fn setup_text(items: &[crate::profile::SetupItem]) -> String {
    items
        .iter()
        .map(|item| format!("{:<12} {}", format!("{}:", item.label), item.value))
        .collect::<Vec<_>>()
        .join("\n")
}
