use super::{CommandContext, CommandRegistry, sync, usage_warning};
use crate::date::LS_DATE;
use crate::output::{OutputLine, lines_of};
use crate::vfs::{FsNode, HOME, join_path};
use std::collections::BTreeMap;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(sync("cd", "cd [dir]", "Change directory", "fa-folder-open", cd));
    registry.register(sync(
        "ls",
        "ls [-a] [-l] [path]",
        "List directory contents",
        "fa-folder",
        ls,
    ));
    registry.register(sync(
        "cat",
        "cat <file>...",
        "Print file contents",
        "fa-file-lines",
        cat,
    ));
    registry.register(sync(
        "tree",
        "tree [-a] [path]",
        "Show the directory tree",
        "fa-sitemap",
        tree,
    ));
}

fn cd(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let Some(target) = args.first() else {
        ctx.state.cwd = HOME.to_string();
        return vec![];
    };
    if args.len() > 1 {
        return vec![OutputLine::error("cd: too many arguments")];
    }
    let path = join_path(&ctx.state.cwd, target);
    match ctx.services.fs.resolve(&path) {
        Some(node) if node.is_dir() => {
            ctx.state.cwd = path;
            vec![]
        }
        Some(_) => vec![OutputLine::error(format!("cd: not a directory: {target}"))],
        None => vec![OutputLine::error(format!("cd: no such file or directory: {target}"))],
    }
}

#[derive(Debug, Default, Eq, PartialEq)]
struct LsFlags {
    all: bool,
    long: bool,
}

fn parse_ls_args(args: &[String]) -> Result<(LsFlags, Vec<&str>), String> {
    let mut flags = LsFlags::default();
    let mut positional = Vec::new();
    for arg in args {
        let Some(letters) = arg.strip_prefix('-').filter(|rest| !rest.is_empty()) else {
            positional.push(arg.as_str());
            continue;
        };
        for letter in letters.chars() {
            match letter {
                'a' => flags.all = true,
                'l' => flags.long = true,
                other => return Err(format!("ls: invalid option -- '{other}'")),
            }
        }
    }
    Ok((flags, positional))
}

fn ls(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let (flags, positional) = match parse_ls_args(args) {
        Ok(parsed) => parsed,
        Err(message) => return vec![OutputLine::warning(message)],
    };
    if positional.len() > 1 {
        return vec![OutputLine::warning("ls: accepts at most a single path")];
    }
    let label = positional.first().copied();
    let path = label
        .map(|arg| join_path(&ctx.state.cwd, arg))
        .unwrap_or_else(|| ctx.state.cwd.clone());
    let Some(node) = ctx.services.fs.resolve(&path) else {
        let label = label.unwrap_or(".");
        return vec![OutputLine::error(format!(
            "ls: cannot access '{label}': No such file or directory"
        ))];
    };
    let user = ctx.state.user(&ctx.services.config.prompt_user);

    let FsNode::Dir(children) = node else {
        let name = label.unwrap_or(&path);
        return vec![entry_line(name, node, flags.long, user)];
    };

    let mut entries: Vec<(&str, &FsNode)> = Vec::new();
    if flags.all {
        entries.push((".", node));
        entries.push(("..", node));
    }
    entries.extend(
        children
            .iter()
            .filter(|(name, _)| flags.all || !name.starts_with('.'))
            .map(|(name, child)| (name.as_str(), child)),
    );
    if entries.is_empty() {
        return vec![];
    }
    if flags.long {
        let mut lines = vec![OutputLine::muted(format!("total {}", entries.len()))];
        lines.extend(entries.iter().map(|(name, child)| entry_line(name, child, true, user)));
        return lines;
    }
    let names: Vec<String> = entries
        .iter()
        .map(|(name, child)| short_name(name, child))
        .collect();
    vec![OutputLine::plain(names.join("  "))]
}

fn short_name(name: &str, node: &FsNode) -> String {
    if node.is_dir() && name != "." && name != ".." {
        format!("{name}/")
    } else {
        name.to_string()
    }
}

/// Fabricated `ls -l` row; the metadata is scenery.
fn entry_line(name: &str, node: &FsNode, long_format: bool, user: &str) -> OutputLine {
    if !long_format {
        let line = short_name(name, node);
        return if node.is_dir() {
            OutputLine::info(line)
        } else {
            OutputLine::plain(line)
        };
    }
    let permissions = match node {
        FsNode::Dir(_) => "drwxr-xr-x",
        FsNode::File(_) if name.starts_with('.') => "-rw-------",
        FsNode::File(_) => "-rw-r--r--",
    };
    let links = match node {
        FsNode::Dir(children) => 2 + children.values().filter(|child| child.is_dir()).count(),
        FsNode::File(_) => 1,
    };
    let line = format!(
        "{permissions} {links:>2} {user:<6} {user:<6} {size:>6} {LS_DATE} {name}",
        size = node.size()
    );
    if node.is_dir() {
        OutputLine::info(line)
    } else {
        OutputLine::plain(line)
    }
}

fn cat(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    if args.is_empty() {
        return vec![usage_warning("cat", "cat <file>...")];
    }
    let mut lines = Vec::new();
    for arg in args {
        let path = join_path(&ctx.state.cwd, arg);
        match ctx.services.fs.resolve(&path) {
            Some(FsNode::File(content)) => lines.extend(lines_of(content)),
            Some(FsNode::Dir(_)) => {
                lines.push(OutputLine::error(format!("cat: {arg}: Is a directory")))
            }
            None => lines.push(OutputLine::error(format!(
                "cat: {arg}: No such file or directory"
            ))),
        }
    }
    lines
}

fn tree(ctx: &mut CommandContext<'_>, args: &[String]) -> Vec<OutputLine> {
    let show_hidden = args.iter().any(|arg| arg == "-a");
    let label = args.iter().find(|arg| !arg.starts_with('-'));
    let path = label
        .map(|arg| join_path(&ctx.state.cwd, arg))
        .unwrap_or_else(|| ctx.state.cwd.clone());
    let children = match ctx.services.fs.resolve(&path) {
        Some(FsNode::Dir(children)) => children,
        Some(FsNode::File(_)) => {
            return vec![OutputLine::error(format!(
                "tree: {}: Not a directory",
                label.map(String::as_str).unwrap_or(".")
            ))];
        }
        None => {
            return vec![OutputLine::error(format!(
                "tree: {}: No such file or directory",
                label.map(String::as_str).unwrap_or(".")
            ))];
        }
    };
    let mut lines = vec![OutputLine::info(label.map(String::as_str).unwrap_or("."))];
    let mut counts = (0usize, 0usize);
    walk_tree(children, "", show_hidden, &mut lines, &mut counts);
    let (dirs, files) = counts;
    lines.push(OutputLine::plain(""));
    lines.push(OutputLine::muted(format!(
        "{dirs} {}, {files} {}",
        if dirs == 1 { "directory" } else { "directories" },
        if files == 1 { "file" } else { "files" }
    )));
    lines
}

fn walk_tree(
    children: &BTreeMap<String, FsNode>,
    prefix: &str,
    show_hidden: bool,
    lines: &mut Vec<OutputLine>,
    counts: &mut (usize, usize),
) {
    let visible: Vec<(&String, &FsNode)> = children
        .iter()
        .filter(|(name, _)| show_hidden || !name.starts_with('.'))
        .collect();
    let last_index = visible.len().saturating_sub(1);
    for (index, (name, node)) in visible.into_iter().enumerate() {
        let last = index == last_index;
        let branch = if last { "└── " } else { "├── " };
        match node {
            FsNode::Dir(grandchildren) => {
                counts.0 += 1;
                lines.push(OutputLine::info(format!("{prefix}{branch}{name}/")));
                let next_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
                walk_tree(grandchildren, &next_prefix, show_hidden, lines, counts);
            }
            FsNode::File(_) => {
                counts.1 += 1;
                lines.push(OutputLine::plain(format!("{prefix}{branch}{name}")));
            }
        }
    }
}
