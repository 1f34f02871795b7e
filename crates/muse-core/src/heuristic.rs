//! Network-free commit message generation from diff statistics.
//!
//! Deterministic for a given diff and style, so it doubles as the offline
//! mode and as a stand-in backend in tests.

use crate::format;
use crate::style::Style;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub files: Vec<String>,
    pub has_declaration: bool,
    pub has_import: bool,
}

impl DiffStats {
    pub fn parse(diff: &str) -> Self {
        let mut stats = DiffStats::default();
        // Between `diff --git` and the first hunk, `---`/`+++` name files.
        let mut in_file_header = false;

        for line in diff.lines() {
            if line.contains("function") || line.contains("class") || line.contains("const ") {
                stats.has_declaration = true;
            }
            if line.contains("import") || line.contains("require") {
                stats.has_import = true;
            }

            if let Some(header) = line.strip_prefix("diff --git ") {
                in_file_header = true;
                stats.files.push(post_image_path(header));
                continue;
            }
            if line.starts_with("@@") {
                in_file_header = false;
                continue;
            }
            if in_file_header && (line.starts_with("+++") || line.starts_with("---")) {
                continue;
            }

            if line.starts_with('+') {
                stats.added += 1;
            } else if line.starts_with('-') {
                stats.removed += 1;
            }
        }

        stats
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn post_image_path(header: &str) -> String {
    match header.rsplit_once(" b/") {
        Some((_, path)) => path.to_string(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Categories {
    pub config: bool,
    pub test: bool,
    pub docs: bool,
    pub style: bool,
    pub api: bool,
    pub ui: bool,
}

impl Categories {
    pub fn classify<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut categories = Categories::default();
        for path in paths {
            let path = path.as_ref();
            let extension = extension(path);
            categories.config |= matches!(extension, "json" | "yaml" | "yml" | "toml" | "ini" | "env")
                || path.contains("config");
            categories.test |= path.contains(".test.")
                || path.contains(".spec.")
                || contains_dir(path, "test")
                || contains_dir(path, "tests")
                || contains_dir(path, "__tests__");
            categories.docs |= matches!(extension, "md" | "txt" | "rst") || path.contains("README");
            categories.style |= matches!(extension, "css" | "scss" | "sass" | "less" | "styl");
            categories.api |= contains_dir(path, "api")
                || contains_dir(path, "routes")
                || contains_dir(path, "controllers");
            categories.ui |= contains_dir(path, "components")
                || contains_dir(path, "views")
                || contains_dir(path, "pages")
                || matches!(extension, "vue" | "jsx" | "tsx");
        }
        categories
    }

    /// config > test > docs > api > ui > none.
    pub fn scope(&self) -> &'static str {
        if self.config {
            "config"
        } else if self.test {
            "tests"
        } else if self.docs {
            "docs"
        } else if self.api {
            "api"
        } else if self.ui {
            "ui"
        } else {
            ""
        }
    }
}

fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// Substring match, like `api/` matching both `api/` and `src/myapi/`.
fn contains_dir(path: &str, dir: &str) -> bool {
    path.contains(&format!("{dir}/"))
}

pub fn action(stats: &DiffStats, categories: &Categories) -> &'static str {
    if stats.added > stats.removed * 3 {
        if categories.config {
            "configure"
        } else if categories.test {
            "test"
        } else {
            "add"
        }
    } else if stats.removed > stats.added * 3 {
        "remove"
    } else if stats.has_declaration {
        if categories.test {
            "test"
        } else {
            "refactor"
        }
    } else if stats.has_import {
        "update dependencies"
    } else if categories.docs {
        "document"
    } else if categories.style {
        "style"
    } else {
        "update"
    }
}

pub fn target(stats: &DiffStats) -> String {
    if stats.file_count() == 1 {
        let name = file_name(&stats.files[0]);
        match name.split('.').next() {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => "file".to_string(),
        }
    } else {
        format!("{} files", stats.file_count())
    }
}

pub fn heuristic_message(diff: &str, style: &Style) -> String {
    let stats = DiffStats::parse(diff);
    let categories = Categories::classify(&stats.files);
    format::format(
        action(&stats, &categories),
        categories.scope(),
        &target(&stats),
        style.id(),
    )
}

/// One-line pull-request summary from the same statistics.
pub fn heuristic_summary(diff: &str) -> String {
    let stats = DiffStats::parse(diff);
    let categories = Categories::classify(&stats.files);
    let action = action(&stats, &categories);
    let target = target(&stats);
    let area = match categories.scope() {
        "" => String::new(),
        scope => format!(" in the {scope} area"),
    };
    format!(
        "This change {} {}{} with {} added and {} removed lines.",
        third_person(action),
        target,
        area,
        stats.added,
        stats.removed
    )
}

fn third_person(action: &str) -> String {
    match action.split_once(' ') {
        Some((verb, rest)) => format!("{verb}s {rest}"),
        None => format!("{action}s"),
    }
}
