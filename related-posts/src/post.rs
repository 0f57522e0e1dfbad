use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::RelatedPostsError;

const SEPARATOR: &str = "---";
const INDEX_FILE: &str = "index.md";

// Paired Hugo shortcodes, `{{< name args >}}...{{< /name >}}`, contents included.
static SHORTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{<\s*[^>]+>\}\}.*?\{\{<\s*/[^>]+>\}\}").expect("valid shortcode regex")
});

/// Hugo post frontmatter. Keys this tool doesn't know about are carried
/// through untouched when the post is saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub similar_posts: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

impl Frontmatter {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_date)
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

#[derive(Debug, Clone)]
pub struct MarkdownPost {
    pub path: PathBuf,
    pub frontmatter: Frontmatter,
    /// Everything after the closing frontmatter separator, byte for byte.
    pub content: String,
    pub embedding: Vec<f64>,
}

impl MarkdownPost {
    pub fn read(path: &Path) -> Result<Self, RelatedPostsError> {
        let raw = fs::read_to_string(path).map_err(|source| RelatedPostsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self, RelatedPostsError> {
        let parts: Vec<&str> = raw.splitn(3, SEPARATOR).collect();
        let [_, yaml, content] = parts.as_slice() else {
            return Err(RelatedPostsError::Frontmatter {
                path: path.to_path_buf(),
                reason: "expected the post to start with a `---` delimited block".to_owned(),
            });
        };

        let frontmatter: Frontmatter = if yaml.trim().is_empty() {
            Frontmatter::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| RelatedPostsError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        if let Some(date) = &frontmatter.date {
            if parse_date(date).is_none() {
                return Err(RelatedPostsError::Frontmatter {
                    path: path.to_path_buf(),
                    reason: format!("unrecognized date {date:?}"),
                });
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            frontmatter,
            content: (*content).to_owned(),
            embedding: Vec::new(),
        })
    }

    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        !self.frontmatter.draft && self.frontmatter.published_at().map_or(true, |date| date <= now)
    }

    /// Site-relative link to the post: `content/posts/foo/index.md` becomes `/posts/foo`.
    pub fn link(&self) -> String {
        let lossy = self.path.to_string_lossy();
        let mut path: &str = &lossy;
        while let Some(rest) = path.strip_prefix("./") {
            path = rest;
        }

        let path = path.strip_prefix("content").unwrap_or(path);
        path.strip_suffix("/index.md").unwrap_or(path).to_owned()
    }

    pub fn plain_text(&self) -> String {
        strip_markdown(&self.content)
    }

    pub fn render(&self) -> Result<String, RelatedPostsError> {
        let yaml = serde_yaml::to_string(&self.frontmatter).map_err(RelatedPostsError::Serialize)?;
        Ok(format!("{SEPARATOR}\n{yaml}{SEPARATOR}{}", self.content))
    }

    pub fn save(&self) -> Result<(), RelatedPostsError> {
        fs::write(&self.path, self.render()?).map_err(|source| RelatedPostsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Reduce markdown to the text a reader would see, minus paired shortcodes.
pub fn strip_markdown(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(s) | Event::Code(s) => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => text.push('\n'),
            _ => {}
        }
    }

    SHORTCODE.replace_all(&text, "").into_owned()
}

/// Every parseable `index.md` (any case) under `dir`. Posts that fail to parse
/// are logged and left out.
pub fn load_posts(dir: &Path) -> Result<Vec<MarkdownPost>, RelatedPostsError> {
    let mut posts = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file()
            || !entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(INDEX_FILE)
        {
            continue;
        }

        match MarkdownPost::read(entry.path()) {
            Ok(post) => posts.push(post),
            Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping post"),
        }
    }

    Ok(posts)
}
