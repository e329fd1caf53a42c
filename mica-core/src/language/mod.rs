//! Language classification for virtual files.
//!
//! Pure lookups from a file name to its language tag, extension, MIME type,
//! and binary-ness, plus the fixed ignore policy for dependency caches and
//! build outputs. Stateless; every other component consumes this one.

pub mod analyze;

use serde::{Deserialize, Serialize};
use strum::VariantArray;

/// Closed set of languages the engine understands. Anything else classifies
/// as `PlainText`, which is a valid answer rather than an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::VariantArray,
)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    TypeScript,
    JavaScript,
    Rust,
    Python,
    Go,
    Java,
    C,
    Cpp,
    Csharp,
    Ruby,
    Php,
    Html,
    Css,
    Json,
    Yaml,
    Toml,
    Markdown,
    Shell,
    Sql,
    Dockerfile,
    PlainText,
}

impl Language {
    /// Case-insensitive extension table. First language claiming an
    /// extension wins; extensions here are lower-case without the dot.
    fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Rust => &["rs"],
            Language::Python => &["py", "pyi", "pyw"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
            Language::Csharp => &["cs"],
            Language::Ruby => &["rb", "rake"],
            Language::Php => &["php"],
            Language::Html => &["html", "htm"],
            Language::Css => &["css", "scss", "sass", "less"],
            Language::Json => &["json", "jsonc"],
            Language::Yaml => &["yaml", "yml"],
            Language::Toml => &["toml"],
            Language::Markdown => &["md", "markdown"],
            Language::Shell => &["sh", "bash", "zsh"],
            Language::Sql => &["sql"],
            Language::Dockerfile => &[],
            Language::PlainText => &["txt", "text"],
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Language::TypeScript => "text/x-typescript",
            Language::JavaScript => "text/javascript",
            Language::Rust => "text/x-rust",
            Language::Python => "text/x-python",
            Language::Go => "text/x-go",
            Language::Java => "text/x-java",
            Language::C => "text/x-c",
            Language::Cpp => "text/x-c++",
            Language::Csharp => "text/x-csharp",
            Language::Ruby => "text/x-ruby",
            Language::Php => "text/x-php",
            Language::Html => "text/html",
            Language::Css => "text/css",
            Language::Json => "application/json",
            Language::Yaml => "text/yaml",
            Language::Toml => "text/toml",
            Language::Markdown => "text/markdown",
            Language::Shell => "text/x-shellscript",
            Language::Sql => "text/x-sql",
            Language::Dockerfile => "text/x-dockerfile",
            Language::PlainText => "text/plain",
        }
    }
}

/// Classification of a single file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Lower-cased extension without the dot, when the name has one.
    pub extension: Option<String>,
    pub language: Language,
    pub mime_type: String,
    pub is_binary: bool,
}

/// File names that classify regardless of extension rules. Compared
/// case-insensitively against the bare file name.
const FILENAME_OVERRIDES: &[(&str, Language)] = &[
    ("dockerfile", Language::Dockerfile),
    ("containerfile", Language::Dockerfile),
    ("makefile", Language::PlainText),
    ("gemfile", Language::Ruby),
    ("rakefile", Language::Ruby),
];

/// Extensions treated as binary payloads. Content search and import
/// analysis skip these.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svgz", // images
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", // archives
    "exe", "dll", "so", "dylib", "a", "o", "bin", "wasm", // executables
    "woff", "woff2", "ttf", "otf", "eot", // fonts
    "mp3", "mp4", "wav", "ogg", "avi", "mov", "webm", // media
    "pdf", "class", "pyc", "db", "sqlite",
];

/// Directory names never worth indexing: version-control metadata,
/// dependency caches, build outputs, editor state.
const IGNORED_DIR_NAMES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "target",
    "build",
    "dist",
    "out",
    "__pycache__",
    ".cache",
    ".next",
    ".venv",
    "venv",
    "coverage",
    ".idea",
    ".vscode",
];

/// Classify a file name (not a path - pass the final segment).
///
/// Exact-filename overrides beat extension rules; extension lookup is
/// case-insensitive. Unknown extensions yield `PlainText` with an
/// `application/octet-stream` MIME type, which is not an error.
pub fn classify(name: &str) -> Classification {
    let lower = name.to_lowercase();

    for (override_name, language) in FILENAME_OVERRIDES {
        if lower == *override_name {
            return Classification {
                extension: extension_of(name),
                language: *language,
                mime_type: language.mime_type().to_string(),
                is_binary: false,
            };
        }
    }

    let Some(ext) = extension_of(name) else {
        return Classification {
            extension: None,
            language: Language::PlainText,
            mime_type: "application/octet-stream".to_string(),
            is_binary: false,
        };
    };

    if BINARY_EXTENSIONS.contains(&ext.as_str()) {
        return Classification {
            extension: Some(ext),
            language: Language::PlainText,
            mime_type: "application/octet-stream".to_string(),
            is_binary: true,
        };
    }

    for language in Language::VARIANTS {
        if language.extensions().contains(&ext.as_str()) {
            return Classification {
                extension: Some(ext),
                language: *language,
                mime_type: language.mime_type().to_string(),
                is_binary: false,
            };
        }
    }

    Classification {
        extension: Some(ext),
        language: Language::PlainText,
        mime_type: "application/octet-stream".to_string(),
        is_binary: false,
    }
}

/// Whether a slash-separated path should be ignored entirely. True when any
/// segment equals one of the ignored directory names.
pub fn should_ignore(path: &str) -> bool {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .any(|segment| IGNORED_DIR_NAMES.contains(&segment))
}

/// Lower-cased extension without the dot. Dotfiles like `.gitignore` have
/// no extension; `archive.tar.gz` yields `gz`.
fn extension_of(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    if dot == 0 || dot == name.len() - 1 {
        return None;
    }
    Some(name[dot + 1..].to_lowercase())
}
