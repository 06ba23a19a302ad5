use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of leading bytes inspected by the content sniffer.
const SNIFF_LEN: usize = 512;

/// Minimum share of printable bytes for an unknown file to count as text.
const PRINTABLE_THRESHOLD: f64 = 0.8;

const TEXT_EXTENSIONS: &[&str] = &[
    // Programming languages
    ".js", ".ts", ".jsx", ".tsx", ".vue", ".svelte", ".astro", ".py", ".java", ".c", ".cpp",
    ".cc", ".cxx", ".h", ".hpp", ".hxx", ".cs", ".php", ".rb", ".go", ".rs", ".swift", ".kt",
    ".scala", ".clj", ".dart", ".r", ".m", ".mm", ".pl", ".sh", ".bash", ".zsh", ".fish",
    ".lua", ".vim", ".el", ".lisp", ".hs", ".ml", ".fs", ".fsx", ".fsi",
    // Web technologies
    ".html", ".htm", ".xml", ".svg", ".css", ".scss", ".sass", ".less", ".styl",
    ".json", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf", ".properties",
    // Documentation
    ".md", ".mdx", ".txt", ".rst", ".tex", ".org", ".adoc", ".asciidoc",
    // Configuration
    ".dockerfile", ".gitignore", ".gitattributes", ".editorconfig", ".eslintrc", ".prettierrc",
    ".babelrc", ".browserslistrc", ".nvmrc", ".python-version", ".ruby-version", ".node-version",
    // Database and API
    ".sql", ".graphql", ".gql", ".proto", ".prisma",
    // Build and deployment
    ".makefile", ".cmake", ".gradle", ".maven", ".sbt", ".msbuild",
    // Environment
    ".env", ".env.local", ".env.production", ".env.development", ".env.staging", ".env.test",
    // Templates
    ".hbs", ".mustache", ".ejs", ".pug", ".jade", ".twig",
    // Data
    ".csv", ".tsv", ".jsonl", ".ndjson",
];

/// Extension-less file names that are always text.
const SPECIAL_TEXT_FILENAMES: &[&str] = &[
    "dockerfile", "makefile", "readme", "license", "changelog", "contributing", "authors",
    "notice", "todo", "copying", "install", "news", "thanks", "version", "manifest", "gemfile",
    "rakefile", "guardfile", "vagrantfile", "procfile", "gruntfile", "gulpfile", "webpack",
];

/// Returns the extension of `path` including the leading dot, or an empty string.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Determines if a file is a text file eligible for packing.
///
/// The extension allow-list short-circuits content sniffing, so a `.md` file
/// containing NUL bytes is still eligible. Any I/O failure yields `false`.
pub fn is_text_file(path: &Path) -> bool {
    let ext = dotted_extension(path).to_lowercase();
    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return true;
    }

    if ext.is_empty() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if SPECIAL_TEXT_FILENAMES.contains(&file_name.as_str()) {
            return true;
        }
    }

    match check_file_content(path) {
        Ok(is_text) => is_text,
        Err(e) => {
            tracing::debug!("Treating unreadable file as binary: {} ({})", path.display(), e);
            false
        }
    }
}

/// Checks the leading bytes of a file to decide between text and binary.
fn check_file_content(path: &Path) -> io::Result<bool> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut buffer)?;
    Ok(looks_like_text(&buffer))
}

/// The byte heuristic behind [`is_text_file`] for files without a known extension.
pub fn looks_like_text(prefix: &[u8]) -> bool {
    if prefix.is_empty() {
        return true;
    }
    if prefix.contains(&0) {
        return false;
    }

    let printable = prefix
        .iter()
        .filter(|&&b| (0x20..=0x7e).contains(&b) || matches!(b, b'\t' | b'\n' | b'\r'))
        .count();

    (printable as f64 / prefix.len() as f64) > PRINTABLE_THRESHOLD
}
