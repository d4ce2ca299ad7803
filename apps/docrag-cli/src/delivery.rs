//! Terminal rendering of engine answers and image attachment lookup.

use std::path::{Path, PathBuf};

use docrag_core::types::Answer;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Drop control characters (keeping newlines and tabs) so model output
/// cannot drive the terminal.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\t').collect()
}

/// Answers containing a `|` are usually tables and are kept preformatted.
pub fn is_tabular(text: &str) -> bool {
    text.contains('|')
}

pub fn render(answer: &Answer) -> String {
    let text = sanitize(answer.text.trim());
    let body = if is_tabular(&text) { format!("```\n{}\n```", text) } else { text };
    let sources = if answer.sources.is_empty() {
        "none".to_string()
    } else {
        answer.sources.iter().map(|s| sanitize(s)).collect::<Vec<_>>().join(", ")
    };
    format!("Answer:\n{}\n\nSources: {}", body, sources)
}

/// Finds supplementary media for an answer's sources.
pub trait MediaResolver {
    fn resolve(&self, sources: &[String]) -> Vec<PathBuf>;
}

/// Attaches images from `media_dir` whose filename appears inside a source name.
pub struct SourceSubstringResolver {
    media_dir: PathBuf,
}

impl SourceSubstringResolver {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self { media_dir: media_dir.into() }
    }

    fn images(&self) -> Vec<(String, PathBuf)> {
        let mut images: Vec<(String, PathBuf)> = walkdir::WalkDir::new(&self.media_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let name = e.file_name().to_str()?.to_lowercase();
                let ext = Path::new(&name).extension()?.to_str()?.to_string();
                IMAGE_EXTENSIONS.contains(&ext.as_str()).then(|| (name, e.into_path()))
            })
            .collect();
        images.sort();
        images
    }
}

impl MediaResolver for SourceSubstringResolver {
    fn resolve(&self, sources: &[String]) -> Vec<PathBuf> {
        let images = self.images();
        let mut out: Vec<PathBuf> = Vec::new();
        for source in sources {
            let base = source.rsplit('/').next().unwrap_or(source).to_lowercase();
            for (name, path) in &images {
                if base.contains(name.as_str()) && !out.contains(path) {
                    out.push(path.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str, sources: &[&str]) -> Answer {
        Answer { text: text.into(), sources: sources.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn control_characters_are_stripped() {
        assert_eq!(sanitize("ok\x1b[31m red\x07\nnext\tcol"), "ok[31m red\nnext\tcol");
    }

    #[test]
    fn tables_render_preformatted() {
        let out = render(&answer("| a | b |\n|---|---|", &["sheet.xlsx"]));
        assert!(out.contains("```\n| a | b |"));
        assert!(out.ends_with("Sources: sheet.xlsx"));
    }

    #[test]
    fn plain_answers_render_inline() {
        let out = render(&answer("Wear gloves.", &[]));
        assert_eq!(out, "Answer:\nWear gloves.\n\nSources: none");
    }

    #[test]
    fn images_match_by_filename_substring() {
        let dir = tempfile::tempdir().expect("tmp");
        std::fs::write(dir.path().join("Layout.PNG"), b"png").expect("write");
        std::fs::write(dir.path().join("pump.jpg"), b"jpg").expect("write");
        std::fs::write(dir.path().join("pump.pdf"), b"pdf").expect("write");
        let r = SourceSubstringResolver::new(dir.path());

        let got = r.resolve(&["plans/layout.png".to_string(), "layout.png".to_string(), "pump.pdf".to_string()]);
        assert_eq!(got, vec![dir.path().join("Layout.PNG")]);
        assert!(r.resolve(&["other.txt".to_string()]).is_empty());
    }
}
