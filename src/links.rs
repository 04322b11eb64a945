//! NoteVault - Resource Link Extraction
//!
//! Pulls linked resource paths out of a markdown note body. Supports wiki
//! embeds (`[[1.jpg]]`, `![[1.jpg|alias]]`) and markdown image embeds
//! (`![alt](media/1.jpg)`). External URLs are ignored.

use std::collections::HashSet;

/// Extract linked resource paths from a note body, order-preserving and
/// deduplicated.
pub fn extract_links(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |target: &str| {
        let target = target.trim();
        if target.is_empty() || target.contains("://") {
            return;
        }
        if seen.insert(target.to_string()) {
            links.push(target.to_string());
        }
    };

    // Wiki embeds: [[target]] or [[target|alias]]
    let mut rest = body;
    while let Some(start) = rest.find("[[") {
        let tail = &rest[start + 2..];
        match tail.find("]]") {
            Some(end) => {
                let inner = &tail[..end];
                let target = inner.split('|').next().unwrap_or(inner);
                push(target);
                rest = &tail[end + 2..];
            }
            None => break,
        }
    }

    // Markdown image embeds: ![alt](path)
    let mut rest = body;
    while let Some(start) = rest.find("![") {
        let tail = &rest[start + 2..];
        let Some(open) = tail.find("](") else { break };
        match tail[open + 2..].find(')') {
            Some(close) => {
                push(&tail[open + 2..open + 2 + close]);
                rest = &tail[open + 2 + close..];
            }
            None => break,
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiki_links() {
        let body = "我是一条段落 [[1.jpg]] and ![[shots/long.png|tall one]]";
        assert_eq!(extract_links(body), vec!["1.jpg", "shots/long.png"]);
    }

    #[test]
    fn test_markdown_image_links() {
        let body = "before ![cover](media/cover.jpg) after ![](clip.mp4)";
        assert_eq!(extract_links(body), vec!["media/cover.jpg", "clip.mp4"]);
    }

    #[test]
    fn test_dedup_and_urls_skipped() {
        let body = "[[1.jpg]] again [[1.jpg]] and ![web](https://example.com/x.png)";
        assert_eq!(extract_links(body), vec!["1.jpg"]);
    }

    #[test]
    fn test_unterminated_links_ignored() {
        assert!(extract_links("broken [[no-close and ![img](no-close").is_empty());
        assert!(extract_links("plain text only").is_empty());
    }
}
