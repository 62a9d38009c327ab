//! Post body parsing: split out image and video links from the text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("valid regex"));
static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedBody {
    /// The content with media links removed.
    pub text: String,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Media {
    Image,
    Video,
}

pub fn parse_body(content: &str) -> ParsedBody {
    let mut body = ParsedBody::default();
    let mut text = String::with_capacity(content.len());
    let mut kept_from = 0;

    for m in URL.find_iter(content) {
        // Trailing punctuation belongs to the sentence, not the link.
        let link = m.as_str().trim_end_matches(['.', ',', ')', ';', '!', '?']);
        let list = match media_kind(link) {
            Some(Media::Image) => &mut body.image_urls,
            Some(Media::Video) => &mut body.video_urls,
            None => continue,
        };
        if !list.iter().any(|u| u == link) {
            list.push(link.to_owned());
        }
        text.push_str(&content[kept_from..m.start()]);
        kept_from = m.start() + link.len();
    }
    text.push_str(&content[kept_from..]);

    let text = text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    body.text = EXTRA_BLANK_LINES.replace_all(&text, "\n\n").trim().to_owned();
    body
}

fn media_kind(link: &str) -> Option<Media> {
    let url = url::Url::parse(link).ok()?;
    let ext = url.path().rsplit_once('.')?.1.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(Media::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(Media::Video)
    } else {
        None
    }
}
