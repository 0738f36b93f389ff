use markup5ever_rcdom::Handle;

use super::post::{MediaItem, MediaKind};
use crate::dom::selectors;
use crate::dom::{descendants, find_descendant, get_node_attr, text_content};

/// 按文档顺序提取媒体，没有任何媒体时返回 `None`
pub fn extract_media(container: &Handle) -> Option<Vec<MediaItem>> {
    let mut media = Vec::new();

    for node in descendants(container) {
        let item = if selectors::PHOTO.matches(&node) {
            photo(&node)
        } else if selectors::GIF_PLAYER.matches(&node) {
            video(&node, MediaKind::Gif)
        } else if selectors::VIDEO_PLAYER.matches(&node) {
            let kind = if is_gif(&node) { MediaKind::Gif } else { MediaKind::Video };
            video(&node, kind)
        } else {
            None
        };

        if let Some(item) = item {
            // 播放器嵌套时同一地址只记一次
            if !media.iter().any(|m: &MediaItem| m.url == item.url) {
                media.push(item);
            }
        }
    }

    (!media.is_empty()).then_some(media)
}

fn photo(node: &Handle) -> Option<MediaItem> {
    let img = find_descendant(node, |n| selectors::IMAGE.matches(n))?;
    let url = get_node_attr(&img, "src")?;
    Some(MediaItem {
        kind: MediaKind::Photo,
        url,
    })
}

fn video(node: &Handle, kind: MediaKind) -> Option<MediaItem> {
    let video = find_descendant(node, |n| selectors::VIDEO.matches(n))?;
    let url = get_node_attr(&video, "src")
        .or_else(|| {
            find_descendant(&video, |n| get_node_attr(n, "src").is_some())
                .and_then(|source| get_node_attr(&source, "src"))
        })
        .or_else(|| get_node_attr(&video, "poster"))?;
    Some(MediaItem { kind, url })
}

fn is_gif(player: &Handle) -> bool {
    let labelled = text_content(player)
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("gif"));
    let gif_source = find_descendant(player, |n| {
        selectors::VIDEO.matches(n)
            && get_node_attr(n, "src").is_some_and(|src| src.contains("tweet_video"))
    })
    .is_some();
    labelled || gif_source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{get_node_name, html_to_dom};

    fn article(html: &str) -> Handle {
        let dom = html_to_dom(html.as_bytes(), "utf-8").expect("parse");
        find_descendant(&dom.document, |n| get_node_name(n) == Some("article")).expect("article")
    }

    #[test]
    fn test_media_in_document_order() {
        let node = article(
            r#"<article>
                <div data-testid="tweetPhoto"><img src="https://pbs.example/a.jpg"></div>
                <div data-testid="videoPlayer"><video poster="https://pbs.example/v.jpg"><source src="https://video.example/v.mp4"></video></div>
                <div data-testid="videoPlayer"><video src="https://video.example/tweet_video/g.mp4"></video><span>GIF</span></div>
            </article>"#,
        );

        let media = extract_media(&node).expect("media");
        let kinds: Vec<_> = media.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MediaKind::Photo, MediaKind::Video, MediaKind::Gif]);
        assert_eq!(media[1].url, "https://video.example/v.mp4");
    }

    #[test]
    fn test_no_media_is_none() {
        let node = article("<article><span>text only</span></article>");
        assert_eq!(extract_media(&node), None);
    }
}
