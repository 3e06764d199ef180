//! Markup fallback renderer and chunk anchor index.
//!
//! Markup content is never windowed. It is split at every `<a id="…">` /
//! `<a name="…">` tag, each piece is converted to Markdown-flavoured display
//! text with `htmd`, and the pieces are joined line by line.
//!
//! The byte offset where each anchor's piece starts in the *rendered* text is
//! recorded, so resolving "which chunk does this position belong to" is a
//! binary search over that index instead of a walk over a live tree.

use htmd::options::{HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use tracing::warn;

/// Offset-sorted anchor positions in rendered text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorIndex {
    entries: Vec<(usize, String)>,
}

impl AnchorIndex {
    /// Builds an index from `(offset, id)` pairs in any order.
    pub fn new(mut entries: Vec<(usize, String)>) -> Self {
        entries.sort_by_key(|(offset, _)| *offset);
        Self { entries }
    }

    /// Nearest anchor at or before `offset` in document order.
    pub fn anchor_at(&self, offset: usize) -> Option<&str> {
        let idx = self.entries.partition_point(|(pos, _)| *pos <= offset);
        idx.checked_sub(1).map(|i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(o, id)| (*o, id.as_str()))
    }
}

/// Markup converted to display text.
#[derive(Debug, Clone, Default)]
pub struct RenderedMarkup {
    pub text: String,
    pub anchors: AnchorIndex,
}

/// Converts markup into display text and an anchor index.
pub fn render(markup: &str) -> RenderedMarkup {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Default::default()
        })
        .skip_tags(vec!["script", "style", "head"])
        .build();

    let mut out = String::with_capacity(markup.len() / 2);
    let mut anchors = Vec::new();
    let mut cursor = 0;
    let mut pending_id: Option<String> = None;

    for anchor in find_anchors(markup) {
        let html = &markup[cursor..anchor.start];
        push_segment(&converter, html, pending_id.take(), &mut out, &mut anchors);
        cursor = anchor.end;
        pending_id = Some(anchor.id);
    }
    push_segment(&converter, &markup[cursor..], pending_id, &mut out, &mut anchors);

    RenderedMarkup {
        text: out,
        anchors: AnchorIndex::new(anchors),
    }
}

fn push_segment(
    converter: &HtmlToMarkdown,
    html: &str,
    anchor: Option<String>,
    out: &mut String,
    anchors: &mut Vec<(usize, String)>,
) {
    let converted = match converter.convert(html) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "markup segment conversion failed");
            html.to_owned()
        }
    };
    let text = converted.trim();
    if !text.is_empty() && !out.is_empty() {
        out.push('\n');
    }
    if let Some(id) = anchor {
        anchors.push((out.len(), id));
    }
    out.push_str(text);
}

/// An anchor tag and the byte range it occupies in the source markup.
struct AnchorTag {
    start: usize,
    end: usize,
    id: String,
}

/// Locates the opening `<a>` tags that carry an `id` or `name`, in source order.
fn find_anchors(markup: &str) -> Vec<AnchorTag> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(lt) = markup[from..].find('<').map(|i| from + i) {
        let Some(gt) = markup[lt..].find('>').map(|i| lt + i) else {
            break;
        };
        if markup[lt..].starts_with("<!--") {
            from = markup[lt..].find("-->").map_or(markup.len(), |i| lt + i + 3);
            continue;
        }
        let tag = Tag::parse(&markup[lt + 1..gt]);
        if tag.name == "a" && !tag.closing {
            if let Some(id) = tag.attr("id").or_else(|| tag.attr("name")) {
                found.push(AnchorTag { start: lt, end: gt + 1, id });
            }
        }
        from = gt + 1;
    }
    found
}

struct Tag {
    name: String,
    closing: bool,
    attrs: String,
}

impl Tag {
    fn parse(inner: &str) -> Self {
        let inner = inner.trim();
        let (closing, inner) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let inner = inner.trim_end_matches('/');
        let split = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        Self {
            name: inner[..split].to_ascii_lowercase(),
            closing,
            attrs: inner[split..].to_owned(),
        }
    }

    /// Value of attribute `key`, quoted or bare.
    fn attr(&self, key: &str) -> Option<String> {
        let lower = self.attrs.to_ascii_lowercase();
        let mut search_from = 0;
        while let Some(pos) = lower[search_from..].find(key) {
            let start = search_from + pos;
            search_from = start + key.len();
            let boundary = start == 0
                || lower[..start].ends_with(|c: char| c.is_whitespace());
            let rest = self.attrs[start + key.len()..].trim_start();
            if !boundary || !rest.starts_with('=') {
                continue;
            }
            let value = rest[1..].trim_start();
            let parsed = match value.chars().next() {
                Some(q @ ('"' | '\'')) => value[1..].split(q).next(),
                Some(_) => value.split(|c: char| c.is_whitespace()).next(),
                None => None,
            };
            return parsed.filter(|v| !v.is_empty()).map(str::to_owned);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_become_lines() {
        let r = render("<p>Revenue grew</p>");
        assert_eq!(r.text, "Revenue grew");
        assert!(r.anchors.is_empty());
    }

    #[test]
    fn table_cells_keep_document_order() {
        let r = render("<table><tr><td>2023</td><td>41</td></tr><tr><td>2024</td><td>57</td></tr></table>");
        let positions: Vec<_> = ["2023", "41", "2024", "57"]
            .iter()
            .map(|cell| r.text.find(cell))
            .collect();
        assert!(positions.iter().all(Option::is_some), "{:?}", r.text);
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", r.text);
    }

    #[test]
    fn entities_are_decoded() {
        let r = render("<p>AT&amp;T &#8212; margin</p>");
        assert!(r.text.contains("AT&T"), "{:?}", r.text);
        assert!(r.text.contains('\u{2014}'), "{:?}", r.text);
    }

    #[test]
    fn anchors_record_rendered_offsets() {
        let r = render("<a id=\"c1\"></a><p>first</p><a name='c2'></a><p>second</p>");
        assert_eq!(r.text, "first\nsecond");
        let anchors: Vec<_> = r.anchors.iter().collect();
        assert_eq!(anchors, vec![(0, "c1"), (6, "c2")]);
    }

    #[test]
    fn anchor_wrapping_text_keeps_the_text() {
        let r = render("<p>intro</p><a name=\"c9\">Segment results</a>");
        assert_eq!(r.text, "intro\nSegment results");
        assert_eq!(r.anchors.anchor_at(r.text.len() - 1), Some("c9"));
        assert_eq!(r.anchors.anchor_at(0), None);
    }

    #[test]
    fn anchor_lookup_finds_nearest_preceding() {
        let idx = AnchorIndex::new(vec![(40, "c3".into()), (0, "c1".into()), (12, "c2".into())]);
        assert_eq!(idx.anchor_at(0), Some("c1"));
        assert_eq!(idx.anchor_at(11), Some("c1"));
        assert_eq!(idx.anchor_at(12), Some("c2"));
        assert_eq!(idx.anchor_at(1000), Some("c3"));

        let late = AnchorIndex::new(vec![(5, "x".into())]);
        assert_eq!(late.anchor_at(4), None);
    }

    #[test]
    fn script_and_style_bodies_are_skipped() {
        let r = render("<style>p { color: red }</style><p>kept</p><script>alert(1)</script>");
        assert_eq!(r.text, "kept");
    }

    #[test]
    fn anchors_need_an_id_attribute() {
        assert!(find_anchors("<a data-id=\"nope\" href=\"#\">link</a>").is_empty());
        assert!(find_anchors("<!-- <a id=\"old\"></a> --><p>x</p>").is_empty());
        let found = find_anchors("<p>x</p><A ID=c4>y</A>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c4");
        assert_eq!(found[0].start, 8);
    }
}
