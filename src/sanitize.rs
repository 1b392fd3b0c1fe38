// Allow-list HTML sanitizer for third-party job descriptions. Output is re-serialized
// from the parsed tree, so nothing outside the allow-list survives.

use scraper::{ElementRef, Html, Node};

/// Tags kept in stored descriptions.
pub const ALLOWED_TAGS: [&str; 11] = [
    "p", "br", "ul", "li", "ol", "strong", "em", "h2", "h3", "a", "b",
];

/// Attributes kept on `<a>`; every other element loses all attributes.
pub const ALLOWED_LINK_ATTRS: [&str; 2] = ["href", "title"];

/// Elements removed together with everything inside them.
const DROPPED_WITH_CONTENT: [&str; 9] = [
    "script", "style", "noscript", "iframe", "template", "object", "svg", "head", "title",
];

const ALLOWED_SCHEMES: [&str; 3] = ["http:", "https:", "mailto:"];

/// Sanitize `raw` to the allow-list. Disallowed elements are unwrapped (their text is kept),
/// except script-like elements whose content is dropped entirely.
pub fn sanitize_html(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut out = String::with_capacity(raw.len());
    write_children(fragment.root_element(), &mut out);
    out.trim().to_string()
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(el) => {
                let name = el.name();
                if DROPPED_WITH_CONTENT.contains(&name) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if !ALLOWED_TAGS.contains(&name) {
                    write_children(child_ref, out);
                    continue;
                }

                out.push('<');
                out.push_str(name);
                if name == "a" {
                    for attr in ALLOWED_LINK_ATTRS {
                        let Some(value) = el.attr(attr) else {
                            continue;
                        };
                        if attr == "href" && !is_safe_href(value) {
                            continue;
                        }
                        out.push(' ');
                        out.push_str(attr);
                        out.push_str("=\"");
                        escape_attr(value, out);
                        out.push('"');
                    }
                }
                out.push('>');

                if name == "br" {
                    continue;
                }
                write_children(child_ref, out);
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

fn is_safe_href(href: &str) -> bool {
    let href = href.trim().to_ascii_lowercase();
    match href.find(':') {
        // Relative links and fragments have no scheme; a colon after a path separator is not one.
        Some(idx) if !href[..idx].contains(['/', '?', '#']) => {
            ALLOWED_SCHEMES.iter().any(|s| href.starts_with(s))
        }
        _ => true,
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            _ => escape_text(c.encode_utf8(&mut [0; 4]), out),
        }
    }
}

/// Decode entities and drop any markup, collapsing whitespace.
pub fn decode_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Length of the visible text of an HTML snippet, in characters.
pub fn text_len(html: &str) -> usize {
    decode_text(html).chars().count()
}

/// Render sanitized HTML as plain text: block elements become line breaks,
/// list items become bullets.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    write_text(fragment.root_element(), &mut out);

    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;
    for line in out.lines().map(collapse_whitespace) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || lines.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn write_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.name() {
                    "br" => out.push('\n'),
                    "li" => {
                        out.push_str("\n• ");
                        write_text(child_ref, out);
                    }
                    "p" | "h2" | "h3" | "ul" | "ol" | "div" => {
                        out.push('\n');
                        write_text(child_ref, out);
                        out.push_str("\n\n");
                    }
                    name if DROPPED_WITH_CONTENT.contains(&name) => {}
                    _ => write_text(child_ref, out),
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collect every tag name and attribute left in sanitized output.
    fn tags_and_attrs(html: &str) -> Vec<(String, Vec<String>)> {
        let fragment = Html::parse_fragment(html);
        fragment
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .skip(1)
            .map(|e| {
                let attrs = e.value().attrs().map(|(k, _)| k.to_string()).collect();
                (e.value().name().to_string(), attrs)
            })
            .collect()
    }

    #[test]
    fn keeps_allowed_structure() {
        let out = sanitize_html("<p>Hello <strong>world</strong><br>next</p><ul><li>one</li></ul>");
        assert_eq!(
            out,
            "<p>Hello <strong>world</strong><br>next</p><ul><li>one</li></ul>"
        );
    }

    #[test]
    fn unwraps_disallowed_tags_and_drops_scripts() {
        let out = sanitize_html(
            r#"<div class="x"><span>Keep</span> me<script>alert(1)</script><style>p{}</style></div>"#,
        );
        assert_eq!(out, "Keep me");
    }

    #[test]
    fn strips_attributes_outside_allow_list() {
        let out = sanitize_html(
            r#"<p style="color:red" onclick="x()">a</p><a href="https://e.com" title="t" target="_blank" onclick="y()">link</a>"#,
        );
        assert_eq!(
            out,
            r#"<p>a</p><a href="https://e.com" title="t">link</a>"#
        );
    }

    #[test]
    fn drops_javascript_links() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">x</a><a href="/jobs/1">y</a>"#);
        assert_eq!(out, r#"<a>x</a><a href="/jobs/1">y</a>"#);
    }

    #[test]
    fn escapes_text() {
        let out = sanitize_html("<p>5 &lt; 6 &amp; &quot;fun&quot;</p>");
        assert_eq!(out, "<p>5 &lt; 6 &amp; \"fun\"</p>");
    }

    #[test]
    fn output_never_contains_disallowed_tags_or_attrs() {
        let inputs = [
            r#"<table><tr><td onclick="x">cell</td></tr></table>"#,
            r#"<img src=x onerror=alert(1)><h1 id="a">Head</h1><h2 class="b">Sub</h2>"#,
            r#"<p><a href="https://a" rel="nofollow" data-x="1">l</a><iframe src="e"></iframe></p>"#,
            "<<p>>unbalanced <b>bold <em>both</b></em>",
            r#"<form action="/steal"><input name="x"><button>go</button></form>"#,
        ];
        for input in inputs {
            let out = sanitize_html(input);
            for (tag, attrs) in tags_and_attrs(&out) {
                assert!(ALLOWED_TAGS.contains(&tag.as_str()), "tag {tag} in {out}");
                for attr in attrs {
                    assert_eq!(tag, "a", "attribute {attr} on {tag}");
                    assert!(ALLOWED_LINK_ATTRS.contains(&attr.as_str()), "attr {attr}");
                }
            }
        }
    }

    #[test]
    fn decodes_entities_for_plain_fields() {
        assert_eq!(decode_text("  Risk &amp; Control\n Analyst "), "Risk & Control Analyst");
        assert_eq!(decode_text("<b>Bold</b> name"), "Bold name");
    }

    #[test]
    fn renders_plain_text_with_bullets() {
        let text = html_to_text("<p>Intro</p><ul><li>One</li><li>Two</li></ul><p>End<br>line</p>");
        assert_eq!(text, "Intro\n\n• One\n• Two\n\nEnd\nline");
    }
}
