//! Cheap HTML-to-text conversion for classification input. Not a renderer —
//! just enough structure-stripping that the classifier sees body text rather
//! than markup.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</\1>").expect("static regex compiles"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("static regex compiles"));
static MULTI_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex compiles"));

pub fn html_to_text(html: &str) -> String {
    let mut text = SCRIPT_STYLE_RE.replace_all(html, "").into_owned();
    text = TAG_RE.replace_all(&text, " ").into_owned();
    text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    text = MULTI_WS_RE.replace_all(&text, "\n\n").into_owned();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_scripts() {
        let html = "<html><head><script>evil()</script></head><body><p>Hallo <b>Welt</b></p></body></html>";
        let text = html_to_text(html);
        assert!(!text.contains("evil"));
        assert!(text.contains("Hallo"));
        assert!(text.contains("Welt"));
    }
}
