//! Text extraction helpers shared by the tools.

/// Extract readable text from HTML (simple approach).
pub fn extract_text_from_html(html: &str) -> String {
    let mut text = strip_element(html, "<script", "</script>");
    text = strip_element(&text, "<style", "</style>");

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;

    for c in text.chars() {
        if c == '<' {
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag {
            result.push(c);
        }
    }

    let result = result.split_whitespace().collect::<Vec<_>>().join(" ");
    html_decode(&result)
}

fn strip_element(html: &str, open: &str, close: &str) -> String {
    let mut text = html.to_string();
    while let Some(start) = text.find(open) {
        match text[start..].find(close) {
            Some(end) => {
                text = format!("{}{}", &text[..start], &text[start + end + close.len()..]);
            }
            None => break,
        }
    }
    text
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Keep runs of printable characters from binary content (like `strings`).
///
/// Runs shorter than `min_run` characters are dropped as noise.
pub fn printable_runs(bytes: &[u8], min_run: usize) -> String {
    let mut runs = Vec::new();
    let mut current = String::new();

    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' || b == b'\t' {
            current.push(b as char);
        } else {
            if current.trim().len() >= min_run {
                runs.push(current.trim().to_string());
            }
            current.clear();
        }
    }
    if current.trim().len() >= min_run {
        runs.push(current.trim().to_string());
    }

    runs.join("\n")
}

/// Truncate on a char boundary, appending a marker when anything was cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_reduced_to_text() {
        let html = "<html><head><style>p{}</style><script>var x = 1;</script></head>\
                    <body><h1>Path&nbsp;Params</h1><p>Use &lt;int&gt; &amp; more</p></body></html>";
        assert_eq!(extract_text_from_html(html), "Path Params Use <int> & more");
    }

    #[test]
    fn printable_runs_skip_binary_noise() {
        let bytes = b"%PDF-1.4\x00\x01\x02ab\xff\xfeminimize the objective\x00";
        assert_eq!(printable_runs(bytes, 4), "%PDF-1.4\nminimize the objective");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h... [truncated]");
    }
}
