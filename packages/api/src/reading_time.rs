//! Reading-time estimate for article content.

const WORDS_PER_MINUTE: usize = 200;

/// `"{n} min read"` for rich-text `content`, rounding up. Tags are stripped
/// before counting; empty content is `"0 min read"`.
pub fn reading_time(content: &str) -> String {
    let words = strip_tags(content).split_whitespace().count();
    format!("{} min read", words.div_ceil(WORDS_PER_MINUTE))
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}
