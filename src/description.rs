//! Parsing of change descriptions.
//!
//! A change declares its cross-repository dependencies with lines such as
//!
//! ```text
//! Depends-On: https://github.com/acme/widget/pull/42?subdir=lib
//! Main-Dir: services/api
//! ```
//!
//! HTML comments are removed first so PR templates can document the syntax
//! without triggering it.

use std::sync::OnceLock;

use regex::Regex;

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

fn depends_on_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^Depends-On:[ \t]*(\S.*?)\s*$").expect("valid regex"))
}

fn main_dir_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^Main-Dir:[ \t]*(\S.*?)\s*$").expect("valid regex"))
}

/// Remove `<!-- ... -->` blocks, including multi-line ones.
pub fn filter_comments(text: &str) -> String {
    comment_re().replace_all(text, "").into_owned()
}

/// Every `Depends-On:` URL, in declaration order, without duplicates.
pub fn depends_on_urls(text: &str) -> Vec<String> {
    let text = filter_comments(text);
    let mut urls: Vec<String> = Vec::new();
    for capture in depends_on_re().captures_iter(&text) {
        let url = capture[1].to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// The last `Main-Dir:` value, if any.
pub fn main_dir(text: &str) -> Option<String> {
    let text = filter_comments(text);
    main_dir_re()
        .captures_iter(&text)
        .last()
        .map(|capture| capture[1].to_string())
}
