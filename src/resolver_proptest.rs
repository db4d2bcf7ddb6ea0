//! Property-based tests for URL classification and description parsing.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::description::{depends_on_urls, filter_comments};
    use crate::resolver::{classify, ChangeKind};
    use proptest::prelude::*;

    // ============================================================================
    // classify property tests
    // ============================================================================

    proptest! {
        /// Property: any path containing /c/ is a Gerrit change, whatever the host
        #[test]
        fn classify_gerrit_wins(
            host in "[a-z]{1,10}(\\.[a-z]{2,5}){0,2}",
            before in "(/[a-z0-9]{1,8}){0,3}",
            after in "(/[a-z0-9+]{1,8}){1,4}",
        ) {
            let url = format!("https://{}{}/c{}", host, before, after);
            prop_assert_eq!(classify(&url), ChangeKind::Gerrit);
        }

        /// Property: gitlab hosts without /c/ are GitLab merge requests
        #[test]
        fn classify_gitlab_host(
            prefix in "[a-z]{0,6}",
            suffix in "[a-z]{0,6}\\.(com|org|io)",
            path in "(/[abd-z0-9]{1,8}){1,4}",
        ) {
            let url = format!("https://{}gitlab{}{}/-/merge_requests/1", prefix, suffix, path);
            prop_assert_eq!(classify(&url), ChangeKind::GitLab);
        }

        /// Property: hosts without gitlab and paths without /c/ default to GitHub
        #[test]
        fn classify_github_default(
            org in "[abd-z0-9]{1,12}",
            repo in "[abd-z0-9_-]{1,12}",
            number in 1u32..100000,
        ) {
            let url = format!("https://github.com/{}/{}/pull/{}", org, repo, number);
            prop_assert_eq!(classify(&url), ChangeKind::GitHub);
        }

        /// Property: classify never panics
        #[test]
        fn classify_never_panics(url in ".*") {
            let _ = classify(&url);
        }
    }

    // ============================================================================
    // description property tests
    // ============================================================================

    proptest! {
        /// Property: a Depends-On line inside an HTML comment is never reported
        #[test]
        fn commented_depends_on_is_ignored(
            text in "[a-zA-Z0-9 .,\n]{0,80}",
            number in 1u32..10000,
        ) {
            let description = format!(
                "{}\n<!--\nDepends-On: https://github.com/a/b/pull/{}\n-->\n",
                text, number
            );
            prop_assert!(depends_on_urls(&description).is_empty());
        }

        /// Property: filter_comments output contains no complete comment
        #[test]
        fn filter_comments_removes_all_comments(
            parts in prop::collection::vec("[a-z \n]{0,10}", 1..5),
        ) {
            let description = parts.join("<!-- hidden -->");
            let filtered = filter_comments(&description);
            prop_assert!(!filtered.contains("<!--"));
            prop_assert!(!filtered.contains("hidden"));
        }

        /// Property: every listed URL is reported exactly once
        #[test]
        fn depends_on_urls_deduplicated(
            numbers in prop::collection::vec(1u32..20, 1..8),
        ) {
            let description: String = numbers
                .iter()
                .map(|n| format!("Depends-On: https://github.com/a/b/pull/{}\n", n))
                .collect();
            let urls = depends_on_urls(&description);
            let mut unique = numbers.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(urls.len(), unique.len());
        }
    }
}
