/// Expand keywords and languages into search queries.
///
/// Keywords form the outer loop and languages the inner one, so the output
/// order is deterministic. An empty list on either side yields no queries.
pub fn build_queries<K, L>(keywords: &[K], languages: &[L]) -> Vec<String>
where
    K: AsRef<str>,
    L: AsRef<str>,
{
    keywords
        .iter()
        .flat_map(|keyword| {
            languages
                .iter()
                .map(move |lang| format!("{} language:{}", keyword.as_ref(), lang.as_ref()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_outer_languages_inner() {
        let queries = build_queries(&["foo", "bar"], &["go", "rust"]);
        assert_eq!(
            queries,
            vec![
                "foo language:go",
                "foo language:rust",
                "bar language:go",
                "bar language:rust",
            ]
        );
    }

    #[test]
    fn test_empty_inputs_yield_no_queries() {
        let none: [&str; 0] = [];
        assert!(build_queries(&none, &["go"]).is_empty());
        assert!(build_queries(&["foo"], &none).is_empty());
    }

    #[test]
    fn test_accepts_owned_strings() {
        let keywords = vec!["cli".to_string()];
        let languages = vec!["rust".to_string()];
        assert_eq!(build_queries(&keywords, &languages), vec!["cli language:rust"]);
    }
}
