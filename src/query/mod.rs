//! Query plan generation
//!
//! The endpoint only supports name search, so full enumeration is
//! approximated by many short queries. Short, generic queries tend to return
//! the largest and most varied result pages, so the plan runs them first.

use crate::config::QueryConfig;
use std::collections::BTreeSet;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// The ordered set of search strings submitted to the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    queries: Vec<String>,
}

impl QueryPlan {
    /// Builds a plan from the query configuration and the target country's keywords
    ///
    /// Queries are deduplicated and ordered shortest first, with ties broken
    /// lexicographically, so the same configuration always yields the same
    /// plan. Overlong queries are kept; workers skip them.
    ///
    /// # Example
    ///
    /// ```
    /// use institution_crawler::config::QueryConfig;
    /// use institution_crawler::query::QueryPlan;
    ///
    /// let config = QueryConfig {
    ///     letters: 2,
    ///     bigram_first: 1,
    ///     bigram_second: 2,
    ///     keywords: vec!["school".to_string()],
    ///     include_empty: true,
    /// };
    /// let plan = QueryPlan::generate(&config, &[]);
    /// assert_eq!(plan.queries(), ["", "a", "b", "aa", "ab", "school"]);
    /// ```
    pub fn generate(config: &QueryConfig, country_keywords: &[String]) -> Self {
        let letters = |n: usize| ALPHABET[..n.min(ALPHABET.len())].iter().map(|&b| b as char);

        let mut unique = BTreeSet::new();
        unique.extend(letters(config.letters).map(String::from));
        for first in letters(config.bigram_first) {
            for second in letters(config.bigram_second) {
                unique.insert(format!("{first}{second}"));
            }
        }
        unique.extend(
            config
                .keywords
                .iter()
                .chain(country_keywords)
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty()),
        );
        if config.include_empty {
            unique.insert(String::new());
        }

        // BTreeSet iteration is lexicographic; a stable sort by length keeps
        // that order within each length.
        let mut queries: Vec<String> = unique.into_iter().collect();
        queries.sort_by_key(|q| q.chars().count());

        Self { queries }
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Number of queries a worker would skip for exceeding `max_len`
    pub fn count_over_length(&self, max_len: usize) -> usize {
        self.queries
            .iter()
            .filter(|q| exceeds_query_length(q, max_len))
            .count()
    }
}

impl IntoIterator for QueryPlan {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.queries.into_iter()
    }
}

/// Whether a query is too long to be worth submitting
pub fn exceeds_query_length(query: &str, max_len: usize) -> bool {
    query.chars().count() > max_len
}
