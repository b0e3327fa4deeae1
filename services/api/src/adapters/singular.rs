//! services/api/src/adapters/singular.rs
//!
//! English plural folding for allergen matching, backed by the `Inflector` crate.
//!
//! Only the head noun (the last word) of a phrase is folded, so "tree nuts"
//! becomes "tree nut".

use inflector::Inflector;
use medvault_core::ports::Singularizer;

#[derive(Clone, Debug, Default)]
pub struct InflectorSingularizer;

/// Inflector strips "oes" plurals down to the consonant and eats the "s" of
/// Latin "-us" singulars, so those shapes are handled here first.
fn singularize_word(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("oes") {
        return format!("{}o", stem);
    }
    if word.ends_with("us") || word.ends_with("ss") || word.ends_with('o') {
        return word.to_string();
    }
    word.to_singular()
}

impl Singularizer for InflectorSingularizer {
    fn singularize(&self, term: &str) -> String {
        let mut words: Vec<&str> = term.split_whitespace().collect();
        let Some(head) = words.pop() else {
            return String::new();
        };
        let head = singularize_word(head);
        if words.is_empty() {
            head
        } else {
            format!("{} {}", words.join(" "), head)
        }
    }
}
