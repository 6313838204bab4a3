//! English stopword list used to filter key-concept tokens.
//!
//! Plain function words with no domain-specific signal; excluded from
//! `key_concepts` the same way `vestige_core::search::sanitize_fts5_query`
//! strips noise tokens before indexing.

pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see",
    "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use", "that",
    "with", "have", "this", "will", "your", "from", "they", "know", "want", "been", "good",
    "much", "some", "time", "very", "when", "come", "here", "just", "like", "long", "make",
    "many", "over", "such", "take", "than", "them", "well", "were", "what", "about", "after",
    "again", "could", "every", "first", "found", "great", "house", "large", "learn", "never",
    "other", "place", "plant", "point", "right", "small", "sound", "spell", "still", "study",
    "their", "there", "these", "thing", "think", "three", "water", "where", "which", "world",
    "would", "write", "being", "below", "between", "both", "during", "each", "into", "more",
    "most", "only", "same", "should", "through", "under", "until", "while", "because", "before",
    "does", "doing", "down", "further", "then", "those", "above", "against", "once", "ours",
    "ourselves", "yours", "yourself", "himself", "herself", "itself", "themselves", "having",
    "also", "any", "both", "few", "off", "own", "too", "very", "itis", "cant", "wont", "didnt",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}
