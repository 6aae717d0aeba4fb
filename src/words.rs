pub const WORDLE_WORDS: &[&str] = &[
    "DEBIT", "TOKEN", "FRAUD", "VAULT", "SWIFT", "BLOCK", "CHAIN", "BUYER", "MONEY", "PRICE",
    "LEDGE", "BATCH", "FUNDS", "QUOTA", "YIELD", "STAKE", "ASSET", "BONDS", "TRADE", "AUDIT",
    "DRAFT", "FLOAT", "GROSS", "INDEX", "LIMIT", "MERGE", "ORDER", "PAYER", "QUERY", "RATES",
    "SPLIT", "TAXES", "UNION", "VALUE", "WIRES", "XFERS", "ZEROS", "AGENT", "BILLS", "CARDS",
    "DEALS", "ESCRO", "FOREX", "GRANT", "HEDGE", "ISSUE", "JOINT", "KIOSK", "LOANS", "MICRO",
];

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn wordle_words_are_five_upper_letters()
    {
        assert_eq!(WORDLE_WORDS.len(), 50);
        for word in WORDLE_WORDS {
            assert_eq!(word.len(), 5, "{word}");
            assert!(word.chars().all(|c| c.is_ascii_uppercase()), "{word}");
        }
    }
}
