/// Ticker symbol -> CoinGecko coin id.
/// Order matters: intent detection picks the first symbol mentioned in this order.
const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("DOT", "polkadot"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("UNI", "uniswap"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub symbol: String,
    pub coin_id: String,
}

/// Fixed symbol table, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOLS.iter().copied())
    }
}

impl SymbolTable {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(symbol, coin_id)| SymbolEntry {
                symbol: symbol.to_uppercase(),
                coin_id: coin_id.to_string(),
            })
            .collect();
        Self { entries }
    }

    /// Exact (case-insensitive) symbol lookup. No fuzzy matching.
    pub fn coin_id(&self, symbol: &str) -> Option<&str> {
        let symbol = symbol.trim();
        self.entries
            .iter()
            .find(|e| e.symbol.eq_ignore_ascii_case(symbol))
            .map(|e| e.coin_id.as_str())
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = SymbolTable::default();
        assert_eq!(table.len(), 12);
        assert_eq!(table.entries()[0].symbol, "BTC");
        assert_eq!(table.coin_id("BTC"), Some("bitcoin"));
        assert_eq!(table.coin_id("avax"), Some("avalanche-2"));
        assert_eq!(table.coin_id(" matic "), Some("matic-network"));
    }

    #[test]
    fn test_unknown_symbol_is_not_found() {
        let table = SymbolTable::default();
        assert_eq!(table.coin_id("ZZZ"), None);
        // no prefix or fuzzy matching
        assert_eq!(table.coin_id("BT"), None);
        assert_eq!(table.coin_id("bitcoin"), None);
    }
}
