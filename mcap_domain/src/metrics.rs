//! Column names and formulas of the stablecoin and dominance dataset.

use crate::derived::Formula;

pub mod columns {
    pub const BITCOIN: &str = "Bitcoin Market Cap";
    pub const ETHEREUM: &str = "Ethereum Market Cap";
    pub const USDT: &str = "USDT Market Cap";
    pub const USDC: &str = "USDC Market Cap";
    pub const ALTCOINS: &str = "Altcoins Market Cap";

    pub const STABLECOIN_TOTAL: &str = "Stablecoin Total Market Cap";
    pub const TOTAL_EXCL_STABLECOINS: &str = "Total Market Cap Excluding Stablecoins";
    pub const BITCOIN_DOMINANCE: &str = "Bitcoin Dominance (%)";
    pub const ETHEREUM_DOMINANCE: &str = "Ethereum Dominance (%)";

    pub const BACKUP_BITCOIN: &str = "Stablecoin Backup (Bitcoin)";
    pub const BACKUP_ALTCOINS_ETHEREUM: &str = "Stablecoin Backup (Altcoins + Ethereum)";
    pub const BACKUP_TOTAL: &str = "Stablecoin Backup (Bitcoin + Altcoins + Ethereum)";

    pub const STABLECOINS: &[&str] = &[USDT, USDC];
}

use self::columns::*;

/// Upstream ids fetched individually, paired with their dataset column.
pub const CORE_ENTITIES: &[(&str, &str)] = &[
    ("bitcoin", BITCOIN),
    ("ethereum", ETHEREUM),
    ("tether", USDT),
    ("usd-coin", USDC),
];

/// Persisted column order of the dominance dataset.
pub const DOMINANCE_LAYOUT: &[&str] = &[
    BITCOIN,
    ETHEREUM,
    USDT,
    USDC,
    STABLECOIN_TOTAL,
    ALTCOINS,
    TOTAL_EXCL_STABLECOINS,
    BITCOIN_DOMINANCE,
    ETHEREUM_DOMINANCE,
    BACKUP_BITCOIN,
    BACKUP_ALTCOINS_ETHEREUM,
    BACKUP_TOTAL,
];

/// Totals, dominance and stablecoin backup ratios, in dependency order.
///
/// Expects the core columns plus the altcoin aggregate to be present.
pub fn dominance_formulas() -> Vec<Formula> {
    vec![
        Formula::sum(STABLECOIN_TOTAL, STABLECOINS),
        Formula::sum(TOTAL_EXCL_STABLECOINS, &[BITCOIN, ETHEREUM, ALTCOINS]),
        Formula::percent_of(BITCOIN_DOMINANCE, &[BITCOIN], &[TOTAL_EXCL_STABLECOINS]),
        Formula::percent_of(ETHEREUM_DOMINANCE, &[ETHEREUM], &[TOTAL_EXCL_STABLECOINS]),
        Formula::percent_of(BACKUP_BITCOIN, &[STABLECOIN_TOTAL], &[BITCOIN]),
        Formula::percent_of(BACKUP_ALTCOINS_ETHEREUM, &[STABLECOIN_TOTAL], &[ETHEREUM, ALTCOINS]),
        Formula::percent_of(BACKUP_TOTAL, &[STABLECOIN_TOTAL], &[BITCOIN, ETHEREUM, ALTCOINS]),
    ]
}
