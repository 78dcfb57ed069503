//! Chain-level constants: mint sets, DEX registry, unit conversions.

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Mints treated as native SOL. Wrapped SOL balances are folded into the
/// wallet's SOL delta during parsing and never surface as a traded token.
pub const SOL_MINTS: &[&str] = &[
    "So11111111111111111111111111111111111111112",
    "So11111111111111111111111111111111111111111",
];

/// Routing-hop tokens: stablecoins and liquid-staking tokens that commonly
/// appear as the middle leg of a multi-hop swap. These never surface as the
/// target token of a trade.
pub const INTERMEDIATE_MINTS: &[&str] = &[
    // Stablecoins
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", // USDC
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", // USDT
    "USDSwr9ApdHk5bvJKMjzff41FfuX8bSxdKcR81vTwcA",  // USDS
    "USD1ttGY1N17NEEHLmELoaybftRBUSErhqYiQzvEmuB",  // USD1
    // Liquid staking
    "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",  // mSOL
    "bSo13r4TkiE4KumL71LsHTPpL2euBYLFx6h9HP3piy1",  // bSOL
    "7dHbWXmci3dT8UFYWYZweBLXgycu7Y3iL6trKn1Y7ARj", // stSOL
    "J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn", // jitoSOL
];

/// Known DEX vendors, matched case-insensitively as substrings against the
/// provider's `source` field. First hit wins.
pub const KNOWN_DEXES: &[(&str, &str)] = &[
    ("jupiter", "Jupiter"),
    ("raydium", "Raydium"),
    ("pump", "Pump.fun"),
    ("orca", "Orca"),
    ("meteora", "Meteora"),
    ("moonshot", "Moonshot"),
    ("phoenix", "Phoenix"),
    ("lifinity", "Lifinity"),
];

/// Program id -> DEX label, used when only a low-level parsed transaction is
/// available and the enhanced `source` field is missing.
pub const DEX_PROGRAM_IDS: &[(&str, &str)] = &[
    ("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4", "Jupiter"),
    ("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", "Raydium"),
    ("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P", "Pump.fun"),
    ("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc", "Orca"),
    ("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo", "Meteora"),
    ("MoonCVVNZFSYkqNXP6bxHLPL6QQJiMagDL3qcqUQTrG", "Moonshot"),
    ("PhoeNiXZ8ByJGLkxNfZRnkUfjvmuYqLR89jjFHGqdXY", "Phoenix"),
    ("EewxydAPCCVuNEyrVN68PuSYdQ7wKn27V9Gjeoi8dy3S", "Lifinity"),
];

/// Token deltas below this absolute value are dust and dropped by the parser.
pub const DUST_THRESHOLD: f64 = 1e-6;

/// SOL deltas below this absolute value are treated as "no SOL moved".
pub const SOL_DELTA_FLOOR: f64 = 1e-4;

/// Convert a lamport amount to SOL.
pub fn lamports_to_sol(lamports: i64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
