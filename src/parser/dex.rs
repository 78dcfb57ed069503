//! DEX label resolution
//!
//! The enhanced record's `source` field names the venue when the provider
//! recognizes it; otherwise the label falls back to the transaction type or
//! to the first known program id in the instruction list.

use crate::constants::{DEX_PROGRAM_IDS, KNOWN_DEXES};

/// Resolve a display label for the venue of a swap.
///
/// A non-empty source is matched case-insensitively against the known
/// vendors and used verbatim otherwise. Without a source, a type that
/// mentions "swap" yields the generic label.
pub fn resolve_dex_label(source: Option<&str>, tx_type: Option<&str>) -> String {
    if let Some(source) = source {
        let trimmed = source.trim();
        if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("unknown") {
            let lowered = trimmed.to_lowercase();
            for (needle, label) in KNOWN_DEXES {
                if lowered.contains(needle) {
                    return (*label).to_string();
                }
            }
            return trimmed.to_string();
        }
    }

    if let Some(tx_type) = tx_type {
        if tx_type.to_lowercase().contains("swap") {
            return "DEX Swap".to_string();
        }
    }

    "Unknown".to_string()
}

/// Derive the DEX from program ids when only a low-level parsed transaction
/// is available. First known program wins.
pub fn dex_from_program_ids<'a, I>(program_ids: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    for id in program_ids {
        for (program, label) in DEX_PROGRAM_IDS {
            if id == *program {
                return Some(label);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vendor_substring_match() {
        assert_eq!(resolve_dex_label(Some("JUPITER"), None), "Jupiter");
        assert_eq!(resolve_dex_label(Some("PUMP_FUN"), None), "Pump.fun");
        assert_eq!(resolve_dex_label(Some("raydium_amm_v4"), None), "Raydium");
        assert_eq!(resolve_dex_label(Some("Meteora DLMM"), None), "Meteora");
    }

    #[test]
    fn test_unrecognized_source_used_verbatim() {
        assert_eq!(resolve_dex_label(Some("GOOSEFX"), None), "GOOSEFX");
    }

    #[test]
    fn test_swap_type_fallback() {
        assert_eq!(resolve_dex_label(None, Some("SWAP")), "DEX Swap");
        assert_eq!(resolve_dex_label(Some(""), Some("TOKEN_SWAP")), "DEX Swap");
        assert_eq!(resolve_dex_label(Some("UNKNOWN"), Some("swap")), "DEX Swap");
    }

    #[test]
    fn test_no_information_is_unknown() {
        assert_eq!(resolve_dex_label(None, None), "Unknown");
        assert_eq!(resolve_dex_label(None, Some("TRANSFER")), "Unknown");
    }

    #[test]
    fn test_dex_from_program_ids() {
        let ids = [
            "11111111111111111111111111111111",
            "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
        ];
        assert_eq!(dex_from_program_ids(ids.iter().copied()), Some("Jupiter"));
        assert_eq!(
            dex_from_program_ids(["11111111111111111111111111111111"].iter().copied()),
            None
        );
    }
}
