//! Captured `varnishstat` payloads for tests and demos.
//!
//! The JSON captures come from a Varnish 6.0 instance with one backend
//! (`boot.default`), two storage backends (`s0`, `Transient`) and default
//! thread pools.

use crate::model::StatSnapshot;
use crate::parser::{parse_json, parse_text};

/// `varnishstat -j` with a handful of MAIN, MGT and MEMPOOL stats.
pub const SMALL_JSON: &str = include_str!("fixtures/small.json");

/// Complete `varnishstat -j` output: 334 stats over MGT, MAIN, LCK,
/// MEMPOOL, SMA and VBE. `VBE.boot.default.happy` is the only bitmap.
pub const FULL_JSON: &str = include_str!("fixtures/full.json");

/// The `SMALL_JSON` stats as `varnishstat -1` prints them.
pub const SMALL_TEXT: &str = "\
MAIN.uptime                17276         1.00 Child process uptime
MAIN.cache_hit              4144         0.24 Cache hits
MAIN.cache_miss              600         0.03 Cache misses
MGT.uptime                 17275         1.00 Management process uptime
MGT.child_start                1         0.00 Child process started
MEMPOOL.req0.live              0          .   In use
MEMPOOL.req0.pool             10          .   In Pool
MEMPOOL.req0.sz_wanted     65536          .   Size requested
";

/// `SMALL_JSON`, decoded.
pub fn small_snapshot() -> StatSnapshot {
    parse_json(SMALL_JSON).unwrap_or_default()
}

/// `FULL_JSON`, decoded.
pub fn full_snapshot() -> StatSnapshot {
    parse_json(FULL_JSON).unwrap_or_default()
}

/// `SMALL_TEXT`, decoded.
pub fn small_text_snapshot() -> StatSnapshot {
    parse_text(SMALL_TEXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_decode() {
        assert_eq!(small_snapshot().len(), 8);
        assert_eq!(full_snapshot().len(), 334);
        assert_eq!(small_text_snapshot().len(), 8);
    }

    #[test]
    fn test_text_and_json_agree() {
        let json = small_snapshot();
        let text = small_text_snapshot();
        for (j, t) in json.entries.iter().zip(&text.entries) {
            assert_eq!(j.name, t.name);
            assert_eq!(j.value, t.value);
        }
    }
}
