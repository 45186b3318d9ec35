use crate::symbols::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the paytable in flat form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaytableEntry {
    pub symbol: Symbol,
    pub count: u8,
    pub payout_multiplier: f64,
}

/// Symbol -> (match count -> multiplier of the bet).
///
/// A missing or zero entry means the combination pays nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paytable(pub BTreeMap<Symbol, BTreeMap<u8, f64>>);

impl Paytable {
    pub fn from_entries(entries: impl IntoIterator<Item = PaytableEntry>) -> Self {
        let mut table: BTreeMap<Symbol, BTreeMap<u8, f64>> = BTreeMap::new();
        for e in entries {
            table
                .entry(e.symbol)
                .or_default()
                .insert(e.count, e.payout_multiplier);
        }
        Self(table)
    }

    pub fn multiplier(&self, symbol: Symbol, count: usize) -> f64 {
        let Ok(count) = u8::try_from(count) else {
            return 0.0;
        };
        self.0
            .get(&symbol)
            .and_then(|row| row.get(&count))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> impl Iterator<Item = PaytableEntry> + '_ {
        self.0.iter().flat_map(|(symbol, row)| {
            row.iter().map(move |(count, m)| PaytableEntry {
                symbol: *symbol,
                count: *count,
                payout_multiplier: *m,
            })
        })
    }

    /// Reference Market Surge paytable.
    pub fn market_surge() -> Self {
        use Symbol::*;
        let rows: [(Symbol, [f64; 3]); 9] = [
            (Bull, [5.0, 25.0, 100.0]),
            (Bear, [4.0, 20.0, 80.0]),
            (Gold, [4.0, 18.0, 75.0]),
            (Oil, [3.0, 15.0, 60.0]),
            (Chart, [3.0, 12.0, 50.0]),
            (Coin, [2.0, 10.0, 40.0]),
            (Surge, [10.0, 50.0, 200.0]),
            (News, [2.0, 5.0, 50.0]),
            (Ipo, [0.0, 0.0, 0.0]),
        ];
        Self::from_entries(rows.into_iter().flat_map(|(symbol, pays)| {
            pays.into_iter()
                .zip(3u8..)
                .map(move |(payout_multiplier, count)| PaytableEntry {
                    symbol,
                    count,
                    payout_multiplier,
                })
        }))
    }
}
