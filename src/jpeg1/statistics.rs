//! Symbol counting and entropy estimates for coded scans.

use std::collections::HashMap;

use crate::jpeg1::bit_stream::category;
use crate::jpeg1::component::ComponentClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoefficientKind {
    Dc,
    Ac,
}

/// One coded coefficient symbol, as seen by the entropy encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolEvent {
    pub kind: CoefficientKind,
    pub class: ComponentClass,
    /// Zero run preceding an AC value; always 0 for DC.
    pub run: u8,
    pub value: i32,
}

impl SymbolEvent {
    /// The Huffman symbol: magnitude category, with the run in the high nibble for AC.
    pub fn category_symbol(&self) -> u8 {
        (self.run << 4) | category(self.value)
    }
}

/// Receives every symbol a scan encoder emits.
pub trait SymbolObserver {
    fn observe(&mut self, event: &SymbolEvent);
}

type StreamKey = (CoefficientKind, ComponentClass);

/// Per-stream histograms of coded values and Huffman symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolStatistics {
    values: HashMap<StreamKey, HashMap<i32, u64>>,
    symbols: HashMap<StreamKey, [u64; 256]>,
}

impl SymbolObserver for SymbolStatistics {
    fn observe(&mut self, event: &SymbolEvent) {
        let key = (event.kind, event.class);
        *self.values.entry(key).or_default().entry(event.value).or_insert(0) += 1;
        self.symbols.entry(key).or_insert([0; 256])[event.category_symbol() as usize] += 1;
    }
}

impl SymbolStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol_count(&self, kind: CoefficientKind, class: ComponentClass) -> u64 {
        self.symbols
            .get(&(kind, class))
            .map_or(0, |counts| counts.iter().sum())
    }

    /// Huffman symbol frequencies, saturated to `u32`.
    pub fn symbol_frequencies(&self, kind: CoefficientKind, class: ComponentClass) -> Vec<u32> {
        match self.symbols.get(&(kind, class)) {
            Some(counts) => counts
                .iter()
                .map(|&count| u32::try_from(count).unwrap_or(u32::MAX))
                .collect(),
            None => vec![0; 256],
        }
    }

    /// Shannon entropy of the coded values, in bits per symbol.
    pub fn value_entropy(&self, kind: CoefficientKind, class: ComponentClass) -> f64 {
        self.values
            .get(&(kind, class))
            .map_or(0.0, |counts| entropy(counts.values().copied()))
    }

    /// Shannon entropy of the Huffman symbols, in bits per symbol.
    pub fn symbol_entropy(&self, kind: CoefficientKind, class: ComponentClass) -> f64 {
        self.symbols
            .get(&(kind, class))
            .map_or(0.0, |counts| entropy(counts.iter().copied()))
    }

    pub fn distinct_values(&self, kind: CoefficientKind, class: ComponentClass) -> usize {
        self.values.get(&(kind, class)).map_or(0, HashMap::len)
    }
}

pub fn entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let counts: Vec<u64> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
