use crate::catalog::SymbolCatalog;
use crate::fetch::QuoteCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatTone {
    Up,
    Down,
    Flat,
}

pub fn heat_tone(change_pct: Option<f64>) -> HeatTone {
    match change_pct {
        Some(change) if change > 0.0 => HeatTone::Up,
        Some(change) if change < 0.0 => HeatTone::Down,
        _ => HeatTone::Flat,
    }
}

/// Mean change of one industry across the symbols that have a computable change.
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryHeat {
    pub industry: String,
    pub change_pct: Option<f64>,
    pub quoted: usize,
    pub members: usize,
}

/// Per-industry average change, in catalog order.
pub fn industry_heat(cache: &QuoteCache, catalog: &SymbolCatalog) -> Vec<IndustryHeat> {
    catalog
        .industries()
        .into_iter()
        .map(|industry| {
            let members = catalog.symbols_in(industry);
            let changes: Vec<f64> = members
                .iter()
                .filter_map(|entry| cache.get(&entry.symbol))
                .filter_map(|quote| quote.change_pct())
                .collect();
            let change_pct = if changes.is_empty() {
                None
            } else {
                Some(changes.iter().sum::<f64>() / changes.len() as f64)
            };
            IndustryHeat {
                industry: industry.to_string(),
                change_pct,
                quoted: changes.len(),
                members: members.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SourceQuote;
    use chrono::Local;

    #[test]
    fn tones_follow_sign() {
        assert_eq!(heat_tone(Some(1.5)), HeatTone::Up);
        assert_eq!(heat_tone(Some(-0.1)), HeatTone::Down);
        assert_eq!(heat_tone(Some(0.0)), HeatTone::Flat);
        assert_eq!(heat_tone(None), HeatTone::Flat);
    }

    #[test]
    fn averages_changes_per_industry() {
        let catalog = SymbolCatalog::from_reader(
            "industry,code,name\nSemis,A,a\nSemis,B,b\nSteel,C,c\n".as_bytes(),
        )
        .unwrap();
        let cache = QuoteCache::new();
        for (symbol, price, prev) in [("A", 110.0, 100.0), ("B", 95.0, 100.0)] {
            cache.record_success(
                symbol,
                SourceQuote {
                    name: symbol.to_string(),
                    price,
                    volume: 1,
                    prev_close: Some(prev),
                },
                Local::now(),
            );
        }

        let heat = industry_heat(&cache, &catalog);
        assert_eq!(heat.len(), 2);
        assert_eq!(heat[0].industry, "Semis");
        assert!((heat[0].change_pct.unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(heat[0].quoted, 2);
        assert_eq!(heat[1].change_pct, None);
        assert_eq!(heat[1].members, 1);
    }
}
