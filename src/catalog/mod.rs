use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::{AppError, Context, Result};

const BUILTIN_CATALOG: &str = include_str!("../../assets/catalog/tw.csv");

/// Industry filter value meaning "every industry".
pub const ALL_INDUSTRIES: &str = "all";

/// Returns true for the "every industry" sentinel, including the label the Taiwan UI shows.
pub fn is_all_sentinel(industry: &str) -> bool {
    let trimmed = industry.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_INDUSTRIES) || trimmed == "全部"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone)]
struct Industry {
    name: String,
    entries: Vec<CatalogEntry>,
}

/// Static classification of known symbols into industry groups.
///
/// Industries keep the order they were declared in; a symbol may be listed under several.
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    industries: Vec<Industry>,
}

impl SymbolCatalog {
    /// The embedded Taiwan equities table.
    pub fn builtin() -> Result<Self> {
        Self::from_reader(BUILTIN_CATALOG.as_bytes())
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open catalog file {}", path.display()))?;
        let catalog = Self::from_reader(file)?;
        if catalog.industries.is_empty() {
            return Err(AppError::message(format!(
                "Catalog file is empty: {}",
                path.display()
            )));
        }
        Ok(catalog)
    }

    /// Parse `industry,code,name` rows; blank cells are skipped, `#` lines are comments.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut catalog = SymbolCatalog::default();
        for result in reader.records() {
            let record = result.context("Failed to read catalog record")?;
            let (Some(industry), Some(code), Some(name)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                continue;
            };
            if industry.is_empty() || code.is_empty() {
                continue;
            }
            let name = if name.is_empty() { code } else { name };
            catalog.push(industry, code, name);
        }
        Ok(catalog)
    }

    fn push(&mut self, industry: &str, symbol: &str, name: &str) {
        let entry = CatalogEntry {
            symbol: symbol.to_string(),
            name: name.to_string(),
        };
        match self.industries.iter_mut().find(|i| i.name == industry) {
            Some(existing) => {
                if !existing.entries.iter().any(|e| e.symbol == entry.symbol) {
                    existing.entries.push(entry);
                }
            }
            None => self.industries.push(Industry {
                name: industry.to_string(),
                entries: vec![entry],
            }),
        }
    }

    pub fn industries(&self) -> Vec<&str> {
        self.industries.iter().map(|i| i.name.as_str()).collect()
    }

    /// Entries of one industry, or an empty slice for unknown names.
    pub fn symbols_in(&self, industry: &str) -> &[CatalogEntry] {
        self.industries
            .iter()
            .find(|i| i.name == industry)
            .map(|i| i.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Every catalog symbol once, in first-seen order.
    pub fn all_symbols(&self) -> Vec<&CatalogEntry> {
        let mut seen = HashSet::new();
        self.industries
            .iter()
            .flat_map(|i| i.entries.iter())
            .filter(|e| seen.insert(e.symbol.as_str()))
            .collect()
    }

    /// Candidate pool for an industry filter; `None` or the sentinel means everything.
    pub fn pool(&self, industry: Option<&str>) -> Vec<&CatalogEntry> {
        match industry {
            Some(name) if !is_all_sentinel(name) => self.symbols_in(name).iter().collect(),
            _ => self.all_symbols(),
        }
    }

    pub fn name_of(&self, symbol: &str) -> Option<&str> {
        self.find(symbol).map(|e| e.name.as_str())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.find(symbol).is_some()
    }

    pub fn industry_of(&self, symbol: &str) -> Option<&str> {
        self.industries
            .iter()
            .find(|i| i.entries.iter().any(|e| e.symbol == symbol))
            .map(|i| i.name.as_str())
    }

    /// Case-insensitive substring match over code and name, optionally within one industry.
    pub fn search(&self, keyword: &str, industry: Option<&str>) -> Vec<&CatalogEntry> {
        let needle = keyword.trim().to_lowercase();
        self.pool(industry)
            .into_iter()
            .filter(|e| {
                needle.is_empty()
                    || e.symbol.to_lowercase().contains(&needle)
                    || e.name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.all_symbols().len()
    }

    pub fn is_empty(&self) -> bool {
        self.industries.is_empty()
    }

    fn find(&self, symbol: &str) -> Option<&CatalogEntry> {
        self.industries
            .iter()
            .flat_map(|i| i.entries.iter())
            .find(|e| e.symbol == symbol)
    }
}
