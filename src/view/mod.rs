pub mod heat;
pub mod ranked;

pub use heat::{heat_tone, industry_heat, HeatTone, IndustryHeat};
pub use ranked::{top_n, RankedEntry, RankingMetric, SimulatedMarketCap};
