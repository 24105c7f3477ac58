use catalog::types::{LegacyRecord, ShopId};
use std::collections::BTreeMap;
use std::fmt;

/// Number of legacy records per shop. Records without a shop are counted
/// under `None`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShopDistribution {
    counts: BTreeMap<Option<ShopId>, usize>,
    total: usize,
}

impl ShopDistribution {
    pub fn from_records(records: &[LegacyRecord]) -> Self {
        let mut distribution = Self::default();
        for record in records {
            *distribution.counts.entry(record.shop_id).or_default() += 1;
            distribution.total += 1;
        }
        distribution
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Shops ordered by descending count, ties by shop id.
    pub fn rows(&self) -> Vec<(Option<ShopId>, usize)> {
        let mut rows: Vec<_> = self.counts.iter().map(|(shop, n)| (*shop, *n)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        rows
    }
}

impl fmt::Display for ShopDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12} {:>8}", "shop", "products")?;
        for (shop, count) in self.rows() {
            match shop {
                Some(shop) => writeln!(f, "{shop:<12} {count:>8}")?,
                None => writeln!(f, "{:<12} {count:>8}", "unknown")?,
            }
        }
        write!(f, "{:<12} {:>8}", "total", self.total)
    }
}
