use crate::models::{CountryDataset, DataStats};

/// Aggregate counts over a set of loaded datasets.
pub fn summarize<'a>(datasets: impl IntoIterator<Item = &'a CountryDataset>) -> DataStats {
    let mut stats = DataStats::default();
    for d in datasets {
        stats.countries += 1;
        stats.years += d.as_map().len();
        stats.problems += d.total_problems();
    }
    stats
}

/// Per-year problem counts, newest year first.
pub fn year_breakdown(dataset: &CountryDataset) -> Vec<(String, usize)> {
    dataset
        .years()
        .into_iter()
        .map(|y| {
            let n = dataset.problems(&y).len();
            (y, n)
        })
        .collect()
}
