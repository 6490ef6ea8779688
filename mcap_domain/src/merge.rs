use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::{debug, error};

use crate::dataset::{Column, DatasetError, WideDataset};
use crate::models::ObservationSeries;

/// Accumulator for a full outer join of series on their timestamps.
///
/// Cells stay sparse until `finish`, which zero-fills in one pass, so the order series are
/// pushed in does not change the result. There is one column per entity id; pushing the same
/// entity again overlays its observations on the earlier ones.
///
/// Columns are labelled with the entity display name. When two entities share a display name,
/// each of them is labelled `name (id)` instead.
#[derive(Clone, Debug, Default)]
pub struct SeriesMerger {
    cells: BTreeMap<String, EntityCells>,
}

#[derive(Clone, Debug, Default)]
struct EntityCells {
    name: String,
    values: BTreeMap<DateTime<Utc>, f64>,
}

impl SeriesMerger {
    pub fn new() -> SeriesMerger {
        SeriesMerger::default()
    }

    /// Empty series are skipped and contribute no column.
    pub fn push(mut self, series: &ObservationSeries) -> SeriesMerger {
        if series.is_empty() {
            debug!("Skipping {}: no observations", series.entity());
            return self;
        }

        let entity = series.entity();
        let column = self.cells
            .entry(entity.id().to_owned())
            .or_insert_with(|| EntityCells { name: entity.name().to_owned(), values: BTreeMap::new() });

        // Smallest name wins so that the label does not depend on push order
        if entity.name() < column.name.as_str() {
            column.name = entity.name().to_owned();
        }

        for o in series.observations() {
            column.values.insert(o.timestamp, o.value);
        }
        self
    }

    pub fn finish(self) -> WideDataset {
        let index: Vec<DateTime<Utc>> = self.cells.values()
            .flat_map(|c| c.values.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut name_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for c in self.cells.values() {
            *name_counts.entry(c.name.as_str()).or_default() += 1;
        }

        let mut columns: Vec<Column> = self.cells.iter()
            .map(|(id, cells)| {
                let label = match name_counts.get(cells.name.as_str()) {
                    _ if cells.name.is_empty() => id.clone(),
                    Some(&n) if n > 1 => format!("{} ({})", cells.name, id),
                    _ => cells.name.clone(),
                };
                let values = index.iter()
                    .map(|ts| cells.values.get(ts).copied().unwrap_or(0f64))
                    .collect();
                Column::new(label, values)
            })
            .collect();
        columns.sort_by(|a, b| a.name().cmp(b.name()));

        match WideDataset::from_parts(index, columns) {
            Ok(dataset) => dataset,
            Err(e) => {
                error!("Merged series do not form a dataset: {}", e);
                WideDataset::default()
            },
        }
    }
}

pub fn merge<'a>(series: impl IntoIterator<Item = &'a ObservationSeries>) -> WideDataset {
    series.into_iter()
        .fold(SeriesMerger::new(), SeriesMerger::push)
        .finish()
}

/// Merges a group of series and appends `aggregate` as the row-wise sum of the group's own
/// columns, computed after zero-fill.
pub fn merge_group<'a>(
    series: impl IntoIterator<Item = &'a ObservationSeries>,
    aggregate: &str,
) -> Result<WideDataset, DatasetError> {
    let merged = merge(series);
    let members: Vec<String> = merged.column_names().iter()
        .map(|s| (*s).to_owned())
        .collect();

    merged.with_row_sum(aggregate, &members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use crate::models::{Entity, Observation};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.ymd(2024, 1, day).and_hms(0, 0, 0)
    }

    fn series(name: &str, points: &[(u32, f64)]) -> ObservationSeries {
        ObservationSeries::new(
            Entity::new(name.to_lowercase(), name),
            points.iter().map(|&(d, v)| Observation::new(ts(d), v)).collect())
    }

    fn random_series(rng: &mut StdRng, name: &str) -> ObservationSeries {
        let mut points = Vec::new();
        for day in 1..=28u32 {
            if rng.gen_bool(0.6) {
                points.push((day, rng.gen_range(0.0..1e12)));
            }
        }
        series(name, &points)
    }

    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn outer_join_zero_fills_missing_cells() {
        let a = series("A", &[(1, 100.0), (2, 200.0)]);
        let b = series("B", &[(1, 50.0)]);

        let merged = merge(vec![&a, &b]);
        assert_eq!(merged.index(), &[ts(1), ts(2)]);
        assert_eq!(merged.column("A"), Some(&[100.0, 200.0][..]));
        assert_eq!(merged.column("B"), Some(&[50.0, 0.0][..]));
    }

    #[test]
    fn merge_is_order_independent() {
        let mut rng = StdRng::seed_from_u64(0x6d63_6170);
        for _ in 0..16 {
            let inputs = vec![
                random_series(&mut rng, "A"),
                random_series(&mut rng, "B"),
                random_series(&mut rng, "C"),
                random_series(&mut rng, "D"),
            ];
            let expected = merge(&inputs);

            for order in permutations(&inputs) {
                assert_eq!(merge(&order), expected);
            }
        }
    }

    #[test]
    fn merge_is_associative_through_outer_join() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let a = random_series(&mut rng, "A");
            let b = random_series(&mut rng, "B");
            let c = random_series(&mut rng, "C");

            let all = merge(vec![&a, &b, &c]);
            let left = merge(vec![&a, &b]).outer_join(&merge(vec![&c]));
            let right = merge(vec![&a]).outer_join(&merge(vec![&b, &c]));

            assert_eq!(left, all);
            assert_eq!(right, all);
        }
    }

    #[test]
    fn entities_sharing_a_name_keep_separate_columns() {
        let circle = ObservationSeries::new(
            Entity::new("usd-coin", "USDC"),
            vec![Observation::new(ts(1), 100.0), Observation::new(ts(2), 110.0)]);
        let bridged = ObservationSeries::new(
            Entity::new("bridged-usdc", "USDC"),
            vec![Observation::new(ts(1), 7.0)]);
        let other = series("B", &[(2, 5.0)]);

        let inputs = vec![circle, bridged, other];
        let expected = merge(&inputs);
        assert_eq!(expected.column_names(), vec!["B", "USDC (bridged-usdc)", "USDC (usd-coin)"]);
        assert_eq!(expected.column("USDC (usd-coin)"), Some(&[100.0, 110.0][..]));
        assert_eq!(expected.column("USDC (bridged-usdc)"), Some(&[7.0, 0.0][..]));

        for order in permutations(&inputs) {
            assert_eq!(merge(&order), expected);
        }
    }

    #[test]
    fn same_entity_under_two_names_is_one_column() {
        let a = ObservationSeries::new(Entity::new("tether", "Tether"), vec![Observation::new(ts(1), 1.0)]);
        let b = ObservationSeries::new(Entity::new("tether", "USDT"), vec![Observation::new(ts(2), 2.0)]);

        let ab = merge(vec![&a, &b]);
        assert_eq!(ab.column_names(), vec!["Tether"]);
        assert_eq!(ab.column("Tether"), Some(&[1.0, 2.0][..]));
        assert_eq!(merge(vec![&b, &a]), ab);
    }

    #[test]
    fn merging_same_series_twice_does_not_double_count() {
        let a = series("A", &[(1, 100.0), (2, 200.0)]);
        let b = series("B", &[(2, 5.0)]);

        let once = merge(vec![&a, &b]);
        let twice = merge(vec![&a, &b, &a]);

        assert_eq!(twice, once);
        assert_eq!(twice.column_names(), vec!["A", "B"]);
    }

    #[test]
    fn empty_series_contribute_nothing() {
        let a = series("A", &[(1, 1.0)]);
        let empty = ObservationSeries::empty(Entity::new("zcash", "Zcash"));

        let merged = merge(vec![&a, &empty]);
        assert_eq!(merged.column_names(), vec!["A"]);
        assert!(merge(vec![&empty]).is_empty());
    }

    #[test]
    fn group_aggregate_is_row_sum_of_members() {
        let mut rng = StdRng::seed_from_u64(42);
        let group: Vec<_> = ["solana", "ripple", "tron"].iter()
            .map(|n| random_series(&mut rng, n))
            .collect();

        let merged = merge_group(&group, "Altcoins Market Cap").unwrap();
        let aggregate = merged.column("Altcoins Market Cap").unwrap();

        let members: Vec<&str> = merged.column_names().into_iter()
            .filter(|n| *n != "Altcoins Market Cap")
            .collect();
        assert_eq!(members, vec!["ripple", "solana", "tron"]);

        for (row, total) in aggregate.iter().enumerate() {
            let expected = members.iter()
                .fold(0f64, |acc, n| acc + merged.column(n).unwrap()[row]);
            assert_eq!(*total, expected);
        }
    }

    #[test]
    fn group_aggregate_is_zero_on_zero_filled_rows() {
        let a = series("A", &[(1, 10.0)]);
        let b = series("B", &[(1, 5.0)]);
        let merged = merge_group(vec![&a, &b], "Sum").unwrap();

        let other = series("C", &[(2, 7.0)]);
        let joined = merged.outer_join(&merge(vec![&other]));

        assert_eq!(joined.column("Sum"), Some(&[15.0, 0.0][..]));
    }
}
