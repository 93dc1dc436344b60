use serde::Serialize;

use crate::catalog::{DrugRecord, RecordId};

/// The row carrying the highest unit price in a sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedRecord {
    pub id: RecordId,
    pub drug_name: String,
    pub notice_id: String,
    pub unit_price: f64,
}

/// Price aggregates over every row matching a query, or over a bounded sample
/// of them when `capped` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub record_at_max: Option<PricedRecord>,
    pub total_count: u64,
    pub sample_size: usize,
    pub capped: bool,
}

impl PriceStats {
    pub fn from_samples(samples: &[DrugRecord], total_count: u64, capped: bool) -> Self {
        if samples.is_empty() {
            return Self {
                total_count,
                capped,
                ..Self::default()
            };
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut at_max: Option<&DrugRecord> = None;
        let mut sum = 0.0;
        for record in samples {
            let price = record.unit_price;
            sum += price;
            min = min.min(price);
            // First row wins on ties.
            if price > max {
                max = price;
                at_max = Some(record);
            }
        }

        let mut prices: Vec<f64> = samples.iter().map(|r| r.unit_price).collect();
        prices.sort_by(f64::total_cmp);

        Self {
            min: Some(min),
            max: Some(max),
            average: Some(sum / samples.len() as f64),
            median: median(&prices),
            record_at_max: at_max.map(|record| PricedRecord {
                id: record.id,
                drug_name: record.drug_name.clone(),
                notice_id: record.notice_id.clone(),
                unit_price: record.unit_price,
            }),
            total_count,
            sample_size: samples.len(),
            capped,
        }
    }
}

/// Median of an already sorted slice.
pub fn median(sorted: &[f64]) -> Option<f64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(id: RecordId, price: f64, tbmt: &str) -> DrugRecord {
        DrugRecord {
            id,
            unit_price: price,
            notice_id: tbmt.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[10.0, 20.0, 30.0, 40.0]), Some(25.0));
        assert_eq!(median(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn aggregates_unsorted_sample() {
        let samples = vec![
            priced(1, 40.0, "IB01"),
            priced(2, 10.0, "IB02"),
            priced(3, 30.0, "IB03"),
            priced(4, 20.0, "IB04"),
        ];
        let stats = PriceStats::from_samples(&samples, 4, false);
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(40.0));
        assert_eq!(stats.average, Some(25.0));
        assert_eq!(stats.median, Some(25.0));
        assert_eq!(stats.record_at_max.unwrap().notice_id, "IB01");
        assert_eq!(stats.sample_size, 4);
    }

    #[test]
    fn first_record_wins_ties_at_max() {
        let samples = vec![priced(7, 99.0, "first"), priced(8, 99.0, "second")];
        let stats = PriceStats::from_samples(&samples, 2, false);
        assert_eq!(stats.record_at_max.unwrap().id, 7);
    }

    #[test]
    fn empty_sample_keeps_count_and_flag() {
        let stats = PriceStats::from_samples(&[], 12, true);
        assert_eq!(stats.min, None);
        assert_eq!(stats.median, None);
        assert_eq!(stats.total_count, 12);
        assert!(stats.capped);
    }
}
