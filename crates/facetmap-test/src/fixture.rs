//! Dataset fixtures shared by the integration tests.

use crate::mock::{extent_of, MockQueryProvider, MockView};
use facetmap_core::{
    Dataset, Extent, Feature, Field, FieldSummary, GeometryType, Value, ValueCount,
};

/// A dataset together with the features its provider serves.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Dataset metadata
    pub dataset: Dataset,
    /// Every feature of the dataset
    pub features: Vec<Feature>,
}

impl Fixture {
    /// Build a point dataset over `features`, located on a grid.
    #[must_use]
    pub fn points(id: &str, fields: Vec<Field>, features: Vec<Feature>) -> Self {
        let features: Vec<Feature> = features
            .into_iter()
            .enumerate()
            .map(|(i, mut f)| {
                f.attributes.insert("x".to_string(), Value::Number((i % 100) as f64));
                f.attributes.insert("y".to_string(), Value::Number((i / 100) as f64));
                f
            })
            .collect();
        let dataset = Dataset {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("https://services.example.com/{id}/FeatureServer/0"),
            geometry_type: GeometryType::Point,
            extent: extent_of(&features),
            record_count: features.len() as u64,
            fields,
            display_field: None,
        };
        Self { dataset, features }
    }

    /// Query provider over the fixture features.
    #[must_use]
    pub fn provider(&self) -> MockQueryProvider {
        MockQueryProvider::new(self.features.clone())
    }

    /// View with every feature loaded, showing the full extent.
    #[must_use]
    pub fn view(&self) -> MockView {
        let extent = self
            .dataset
            .extent
            .unwrap_or_else(|| Extent::new(0.0, 0.0, 1.0, 1.0));
        MockView::new(self.features.clone(), extent)
    }
}

/// `Age` uniform over 0..=99, each value ten times.
#[must_use]
pub fn ages() -> Fixture {
    let features = (0..1000)
        .map(|i| Feature::from_pairs([("Age", Value::Number(f64::from(i % 100)))]))
        .collect();
    Fixture::points(
        "ages",
        vec![Field::new("Age", "esriFieldTypeDouble")],
        features,
    )
}

/// `Status` with three values: A ×50, B ×30, C ×20.
#[must_use]
pub fn statuses() -> Fixture {
    let features = (0..100)
        .map(|i| {
            let status = match i {
                0..=49 => "A",
                50..=79 => "B",
                _ => "C",
            };
            Feature::from_pairs([("Status", Value::text(status))])
        })
        .collect();
    Fixture::points(
        "statuses",
        vec![Field::new("Status", "esriFieldTypeString")],
        features,
    )
}

/// Value counts of `Region`: 500 values over 10000 records, the top six
/// covering 82%.
#[must_use]
pub fn region_counts() -> Vec<ValueCount> {
    let top = [2000, 1600, 1400, 1200, 1000, 1000];
    let mut counts: Vec<ValueCount> = top
        .iter()
        .enumerate()
        .map(|(i, c)| ValueCount::new(format!("R{i:03}"), *c))
        .collect();
    counts.extend((6..500).map(|i| ValueCount::new(format!("R{i:03}"), if i < 324 { 4 } else { 3 })));
    counts
}

/// `Region` carrying its value counts as metadata statistics.
#[must_use]
pub fn regions() -> Fixture {
    let counts = region_counts();
    let summary = FieldSummary {
        count: Some(10_000),
        unique_count: Some(counts.len() as u64),
        min: None,
        max: None,
        values: counts.clone(),
    };
    let mut features = Vec::with_capacity(10_000);
    for vc in &counts {
        for _ in 0..vc.count {
            features.push(Feature::from_pairs([("Region", vc.value.clone())]));
        }
    }
    Fixture::points(
        "regions",
        vec![Field::new("Region", "esriFieldTypeString").with_summary(summary)],
        features,
    )
}

/// Survey rows: `Age` stored as text, `Status`, a numeric `Score` and an
/// `Opened` date spread over the first 100 days of 2020.
#[must_use]
pub fn survey() -> Fixture {
    const DAY: f64 = 86_400_000.0;
    const JAN_1_2020: f64 = 1_577_836_800_000.0;
    let statuses = ["A", "B", "C", "D"];
    let features = (0..200)
        .map(|i: i32| {
            Feature::from_pairs([
                ("Age", Value::text((18 + i % 60).to_string())),
                ("Status", Value::text(statuses[(i % 4) as usize])),
                ("Score", Value::Number(f64::from(i % 50) / 2.0)),
                ("Opened", Value::Number(f64::from(i % 100).mul_add(DAY, JAN_1_2020))),
            ])
        })
        .collect();
    Fixture::points(
        "survey",
        vec![
            Field::new("Age", "esriFieldTypeString").with_alias("Age (years)"),
            Field::new("Status", "esriFieldTypeString"),
            Field::new("Score", "esriFieldTypeDouble"),
            Field::new("Opened", "esriFieldTypeDate"),
        ],
        features,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_counts_cover_ten_thousand() {
        let counts = region_counts();
        assert_eq!(counts.len(), 500);
        assert_eq!(counts.iter().map(|c| c.count).sum::<u64>(), 10_000);
        assert_eq!(counts[..6].iter().map(|c| c.count).sum::<u64>(), 8_200);
    }

    #[test]
    fn test_points_have_extent() {
        let fixture = ages();
        assert_eq!(fixture.dataset.record_count, 1000);
        assert_eq!(
            fixture.dataset.extent,
            Some(Extent::new(0.0, 0.0, 99.0, 9.0))
        );
    }

    #[test]
    fn test_survey_fields() {
        let fixture = survey();
        assert!(fixture.dataset.field("opened").is_ok());
        assert_eq!(fixture.features.len(), 200);
    }
}
