//! Catalog of gridded satellite pollution surfaces.

use crate::types::satellite::{ImageCategory, SatelliteError, SatelliteImage};
use chrono::NaiveDate;
use log::info;
use std::collections::{BTreeMap, HashMap};

/// Keyed store of day-averaged satellite surfaces.
///
/// Images are validated against their declared shape on insert, so every
/// retrieval can reshape without re-checking. Lookups are keyed by
/// (canonical pollutant, date, category); inserting an image under an
/// existing key replaces it.
#[derive(Debug, Clone, Default)]
pub struct SatelliteCatalog {
    images: HashMap<String, SatelliteImage>,
}

impl SatelliteCatalog {
    pub fn new() -> SatelliteCatalog {
        SatelliteCatalog::default()
    }

    pub fn insert(&mut self, image: SatelliteImage) -> Result<(), SatelliteError> {
        image.validate()?;
        self.images.insert(image.key.clone(), image);
        Ok(())
    }

    /// The surface for one pollutant, day and product category.
    pub fn image(
        &self,
        pollutant: &str,
        date: NaiveDate,
        category: ImageCategory,
    ) -> Option<&SatelliteImage> {
        let image = self
            .images
            .values()
            .find(|i| i.pollutant == pollutant && i.date == date && i.category == category);
        if image.is_none() {
            info!(
                "No {} image for {pollutant} on {date}.",
                category.as_str()
            );
        }
        image
    }

    /// Latest surface per pollutant for one product category, keyed by
    /// canonical pollutant key.
    pub fn day_average_images(
        &self,
        pollutants: &[String],
        category: ImageCategory,
    ) -> BTreeMap<String, &SatelliteImage> {
        let mut latest: BTreeMap<String, &SatelliteImage> = BTreeMap::new();
        for image in self.images.values() {
            if image.category != category || !pollutants.contains(&image.pollutant) {
                continue;
            }
            match latest.get(&image.pollutant) {
                Some(existing) if existing.date >= image.date => {}
                _ => {
                    latest.insert(image.pollutant.clone(), image);
                }
            }
        }
        latest
    }

    /// Date of the most recently observed surface, across all pollutants
    /// and categories.
    pub fn most_recent_date(&self) -> Option<NaiveDate> {
        self.images.values().map(|i| i.date).max()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::satellite::BoundingBox;

    fn image(key: &str, pollutant: &str, date: (i32, u32, u32), category: ImageCategory) -> SatelliteImage {
        SatelliteImage {
            key: key.to_string(),
            pollutant: pollutant.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category,
            bbox: BoundingBox {
                min_lon: -25.0,
                max_lon: 45.0,
                min_lat: 30.0,
                max_lat: 70.0,
            },
            shape: vec![2, 4],
            values: (0..8).map(f64::from).collect(),
        }
    }

    #[test]
    fn insert_validates_and_round_trips() {
        let mut catalog = SatelliteCatalog::new();
        catalog
            .insert(image("i1", "O3", (2020, 6, 1), ImageCategory::Analysis))
            .unwrap();
        let stored = catalog
            .image(
                "O3",
                NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
                ImageCategory::Analysis,
            )
            .unwrap();
        assert_eq!(stored.rows().unwrap()[1], vec![4.0, 5.0, 6.0, 7.0]);
        assert!(catalog
            .image(
                "O3",
                NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
                ImageCategory::Forecast,
            )
            .is_none());
    }

    #[test]
    fn insert_rejects_inconsistent_shape() {
        let mut catalog = SatelliteCatalog::new();
        let mut bad = image("i1", "O3", (2020, 6, 1), ImageCategory::Analysis);
        bad.values.pop();
        assert!(matches!(
            catalog.insert(bad),
            Err(SatelliteError::ShapeMismatch { .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn day_average_images_take_latest_per_pollutant() {
        let mut catalog = SatelliteCatalog::new();
        catalog
            .insert(image("i1", "O3", (2020, 6, 1), ImageCategory::Analysis))
            .unwrap();
        catalog
            .insert(image("i2", "O3", (2020, 6, 2), ImageCategory::Analysis))
            .unwrap();
        catalog
            .insert(image("i3", "PM25", (2020, 6, 1), ImageCategory::Analysis))
            .unwrap();
        catalog
            .insert(image("i4", "NO2", (2020, 6, 1), ImageCategory::Forecast))
            .unwrap();

        let images = catalog.day_average_images(
            &["O3".to_string(), "PM25".to_string(), "NO2".to_string()],
            ImageCategory::Analysis,
        );
        assert_eq!(images.len(), 2);
        assert_eq!(images["O3"].key, "i2");
        assert_eq!(images["PM25"].key, "i3");
    }

    #[test]
    fn most_recent_date_spans_categories() {
        let mut catalog = SatelliteCatalog::new();
        assert_eq!(catalog.most_recent_date(), None);
        catalog
            .insert(image("i1", "O3", (2020, 6, 1), ImageCategory::Analysis))
            .unwrap();
        catalog
            .insert(image("i2", "NO2", (2020, 6, 3), ImageCategory::Forecast))
            .unwrap();
        assert_eq!(
            catalog.most_recent_date(),
            NaiveDate::from_ymd_opt(2020, 6, 3)
        );
    }
}
