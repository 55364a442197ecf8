//! Daily mosaics
//!
//! Scenes acquired on the same UTC calendar day are merged into one grid.
//! For every band and pixel the value comes from the first member (in
//! collection order) that is valid there; pixels with no valid member are
//! NaN. The composite carries no mask: invalidity is encoded as NaN.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rivice_core::raster::Raster;
use rivice_core::{Error, Result, Scene};
use tracing::debug;

use crate::maybe_rayon::*;

/// One composite per calendar day.
#[derive(Debug, Clone)]
pub struct DailyComposite {
    pub date: NaiveDate,
    /// Composite grid; id is `YYYY-MM-DD`, timestamp is midnight UTC
    pub scene: Scene,
    /// Ids of the scenes merged into this composite, in priority order
    pub sources: Vec<String>,
}

/// Group scenes by UTC calendar day.
///
/// Groups are in ascending date order; members keep the input order.
pub fn group_by_date(scenes: &[Scene]) -> Vec<(NaiveDate, Vec<&Scene>)> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Scene>> = BTreeMap::new();
    for scene in scenes {
        groups.entry(scene.date()).or_default().push(scene);
    }
    groups.into_iter().collect()
}

/// Merge same-day scenes into one, first valid pixel wins.
///
/// The band set is that of the first member; every member must carry those
/// bands on a grid of the same shape.
pub fn mosaic(date: NaiveDate, members: &[&Scene]) -> Result<Scene> {
    let first = match members.first() {
        Some(first) => *first,
        None => {
            return Err(Error::InvalidParameter {
                name: "members",
                value: date.to_string(),
                reason: "cannot composite an empty group".into(),
            })
        }
    };

    let shape = first.shape();
    for member in &members[1..] {
        if member.shape() != shape {
            return Err(Error::size_mismatch(shape, member.shape()));
        }
    }

    let timestamp = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let mut builder = Scene::builder(date.format("%Y-%m-%d").to_string(), timestamp);

    for name in first.band_names() {
        let sources = members
            .iter()
            .map(|m| Ok((m.band(name)?, m.mask())))
            .collect::<Result<Vec<_>>>()?;
        let merged = first_valid(&sources, shape)?;
        builder = builder.band(name, merged.with_transform(*first.transform()));
    }

    builder.build()
}

/// Per-pixel first valid value across `(band, mask)` layers.
fn first_valid(layers: &[(&Raster<f64>, Option<&Raster<u8>>)], shape: (usize, usize)) -> Result<Raster<f64>> {
    let (rows, cols) = shape;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                for (band, mask) in layers {
                    if let Some(mask) = mask {
                        if unsafe { mask.get_unchecked(row, col) } == 0 {
                            continue;
                        }
                    }
                    let v = unsafe { band.get_unchecked(row, col) };
                    if !band.is_nodata(v) {
                        *out = v;
                        break;
                    }
                }
            }
            row_data
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Composite every day of a timestamp-ordered scene list.
///
/// Days are processed in parallel; the result is in ascending date order.
pub fn daily_composites(scenes: &[Scene]) -> Result<Vec<DailyComposite>> {
    let groups = group_by_date(scenes);

    groups
        .into_par_iter()
        .map(|(date, members)| {
            let scene = mosaic(date, &members)?;
            let sources: Vec<String> = members.iter().map(|m| m.id().to_string()).collect();
            debug!(%date, members = sources.len(), "daily composite built");
            Ok(DailyComposite {
                date,
                scene,
                sources,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;
    use rivice_core::scene::bands;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 10, day, hour, 0, 0).unwrap()
    }

    fn scene(id: &str, ts: DateTime<Utc>, green: Vec<f64>, mask: Vec<u8>) -> Scene {
        Scene::builder(id, ts)
            .band(bands::GREEN, Raster::from_vec(green.clone(), 2, 2).unwrap())
            .band(bands::NIR, Raster::from_vec(green.iter().map(|g| g / 2.0).collect(), 2, 2).unwrap())
            .mask(Raster::from_vec(mask, 2, 2).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_group_by_utc_day() {
        let scenes = vec![
            scene("a", at(3, 10), vec![0.1; 4], vec![1; 4]),
            scene("b", at(3, 23), vec![0.2; 4], vec![1; 4]),
            scene("c", at(4, 0), vec![0.3; 4], vec![1; 4]),
        ];
        let groups = group_by_date(&scenes);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, NaiveDate::from_ymd_opt(2022, 10, 3).unwrap());
        let ids: Vec<&str> = groups[0].1.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(groups[1].1[0].id(), "c");
    }

    #[test]
    fn test_first_valid_wins() {
        let a = scene("A", at(5, 22), vec![0.2, 0.2, 0.2, f64::NAN], vec![0, 1, 1, 1]);
        let b = scene("B", at(5, 22), vec![0.3, 0.4, 0.5, f64::NAN], vec![1, 1, 1, 1]);
        let date = NaiveDate::from_ymd_opt(2022, 10, 5).unwrap();

        let out = mosaic(date, &[&a, &b]).unwrap();
        assert_eq!(out.id(), "2022-10-05");
        assert_eq!(out.timestamp(), at(5, 0));
        assert!(out.mask().is_none());

        let green = out.band(bands::GREEN).unwrap();
        assert_eq!(green.get(0, 0).unwrap(), 0.3); // A masked, B used
        assert_eq!(green.get(0, 1).unwrap(), 0.2); // A valid, A used
        assert!(green.get(1, 1).unwrap().is_nan()); // nobody valid
        assert_eq!(out.band(bands::NIR).unwrap().get(0, 0).unwrap(), 0.15);
    }

    #[test]
    fn test_single_member_keeps_masked_values() {
        let a = scene("A", at(6, 1), vec![0.1, 0.2, 0.3, 0.4], vec![1, 0, 1, 1]);
        let out = mosaic(a.date(), &[&a]).unwrap();
        let green = out.band(bands::GREEN).unwrap();
        assert_eq!(green.get(0, 0).unwrap(), 0.1);
        assert!(green.get(0, 1).unwrap().is_nan());
        assert_eq!(out.invalid_count(bands::GREEN).unwrap(), 1);
    }

    #[test]
    fn test_all_invalid_group_still_composites() {
        let a = scene("A", at(7, 1), vec![0.1; 4], vec![0; 4]);
        let out = mosaic(a.date(), &[&a]).unwrap();
        assert_eq!(out.invalid_count(bands::GREEN).unwrap(), 4);
    }

    #[test]
    fn test_mismatched_members() {
        let a = scene("A", at(8, 1), vec![0.1; 4], vec![1; 4]);
        let b = Scene::builder("B", at(8, 2))
            .band(bands::GREEN, Raster::filled(3, 3, 0.1))
            .build()
            .unwrap();
        assert!(matches!(mosaic(a.date(), &[&a, &b]), Err(Error::SizeMismatch { .. })));

        let c = Scene::builder("C", at(8, 3))
            .band(bands::GREEN, Raster::filled(2, 2, 0.1))
            .build()
            .unwrap();
        assert!(matches!(mosaic(a.date(), &[&a, &c]), Err(Error::MissingBand { .. })));
        assert!(mosaic(a.date(), &[]).is_err());
    }

    #[test]
    fn test_daily_composites_ordered_with_sources() {
        let scenes = vec![
            scene("x", at(3, 10), vec![0.1; 4], vec![1; 4]),
            scene("y", at(3, 11), vec![0.2; 4], vec![1; 4]),
            scene("z", at(9, 10), vec![0.3; 4], vec![1; 4]),
        ];
        let composites = daily_composites(&scenes).unwrap();
        assert_eq!(composites.len(), 2);
        assert!(composites[0].date < composites[1].date);
        assert_eq!(composites[0].sources, vec!["x", "y"]);
        assert_eq!(composites[1].scene.id(), "2022-10-09");
    }

    fn pixel_strategy() -> impl Strategy<Value = (f64, bool)> {
        (prop_oneof![3 => 0.0f64..1.0, 1 => Just(f64::NAN)], any::<bool>())
    }

    proptest! {
        #[test]
        fn prop_composite_pixel_is_first_valid(
            members in proptest::collection::vec(proptest::collection::vec(pixel_strategy(), 4), 1..5)
        ) {
            let scenes: Vec<Scene> = members
                .iter()
                .enumerate()
                .map(|(i, px)| {
                    Scene::builder(format!("s{}", i), at(12, i as u32))
                        .band(bands::GREEN, Raster::from_vec(px.iter().map(|p| p.0).collect(), 2, 2).unwrap())
                        .mask(Raster::from_vec(px.iter().map(|p| u8::from(p.1)).collect(), 2, 2).unwrap())
                        .build()
                        .unwrap()
                })
                .collect();
            let refs: Vec<&Scene> = scenes.iter().collect();
            let out = mosaic(scenes[0].date(), &refs).unwrap();
            let green = out.band(bands::GREEN).unwrap();

            for idx in 0..4 {
                let expected = members
                    .iter()
                    .map(|px| px[idx])
                    .find(|(v, valid)| *valid && !v.is_nan())
                    .map(|(v, _)| v);
                let actual = green.get(idx / 2, idx % 2).unwrap();
                match expected {
                    Some(v) => prop_assert_eq!(actual, v),
                    None => prop_assert!(actual.is_nan()),
                }
            }
        }
    }
}
