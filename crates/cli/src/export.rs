//! CSV exports for statistics, class-area and sub-region tables

use anyhow::{Context, Result};
use csv::Writer;
use forestmgmt_algorithms::constraint::Stage;
use forestmgmt_algorithms::pipeline::{BatchReport, RegionOutcome};
use forestmgmt_algorithms::statistics::ClassAreas;
use forestmgmt_algorithms::vector::SubregionOverlap;
use forestmgmt_core::Region;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn status_columns<T>(outcome: &RegionOutcome<T>) -> [String; 2] {
    match outcome.skip_reason() {
        None => ["ok".to_string(), String::new()],
        Some(reason) => ["skipped".to_string(), reason.to_string()],
    }
}

fn number(value: f64) -> String {
    format!("{:.2}", value)
}

fn fraction(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

/// Union of attribute keys across regions, in sorted order
fn attribute_keys(regions: &[Region]) -> Vec<String> {
    regions
        .iter()
        .flat_map(|r| r.attributes.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One row per input region: status, areas, retained fractions,
/// diagnostics, then every region attribute.
///
/// Skipped regions leave numeric columns empty; undefined fractions are
/// written as empty cells.
pub fn write_statistics<W: Write>(writer: W, regions: &[Region], report: &BatchReport) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    let attributes = attribute_keys(regions);
    let by_id: BTreeMap<&str, &Region> = regions.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut header: Vec<String> = [
        "region_id",
        "region_name",
        "status",
        "skip_reason",
        "region_area_m2",
        "landcover_area_m2",
        "candidate_area_m2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for stage in Stage::ALL {
        header.push(format!("{}_area_m2", stage));
    }
    for stage in Stage::ALL {
        header.push(format!("{}_fraction", stage));
    }
    header.push("diagnostics".to_string());
    header.extend(attributes.iter().cloned());
    wtr.write_record(&header)?;

    for outcome in &report.outcomes {
        let mut row = vec![outcome.region_id.clone(), outcome.region_name.clone()];
        row.extend(status_columns(outcome));

        match outcome.completed() {
            Some(result) => {
                let stats = &result.statistics;
                row.push(number(stats.region_area_m2));
                row.push(number(stats.landcover_area_m2));
                row.push(number(stats.candidate_area_m2));
                row.extend(stats.stages.iter().map(|s| number(s.area_m2)));
                row.extend(stats.stages.iter().map(|s| fraction(s.retained_fraction)));
                row.push(
                    result
                        .diagnostics
                        .iter()
                        .map(|d| d.to_string())
                        .collect::<Vec<_>>()
                        .join("; "),
                );
            }
            None => row.extend(std::iter::repeat(String::new()).take(3 + 2 * Stage::ALL.len() + 1)),
        }

        let region = by_id.get(outcome.region_id.as_str());
        for key in &attributes {
            row.push(
                region
                    .and_then(|r| r.attribute(key))
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }

        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// One row per region with an `area_m2_nlcd_cl_<code>` column for every
/// class seen in any region.
pub fn write_class_areas<W: Write>(writer: W, report: &BatchReport<ClassAreas>) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    let classes: BTreeSet<u16> = report
        .results()
        .flat_map(|areas| areas.classes.keys().copied())
        .collect();

    let mut header = vec![
        "region_id".to_string(),
        "region_name".to_string(),
        "status".to_string(),
        "skip_reason".to_string(),
    ];
    header.extend(classes.iter().map(|c| format!("area_m2_nlcd_cl_{}", c)));
    wtr.write_record(&header)?;

    for outcome in &report.outcomes {
        let mut row = vec![outcome.region_id.clone(), outcome.region_name.clone()];
        row.extend(status_columns(outcome));
        match outcome.completed() {
            Some(areas) => row.extend(classes.iter().map(|&c| number(areas.area_m2(c)))),
            None => row.extend(classes.iter().map(|_| String::new())),
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// One row per kept sub-region, prefixed by its region.
///
/// Sub-region columns are named after `prefix`: `<prefix>_id`,
/// `<prefix>_area_m2`, `pct_<prefix>_intrsct` and so on, followed by
/// every sub-region attribute. Skipped regions and regions with no kept
/// sub-region get a single row with the sub-region cells empty.
pub fn write_subregions<W: Write>(
    writer: W,
    prefix: &str,
    report: &BatchReport<Vec<SubregionOverlap>>,
) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    let attributes: Vec<String> = report
        .results()
        .flatten()
        .flat_map(|o| o.attributes.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut header: Vec<String> = ["region_id", "region_name", "status", "skip_reason"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.push(format!("{prefix}_id"));
    header.push(format!("{prefix}_name"));
    header.push(format!("{prefix}_area_m2"));
    header.push(format!("{prefix}_intrsct_area_m2"));
    header.push(format!("pct_{prefix}_intrsct"));
    header.extend(attributes.iter().cloned());
    wtr.write_record(&header)?;

    let blank = 5 + attributes.len();
    for outcome in &report.outcomes {
        let mut lead = vec![outcome.region_id.clone(), outcome.region_name.clone()];
        lead.extend(status_columns(outcome));

        let overlaps = outcome.completed().map(Vec::as_slice).unwrap_or_default();
        if overlaps.is_empty() {
            let mut row = lead;
            row.extend(std::iter::repeat(String::new()).take(blank));
            wtr.write_record(&row)?;
            continue;
        }

        for overlap in overlaps {
            let mut row = lead.clone();
            row.push(overlap.subregion_id.clone());
            row.push(overlap.subregion_name.clone());
            row.push(number(overlap.subregion_area_m2));
            row.push(number(overlap.intersection_area_m2));
            row.push(fraction(Some(overlap.overlap_fraction)));
            for key in &attributes {
                row.push(overlap.attributes.get(key).map(|v| v.to_string()).unwrap_or_default());
            }
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_statistics_csv(path: &Path, regions: &[Region], report: &BatchReport) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_statistics(BufWriter::new(file), regions, report)
}

pub fn write_class_areas_csv(path: &Path, report: &BatchReport<ClassAreas>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_class_areas(BufWriter::new(file), report)
}

pub fn write_subregions_csv(path: &Path, prefix: &str, report: &BatchReport<Vec<SubregionOverlap>>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_subregions(BufWriter::new(file), prefix, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forestmgmt_algorithms::constraint::{AreaStatistics, StageArea};
    use forestmgmt_algorithms::pipeline::{RegionResult, RegionStatus};
    use forestmgmt_algorithms::statistics::ClassArea;
    use forestmgmt_core::AttributeValue;
    use geo::polygon;

    fn region(id: &str, state: &str) -> Region {
        Region::from_polygon(
            id,
            format!("Forest {id}"),
            polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)],
        )
        .with_attribute("STATE", AttributeValue::String(state.into()))
    }

    fn statistics(id: &str, candidate: f64) -> AreaStatistics {
        let stages = Stage::ALL.map(|stage| StageArea {
            stage,
            area_m2: candidate / 2.0,
            retained_fraction: (candidate > 0.0).then_some(0.5),
        });
        AreaStatistics {
            region_id: id.into(),
            region_name: format!("Forest {id}"),
            region_area_m2: 50.0,
            landcover_area_m2: candidate,
            candidate_area_m2: candidate,
            stages,
        }
    }

    fn completed(id: &str, candidate: f64) -> RegionOutcome {
        RegionOutcome {
            region_id: id.into(),
            region_name: format!("Forest {id}"),
            status: RegionStatus::Completed(RegionResult {
                statistics: statistics(id, candidate),
                features: Vec::new(),
                diagnostics: Vec::new(),
            }),
        }
    }

    fn to_string(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_statistics_rows() {
        let regions = vec![region("A", "Montana"), region("B", "Idaho"), region("C", "Idaho")];
        let report = BatchReport {
            outcomes: vec![
                completed("A", 900.0),
                RegionOutcome {
                    region_id: "B".into(),
                    region_name: "Forest B".into(),
                    status: RegionStatus::Skipped {
                        reason: "bad ring".into(),
                    },
                },
                completed("C", 0.0),
            ],
        };

        let mut out = Vec::new();
        write_statistics(&mut out, &regions, &report).unwrap();
        let text = to_string(out);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("region_id,region_name,status,skip_reason,region_area_m2"));
        assert!(lines[0].contains("protected_area_m2"));
        assert!(lines[0].contains("roads_fraction"));
        assert!(lines[0].ends_with("diagnostics,STATE"));

        assert!(lines[1].starts_with("A,Forest A,ok,,50.00,900.00,900.00,450.00"));
        assert!(lines[1].contains("0.500000"));
        assert!(lines[1].ends_with("Montana"));

        assert!(lines[2].starts_with("B,Forest B,skipped,bad ring,,,"));
        assert!(lines[2].ends_with(",Idaho"));

        // Zero candidate: fractions empty
        let fields: Vec<&str> = lines[3].split(',').collect();
        assert_eq!(fields[6], "0.00");
        assert!(fields[12..17].iter().all(|f| f.is_empty()));
    }

    #[test]
    fn test_class_area_columns() {
        let mut a = BTreeMap::new();
        a.insert(41, ClassArea { cell_count: 2, area_m2: 1800.0 });
        let mut b = BTreeMap::new();
        b.insert(42, ClassArea { cell_count: 1, area_m2: 900.0 });

        let report = BatchReport {
            outcomes: vec![
                RegionOutcome {
                    region_id: "A".into(),
                    region_name: "Forest A".into(),
                    status: RegionStatus::Completed(ClassAreas {
                        region_id: "A".into(),
                        region_name: "Forest A".into(),
                        classes: a,
                    }),
                },
                RegionOutcome {
                    region_id: "B".into(),
                    region_name: "Forest B".into(),
                    status: RegionStatus::Completed(ClassAreas {
                        region_id: "B".into(),
                        region_name: "Forest B".into(),
                        classes: b,
                    }),
                },
            ],
        };

        let mut out = Vec::new();
        write_class_areas(&mut out, &report).unwrap();
        let text = to_string(out);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "region_id,region_name,status,skip_reason,area_m2_nlcd_cl_41,area_m2_nlcd_cl_42");
        assert_eq!(lines[1], "A,Forest A,ok,,1800.00,0.00");
        assert_eq!(lines[2], "B,Forest B,ok,,0.00,900.00");
    }

    fn overlap(region: &str, unit: &str, fraction: f64) -> SubregionOverlap {
        let mut attributes = BTreeMap::new();
        attributes.insert("states".to_string(), AttributeValue::String("MT".into()));
        SubregionOverlap {
            region_id: region.into(),
            subregion_id: unit.into(),
            subregion_name: format!("Creek {unit}"),
            subregion_area_m2: 1000.0,
            intersection_area_m2: 1000.0 * fraction,
            overlap_fraction: fraction,
            attributes,
        }
    }

    #[test]
    fn test_subregion_rows() {
        let report = BatchReport {
            outcomes: vec![
                RegionOutcome {
                    region_id: "A".into(),
                    region_name: "Forest A".into(),
                    status: RegionStatus::Completed(vec![overlap("A", "170102", 1.0), overlap("A", "170103", 0.5)]),
                },
                RegionOutcome {
                    region_id: "B".into(),
                    region_name: "Forest B".into(),
                    status: RegionStatus::Skipped {
                        reason: "bad ring".into(),
                    },
                },
                RegionOutcome {
                    region_id: "C".into(),
                    region_name: "Forest C".into(),
                    status: RegionStatus::Completed(Vec::new()),
                },
            ],
        };

        let mut out = Vec::new();
        write_subregions(&mut out, "huc12", &report).unwrap();
        let text = to_string(out);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "region_id,region_name,status,skip_reason,huc12_id,huc12_name,huc12_area_m2,huc12_intrsct_area_m2,pct_huc12_intrsct,states"
        );
        assert_eq!(lines[1], "A,Forest A,ok,,170102,Creek 170102,1000.00,1000.00,1.000000,MT");
        assert_eq!(lines[2], "A,Forest A,ok,,170103,Creek 170103,1000.00,500.00,0.500000,MT");
        assert_eq!(lines[3], "B,Forest B,skipped,bad ring,,,,,,");
        assert_eq!(lines[4], "C,Forest C,ok,,,,,,,");
        assert_eq!(lines.len(), 5);
    }
}
