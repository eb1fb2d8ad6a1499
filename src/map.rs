//! Choropleth rendering: join a result table onto boundary features, then
//! colour each matched region on a continuous blue scale.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::charts::{hex_rgb, Palette};
use crate::geo::{BoundarySet, FEATURE_ID_KEY};
use crate::query::ResultTable;
use crate::region_names::RegionName;

/// Palette for every choropleth
pub const MAP_PALETTE: Palette = Palette::Blues;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValue {
    pub region: RegionName,
    pub value: f64,
}

/// Outcome of joining query rows onto boundary features
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionJoin {
    /// Regions with a boundary feature, sorted by name
    pub matched: Vec<RegionValue>,
    /// Normalized names with no boundary feature
    pub unmatched: Vec<RegionName>,
}

/// Normalize each row's region name and left-join it onto the boundary keys.
///
/// Rows that normalize to the same name are summed. Rows without a numeric
/// metric are skipped; rows whose name has no feature land in `unmatched`.
pub fn join_regions(table: &ResultTable, region_column: &str, value_column: &str, boundaries: &BoundarySet) -> RegionJoin {
    let mut matched: BTreeMap<RegionName, f64> = BTreeMap::new();
    let mut unmatched: BTreeSet<RegionName> = BTreeSet::new();

    for row in 0..table.len() {
        let Some(raw) = table.text(row, region_column) else {
            debug!(row, column = region_column, "row has no region name");
            continue;
        };
        let region = RegionName::normalize(raw);

        let Some(value) = table.number(row, value_column) else {
            debug!(region = %region, column = value_column, "row has no numeric metric");
            continue;
        };

        if boundaries.contains(region.as_str()) {
            *matched.entry(region).or_insert(0.0) += value;
        } else {
            unmatched.insert(region);
        }
    }

    RegionJoin {
        matched: matched
            .into_iter()
            .map(|(region, value)| RegionValue { region, value })
            .collect(),
        unmatched: unmatched.into_iter().collect(),
    }
}

/// Continuous linear scale between the smallest and largest mapped value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(s) => Some(Self {
                min: s.min.min(v),
                max: s.max.max(v),
            }),
        })
    }

    /// Position on the scale in [0, 1]; a flat scale sits in the middle
    pub fn position(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn fill(&self, value: f64) -> String {
        hex_rgb(MAP_PALETTE.interpolate(self.position(value)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRegion {
    pub region: RegionName,
    pub value: f64,
    pub fill: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethMap {
    pub title: String,
    pub metric: String,
    pub regions: Vec<RenderedRegion>,
    pub unmatched: Vec<RegionName>,
    pub scale: Option<ColorScale>,
}

impl ChoroplethMap {
    pub fn from_join(title: impl Into<String>, metric: impl Into<String>, join: RegionJoin) -> Self {
        let title = title.into();
        if !join.unmatched.is_empty() {
            let names: Vec<&str> = join.unmatched.iter().map(RegionName::as_str).collect();
            warn!(
                map = %title,
                unmatched = join.unmatched.len(),
                names = ?names,
                "regions without a boundary feature were left off the map"
            );
        }

        let scale = ColorScale::from_values(join.matched.iter().map(|r| r.value));
        let regions = join
            .matched
            .into_iter()
            .map(|r| RenderedRegion {
                fill: scale.map(|s| s.fill(r.value)).unwrap_or_else(|| hex_rgb(MAP_PALETTE.stops()[0])),
                region: r.region,
                value: r.value,
            })
            .collect();

        Self {
            title,
            metric: metric.into(),
            regions,
            unmatched: join.unmatched,
            scale,
        }
    }

    /// Plotly choropleth figure; `geojson` is the boundary document or a URL to it
    pub fn to_plotly(&self, geojson: Value) -> Value {
        let locations: Vec<&str> = self.regions.iter().map(|r| r.region.as_str()).collect();
        let values: Vec<f64> = self.regions.iter().map(|r| r.value).collect();

        let mut trace = json!({
            "type": "choropleth",
            "geojson": geojson,
            "featureidkey": FEATURE_ID_KEY,
            "locations": locations,
            "z": values,
            "colorscale": MAP_PALETTE.colorscale(),
            "colorbar": { "title": { "text": self.metric } },
            "marker": { "line": { "width": 0.5 } },
        });
        if let Some(scale) = self.scale {
            trace["zmin"] = json!(scale.min);
            trace["zmax"] = json!(scale.max);
        }

        json!({
            "data": [trace],
            "layout": {
                "title": { "text": self.title },
                "geo": { "fitbounds": "locations", "visible": false },
                "margin": { "r": 0, "t": 50, "l": 0, "b": 0 },
            }
        })
    }
}

/// Join and render in one step
pub fn render_choropleth(
    table: &ResultTable,
    region_column: &str,
    value_column: &str,
    boundaries: &BoundarySet,
    title: impl Into<String>,
) -> ChoroplethMap {
    let join = join_regions(table, region_column, value_column, boundaries);
    ChoroplethMap::from_join(title, value_column, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::boundary_fixture;
    use serde_json::Map;
    use std::collections::HashSet;

    fn states(rows: &[(&str, f64)]) -> ResultTable {
        ResultTable {
            columns: vec!["State".into(), "Total".into()],
            rows: rows
                .iter()
                .map(|(s, v)| {
                    let mut row = Map::new();
                    row.insert("State".into(), json!(s));
                    row.insert("Total".into(), json!(v));
                    row
                })
                .collect(),
        }
    }

    #[test]
    fn test_tamil_nadu_matches_boundary_key() {
        let boundaries = boundary_fixture();
        let join = join_regions(&states(&[("tamil nadu", 10.0)]), "State", "Total", &boundaries);
        assert_eq!(join.matched.len(), 1);
        assert_eq!(join.matched[0].region.as_str(), "Tamil Nadu");
        assert!(boundaries.contains(join.matched[0].region.as_str()));
        assert!(join.unmatched.is_empty());
    }

    #[test]
    fn test_rendered_regions_are_subset_of_both_sides() {
        let boundaries = boundary_fixture();
        let table = states(&[
            ("tamil nadu", 10.0),
            ("KARNATAKA", 20.0),
            ("andaman-&-nicobar-islands", 3.0),
            ("ladakh", 4.0),
        ]);
        let join = join_regions(&table, "State", "Total", &boundaries);

        let result_names: HashSet<RegionName> =
            table.texts("State").iter().map(|s| RegionName::normalize(s)).collect();
        for region in &join.matched {
            assert!(boundaries.contains(region.region.as_str()));
            assert!(result_names.contains(&region.region));
        }
        assert_eq!(
            join.unmatched.iter().map(RegionName::as_str).collect::<Vec<_>>(),
            vec!["Andaman-&-Nicobar-Islands", "Ladakh"]
        );
    }

    #[test]
    fn test_duplicate_names_are_summed() {
        let boundaries = boundary_fixture();
        let join = join_regions(&states(&[("kerala", 1.5), ("Kerala", 2.5)]), "State", "Total", &boundaries);
        assert_eq!(
            join.matched,
            vec![RegionValue {
                region: RegionName::normalize("kerala"),
                value: 4.0
            }]
        );
    }

    #[test]
    fn test_rows_without_metric_are_skipped() {
        let boundaries = boundary_fixture();
        let mut table = states(&[("kerala", 1.0)]);
        table.rows[0].insert("Total".into(), Value::Null);
        let join = join_regions(&table, "State", "Total", &boundaries);
        assert!(join.matched.is_empty());
        assert!(join.unmatched.is_empty());
    }

    #[test]
    fn test_fill_is_linear_in_value() {
        let boundaries = boundary_fixture();
        let map = render_choropleth(
            &states(&[("kerala", 0.0), ("karnataka", 50.0), ("maharashtra", 100.0)]),
            "State",
            "Total",
            &boundaries,
            "Amount by State",
        );
        let fills: Vec<&str> = map.regions.iter().map(|r| r.fill.as_str()).collect();
        // sorted by name: Karnataka, Kerala, Maharashtra
        assert_eq!(fills, vec!["#6baed6", "#f7fbff", "#08306b"]);
        assert_eq!(map.scale, Some(ColorScale { min: 0.0, max: 100.0 }));
    }

    #[test]
    fn test_flat_scale_uses_midpoint() {
        let scale = ColorScale { min: 5.0, max: 5.0 };
        assert_eq!(scale.position(5.0), 0.5);
        assert!(ColorScale::from_values(Vec::new()).is_none());
    }

    #[test]
    fn test_plotly_figure_keys() {
        let boundaries = boundary_fixture();
        let map = render_choropleth(&states(&[("kerala", 7.0)]), "State", "Total", &boundaries, "Kerala only");
        let fig = map.to_plotly(json!("/api/v1/boundaries"));
        let trace = &fig["data"][0];
        assert_eq!(trace["type"], "choropleth");
        assert_eq!(trace["featureidkey"], "properties.ST_NM");
        assert_eq!(trace["locations"], json!(["Kerala"]));
        assert_eq!(trace["geojson"], "/api/v1/boundaries");
        assert_eq!(trace["colorscale"].as_array().unwrap().len(), 9);
        assert_eq!(fig["layout"]["geo"]["fitbounds"], "locations");
    }
}
