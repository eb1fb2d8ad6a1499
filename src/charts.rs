//! Bar and pie figures over a result table, serialized as Plotly figure JSON.

use serde::Serialize;
use serde_json::{json, Value};

use crate::query::ResultTable;

type Rgb = (u8, u8, u8);

/// Sequential colour palettes, light to dark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Palette {
    Blues,
    Reds,
    OrRd,
    Purples,
    Greens,
}

impl Palette {
    pub fn stops(self) -> &'static [Rgb; 9] {
        match self {
            Palette::Blues => &[
                (247, 251, 255),
                (222, 235, 247),
                (198, 219, 239),
                (158, 202, 225),
                (107, 174, 214),
                (66, 146, 198),
                (33, 113, 181),
                (8, 81, 156),
                (8, 48, 107),
            ],
            Palette::Reds => &[
                (255, 245, 240),
                (254, 224, 210),
                (252, 187, 161),
                (252, 146, 114),
                (251, 106, 74),
                (239, 59, 44),
                (203, 24, 29),
                (165, 15, 21),
                (103, 0, 13),
            ],
            Palette::OrRd => &[
                (255, 247, 236),
                (254, 232, 200),
                (253, 212, 158),
                (253, 187, 132),
                (252, 141, 89),
                (239, 101, 72),
                (215, 48, 31),
                (179, 0, 0),
                (127, 0, 0),
            ],
            Palette::Purples => &[
                (252, 251, 253),
                (239, 237, 245),
                (218, 218, 235),
                (188, 189, 220),
                (158, 154, 200),
                (128, 125, 186),
                (106, 81, 163),
                (84, 39, 143),
                (63, 0, 125),
            ],
            Palette::Greens => &[
                (247, 252, 245),
                (229, 245, 224),
                (199, 233, 192),
                (161, 217, 155),
                (116, 196, 118),
                (65, 171, 93),
                (35, 139, 69),
                (0, 109, 44),
                (0, 68, 27),
            ],
        }
    }

    /// Colours as `rgb(r,g,b)` strings
    pub fn css(self) -> Vec<String> {
        self.stops().iter().map(|&c| css_rgb(c)).collect()
    }

    /// Plotly continuous colorscale: evenly spaced `[position, colour]` pairs
    pub fn colorscale(self) -> Value {
        let stops = self.stops();
        let last = (stops.len() - 1) as f64;
        Value::Array(
            stops
                .iter()
                .enumerate()
                .map(|(i, &c)| json!([i as f64 / last, css_rgb(c)]))
                .collect(),
        )
    }

    /// Linear interpolation along the palette, `t` clamped to [0, 1]
    pub fn interpolate(self, t: f64) -> Rgb {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = t * (stops.len() - 1) as f64;
        let idx = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - idx as f64;

        let (a, b) = (stops[idx], stops[idx + 1]);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

pub fn css_rgb((r, g, b): Rgb) -> String {
    format!("rgb({},{},{})", r, g, b)
}

pub fn hex_rgb((r, g, b): Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Bar chart; with a colour column there is one trace per distinct colour value
#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

impl BarChart {
    pub fn from_table(table: &ResultTable, x: &str, y: &str, color: Option<&str>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: x.to_string(),
            y_label: y.to_string(),
            categories: table.texts(x),
            values: table.numbers(y),
            color_label: color.map(str::to_string),
            groups: color.map(|c| table.texts(c)),
        }
    }

    pub fn to_plotly(&self) -> Value {
        let traces: Vec<Value> = match &self.groups {
            None => vec![json!({
                "type": "bar",
                "x": self.categories,
                "y": self.values,
            })],
            Some(groups) => {
                // first-seen order, like the legend order of the source rows
                let mut names: Vec<&String> = Vec::new();
                for g in groups {
                    if !names.contains(&g) {
                        names.push(g);
                    }
                }
                names
                    .into_iter()
                    .map(|name| {
                        let (xs, ys): (Vec<&String>, Vec<f64>) = self
                            .categories
                            .iter()
                            .zip(&self.values)
                            .zip(groups)
                            .filter(|(_, g)| *g == name)
                            .map(|((x, y), _)| (x, *y))
                            .unzip();
                        json!({
                            "type": "bar",
                            "name": name,
                            "x": xs,
                            "y": ys,
                        })
                    })
                    .collect()
            }
        };

        json!({
            "data": traces,
            "layout": {
                "title": { "text": self.title },
                "xaxis": { "title": { "text": self.x_label } },
                "yaxis": { "title": { "text": self.y_label } },
                "barmode": "relative",
                "legend": { "title": { "text": self.color_label.clone().unwrap_or_default() } },
            }
        })
    }
}

/// Donut/pie chart with a sequential slice palette
#[derive(Debug, Clone, Serialize)]
pub struct PieChart {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub hole: f64,
    pub palette: Palette,
}

impl PieChart {
    pub fn from_table(
        table: &ResultTable,
        names: &str,
        values: &str,
        title: impl Into<String>,
        hole: f64,
        palette: Palette,
    ) -> Self {
        Self {
            title: title.into(),
            labels: table.texts(names),
            values: table.numbers(values),
            hole,
            palette,
        }
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn to_plotly(&self) -> Value {
        let colors = self.palette.css();
        let slice_colors: Vec<&String> = (0..self.labels.len()).map(|i| &colors[i % colors.len()]).collect();

        json!({
            "data": [{
                "type": "pie",
                "labels": self.labels,
                "values": self.values,
                "hole": self.hole,
                "marker": { "colors": slice_colors },
            }],
            "layout": {
                "title": { "text": self.title },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn table() -> ResultTable {
        let rows = [("Chennai", "Tamil Nadu", 30.0), ("Pune", "Maharashtra", 20.0), ("Madurai", "Tamil Nadu", 10.0)]
            .iter()
            .map(|(d, s, v)| {
                let mut row = Map::new();
                row.insert("District".into(), json!(d));
                row.insert("State".into(), json!(s));
                row.insert("Total".into(), json!(v));
                row
            })
            .collect();
        ResultTable {
            columns: vec!["District".into(), "State".into(), "Total".into()],
            rows,
        }
    }

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(Palette::Blues.interpolate(0.0), (247, 251, 255));
        assert_eq!(Palette::Blues.interpolate(1.0), (8, 48, 107));
        assert_eq!(Palette::Blues.interpolate(7.0), (8, 48, 107));
        assert_eq!(Palette::Blues.interpolate(f64::NAN), (247, 251, 255));
        assert_eq!(hex_rgb((8, 48, 107)), "#08306b");
    }

    #[test]
    fn test_palette_midpoint_between_stops() {
        // halfway between stop 0 and stop 1
        let c = Palette::Greens.interpolate(0.5 / 8.0);
        assert_eq!(c, (238, 249, 235));
    }

    #[test]
    fn test_bar_traces_per_group() {
        let chart = BarChart::from_table(&table(), "District", "Total", Some("State"), "Top districts");
        let fig = chart.to_plotly();
        let traces = fig["data"].as_array().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["name"], "Tamil Nadu");
        assert_eq!(traces[0]["x"], json!(["Chennai", "Madurai"]));
        assert_eq!(traces[0]["y"], json!([30.0, 10.0]));
        assert_eq!(fig["layout"]["title"]["text"], "Top districts");
    }

    #[test]
    fn test_bar_single_trace_without_color() {
        let chart = BarChart::from_table(&table(), "District", "Total", None, "t");
        let fig = chart.to_plotly();
        assert_eq!(fig["data"].as_array().unwrap().len(), 1);
        assert_eq!(fig["data"][0]["x"], json!(["Chennai", "Pune", "Madurai"]));
    }

    #[test]
    fn test_pie_figure() {
        let chart = PieChart::from_table(&table(), "District", "Total", "Share", 0.6, Palette::Purples);
        assert_eq!(chart.total(), 60.0);
        let fig = chart.to_plotly();
        assert_eq!(fig["data"][0]["hole"], 0.6);
        assert_eq!(fig["data"][0]["marker"]["colors"].as_array().unwrap().len(), 3);
        assert_eq!(fig["data"][0]["marker"]["colors"][0], "rgb(252,251,253)");
    }
}
