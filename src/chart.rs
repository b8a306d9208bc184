//! Visual units a block can produce.
//!
//! Charts are Vega-Lite v5 specifications built from frame records; the HTML
//! layer embeds them as-is. Tables, metric cards, notices and the word cloud
//! are plain data rendered server-side.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::FrameError;
use crate::frame::{Frame, Scalar};
use crate::transform::{fmt_fixed, fmt_percent, fmt_thousands};
use crate::wordfreq::WordWeight;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub tone: Tone,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self { tone: Tone::Info, text: text.into() }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { tone: Tone::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { tone: Tone::Warning, text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub delta: Option<String>,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into(), delta: None }
    }

    pub fn with_delta(mut self, delta: impl Into<String>) -> Self {
        self.delta = Some(delta.into());
        self
    }
}

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellFormat {
    Fixed(usize),
    Percent(usize),
    Thousands,
}

impl CellFormat {
    fn apply(&self, v: &Scalar) -> String {
        match (self, v) {
            (_, Scalar::Null) => String::new(),
            (CellFormat::Fixed(p), v) => v.as_f64().map(|x| fmt_fixed(x, *p)).unwrap_or_else(|| v.to_string()),
            (CellFormat::Percent(p), v) => v.as_f64().map(|x| fmt_percent(x, *p)).unwrap_or_else(|| v.to_string()),
            (CellFormat::Thousands, v) => v
                .as_f64()
                .map(|x| fmt_thousands(x.round() as i64))
                .unwrap_or_else(|| v.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Every column of `frame`, formatted per `formats` where named.
    pub fn from_frame(frame: &Frame, formats: &[(&str, CellFormat)]) -> Result<Self, FrameError> {
        let mut by_index: Vec<Option<CellFormat>> = vec![None; frame.columns().len()];
        for (name, fmt) in formats {
            by_index[frame.column_index(name)?] = Some(*fmt);
        }
        let rows = frame
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&by_index)
                    .map(|(v, fmt)| match fmt {
                        Some(f) => f.apply(v),
                        None => v.to_string(),
                    })
                    .collect()
            })
            .collect();
        Ok(Self { columns: frame.columns().to_vec(), rows })
    }
}

// =============================================================================
// Charts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Nominal,
    Ordinal,
    Quantitative,
}

impl FieldKind {
    fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Nominal => "nominal",
            FieldKind::Ordinal => "ordinal",
            FieldKind::Quantitative => "quantitative",
        }
    }
}

/// One encoding channel of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub field: String,
    pub title: String,
    pub kind: FieldKind,
    pub sort: Option<Vec<String>>,
    pub domain: Option<[f64; 2]>,
}

impl Channel {
    fn of(field: &str, title: &str, kind: FieldKind) -> Self {
        Self {
            field: field.to_string(),
            title: title.to_string(),
            kind,
            sort: None,
            domain: None,
        }
    }

    pub fn nominal(field: &str, title: &str) -> Self {
        Self::of(field, title, FieldKind::Nominal)
    }

    pub fn ordinal(field: &str, title: &str) -> Self {
        Self::of(field, title, FieldKind::Ordinal)
    }

    pub fn quantitative(field: &str, title: &str) -> Self {
        Self::of(field, title, FieldKind::Quantitative)
    }

    /// Fixes the axis order instead of letting the renderer sort labels.
    pub fn sorted(mut self, order: &[&str]) -> Self {
        self.sort = Some(order.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn domain(mut self, lo: f64, hi: f64) -> Self {
        self.domain = Some([lo, hi]);
        self
    }

    fn encode(&self) -> Value {
        let mut m = Map::new();
        m.insert("field".into(), json!(self.field));
        m.insert("type".into(), json!(self.kind.as_str()));
        m.insert("title".into(), json!(self.title));
        match &self.sort {
            Some(order) => {
                m.insert("sort".into(), json!(order));
            }
            // Rows arrive already ordered; keep that order on discrete axes.
            None if self.kind != FieldKind::Quantitative => {
                m.insert("sort".into(), Value::Null);
            }
            None => {}
        }
        if let Some([lo, hi]) = self.domain {
            m.insert("scale".into(), json!({ "domain": [lo, hi] }));
        }
        Value::Object(m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub spec: Value,
}

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

fn base(title: &str, data: Vec<Value>) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("$schema".into(), json!(SCHEMA));
    if !title.is_empty() {
        m.insert("title".into(), json!(title));
    }
    m.insert("width".into(), json!("container"));
    m.insert("height".into(), json!(320));
    m.insert("data".into(), json!({ "values": data }));
    m
}

impl Chart {
    pub fn bar(title: &str, data: Vec<Value>, x: Channel, y: Channel, color: &str) -> Self {
        let mut m = base(title, data);
        m.insert("mark".into(), json!({ "type": "bar", "color": color, "tooltip": true }));
        m.insert("encoding".into(), json!({ "x": x.encode(), "y": y.encode() }));
        Self { spec: Value::Object(m) }
    }

    /// Bars colored by the x category, each labelled with its value.
    pub fn labelled_bar(title: &str, data: Vec<Value>, x: Channel, y: Channel) -> Self {
        let mut m = base(title, data);
        let color = json!({ "field": x.field, "type": "nominal", "legend": null });
        m.insert(
            "layer".into(),
            json!([
                {
                    "mark": { "type": "bar", "tooltip": true },
                    "encoding": { "x": x.encode(), "y": y.encode(), "color": color }
                },
                {
                    "mark": { "type": "text", "dy": -8 },
                    "encoding": {
                        "x": x.encode(),
                        "y": y.encode(),
                        "text": { "field": y.field, "type": "quantitative", "format": ".2f" }
                    }
                }
            ]),
        );
        Self { spec: Value::Object(m) }
    }

    pub fn line(title: &str, data: Vec<Value>, x: Channel, y: Channel, color: &str) -> Self {
        let mut m = base(title, data);
        m.insert(
            "mark".into(),
            json!({ "type": "line", "color": color, "point": { "color": color }, "tooltip": true }),
        );
        m.insert("encoding".into(), json!({ "x": x.encode(), "y": y.encode() }));
        Self { spec: Value::Object(m) }
    }

    /// Bars on the left axis, a line on an independent right axis.
    pub fn dual_axis(
        title: &str,
        data: Vec<Value>,
        x: Channel,
        bars: (Channel, &str),
        line: (Channel, &str),
    ) -> Self {
        let (bar_y, bar_color) = bars;
        let (line_y, line_color) = line;
        let mut bar_enc = bar_y.encode();
        bar_enc["axis"] = json!({ "titleColor": bar_color, "labelColor": bar_color });
        let mut line_enc = line_y.encode();
        line_enc["axis"] = json!({ "orient": "right", "titleColor": line_color, "labelColor": line_color });

        let mut m = base(title, data);
        m.insert("encoding".into(), json!({ "x": x.encode() }));
        m.insert(
            "layer".into(),
            json!([
                {
                    "mark": { "type": "bar", "color": bar_color, "opacity": 0.8, "tooltip": true },
                    "encoding": { "y": bar_enc }
                },
                {
                    "mark": { "type": "line", "color": line_color, "strokeWidth": 2,
                              "point": { "color": line_color }, "tooltip": true },
                    "encoding": { "y": line_enc }
                }
            ]),
        );
        m.insert("resolve".into(), json!({ "scale": { "y": "independent" } }));
        Self { spec: Value::Object(m) }
    }

    /// Pie of `value_field` per `label_field`, slices annotated with their share.
    pub fn pie(title: &str, data: Vec<Value>, value_field: &str, label_field: &str) -> Self {
        let mut m = base(title, data);
        m.insert(
            "transform".into(),
            json!([
                { "joinaggregate": [{ "op": "sum", "field": value_field, "as": "__total" }] },
                { "calculate": format!("datum['{}'] / datum.__total", value_field), "as": "__share" }
            ]),
        );
        m.insert(
            "encoding".into(),
            json!({
                "theta": { "field": value_field, "type": "quantitative", "stack": true },
                "color": { "field": label_field, "type": "nominal", "sort": null,
                           "scale": { "scheme": "pastel1" } },
                "order": { "field": value_field, "type": "quantitative", "sort": "descending" }
            }),
        );
        m.insert(
            "layer".into(),
            json!([
                { "mark": { "type": "arc", "outerRadius": 120, "stroke": "white", "tooltip": true } },
                {
                    "mark": { "type": "text", "radius": 140 },
                    "encoding": { "text": { "field": "__share", "type": "quantitative", "format": ".1%" } }
                }
            ]),
        );
        Self { spec: Value::Object(m) }
    }

    pub fn scatter(
        title: &str,
        data: Vec<Value>,
        x: Channel,
        y: Channel,
        color: Channel,
        tooltip: &[&str],
    ) -> Self {
        let mut m = base(title, data);
        m.insert("mark".into(), json!({ "type": "circle", "size": 60 }));
        let tips: Vec<Value> = tooltip.iter().map(|f| json!({ "field": f })).collect();
        m.insert(
            "encoding".into(),
            json!({ "x": x.encode(), "y": y.encode(), "color": color.encode(), "tooltip": tips }),
        );
        Self { spec: Value::Object(m) }
    }

    /// Points placed by longitude/latitude on a mercator projection.
    pub fn map(title: &str, data: Vec<Value>, longitude: &str, latitude: &str) -> Self {
        let mut m = base(title, data);
        m.insert("height".into(), json!(480));
        m.insert("projection".into(), json!({ "type": "mercator" }));
        m.insert("mark".into(), json!({ "type": "circle", "size": 12, "color": "#E4572E", "opacity": 0.6 }));
        m.insert(
            "encoding".into(),
            json!({
                "longitude": { "field": longitude, "type": "quantitative" },
                "latitude": { "field": latitude, "type": "quantitative" }
            }),
        );
        Self { spec: Value::Object(m) }
    }
}

// =============================================================================
// Visual
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Visual {
    Chart(Chart),
    Table(Table),
    Metrics { items: Vec<Metric> },
    Notice(Notice),
    /// Plain text line derived from the data.
    Note { text: String },
    WordCloud { words: Vec<WordWeight> },
}

impl Visual {
    pub fn note(text: impl Into<String>) -> Self {
        Visual::Note { text: text.into() }
    }

    pub fn metrics(items: Vec<Metric>) -> Self {
        Visual::Metrics { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution() -> Frame {
        Frame::from_rows(
            &["stars", "nb_notes", "ratio"],
            vec![vec![1.into(), 1234.into(), 0.125.into()], vec![2.into(), Scalar::Null, 0.5.into()]],
        )
        .unwrap()
    }

    #[test]
    fn test_table_formats() {
        let t = Table::from_frame(
            &distribution(),
            &[("nb_notes", CellFormat::Thousands), ("ratio", CellFormat::Percent(2))],
        )
        .unwrap();
        assert_eq!(t.columns, vec!["stars", "nb_notes", "ratio"]);
        assert_eq!(t.rows[0], vec!["1", "1,234", "12.50%"]);
        assert_eq!(t.rows[1], vec!["2", "", "50.00%"]);
    }

    #[test]
    fn test_table_unknown_format_column() {
        assert!(Table::from_frame(&distribution(), &[("avg", CellFormat::Fixed(1))]).is_err());
    }

    #[test]
    fn test_sorted_channel_keeps_canonical_order() {
        let x = Channel::nominal("day_name", "Jour").sorted(&["Monday", "Tuesday"]);
        let enc = x.encode();
        assert_eq!(enc["sort"], json!(["Monday", "Tuesday"]));
        assert_eq!(enc["type"], "nominal");
    }

    #[test]
    fn test_bar_spec_shape() {
        let data = distribution().records(&["stars", "nb_notes"]).unwrap();
        let chart = Chart::bar(
            "",
            data,
            Channel::ordinal("stars", "Note"),
            Channel::quantitative("nb_notes", "Nombre").domain(0.0, 5.0),
            "#4c8bf5",
        );
        assert_eq!(chart.spec["mark"]["type"], "bar");
        assert_eq!(chart.spec["data"]["values"].as_array().unwrap().len(), 2);
        assert_eq!(chart.spec["encoding"]["y"]["scale"]["domain"], json!([0.0, 5.0]));
        assert!(chart.spec.get("title").is_none());
    }

    #[test]
    fn test_dual_axis_independent_scales() {
        let chart = Chart::dual_axis(
            "t",
            vec![],
            Channel::ordinal("stars", "Note"),
            (Channel::quantitative("nb_reviews", "Avis"), "#4c8bf5"),
            (Channel::quantitative("nb_useful", "Utilité"), "#f59e0b"),
        );
        assert_eq!(chart.spec["resolve"]["scale"]["y"], "independent");
        assert_eq!(chart.spec["layer"][1]["encoding"]["y"]["axis"]["orient"], "right");
    }

    #[test]
    fn test_visual_serializes_with_kind() {
        let v = Visual::note("120 / 1000 (12.00%)");
        let j = serde_json::to_value(&v).unwrap();
        assert_eq!(j["kind"], "note");
        assert_eq!(j["text"], "120 / 1000 (12.00%)");
    }
}
