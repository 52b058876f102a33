//! Vega-Lite chart specs for `chart_from_sql`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Supported mark types. Unknown names fall back to [`ChartMark::Bar`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChartMark {
    /// Bars.
    #[default]
    Bar,
    /// Connected line.
    Line,
    /// Filled area.
    Area,
    /// Scatter points.
    Point,
    /// Tick strip.
    Tick,
    /// Box-and-whisker.
    Boxplot,
}

impl ChartMark {
    /// Parses a mark name leniently.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" => Self::Line,
            "area" => Self::Area,
            "point" => Self::Point,
            "tick" => Self::Tick,
            "boxplot" => Self::Boxplot,
            _ => Self::Bar,
        }
    }

    /// Vega-Lite mark name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Area => "area",
            Self::Point => "point",
            Self::Tick => "tick",
            Self::Boxplot => "boxplot",
        }
    }
}

impl From<String> for ChartMark {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

fn default_title() -> String {
    "Chart".to_string()
}

fn default_x_type() -> String {
    "ordinal".to_string()
}

fn default_y_type() -> String {
    "quantitative".to_string()
}

/// Encoding options for a chart. The SQL travels separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOptions {
    /// Mark type.
    #[serde(default)]
    pub mark: ChartMark,
    /// Field on the x axis.
    #[serde(default)]
    pub x: Option<String>,
    /// Field on the y axis.
    #[serde(default)]
    pub y: Option<String>,
    /// Optional nominal color field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Chart title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Vega-Lite type of the x field.
    #[serde(default = "default_x_type")]
    pub x_type: String,
    /// Vega-Lite type of the y field.
    #[serde(default = "default_y_type")]
    pub y_type: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            mark: ChartMark::default(),
            x: None,
            y: None,
            color: None,
            title: default_title(),
            x_type: default_x_type(),
            y_type: default_y_type(),
        }
    }
}

impl ChartOptions {
    /// Builds a Vega-Lite v5 spec with the rows inlined as data.
    #[must_use]
    pub fn to_vega_lite(&self, rows: &[Map<String, Value>]) -> Value {
        let mut encoding = json!({
            "x": { "field": self.x, "type": self.x_type },
            "y": { "field": self.y, "type": self.y_type },
        });
        if let Some(color) = &self.color
            && let Some(obj) = encoding.as_object_mut()
        {
            obj.insert(
                "color".to_string(),
                json!({ "field": color, "type": "nominal" }),
            );
        }

        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "description": "Generated chart",
            "title": self.title,
            "data": { "values": rows },
            "mark": self.mark.as_str(),
            "encoding": encoding,
        })
    }
}
