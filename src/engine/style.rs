//! Typed source and layer descriptions handed to a [`MapHandle`](super::MapHandle).

use geojson::{FeatureCollection, JsonObject};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Property set on cluster features carrying the number of member points
pub const POINT_COUNT: &str = "point_count";
pub const POINT_COUNT_ABBREVIATED: &str = "point_count_abbreviated";
pub const CLUSTER_ID: &str = "cluster_id";
pub const CLUSTER: &str = "cluster";

/// 24-bit colour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb::hex(0xffffff);

    pub const fn hex(value: u32) -> Self {
        Self((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Parse `#rrggbb` or `#rgb`
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        let value = u32::from_str_radix(digits, 16).ok()?;
        match digits.len() {
            6 => Some(Self::hex(value)),
            3 => {
                let expand = |n: u32| ((n & 0xf) * 0x11) as u8;
                Some(Self(expand(value >> 8), expand(value >> 4), expand(value)))
            }
            _ => None,
        }
    }
}

/// Clustering parameters for a GeoJSON source
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterOptions {
    /// Highest zoom at which points are still merged
    pub max_zoom: u8,
    /// Merge radius in screen pixels at tile extent 512
    pub radius: f64,
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_zoom: 14,
            radius: 50.0,
            min_points: 2,
        }
    }
}

/// A GeoJSON data source, optionally clustered
#[derive(Clone, Debug)]
pub struct GeoJsonSource {
    pub data: Arc<FeatureCollection>,
    pub cluster: Option<ClusterOptions>,
}

impl GeoJsonSource {
    pub fn new(data: Arc<FeatureCollection>) -> Self {
        Self { data, cluster: None }
    }

    pub fn clustered(data: Arc<FeatureCollection>, options: ClusterOptions) -> Self {
        Self {
            data,
            cluster: Some(options),
        }
    }
}

/// Feature filter evaluated against feature properties
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Has(String),
    Not(Box<Filter>),
    Eq(String, JsonValue),
    All(Vec<Filter>),
}

impl Filter {
    pub fn has(key: &str) -> Self {
        Filter::Has(key.to_string())
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn matches(&self, properties: Option<&JsonObject>) -> bool {
        match self {
            Filter::Has(key) => properties.is_some_and(|p| p.contains_key(key)),
            Filter::Not(inner) => !inner.matches(properties),
            Filter::Eq(key, value) => properties.and_then(|p| p.get(key)) == Some(value),
            Filter::All(filters) => filters.iter().all(|f| f.matches(properties)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FillPaint {
    pub color: Rgb,
    pub outline_color: Option<Rgb>,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinePaint {
    pub color: Rgb,
    pub width: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CirclePaint {
    pub color: Rgb,
    pub radius: f64,
    pub stroke_width: f64,
    pub stroke_color: Option<Rgb>,
}

/// Text label drawn at each point feature
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolPaint {
    /// Template with `{property}` placeholders
    pub text_field: String,
    pub text_size: f64,
    pub text_color: Rgb,
}

impl SymbolPaint {
    /// Expand `{property}` placeholders; missing properties expand to nothing
    pub fn label(&self, properties: Option<&JsonObject>) -> String {
        let mut out = String::new();
        let mut rest = self.text_field.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let Some(close) = rest[open..].find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let key = &rest[open + 1..open + close];
            match properties.and_then(|p| p.get(key)) {
                Some(JsonValue::String(s)) => out.push_str(s),
                Some(JsonValue::Null) | None => {}
                Some(other) => out.push_str(&other.to_string()),
            }
            rest = &rest[open + close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// Layer kind together with its paint and layout properties
#[derive(Clone, Debug, PartialEq)]
pub enum LayerPaint {
    Fill(FillPaint),
    Line(LinePaint),
    Circle(CirclePaint),
    Symbol(SymbolPaint),
}

impl LayerPaint {
    pub fn kind(&self) -> &'static str {
        match self {
            LayerPaint::Fill(_) => "fill",
            LayerPaint::Line(_) => "line",
            LayerPaint::Circle(_) => "circle",
            LayerPaint::Symbol(_) => "symbol",
        }
    }
}

impl Default for LayerPaint {
    /// The engine's default line style for layers created without options
    fn default() -> Self {
        LayerPaint::Line(LinePaint {
            color: Rgb::hex(0x0080ff),
            width: 1.0,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    None,
}

/// A rendering rule applied to one source
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub filter: Option<Filter>,
    pub paint: LayerPaint,
    pub visibility: Visibility,
}

impl LayerSpec {
    pub fn new(id: &str, source: &str, paint: LayerPaint) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            filter: None,
            paint,
            visibility: Visibility::Visible,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn accepts(&self, properties: Option<&JsonObject>) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_colors() {
        assert_eq!(Rgb::parse("#328ffd"), Some(Rgb(0x32, 0x8f, 0xfd)));
        assert_eq!(Rgb::parse("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::parse("328ffd"), None);
        assert_eq!(Rgb::parse("#12345"), None);
    }

    #[test]
    fn test_has_and_not_filters() {
        let cluster = props(json!({ "point_count": 3 }));
        let point = props(json!({ "name": "a" }));
        let has = Filter::has(POINT_COUNT);
        let not_has = Filter::not(Filter::has(POINT_COUNT));
        assert!(has.matches(Some(&cluster)));
        assert!(!has.matches(Some(&point)));
        assert!(!has.matches(None));
        assert!(not_has.matches(Some(&point)));
        assert!(not_has.matches(None));
    }

    #[test]
    fn test_symbol_label_template() {
        let paint = SymbolPaint {
            text_field: "{point_count_abbreviated} pts".to_string(),
            text_size: 12.0,
            text_color: Rgb::WHITE,
        };
        let p = props(json!({ "point_count_abbreviated": "1.2k" }));
        assert_eq!(paint.label(Some(&p)), "1.2k pts");
        assert_eq!(paint.label(None), " pts");

        let numeric = props(json!({ "point_count_abbreviated": 12 }));
        assert_eq!(paint.label(Some(&numeric)), "12 pts");
    }
}
