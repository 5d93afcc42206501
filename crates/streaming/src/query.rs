//! Request builders for the geodata services layers are fed from.

use foundation::bounds::Aabb2;

/// OGC WFS `GetFeature` returning GeoJSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WfsQuery {
    pub base_url: String,
    pub type_name: String,
}

impl WfsQuery {
    pub fn new(base_url: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            type_name: type_name.into(),
        }
    }

    pub fn url(&self) -> String {
        with_query(
            &self.base_url,
            &[
                ("service", "WFS"),
                ("version", "1.0.0"),
                ("request", "GetFeature"),
                ("typeName", &self.type_name),
                ("outputFormat", "application/json"),
            ],
        )
    }
}

/// OGC WMS `GetMap` for a single rendered overlay image.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsQuery {
    pub base_url: String,
    pub layers: String,
    /// Requested extent in EPSG:3857 meters.
    pub extent: Aabb2,
    pub width: u32,
    pub height: u32,
}

impl WmsQuery {
    pub fn url(&self) -> String {
        let bbox = format!(
            "{},{},{},{}",
            self.extent.min[0], self.extent.min[1], self.extent.max[0], self.extent.max[1]
        );
        let width = self.width.to_string();
        let height = self.height.to_string();
        with_query(
            &self.base_url,
            &[
                ("service", "WMS"),
                ("version", "1.1.0"),
                ("request", "GetMap"),
                ("layers", &self.layers),
                ("styles", ""),
                ("bbox", &bbox),
                ("width", &width),
                ("height", &height),
                ("srs", "EPSG:3857"),
                ("format", "image/png"),
                ("transparent", "true"),
            ],
        )
    }
}

/// What a source fetches on load.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceQuery {
    /// A plain GeoJSON document, e.g. the backend's `/places` feed.
    GeoJson { url: String },
    Wfs(WfsQuery),
    Wms(WmsQuery),
}

impl SourceQuery {
    pub fn url(&self) -> String {
        match self {
            SourceQuery::GeoJson { url } => url.clone(),
            SourceQuery::Wfs(q) => q.url(),
            SourceQuery::Wms(q) => q.url(),
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, SourceQuery::Wms(_))
    }
}

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let base = base.trim_end_matches('/');
    let sep = if base.contains('?') { '&' } else { '?' };
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    format!("{base}{sep}{}", pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wfs_url_carries_fixed_parameters() {
        let q = WfsQuery::new("http://geo.local/geoserver/wfs/", "campus:buildings");
        assert_eq!(
            q.url(),
            "http://geo.local/geoserver/wfs?service=WFS&version=1.0.0&request=GetFeature\
             &typeName=campus%3Abuildings&outputFormat=application%2Fjson"
        );
    }

    #[test]
    fn existing_query_string_is_extended() {
        let q = WfsQuery::new("http://geo.local/ows?workspace=campus", "roads");
        assert!(q.url().starts_with("http://geo.local/ows?workspace=campus&service=WFS&"));
    }

    #[test]
    fn wms_url_encodes_extent_and_size() {
        let q = WmsQuery {
            base_url: "http://geo.local/wms".into(),
            layers: "campus:overlay".into(),
            extent: Aabb2::new([0.0, 1.5], [10.0, 20.0]),
            width: 256,
            height: 128,
        };
        let url = q.url();
        assert!(url.contains("request=GetMap"));
        assert!(url.contains("bbox=0%2C1.5%2C10%2C20"));
        assert!(url.contains("width=256&height=128"));
        assert!(SourceQuery::Wms(q).is_raster());
    }
}
