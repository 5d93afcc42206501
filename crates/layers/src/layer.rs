use std::sync::Arc;

pub use scene::LayerId;
use streaming::{GeoSource, LoadState};

use crate::base::BaseTileLayer;
use crate::labels::LabelPolicy;
use crate::raster::raster_primitives;
use crate::style::{LayerStyleResolver, StyleResolver, VisualPrimitive};
use crate::symbology::FeatureStyle;
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    BaseTiles(BaseTileLayer),
    Vector,
    /// Server-rendered overlay (WMS GetMap).
    Raster,
}

/// Everything needed to add a layer to a [`crate::LayerStack`].
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
    pub resolver: Arc<dyn StyleResolver>,
    pub visible: bool,
    pub pickable: bool,
}

impl LayerSpec {
    pub fn vector(name: impl Into<String>, resolver: Arc<dyn StyleResolver>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Vector,
            resolver,
            visible: true,
            pickable: true,
        }
    }

    pub fn raster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Raster,
            resolver: unstyled(),
            visible: true,
            pickable: false,
        }
    }

    pub fn base_tiles(name: impl Into<String>, base: BaseTileLayer) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::BaseTiles(base),
            resolver: unstyled(),
            visible: true,
            pickable: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }
}

fn unstyled() -> Arc<dyn StyleResolver> {
    Arc::new(LayerStyleResolver::new(
        FeatureStyle::default(),
        LabelPolicy::none(),
    ))
}

/// One entry of the layer stack. Bound to exactly one source and one resolver.
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    name: String,
    kind: LayerKind,
    source: GeoSource,
    resolver: Arc<dyn StyleResolver>,
    z_rank: usize,
    pub(crate) visible: bool,
    pickable: bool,
}

impl Layer {
    pub(crate) fn new(id: LayerId, z_rank: usize, spec: LayerSpec) -> Self {
        let source = GeoSource::new(spec.name.clone(), id);
        Self {
            id,
            name: spec.name,
            kind: spec.kind,
            source,
            resolver: spec.resolver,
            z_rank,
            visible: spec.visible,
            pickable: spec.pickable,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Position in the stack; higher draws later and wins hit-tests.
    pub fn z_rank(&self) -> usize {
        self.z_rank
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Only visible vector layers that opted in take part in picking.
    pub fn is_pickable(&self) -> bool {
        self.visible && self.pickable && self.kind == LayerKind::Vector
    }

    pub fn source(&self) -> &GeoSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut GeoSource {
        &mut self.source
    }

    pub fn load_state(&self) -> &LoadState {
        self.source.state()
    }

    pub fn resolver(&self) -> &dyn StyleResolver {
        self.resolver.as_ref()
    }

    pub fn primitives(&self, viewport: &Viewport) -> Vec<VisualPrimitive> {
        match &self.kind {
            LayerKind::BaseTiles(base) => base.primitives(viewport),
            LayerKind::Raster => raster_primitives(self.source.data()),
            LayerKind::Vector => {
                let Some(snapshot) = self.source.features() else {
                    return Vec::new();
                };
                let extent = viewport.extent();
                let resolution = viewport.resolution();
                snapshot
                    .features
                    .iter()
                    .filter(|f| f.geometry.bounds().is_some_and(|b| b.intersects(&extent)))
                    .flat_map(|f| self.resolver.resolve(f, resolution))
                    .collect()
            }
        }
    }
}
