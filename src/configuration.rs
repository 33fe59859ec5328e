use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::bbox::{self, BoundingBox, ExtentFeatures};
use crate::config::{BorderStyle, LayoutOptions};
use crate::error::{Advisory, InsetError, Result};
use crate::spatial::{self, Crs, FeatureLayer, IdentityProjector, Projector};
use crate::spec::SubplotSpec;

static LAST_CONFIGURATION: Lazy<ConfigurationStore> = Lazy::new(ConfigurationStore::new);

/// Margin between an anchored inset and the canvas edge.
pub const DEFAULT_MARGIN: f64 = 0.02;

/// A spec bundled with what configuration resolution derived for it.
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    index: usize,
    spec: SubplotSpec,
    resolved_bbox: BoundingBox,
    data_extent: Option<BoundingBox>,
    layers: Vec<FeatureLayer>,
}

impl ResolvedSpec {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &SubplotSpec {
        &self.spec
    }

    pub fn is_main(&self) -> bool {
        self.spec.is_main()
    }

    /// The requested bbox with pending fields taken from the overall extent.
    pub fn resolved_bbox(&self) -> &BoundingBox {
        &self.resolved_bbox
    }

    /// Bounds of the data left after cropping; `None` when the crop is empty.
    pub fn data_extent(&self) -> Option<&BoundingBox> {
        self.data_extent.as_ref()
    }

    /// Cropped layers, in the target coordinate system.
    pub fn layers(&self) -> &[FeatureLayer] {
        &self.layers
    }

    pub fn extent_features(&self) -> Result<ExtentFeatures> {
        let tag = |err: InsetError| match err {
            InsetError::DegenerateExtent {
                x_range, y_range, ..
            } => InsetError::DegenerateExtent {
                index: Some(self.index),
                x_range,
                y_range,
            },
            other => other,
        };
        match &self.data_extent {
            Some(extent) => bbox::features(extent).map_err(tag),
            None => Err(InsetError::DegenerateExtent {
                index: Some(self.index),
                x_range: 0.0,
                y_range: 0.0,
            }),
        }
    }
}

/// One main subplot plus its insets, resolved against the data.
#[derive(Debug, Clone)]
pub struct LayoutConfiguration {
    subplots: Vec<ResolvedSpec>,
    main_index: usize,
    layers: Vec<FeatureLayer>,
    full_ratio: f64,
    margin: f64,
    crs: Option<Crs>,
    data_crs: Option<Crs>,
    border: BorderStyle,
    overall_extent: BoundingBox,
    main_ratio: f64,
    advisories: Vec<Advisory>,
}

impl LayoutConfiguration {
    pub fn builder(layers: Vec<FeatureLayer>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(layers)
    }

    /// All subplots in the order they were given.
    pub fn subplots(&self) -> &[ResolvedSpec] {
        &self.subplots
    }

    pub fn main(&self) -> &ResolvedSpec {
        &self.subplots[self.main_index]
    }

    pub fn insets(&self) -> impl Iterator<Item = &ResolvedSpec> {
        self.subplots.iter().filter(|s| !s.is_main())
    }

    pub fn layers(&self) -> &[FeatureLayer] {
        &self.layers
    }

    /// Canvas width over height.
    pub fn full_ratio(&self) -> f64 {
        self.full_ratio
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Aspect ratio of the main subplot's data extent. Output sizing uses it.
    pub fn main_ratio(&self) -> f64 {
        self.main_ratio
    }

    pub fn overall_extent(&self) -> &BoundingBox {
        &self.overall_extent
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn data_crs(&self) -> Option<&Crs> {
        self.data_crs.as_ref()
    }

    pub fn border(&self) -> &BorderStyle {
        &self.border
    }

    /// Advisories raised by every spec, in spec order.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    layers: Vec<FeatureLayer>,
    specs: Vec<SubplotSpec>,
    crs: Option<Crs>,
    data_crs: Option<Crs>,
    full_ratio: f64,
    margin: f64,
    border: BorderStyle,
}

impl ConfigurationBuilder {
    pub fn new(layers: Vec<FeatureLayer>) -> Self {
        Self {
            layers,
            specs: Vec::new(),
            crs: None,
            data_crs: None,
            full_ratio: 1.0,
            margin: DEFAULT_MARGIN,
            border: BorderStyle::default(),
        }
    }

    pub fn spec(mut self, spec: SubplotSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn specs(mut self, specs: impl IntoIterator<Item = SubplotSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    /// Target coordinate system the subplots are drawn in.
    pub fn crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Coordinate system the bounding boxes are given in.
    pub fn data_crs(mut self, crs: Crs) -> Self {
        self.data_crs = Some(crs);
        self
    }

    pub fn full_ratio(mut self, full_ratio: f64) -> Self {
        self.full_ratio = full_ratio;
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    pub fn options(mut self, options: &LayoutOptions) -> Self {
        self.full_ratio = options.full_ratio;
        self.margin = options.margin;
        self
    }

    /// Resolve and store the result as the process-wide last configuration.
    pub fn build(self) -> Result<Arc<LayoutConfiguration>> {
        self.build_in(global_store(), &IdentityProjector)
    }

    /// Resolve and store the result in `store`. Nothing is stored on failure.
    pub fn build_in(
        self,
        store: &ConfigurationStore,
        projector: &dyn Projector,
    ) -> Result<Arc<LayoutConfiguration>> {
        let configuration = Arc::new(self.resolve(projector)?);
        store.set(Arc::clone(&configuration));
        Ok(configuration)
    }

    /// Resolve without touching any store.
    pub fn resolve(self, projector: &dyn Projector) -> Result<LayoutConfiguration> {
        let main_index = self.validate()?;

        let layers = match &self.data_crs {
            Some(data_crs) => self
                .layers
                .into_iter()
                .map(|layer| projector.reproject(layer, data_crs))
                .collect::<Result<Vec<_>>>()?,
            None => self.layers,
        };
        let overall_extent = spatial::collection_bounds(&layers)?;
        let target_crs = self.crs.clone().or_else(|| self.data_crs.clone());

        let mut subplots = Vec::with_capacity(self.specs.len());
        let mut advisories = Vec::new();
        for (index, spec) in self.specs.into_iter().enumerate() {
            let resolved_bbox = bbox::fill_missing(spec.requested_bbox(), Some(&overall_extent))?;
            let mut cropped = Vec::with_capacity(layers.len());
            for layer in &layers {
                let layer = layer.crop(&resolved_bbox);
                let layer = match &target_crs {
                    Some(crs) => projector.reproject(layer, crs)?,
                    None => layer,
                };
                cropped.push(layer);
            }
            let data_extent = spatial::cropped_extent(&cropped);
            if data_extent.is_none() {
                tracing::debug!(index, ?resolved_bbox, "subplot crop is empty");
            }
            advisories.extend(spec.advisories().iter().cloned());
            subplots.push(ResolvedSpec {
                index,
                spec,
                resolved_bbox,
                data_extent,
                layers: cropped,
            });
        }

        let main_ratio = subplots[main_index].extent_features()?.aspect_ratio;
        tracing::info!(
            subplots = subplots.len(),
            main_ratio,
            full_ratio = self.full_ratio,
            "built layout configuration"
        );

        Ok(LayoutConfiguration {
            subplots,
            main_index,
            layers,
            full_ratio: self.full_ratio,
            margin: self.margin,
            crs: target_crs,
            data_crs: self.data_crs,
            border: self.border,
            overall_extent,
            main_ratio,
            advisories,
        })
    }

    fn validate(&self) -> Result<usize> {
        if self.specs.is_empty() {
            return Err(InsetError::EmptySpecList);
        }
        let mains: Vec<usize> = self
            .specs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_main())
            .map(|(i, _)| i)
            .collect();
        let main_index = match mains.as_slice() {
            [] => return Err(InsetError::NoMainSpec),
            [index] => *index,
            _ => return Err(InsetError::MultipleMainSpec { count: mains.len() }),
        };
        if !(self.full_ratio.is_finite() && self.full_ratio > 0.0) {
            return Err(InsetError::InvalidRatio(self.full_ratio));
        }
        if !(self.margin.is_finite() && (0.0..0.5).contains(&self.margin)) {
            return Err(InsetError::MarginOutOfRange(self.margin));
        }
        Ok(main_index)
    }
}

/// Single slot holding the most recently built configuration.
#[derive(Debug, Default)]
pub struct ConfigurationStore {
    slot: Mutex<Option<Arc<LayoutConfiguration>>>,
}

impl ConfigurationStore {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Result<Arc<LayoutConfiguration>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(InsetError::NoConfiguration)
    }

    pub fn set(&self, configuration: Arc<LayoutConfiguration>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(configuration);
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// The process-wide store written by [`ConfigurationBuilder::build`].
pub fn global_store() -> &'static ConfigurationStore {
    &LAST_CONFIGURATION
}

/// The configuration most recently built with [`ConfigurationBuilder::build`].
pub fn last_configuration() -> Result<Arc<LayoutConfiguration>> {
    global_store().get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, polygon};

    fn rect_layer(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> FeatureLayer {
        FeatureLayer::new(
            "states",
            vec![Geometry::Polygon(polygon![
                (x: xmin, y: ymin),
                (x: xmax, y: ymin),
                (x: xmax, y: ymax),
                (x: xmin, y: ymax),
            ])],
        )
    }

    fn main_spec() -> SubplotSpec {
        SubplotSpec::main().build().unwrap()
    }

    #[test]
    fn resolves_main_and_inset_extents() {
        let inset = SubplotSpec::inset()
            .xmax(-80.0)
            .scale_factor(0.5)
            .build()
            .unwrap();
        let config = ConfigurationBuilder::new(vec![rect_layer(-84.0, 33.0, -75.0, 37.0)])
            .spec(main_spec())
            .spec(inset)
            .resolve(&IdentityProjector)
            .unwrap();

        assert_eq!(config.main().index(), 0);
        assert_eq!(
            *config.overall_extent(),
            BoundingBox::new(-84.0, 33.0, -75.0, 37.0)
        );
        assert!((config.main_ratio() - 2.25).abs() < 1e-6);

        let inset = config.insets().next().unwrap();
        assert_eq!(
            *inset.resolved_bbox(),
            BoundingBox::new(-84.0, 33.0, -80.0, 37.0)
        );
        let extent = inset.data_extent().unwrap();
        assert!((extent.x_range() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_missing_or_duplicate_main() {
        let inset = || SubplotSpec::inset().width(0.2).build().unwrap();
        let layers = vec![rect_layer(0.0, 0.0, 1.0, 1.0)];

        let err = ConfigurationBuilder::new(layers.clone())
            .spec(inset())
            .resolve(&IdentityProjector)
            .unwrap_err();
        assert_eq!(err, InsetError::NoMainSpec);

        let err = ConfigurationBuilder::new(layers.clone())
            .spec(main_spec())
            .spec(main_spec())
            .spec(inset())
            .resolve(&IdentityProjector)
            .unwrap_err();
        assert_eq!(err, InsetError::MultipleMainSpec { count: 2 });

        let err = ConfigurationBuilder::new(layers)
            .resolve(&IdentityProjector)
            .unwrap_err();
        assert_eq!(err, InsetError::EmptySpecList);
    }

    #[test]
    fn rejects_bad_canvas_ratio() {
        for ratio in [0.0, -1.0, f64::INFINITY] {
            let err = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 1.0, 1.0)])
                .spec(main_spec())
                .full_ratio(ratio)
                .resolve(&IdentityProjector)
                .unwrap_err();
            assert!(matches!(err, InsetError::InvalidRatio(_)));
        }
    }

    #[test]
    fn rejects_margin_outside_half_canvas() {
        for margin in [-0.01, 0.5, f64::NAN] {
            let err = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 1.0, 1.0)])
                .spec(main_spec())
                .margin(margin)
                .resolve(&IdentityProjector)
                .unwrap_err();
            assert!(matches!(err, InsetError::MarginOutOfRange(_)));
        }
        assert!(
            InsetError::MarginOutOfRange(0.5)
                .to_string()
                .contains("[0, 0.5)")
        );
    }

    #[test]
    fn keeps_layers_in_data_crs() {
        let layer = rect_layer(0.0, 0.0, 2.0, 1.0).with_crs(Crs::new("EPSG:4326"));
        let config = ConfigurationBuilder::new(vec![layer])
            .spec(main_spec())
            .data_crs(Crs::new("EPSG:4326"))
            .resolve(&IdentityProjector)
            .unwrap();
        assert_eq!(config.data_crs().map(Crs::as_str), Some("EPSG:4326"));
        assert_eq!(config.crs(), config.data_crs());
        assert_eq!(config.layers().len(), 1);
        assert_eq!(config.layers()[0].name, "states");
    }

    #[test]
    fn failed_build_leaves_store_empty() {
        let store = ConfigurationStore::new();
        let result = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 1.0, 1.0)])
            .spec(main_spec())
            .spec(main_spec())
            .build_in(&store, &IdentityProjector);
        assert!(matches!(result, Err(InsetError::MultipleMainSpec { .. })));
        assert_eq!(store.get().unwrap_err(), InsetError::NoConfiguration);
    }

    #[test]
    fn store_keeps_last_written_configuration() {
        let store = ConfigurationStore::new();
        let first = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 2.0, 1.0)])
            .spec(main_spec())
            .build_in(&store, &IdentityProjector)
            .unwrap();
        let second = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 1.0, 2.0)])
            .spec(main_spec())
            .build_in(&store, &IdentityProjector)
            .unwrap();
        let current = store.get().unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert!(!Arc::ptr_eq(&current, &first));

        store.clear();
        assert!(store.get().is_err());
    }

    #[test]
    fn empty_inset_crop_is_kept_as_missing_extent() {
        let inset = SubplotSpec::inset()
            .bbox(BoundingBox::new(50.0, 50.0, 60.0, 60.0))
            .width(0.2)
            .build()
            .unwrap();
        let config = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 1.0, 1.0)])
            .spec(main_spec())
            .spec(inset)
            .resolve(&IdentityProjector)
            .unwrap();
        let inset = config.insets().next().unwrap();
        assert!(inset.data_extent().is_none());
        assert!(matches!(
            inset.extent_features(),
            Err(InsetError::DegenerateExtent { index: Some(1), .. })
        ));
    }

    #[test]
    fn collects_spec_advisories() {
        let config = ConfigurationBuilder::new(vec![rect_layer(0.0, 0.0, 1.0, 1.0)])
            .spec(main_spec())
            .spec(SubplotSpec::inset().build().unwrap())
            .resolve(&IdentityProjector)
            .unwrap();
        assert_eq!(config.advisories(), &[Advisory::DefaultScaleFactor]);
    }
}
