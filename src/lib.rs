pub mod bbox;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compose;
pub mod config;
pub mod configuration;
pub mod error;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod sizing;
pub mod spatial;
pub mod spec;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;

pub use bbox::{BoundingBox, PartialBox};
pub use compose::{ComposeOptions, Composition, EmptyInsetPolicy, PlotSource, compose};
pub use configuration::{
    ConfigurationBuilder, ConfigurationStore, LayoutConfiguration, ResolvedSpec,
    last_configuration,
};
pub use error::{Advisory, InsetError};
pub use layout::{ResolvedLayout, resolve_layouts, resolve_layouts_lenient};
pub use render::{Renderer, SvgPlot, SvgRenderer};
pub use spatial::{Crs, FeatureLayer, IdentityProjector, Projector};
pub use spec::{Anchor, HAlign, Position, SizeMode, SubplotSpec, VAlign};
pub use theme::Theme;
