//! Static site builder for course lessons.
//!
//! Turns a directory of markdown, Nunjucks-style and HTML templates into a
//! static site, with passthrough copying, named collections and template
//! filters declared through [`ConfigBuilder`].

pub mod assets;
pub mod builder;
pub mod collections;
pub mod config;
pub mod filters;
pub mod glob;
pub mod passthrough;
pub mod templates;

pub use builder::{BuildError, BuildResult, StaticBuilder};
pub use collections::{CollectionApi, CollectionItem, PageData};
pub use config::{
    CollectionDef, ConfigBuilder, ConfigError, DirConfig, FilterDef, FilterFn, PassthroughRule,
    Plugin, SiteConfig, SiteSettings, TemplateFormat,
};
pub use glob::{Glob, GlobError};
