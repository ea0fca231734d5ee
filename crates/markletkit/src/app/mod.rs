//! Application layer: the build pipeline from unit folders to the gallery.

pub mod build;
pub mod detect;
pub mod gallery;
pub mod helpers;
pub mod inject;
pub mod minify;
pub mod package;
pub mod scan;
pub mod template;
pub mod watch;
