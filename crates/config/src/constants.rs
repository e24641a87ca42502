//! Fixed names and defaults shared across curie crates

/// Directory name under the per-user config and data directories
pub const APP_DIR: &str = "curie";

/// Subdirectory of the data directory holding cached assets
pub const ASSETS_DIR: &str = "assets";

pub const DEFAULT_SIGNURL_ENDPOINT: &str = "https://api.curie.io/public/products/signurl";

/// Assets are usdz models; the extension is fixed per cache, never taken from
/// the signed URL
pub const DEFAULT_ASSET_EXTENSION: &str = "usdz";
