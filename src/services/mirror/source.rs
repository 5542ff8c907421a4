use tracing::debug;

use super::{AssetResolver, DataSource, PlayerError};

/// Resolve a data source into the URL handed to the master surface.
///
/// Network URLs pass through untouched. Asset paths are namespaced under
/// `packages/<package>/` when they belong to a package and then handed to
/// the asset resolver. File and content URIs cannot be played here.
///
/// # Errors
///
/// Returns `PlayerError::UnsupportedSource` for file and content-URI sources.
pub fn resolve_source(
    source: &DataSource,
    assets: &dyn AssetResolver,
) -> Result<String, PlayerError> {
    let url = match source {
        DataSource::Network { uri } => uri.clone(),
        DataSource::Asset { asset, package } => {
            let key = match package {
                Some(package) => format!("packages/{package}/{asset}"),
                None => asset.clone(),
            };
            assets.asset_url(&key)
        }
        DataSource::File { .. } | DataSource::ContentUri { .. } => {
            return Err(PlayerError::UnsupportedSource(source.kind()));
        }
    };

    debug!(kind = %source.kind(), %url, "resolved data source");
    Ok(url)
}
