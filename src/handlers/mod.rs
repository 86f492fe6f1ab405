pub mod generate_handlers;
pub mod health_handlers;
pub mod upload_handlers;

use crate::{config::AppConfig, services::assembler::AssetUrls};
use axum::http::{HeaderMap, header};

/// Form field names shared by the ingestion endpoints.
pub const PROMPT_FIELD: &str = "prompt";
pub const MODEL_FIELD: &str = "model";
pub const IMAGE_FIELD: &str = "image";

/// Work out the base for absolute asset URLs.
///
/// A configured public URL wins, then the `X-Forwarded-*` headers when the
/// deployment trusts its proxy, then `Host`, then the bind address. Without a
/// trusted proxy, production deployments should set `public_base_url`.
pub fn asset_urls(config: &AppConfig, headers: &HeaderMap) -> AssetUrls {
    if let Some(base) = &config.public_base_url {
        return AssetUrls::new(base);
    }

    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let forwarded = |name: &str| {
        if config.trust_forwarded_headers {
            header_str(name)
        } else {
            None
        }
    };

    let host = forwarded("x-forwarded-host").or_else(|| header_str(header::HOST.as_str()));
    match host {
        Some(host) => {
            let scheme = forwarded("x-forwarded-proto").unwrap_or("http");
            AssetUrls::new(format!("{}://{}", scheme, host))
        }
        None => AssetUrls::new(format!("http://{}:{}", config.host, config.port)),
    }
}
