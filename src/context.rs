//! Client environment snapshot
//!
//! Builds the browser-info JSON attached to every submission. Collection must
//! never fail: every field is optional, an unreadable field is simply left
//! out, and the result is always valid JSON text.

use chrono::Utc;
use serde_json::{Map, Value};

/// Raw environment readings as the embedding UI managed to gather them.
/// A field the host could not read stays `None` and is omitted from the
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClientEnvironment {
    pub user_agent: Option<String>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    pub device_pixel_ratio: Option<f64>,
    pub platform: Option<String>,
    pub language: Option<String>,
}

/// Serializes the environment into the browser-info JSON string.
///
/// Key names match what the submission form posts (`userAgent`,
/// `screenWidth`, ...). The pixel ratio defaults to 1 when unavailable and a
/// collection timestamp is always appended.
pub fn collect_browser_info(env: &ClientEnvironment) -> String {
    let mut info = Map::new();

    if let Some(user_agent) = &env.user_agent {
        info.insert("userAgent".to_string(), Value::from(user_agent.clone()));
    }
    if let Some(width) = env.screen_width {
        info.insert("screenWidth".to_string(), Value::from(width));
    }
    if let Some(height) = env.screen_height {
        info.insert("screenHeight".to_string(), Value::from(height));
    }
    if let Some(width) = env.viewport_width {
        info.insert("viewportWidth".to_string(), Value::from(width));
    }
    if let Some(height) = env.viewport_height {
        info.insert("viewportHeight".to_string(), Value::from(height));
    }
    info.insert(
        "devicePixelRatio".to_string(),
        Value::from(env.device_pixel_ratio.unwrap_or(1.0)),
    );
    if let Some(platform) = &env.platform {
        info.insert("platform".to_string(), Value::from(platform.clone()));
    }
    if let Some(language) = &env.language {
        info.insert("language".to_string(), Value::from(language.clone()));
    }
    info.insert(
        "timestamp".to_string(),
        Value::from(Utc::now().to_rfc3339()),
    );

    // Display of a Value is its JSON rendition, so this cannot fail.
    Value::Object(info).to_string()
}
