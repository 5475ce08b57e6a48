//! JNI bindings for an Android host app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.

use jni::JNIEnv;
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use std::sync::OnceLock;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Fitted once per process on first use.
static PIPELINE: OnceLock<Result<Pipeline, String>> = OnceLock::new();

fn pipeline() -> Result<&'static Pipeline, String> {
    PIPELINE
        .get_or_init(|| {
            init_logging();
            Pipeline::new(Config::default()).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(target_os = "android")]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("roadclass"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logging() {}

/// Run a classify request, returning the response JSON or an `{"error": ...}` object.
fn classify_to_json(request: &str) -> String {
    let result = pipeline().and_then(|p| p.classify_json(request).map_err(|e| e.to_string()));
    match result {
        Ok(json) => json,
        Err(message) => {
            log::warn!("classify request failed: {message}");
            serde_json::json!({ "error": message }).to_string()
        }
    }
}

/// Returns the rust-core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_roadclass_app_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    let version = crate::VERSION;
    env.new_string(version)
        .expect("failed to create Java string")
        .into_raw()
}

/// Classifies the segments of a JSON fix list.
/// Maps to: RustBridge.classifyTrack(request: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_roadclass_app_RustBridge_classifyTrack(
    mut env: JNIEnv,
    _class: JClass,
    request: JString,
) -> jstring {
    let response = match env.get_string(&request) {
        Ok(s) => classify_to_json(&String::from(s)),
        Err(e) => {
            serde_json::json!({ "error": format!("invalid request string: {e}") }).to_string()
        }
    };
    env.new_string(response)
        .expect("failed to create Java string")
        .into_raw()
}
