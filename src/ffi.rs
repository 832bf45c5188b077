//! FFI bindings for health fusion
//!
//! This module provides C-compatible functions for calling the engine from
//! mobile and other host runtimes. All functions take null-terminated C strings
//! and return allocated memory that must be freed by the caller using
//! `fusion_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::FusionConfig;
use crate::engine::{merge_sources_json, FusionEngine};
use crate::error::FusionError;
use crate::registry::SourceRegistry;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Convert a C string to a Rust string; `None` for NULL or invalid UTF-8
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Caller must free with `fusion_free_string`
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn result_to_cstr(result: Result<String, FusionError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Merge a JSON fusion request using the built-in registry and default config.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fusion_free_string`.
/// - Returns NULL on error; call `fusion_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fusion_merge_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(merge_sources_json(json_str))
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to a configured FusionEngine
pub struct FusionEngineHandle {
    engine: FusionEngine,
}

/// Create an engine from an optional registry JSON array and an optional
/// config JSON object. Pass NULL for either to use the built-in defaults.
///
/// # Safety
/// - Non-NULL arguments must be valid null-terminated C strings.
/// - Must be freed with `fusion_engine_free`.
/// - Returns NULL on error; call `fusion_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fusion_engine_new(
    sources_json: *const c_char,
    config_json: *const c_char,
) -> *mut FusionEngineHandle {
    clear_last_error();

    let registry = if sources_json.is_null() {
        Ok(SourceRegistry::default())
    } else {
        match cstr_to_string(sources_json) {
            Some(s) => SourceRegistry::from_json(&s),
            None => Err(FusionError::ParseError("Invalid sources string pointer".to_string())),
        }
    };

    let config = if config_json.is_null() {
        Ok(FusionConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => FusionConfig::from_json(&s),
            None => Err(FusionError::ParseError("Invalid config string pointer".to_string())),
        }
    };

    let engine = registry
        .and_then(|registry| config.map(|config| (registry, config)))
        .and_then(|(registry, config)| FusionEngine::new(registry, config));

    match engine {
        Ok(engine) => Box::into_raw(Box::new(FusionEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fusion_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fusion_engine_free(engine: *mut FusionEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Merge a JSON fusion request with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `fusion_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fusion_free_string`.
/// - Returns NULL on error; call `fusion_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fusion_engine_merge(
    engine: *const FusionEngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(handle.engine.merge_json(&json_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by fusion functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a fusion function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fusion_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next fusion call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn fusion_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn fusion_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
