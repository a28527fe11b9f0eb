//! FFI bindings for pagewatch
//!
//! This module provides C-compatible functions for embedding the tracker in
//! a host that owns the real page. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `pagewatch_free_string`. Instants are RFC 3339 strings.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::config::TrackerConfig;
use crate::dom::Document;
use crate::error::TrackError;
use crate::replay::replay_to_json;
use crate::signal::HostSignal;
use crate::sink::ConsoleSink;
use crate::tracker::PageTracker;

// Thread-local storage for the last error message
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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, TrackError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrackError::ParseError(format!("bad instant '{}': {}", s, e)))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a JSON scenario and return the finished session as JSON.
///
/// # Safety
/// - `scenario_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pagewatch_free_string`.
/// - Returns NULL on error; call `pagewatch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_replay(scenario_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(scenario_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid scenario string pointer");
            return ptr::null_mut();
        }
    };

    match replay_to_json(json_str) {
        Ok(session) => string_to_cstr(&session),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Tracker API
// ============================================================================

/// Opaque handle to a PageTracker
pub struct PageTrackerHandle {
    tracker: PageTracker,
}

/// Start tracking a page.
///
/// # Safety
/// - `page_json` and `now` must be valid null-terminated C strings.
/// - `config_json` may be NULL to use the default configuration.
/// - Returns a pointer to a newly allocated tracker that must be released with
///   `pagewatch_tracker_unload` or `pagewatch_tracker_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_tracker_new(
    page_json: *const c_char,
    config_json: *const c_char,
    now: *const c_char,
) -> *mut PageTrackerHandle {
    clear_last_error();

    let page_str = match cstr_to_string(page_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid page string pointer");
            return ptr::null_mut();
        }
    };

    let now_str = match cstr_to_string(now) {
        Some(s) => s,
        None => {
            set_last_error("Invalid instant string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        Ok(TrackerConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => TrackerConfig::from_json(&s),
            None => Err(TrackError::ParseError(
                "Invalid config string pointer".to_string(),
            )),
        }
    };

    let started = config.and_then(|config| {
        let document: Document = serde_json::from_str(&page_str)?;
        let now = parse_instant(&now_str)?;
        PageTracker::start(document, config, Box::new(ConsoleSink::new()), now)
    });

    match started {
        Ok(tracker) => Box::into_raw(Box::new(PageTrackerHandle { tracker })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a tracker without emitting the unload summary.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `pagewatch_tracker_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_tracker_free(tracker: *mut PageTrackerHandle) {
    if !tracker.is_null() {
        drop(Box::from_raw(tracker));
    }
}

/// Deliver one host signal (JSON) at the given instant.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `pagewatch_tracker_new`.
/// - `signal_json` and `at` must be valid null-terminated C strings.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `pagewatch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_tracker_dispatch(
    tracker: *mut PageTrackerHandle,
    signal_json: *const c_char,
    at: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }

    let handle = &mut *tracker;

    let signal_str = match cstr_to_string(signal_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid signal string pointer");
            return -1;
        }
    };

    let at_str = match cstr_to_string(at) {
        Some(s) => s,
        None => {
            set_last_error("Invalid instant string pointer");
            return -1;
        }
    };

    let parsed = serde_json::from_str::<HostSignal>(&signal_str)
        .map_err(TrackError::from)
        .and_then(|signal| Ok((signal, parse_instant(&at_str)?)));

    match parsed {
        Ok((signal, at)) => {
            handle.tracker.dispatch(signal, at);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Let scheduled work run up to the given instant.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `pagewatch_tracker_new`.
/// - `now` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_tracker_advance(
    tracker: *mut PageTrackerHandle,
    now: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }

    let handle = &mut *tracker;

    let now_str = match cstr_to_string(now) {
        Some(s) => s,
        None => {
            set_last_error("Invalid instant string pointer");
            return -1;
        }
    };

    match parse_instant(&now_str) {
        Ok(now) => {
            handle.tracker.advance_to(now);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Events captured so far, as a JSON array.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `pagewatch_tracker_new`.
/// - Returns a newly allocated string that must be freed with `pagewatch_free_string`.
/// - Returns NULL on error; call `pagewatch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_tracker_events(tracker: *mut PageTrackerHandle) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }

    let handle = &*tracker;

    match serde_json::to_string(handle.tracker.session().events()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Tear the page down: emits the unload summary, frees the tracker and
/// returns the finished session as JSON.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `pagewatch_tracker_new`.
/// - `now` must be a valid null-terminated C string.
/// - The tracker pointer is invalid after this call, even on error.
/// - Returns a newly allocated string that must be freed with `pagewatch_free_string`.
/// - Returns NULL on error; call `pagewatch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_tracker_unload(
    tracker: *mut PageTrackerHandle,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }

    let handle = Box::from_raw(tracker);

    let now = match cstr_to_string(now).map(|s| parse_instant(&s)) {
        Some(Ok(now)) => now,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid instant string pointer");
            return ptr::null_mut();
        }
    };

    let session = handle.tracker.unload(now);
    match serde_json::to_string(&session) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by pagewatch functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a pagewatch function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next pagewatch call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the pagewatch library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pagewatch_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_page() -> CString {
        CString::new(
            r#"{
                "url": "https://shop.example.com/cart",
                "viewport": { "width": 1024, "height": 768 },
                "elements": [
                    {
                        "id": 7, "tag": "BUTTON", "classes": ["track-view"],
                        "text": "Checkout",
                        "rect": { "x": 10, "y": 10, "width": 200, "height": 40 }
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    fn instant(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_ffi_tracker_lifecycle() {
        let page = sample_page();
        let start = instant("2024-01-15T14:00:00Z");

        unsafe {
            let tracker = pagewatch_tracker_new(page.as_ptr(), ptr::null(), start.as_ptr());
            assert!(!tracker.is_null());

            let click = CString::new(r#"{ "type": "click", "target": 7, "x": 20, "y": 20 }"#).unwrap();
            let at = instant("2024-01-15T14:00:01.500Z");
            assert_eq!(pagewatch_tracker_dispatch(tracker, click.as_ptr(), at.as_ptr()), 0);

            let later = instant("2024-01-15T14:00:04Z");
            assert_eq!(pagewatch_tracker_advance(tracker, later.as_ptr()), 0);

            let events = pagewatch_tracker_events(tracker);
            assert!(!events.is_null());
            let events_str = CStr::from_ptr(events).to_str().unwrap();
            assert!(events_str.starts_with('['));
            assert!(events_str.contains("button (Checkout)"));
            pagewatch_free_string(events);

            let end = instant("2024-01-15T14:00:05Z");
            let session = pagewatch_tracker_unload(tracker, end.as_ptr());
            assert!(!session.is_null());
            let session_str = CStr::from_ptr(session).to_str().unwrap();
            assert!(session_str.contains("page closing"));
            pagewatch_free_string(session);
        }
    }

    #[test]
    fn test_ffi_replay() {
        let scenario = CString::new(
            r#"{
                "page": { "viewport": { "width": 800, "height": 600 } },
                "start": "2024-01-15T14:00:00Z",
                "signals": [
                    { "at": "2024-01-15T14:00:01Z", "signal": { "type": "key_press" } }
                ]
            }"#,
        )
        .unwrap();

        unsafe {
            let result = pagewatch_replay(scenario.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"sessionId\""));
            assert!(result_str.contains("page loaded"));

            pagewatch_free_string(result);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let bad_signal = CString::new("not json").unwrap();
            let page = sample_page();
            let start = instant("2024-01-15T14:00:00Z");
            let tracker = pagewatch_tracker_new(page.as_ptr(), ptr::null(), start.as_ptr());

            let status = pagewatch_tracker_dispatch(tracker, bad_signal.as_ptr(), start.as_ptr());
            assert_eq!(status, -1);

            let error = pagewatch_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let bad_time = instant("yesterday");
            assert_eq!(pagewatch_tracker_advance(tracker, bad_time.as_ptr()), -1);
            assert!(CStr::from_ptr(pagewatch_last_error())
                .to_str()
                .unwrap()
                .contains("yesterday"));

            pagewatch_tracker_free(tracker);
            assert_eq!(pagewatch_tracker_dispatch(ptr::null_mut(), bad_signal.as_ptr(), start.as_ptr()), -1);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let page = sample_page();
        let start = instant("2024-01-15T14:00:00Z");
        let config = CString::new(r#"{ "idle_inactive_secs": 60 }"#).unwrap();

        unsafe {
            let tracker = pagewatch_tracker_new(page.as_ptr(), config.as_ptr(), start.as_ptr());
            assert!(tracker.is_null());
            let error_str = CStr::from_ptr(pagewatch_last_error()).to_str().unwrap();
            assert!(error_str.contains("Invalid configuration"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = pagewatch_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
