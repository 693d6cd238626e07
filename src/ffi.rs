//! C FFI: sectioning for native hosts (iOS / Android / desktop shells).
//!
//! Functions are `#[no_mangle] extern "C"` so Swift / Kotlin can call them
//! through a thin bridging header.  Results cross the boundary as UTF-8 JSON.
//!
//! ## Memory contract
//!
//! | Function                         | Caller frees with             |
//! |----------------------------------|-------------------------------|
//! | [`storyvoice_sectionize`]        | [`storyvoice_free_string`]    |
//! | [`storyvoice_flatten_html`]      | [`storyvoice_free_string`]    |

use std::ffi::{c_char, CStr, CString};

use crate::{format::flatten_html, sectionize::sectionize, sectionize::MAX_CHARS};

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Borrow a C string as an owned `String`.  `None` if `ptr` is null;
/// invalid UTF-8 is replaced, not rejected.
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Heap-allocate an owned C string.  Returns null on interior nul bytes.
fn to_c_str(s: &str) -> *const c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => std::ptr::null(),
    }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Split `text` into sections of at most `max_chars` characters.
///
/// @param text       UTF-8 text.
/// @param max_chars  Per-section limit; `0` selects the default (4096).
/// @return           Heap-allocated JSON array of strings, e.g.
///                   `["First paragraph.","Second paragraph."]`, or `NULL`
///                   if `text` is null or has nothing to read.
///                   Free with [`storyvoice_free_string`].
#[no_mangle]
pub unsafe extern "C" fn storyvoice_sectionize(
    text: *const c_char,
    max_chars: usize,
) -> *const c_char {
    let Some(text) = (unsafe { cstr_to_string(text) }) else {
        tracing::warn!("storyvoice_sectionize: null text");
        return std::ptr::null();
    };
    let limit = if max_chars == 0 { MAX_CHARS } else { max_chars };

    let sections = match sectionize(&text, limit) {
        Ok(sections) => sections,
        Err(e) => {
            tracing::debug!(error = %e, "storyvoice_sectionize: nothing to section");
            return std::ptr::null();
        }
    };
    match serde_json::to_string(&sections) {
        Ok(json) => to_c_str(&json),
        Err(e) => {
            tracing::error!(error = %e, "storyvoice_sectionize: encode failed");
            std::ptr::null()
        }
    }
}

/// Convert editor HTML to the plain text that gets sectioned.
///
/// @return  Heap-allocated UTF-8 string, or `NULL` if `html` is null.
///          Free with [`storyvoice_free_string`].
#[no_mangle]
pub unsafe extern "C" fn storyvoice_flatten_html(html: *const c_char) -> *const c_char {
    match unsafe { cstr_to_string(html) } {
        Some(html) => to_c_str(&flatten_html(&html)),
        None => std::ptr::null(),
    }
}

/// Free a string returned by this library.  `NULL` is ignored.
#[no_mangle]
pub unsafe extern "C" fn storyvoice_free_string(s: *const c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s as *mut c_char) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(ptr: *const c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let out = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { storyvoice_free_string(ptr) };
        Some(out)
    }

    #[test]
    fn test_sectionize_returns_json_array() {
        let text = CString::new("Alpha beta.\n\nGamma \"delta\".").unwrap();
        let json = take(unsafe { storyvoice_sectionize(text.as_ptr(), 12) }).unwrap();
        let sections: Vec<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(sections, vec!["Alpha beta.", "Gamma \"delta\"."]);
    }

    #[test]
    fn test_sectionize_zero_limit_uses_default() {
        let text = CString::new("One.\n\nTwo.").unwrap();
        let json = take(unsafe { storyvoice_sectionize(text.as_ptr(), 0) }).unwrap();
        assert_eq!(json, r#"["One.\n\nTwo."]"#);
    }

    #[test]
    fn test_sectionize_null_and_empty() {
        assert!(take(unsafe { storyvoice_sectionize(std::ptr::null(), 10) }).is_none());
        let blank = CString::new("  \n ").unwrap();
        assert!(take(unsafe { storyvoice_sectionize(blank.as_ptr(), 10) }).is_none());
    }

    #[test]
    fn test_flatten_html() {
        let html = CString::new("<p>Hi <b>there</b></p>").unwrap();
        assert_eq!(
            take(unsafe { storyvoice_flatten_html(html.as_ptr()) }).as_deref(),
            Some("Hi **there**")
        );
        unsafe { storyvoice_free_string(std::ptr::null()) };
    }
}
