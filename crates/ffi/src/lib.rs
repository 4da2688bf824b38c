//! C ABI over the backup facade
//!
//! A store is opened into an opaque [`AbkHandle`]; every call takes the handle
//! and NUL-terminated UTF-8 paths. Strings and arrays handed out here must be
//! released with [`abk_free_string`] and [`abk_free_change_array`].
//!
//! Status strings start with `success:` or `error:`.

use anybakup::system_config;
use anybakup::{Backup, RepoPath, SourcePath, StoreConfig, VersionRecord};
use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr;
use tracing::warn;

/// Open backup store
pub struct AbkHandle {
    backup: Backup,
}

/// One revision of a file
#[repr(C)]
pub struct AbkChange {
    pub commit: *mut c_char,
    pub author: *mut c_char,
    /// RFC 3339, UTC
    pub date: *mut c_char,
    pub message: *mut c_char,
}

#[repr(C)]
pub struct AbkChangeArray {
    pub changes: *mut AbkChange,
    pub count: usize,
}

/// Open the store at `repodir`; null on failure
///
/// # Safety
/// `repodir` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn abk_open(repodir: *const c_char) -> *mut AbkHandle {
    let Some(repodir) = read_str(repodir) else {
        return ptr::null_mut();
    };
    let opened = StoreConfig::at(repodir).and_then(Backup::open);
    into_handle(opened.map_err(|e| e.to_string()))
}

/// Open the store of the config file's default profile; null on failure
#[no_mangle]
pub extern "C" fn abk_open_default() -> *mut AbkHandle {
    let opened = system_config::load()
        .and_then(|config| config.store_config(None))
        .map_err(|e| e.to_string())
        .and_then(|config| Backup::open(config).map_err(|e| e.to_string()));
    into_handle(opened)
}

/// # Safety
/// `handle` must be null or come from [`abk_open`]/[`abk_open_default`], and
/// must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn abk_close(handle: *mut AbkHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Back up a file or directory
///
/// # Safety
/// `handle` must be a live handle; `path` null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn abk_add_file(handle: *mut AbkHandle, path: *const c_char) -> *mut c_char {
    let Some(handle) = handle.as_mut() else {
        return status_string("error: store handle is nil");
    };
    let Some(path) = read_str(path) else {
        return status_string("error: file path is nil");
    };

    let message = match SourcePath::new(path).and_then(|source| handle.backup.add_file(&source)) {
        Ok(report) => format!(
            "success: dest={}, result={:?}",
            report.repo_path, report.action
        ),
        Err(e) => format!("error: {e}"),
    };
    status_string(&message)
}

/// Revisions touching `path`, newest first; null on error or empty history
///
/// # Safety
/// `handle` must be a live handle; `path` null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn abk_file_log(
    handle: *mut AbkHandle,
    path: *const c_char,
) -> *mut AbkChangeArray {
    let (Some(handle), Some(path)) = (handle.as_ref(), read_str(path)) else {
        return ptr::null_mut();
    };
    let history = SourcePath::new(path)
        .and_then(|source| source.to_repo_path())
        .and_then(|repo_path| handle.backup.list_history(&repo_path));
    match history {
        Ok(records) => change_array(&records),
        Err(e) => {
            warn!(path, error = %e, "file log failed");
            ptr::null_mut()
        }
    }
}

/// Write `path` as it was in `commit` to `target`
///
/// # Safety
/// `handle` must be a live handle; the strings null or valid C strings.
#[no_mangle]
pub unsafe extern "C" fn abk_get_file(
    handle: *mut AbkHandle,
    path: *const c_char,
    commit: *const c_char,
    target: *const c_char,
) -> *mut c_char {
    let Some(handle) = handle.as_ref() else {
        return status_string("error: store handle is nil");
    };
    let (Some(path), Some(commit), Some(target)) =
        (read_str(path), read_str(commit), read_str(target))
    else {
        return status_string("error: file path, commit or target is nil");
    };

    let restored = SourcePath::new(path)
        .and_then(|source| source.to_repo_path())
        .and_then(|repo_path: RepoPath| {
            handle
                .backup
                .get_file_at_revision(&repo_path, commit, Path::new(target))
        });
    match restored {
        Ok(()) => status_string("success: file retrieved"),
        Err(e) => status_string(&format!("error: {e}")),
    }
}

/// # Safety
/// `s` must be null or a string returned by this library, freed once.
#[no_mangle]
pub unsafe extern "C" fn abk_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// # Safety
/// `array` must be null or come from [`abk_file_log`], freed once.
#[no_mangle]
pub unsafe extern "C" fn abk_free_change_array(array: *mut AbkChangeArray) {
    if array.is_null() {
        return;
    }
    let array = Box::from_raw(array);
    if array.changes.is_null() {
        return;
    }
    let changes = Box::from_raw(ptr::slice_from_raw_parts_mut(array.changes, array.count));
    for change in changes.iter() {
        abk_free_string(change.commit);
        abk_free_string(change.author);
        abk_free_string(change.date);
        abk_free_string(change.message);
    }
}

unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn into_handle(opened: Result<Backup, String>) -> *mut AbkHandle {
    match opened {
        Ok(backup) => Box::into_raw(Box::new(AbkHandle { backup })),
        Err(e) => {
            warn!(error = %e, "cannot open store");
            ptr::null_mut()
        }
    }
}

/// Owned C copy of `s`; interior NULs become spaces
fn status_string(s: &str) -> *mut c_char {
    let cleaned = s.replace('\0', " ");
    match CString::new(cleaned) {
        Ok(c) => c.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn change_array(records: &[VersionRecord]) -> *mut AbkChangeArray {
    let changes: Box<[AbkChange]> = records
        .iter()
        .map(|record| AbkChange {
            commit: status_string(&record.revision),
            author: status_string(&record.author),
            date: status_string(&record.timestamp.to_rfc3339()),
            message: status_string(&record.message),
        })
        .collect();
    let count = changes.len();
    let changes = Box::into_raw(changes) as *mut AbkChange;
    Box::into_raw(Box::new(AbkChangeArray { changes, count }))
}
