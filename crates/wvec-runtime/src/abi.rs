/// C ABI exports for the wvec runtime
///
/// Primitive-typed boundary: `i32` ids and sizes, `f32` rates, raw buffers,
/// NUL-terminated paths. Every fallible call returns an `ErrorCode` as `i32`;
/// values come back through out-pointers. Word ids are 0-indexed.
///
/// One model lives behind a global lock. `model_init`, `model_free` and
/// `checkpoint_load` must not race with training from another thread; the
/// lock turns such a race into serialization, not corruption.
use crate::context::{RuntimeConfig, RuntimeContext};
use crate::{set_last_error, shutdown, take_last_error, thermal, ErrorCode};
use parking_lot::Mutex;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::PathBuf;
use std::slice;
use wvec_core::error::Result;

// Global runtime context, created with defaults on first use
static RUNTIME: Mutex<Option<RuntimeContext>> = Mutex::new(None);

fn with_runtime<T>(f: impl FnOnce(&mut RuntimeContext) -> Result<T>) -> Result<T> {
    let mut runtime = RUNTIME.lock();
    f(runtime.get_or_insert_with(RuntimeContext::default))
}

/// Record a failure and turn it into a status code.
fn status(result: Result<()>) -> i32 {
    match result {
        Ok(()) => ErrorCode::Ok as i32,
        Err(e) => {
            let code = ErrorCode::from(&e);
            set_last_error(e.to_string());
            code as i32
        }
    }
}

fn reject(code: ErrorCode, msg: String) -> i32 {
    set_last_error(msg);
    code as i32
}

/// Borrow `len` elements at `ptr`. A zero length accepts a null pointer.
unsafe fn slice_arg<'a, T>(
    ptr: *const T,
    len: i32,
    what: &str,
) -> std::result::Result<&'a [T], i32> {
    if len < 0 {
        return Err(reject(ErrorCode::InvalidSize, format!("{} length {} < 0", what, len)));
    }
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(reject(ErrorCode::InvalidArgument, format!("{} is null", what)));
    }
    Ok(slice::from_raw_parts(ptr, len as usize))
}

unsafe fn path_arg(ptr: *const c_char) -> std::result::Result<PathBuf, i32> {
    if ptr.is_null() {
        return Err(reject(ErrorCode::InvalidArgument, "path is null".to_string()));
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(PathBuf::from(s)),
        Err(e) => Err(reject(ErrorCode::InvalidArgument, format!("Invalid UTF-8 in path: {}", e))),
    }
}

/// Replace the runtime configuration with JSON (`{}` or null = defaults).
///
/// A live model is kept.
///
/// # Safety
/// `config_ptr` must be valid for reads of `config_len` bytes, or null.
#[no_mangle]
pub unsafe extern "C" fn wvec_configure(config_ptr: *const u8, config_len: usize) -> i32 {
    let config_str = if config_ptr.is_null() || config_len == 0 {
        "{}"
    } else {
        let bytes = slice::from_raw_parts(config_ptr, config_len);
        match std::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                return reject(ErrorCode::InvalidArgument, format!("Invalid UTF-8 in config: {}", e))
            }
        }
    };

    status(RuntimeConfig::from_json(config_str).and_then(|config| {
        with_runtime(|rt| rt.reconfigure(config))
    }))
}

/// Allocate a fresh model, dropping any existing one.
#[no_mangle]
pub extern "C" fn wvec_model_init(vocab_size: i32, dim: i32) -> i32 {
    status(with_runtime(|rt| rt.init_model(vocab_size, dim)))
}

/// Drop the model; no-op when none is live.
#[no_mangle]
pub extern "C" fn wvec_model_free() {
    let _ = with_runtime(|rt| {
        rt.free_model();
        Ok(())
    });
}

#[no_mangle]
pub extern "C" fn wvec_model_is_init() -> bool {
    with_runtime(|rt| Ok(rt.state().is_init())).unwrap_or(false)
}

/// Write `(vocab_size, dim)`, `(0, 0)` when uninitialized. Null outputs are skipped.
///
/// # Safety
/// Non-null pointers must be valid for a write of one `i32`.
#[no_mangle]
pub unsafe extern "C" fn wvec_model_get_dims(vocab_size_out: *mut i32, dim_out: *mut i32) {
    let (vocab_size, dim) = with_runtime(|rt| Ok(rt.state().dims())).unwrap_or((0, 0));
    if !vocab_size_out.is_null() {
        *vocab_size_out = vocab_size;
    }
    if !dim_out.is_null() {
        *dim_out = dim;
    }
}

/// Copy the input embedding of `word_id` into `buf` (`buf_len` must equal dim).
///
/// # Safety
/// `buf` must be valid for writes of `buf_len` floats.
#[no_mangle]
pub unsafe extern "C" fn wvec_get_embedding(word_id: i32, buf: *mut f32, buf_len: i32) -> i32 {
    if buf_len < 0 {
        return reject(ErrorCode::InvalidSize, format!("buffer length {} < 0", buf_len));
    }
    let out: &mut [f32] = if buf_len == 0 {
        &mut []
    } else if buf.is_null() {
        return reject(ErrorCode::InvalidArgument, "embedding buffer is null".to_string());
    } else {
        slice::from_raw_parts_mut(buf, buf_len as usize)
    };

    status(with_runtime(|rt| rt.state().embedding(word_id, out)))
}

/// One skip-gram update.
///
/// # Safety
/// `neg_ids` must be valid for reads of `n_neg` ids, or null when `n_neg == 0`.
#[no_mangle]
pub unsafe extern "C" fn wvec_train_pair(
    center_id: i32,
    context_id: i32,
    neg_ids: *const i32,
    n_neg: i32,
    learning_rate: f32,
) -> i32 {
    let negatives = match slice_arg(neg_ids, n_neg, "neg_ids") {
        Ok(s) => s,
        Err(code) => return code,
    };
    status(with_runtime(|rt| rt.train_pair(center_id, context_id, negatives, learning_rate)))
}

/// Train over a token stream.
///
/// # Safety
/// `token_ids` must be valid for `n_tokens` reads and `neg_table` for
/// `table_size` reads.
#[no_mangle]
pub unsafe extern "C" fn wvec_train_corpus(
    token_ids: *const i32,
    n_tokens: i32,
    window: i32,
    n_neg: i32,
    neg_table: *const i32,
    table_size: i32,
    learning_rate: f32,
) -> i32 {
    let tokens = match slice_arg(token_ids, n_tokens, "token_ids") {
        Ok(s) => s,
        Err(code) => return code,
    };
    let table = match slice_arg(neg_table, table_size.max(0), "neg_table") {
        Ok(s) => s,
        Err(code) => return code,
    };

    status(with_runtime(|rt| {
        rt.train_corpus(tokens, window, n_neg, table, table_size, learning_rate).map(|_| ())
    }))
}

/// Save the live model with its training position.
///
/// # Safety
/// `path` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn wvec_checkpoint_save(
    path: *const c_char,
    epoch: i32,
    learning_rate: f32,
) -> i32 {
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    status(with_runtime(|rt| rt.save_checkpoint(&path, epoch, learning_rate)))
}

/// Replace the live model from a checkpoint; writes back epoch and learning rate.
///
/// # Safety
/// `path` must be a valid NUL-terminated string; non-null outputs must be
/// valid for one write.
#[no_mangle]
pub unsafe extern "C" fn wvec_checkpoint_load(
    path: *const c_char,
    epoch_out: *mut i32,
    learning_rate_out: *mut f32,
) -> i32 {
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    status(with_runtime(|rt| rt.load_checkpoint(&path)).map(|(epoch, lr)| {
        if !epoch_out.is_null() {
            *epoch_out = epoch;
        }
        if !learning_rate_out.is_null() {
            *learning_rate_out = lr;
        }
    }))
}

/// Sensor reading in millidegrees Celsius.
///
/// # Safety
/// `path` must be a valid NUL-terminated string; `millis_out` valid for one write or null.
#[no_mangle]
pub unsafe extern "C" fn wvec_thermal_read(path: *const c_char, millis_out: *mut i32) -> i32 {
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    status(thermal::read(&path).map(|millis| {
        if !millis_out.is_null() {
            *millis_out = millis;
        }
    }))
}

/// Whether the sensor is at or above `threshold_celsius`.
///
/// The return value is a status; the verdict goes to `overheating_out`.
///
/// # Safety
/// `path` must be a valid NUL-terminated string; `overheating_out` valid for one write or null.
#[no_mangle]
pub unsafe extern "C" fn wvec_thermal_check(
    path: *const c_char,
    threshold_celsius: i32,
    overheating_out: *mut bool,
) -> i32 {
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    status(thermal::check(&path, threshold_celsius).map(|hot| {
        if !overheating_out.is_null() {
            *overheating_out = hot;
        }
    }))
}

/// Sensor reading in whole degrees Celsius.
///
/// # Safety
/// `path` must be a valid NUL-terminated string; `celsius_out` valid for one write or null.
#[no_mangle]
pub unsafe extern "C" fn wvec_thermal_get_celsius(
    path: *const c_char,
    celsius_out: *mut i32,
) -> i32 {
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    status(thermal::get_celsius(&path).map(|celsius| {
        if !celsius_out.is_null() {
            *celsius_out = celsius;
        }
    }))
}

/// Set the shutdown flag. Safe to call from a signal handler.
#[no_mangle]
pub extern "C" fn wvec_shutdown_request() {
    shutdown::request();
}

#[no_mangle]
pub extern "C" fn wvec_shutdown_check() -> bool {
    shutdown::check()
}

#[no_mangle]
pub extern "C" fn wvec_shutdown_reset() {
    shutdown::reset();
}

/// Get last error message
///
/// Returns number of bytes written to buffer.
///
/// # Safety
/// `buf_ptr` must be valid for writes of `buf_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn wvec_last_error(buf_ptr: *mut c_char, buf_len: usize) -> usize {
    if buf_ptr.is_null() || buf_len == 0 {
        return 0;
    }

    let error_msg = take_last_error().unwrap_or_else(|| "No error".to_string());
    let bytes = error_msg.as_bytes();
    let copy_len = bytes.len().min(buf_len - 1); // Leave room for null terminator

    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf_ptr as *mut u8, copy_len);
    *buf_ptr.add(copy_len) = 0; // Null terminator

    copy_len
}

/// Get runtime version string
#[no_mangle]
pub extern "C" fn wvec_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
